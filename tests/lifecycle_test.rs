use anyhow::Result;
use bpel_deploy::adapters::engine::{EngineClient, ProcessLifecycle};
use bpel_deploy::utils::error::ErrorCategory;
use bpel_deploy::DeployError;
use httpmock::prelude::*;
use std::time::Duration;

const ADMIN_PATH: &str = "/active-bpel/services/ActiveBpelAdmin";

const PROCESS_LIST: &str = r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/"><soapenv:Body>
<getProcessListOutput>
  <rowDetails><ns:processId>42</ns:processId><ns:name>OrderProcess</ns:name></rowDetails>
  <rowDetails><ns:processId>7</ns:processId><ns:name>OrderProcess</ns:name></rowDetails>
</getProcessListOutput>
</soapenv:Body></soapenv:Envelope>"#;

fn lifecycle(server: &MockServer) -> ProcessLifecycle {
    let client = EngineClient::new(Duration::from_secs(5)).unwrap();
    ProcessLifecycle::new(client, server.url(ADMIN_PATH)).unwrap()
}

/// 測試列出執行中的流程實例，依回應順序
#[test]
fn test_list_running_instances() -> Result<()> {
    let server = MockServer::start();
    let list_mock = server.mock(|when, then| {
        when.method(POST)
            .path(ADMIN_PATH)
            .header_exists("SOAPAction")
            .body_contains("<ns:processName>OrderProcess</ns:processName>");
        then.status(200)
            .header("content-type", "text/xml")
            .body(PROCESS_LIST);
    });

    let ids = lifecycle(&server).list_running("OrderProcess")?;

    list_mock.assert();
    assert_eq!(ids, vec![42, 7]);
    Ok(())
}

/// 測試流程名稱會被 XML 跳脫
#[test]
fn test_process_name_is_escaped() -> Result<()> {
    let server = MockServer::start();
    let list_mock = server.mock(|when, then| {
        when.method(POST).path(ADMIN_PATH).body_contains("Orders&amp;Returns");
        then.status(200).body("<empty/>");
    });

    let ids = lifecycle(&server).list_running("Orders&Returns")?;

    list_mock.assert();
    assert!(ids.is_empty());
    Ok(())
}

/// 測試管理服務回應非 200 狀態
#[test]
fn test_non_ok_status_is_rejected() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(ADMIN_PATH);
        then.status(503).body("engine is starting");
    });

    let err = lifecycle(&server).list_running("OrderProcess").unwrap_err();

    match &err {
        DeployError::LifecycleRejected { status, body, .. } => {
            assert_eq!(*status, 503);
            assert_eq!(body, "engine is starting");
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(err.category(), ErrorCategory::Lifecycle);
    Ok(())
}

/// 測試終止所有實例
#[test]
fn test_terminate_all() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(ADMIN_PATH).body_contains("getProcessListInput");
        then.status(200).body(PROCESS_LIST);
    });
    let first = server.mock(|when, then| {
        when.method(POST).path(ADMIN_PATH).body_contains("<act:pid>42</act:pid>");
        then.status(200).body("<ok/>");
    });
    let second = server.mock(|when, then| {
        when.method(POST).path(ADMIN_PATH).body_contains("<act:pid>7</act:pid>");
        then.status(200).body("<ok/>");
    });

    let count = lifecycle(&server).terminate_all("OrderProcess")?;

    assert_eq!(count, 2);
    first.assert_hits(1);
    second.assert_hits(1);
    Ok(())
}

/// 測試重複出現的實例編號只終止一次
#[test]
fn test_repeated_ids_are_terminated_once() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(ADMIN_PATH).body_contains("getProcessListInput");
        then.status(200).body(
            "<r><ns:processId>42</ns:processId><ns:processId>42</ns:processId><ns:processId>7</ns:processId></r>",
        );
    });
    let first = server.mock(|when, then| {
        when.method(POST).path(ADMIN_PATH).body_contains("<act:pid>42</act:pid>");
        then.status(200).body("<ok/>");
    });
    let second = server.mock(|when, then| {
        when.method(POST).path(ADMIN_PATH).body_contains("<act:pid>7</act:pid>");
        then.status(200).body("<ok/>");
    });

    let count = lifecycle(&server).terminate_all("OrderProcess")?;

    assert_eq!(count, 2);
    first.assert_hits(1);
    second.assert_hits(1);
    Ok(())
}

/// 測試終止失敗時中止剩餘的實例
#[test]
fn test_terminate_failure_stops_the_batch() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(ADMIN_PATH).body_contains("getProcessListInput");
        then.status(200).body(PROCESS_LIST);
    });
    let first = server.mock(|when, then| {
        when.method(POST).path(ADMIN_PATH).body_contains("<act:pid>42</act:pid>");
        then.status(500).body("cannot terminate");
    });
    let second = server.mock(|when, then| {
        when.method(POST).path(ADMIN_PATH).body_contains("<act:pid>7</act:pid>");
        then.status(200).body("<ok/>");
    });

    let err = lifecycle(&server).terminate_all("OrderProcess").unwrap_err();

    assert!(matches!(err, DeployError::LifecycleRejected { status: 500, .. }));
    assert!(err.to_string().contains("#42"));
    // 終止請求不重試
    first.assert_hits(1);
    second.assert_hits(0);
    Ok(())
}

/// 測試無法連線時回報 LifecycleFailed
#[test]
fn test_unreachable_engine() -> Result<()> {
    let client = EngineClient::new(Duration::from_secs(2))?;
    let lifecycle = ProcessLifecycle::new(client, "http://127.0.0.1:1/active-bpel/services/ActiveBpelAdmin")?;

    let err = lifecycle.list_running("OrderProcess").unwrap_err();

    assert!(matches!(err, DeployError::LifecycleFailed { .. }));
    assert!(err.to_string().contains("Listing running instances of OrderProcess"));
    Ok(())
}
