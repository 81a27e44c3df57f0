use anyhow::Result;
use bpel_deploy::adapters::engine::{EngineClient, ProcessLifecycle};
use bpel_deploy::DeployError;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const OK_RESPONSE: &[u8] =
    b"HTTP/1.1 200 OK\r\nContent-Type: text/xml\r\nContent-Length: 5\r\nConnection: close\r\n\r\n<ok/>";

/// 讀完一個 HTTP 請求（標頭加上 Content-Length 指定的內容）
fn read_request(stream: &mut TcpStream) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let mut data = Vec::new();
    let mut buffer = [0u8; 4096];

    let header_end = loop {
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        match stream.read(&mut buffer) {
            Ok(0) | Err(_) => return,
            Ok(n) => data.extend_from_slice(&buffer[..n]),
        }
    };

    let headers = String::from_utf8_lossy(&data[..header_end]).to_ascii_lowercase();
    let content_length = headers
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while data.len() < header_end + content_length {
        match stream.read(&mut buffer) {
            Ok(0) | Err(_) => return,
            Ok(n) => data.extend_from_slice(&buffer[..n]),
        }
    }
}

/// 前 `drops` 個連線讀完請求後不回應直接關閉，之後的連線回應 200
fn flaky_server(drops: usize) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/active-bpel/services/ActiveBpelAdmin", listener.local_addr().unwrap());
    let connections = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&connections);

    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { break };
            let seen = counter.fetch_add(1, Ordering::SeqCst);
            read_request(&mut stream);
            if seen >= drops {
                let _ = stream.write_all(OK_RESPONSE);
            }
        }
    });

    (url, connections)
}

fn client() -> EngineClient {
    EngineClient::new(Duration::from_secs(5)).unwrap()
}

/// 測試連線中斷時 post 自動重試一次
#[test]
fn test_post_retries_once_after_dropped_connection() -> Result<()> {
    let (url, connections) = flaky_server(1);

    let result = client().post(&url, "text/xml", b"<req/>")?;

    assert!(result.is_ok());
    assert_eq!(result.body, "<ok/>");
    assert_eq!(connections.load(Ordering::SeqCst), 2);
    Ok(())
}

/// 測試連續兩次中斷時 post 放棄，只嘗試兩次
#[test]
fn test_post_gives_up_after_one_retry() -> Result<()> {
    let (url, connections) = flaky_server(usize::MAX);

    let err = client().post(&url, "text/xml", b"<req/>").unwrap_err();

    assert!(matches!(err, DeployError::Transport { .. }));
    assert_eq!(connections.load(Ordering::SeqCst), 2);
    Ok(())
}

/// 測試列出實例的請求也套用重試
#[test]
fn test_list_running_survives_one_dropped_connection() -> Result<()> {
    let (url, connections) = flaky_server(1);
    let lifecycle = ProcessLifecycle::new(client(), url)?;

    let ids = lifecycle.list_running("OrderProcess")?;

    assert!(ids.is_empty());
    assert_eq!(connections.load(Ordering::SeqCst), 2);
    Ok(())
}

/// 測試終止實例的請求不重試
#[test]
fn test_terminate_process_is_not_retried() -> Result<()> {
    let (url, connections) = flaky_server(1);
    let lifecycle = ProcessLifecycle::new(client(), url)?;

    let err = lifecycle.terminate_process(42).unwrap_err();

    assert!(matches!(err, DeployError::LifecycleFailed { .. }));
    assert!(err.to_string().contains("#42"));
    assert_eq!(connections.load(Ordering::SeqCst), 1);
    Ok(())
}
