mod common;

use anyhow::Result;
use bpel_deploy::core::{ArchiveBuilder, Deployment, DeploymentCycle, ParseCache, TestCase};
use bpel_deploy::{DeployError, Partner, ProcessDeployer, ProcessUnderTest};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

const SIMULATED: &str = "http://localhost:7777/ws/Supplier";

/// 記錄呼叫順序的部署器
struct RecordingDeployer {
    archive: PathBuf,
    fail_deploy: bool,
    fail_undeploy: bool,
    calls: Vec<String>,
}

impl RecordingDeployer {
    fn new(archive: PathBuf) -> Self {
        Self {
            archive,
            fail_deploy: false,
            fail_undeploy: false,
            calls: Vec::new(),
        }
    }
}

impl ProcessDeployer for RecordingDeployer {
    fn deploy(&mut self, _put: &ProcessUnderTest) -> bpel_deploy::Result<()> {
        self.calls.push("deploy".to_string());
        if self.fail_deploy {
            return Err(DeployError::DeploymentRejected {
                status: 500,
                body: "boom".to_string(),
            });
        }
        Ok(())
    }

    fn undeploy(&mut self, put: &ProcessUnderTest) -> bpel_deploy::Result<()> {
        self.calls.push("undeploy".to_string());
        if self.fail_undeploy {
            return Err(DeployError::UndeployFailed {
                process: put.name().to_string(),
                reason: "file not found".to_string(),
            });
        }
        Ok(())
    }

    fn get_deployment(&mut self, put: &ProcessUnderTest) -> bpel_deploy::Result<Deployment> {
        self.calls.push("get_deployment".to_string());
        Deployment::open(put, &self.archive, None)
    }

    fn clean_up_after_test_case(&mut self) -> bpel_deploy::Result<()> {
        self.calls.push("clean_up".to_string());
        Ok(())
    }
}

fn build_archive(dir: &Path) -> Result<PathBuf> {
    let process = common::write_order_fixture(dir);
    let archive = dir.join("order.bpr");
    ArchiveBuilder::new(Arc::new(ParseCache::new())).build(&process, &archive)?;
    Ok(archive)
}

fn put(dir: &Path) -> ProcessUnderTest {
    ProcessUnderTest::new("OrderProcess", dir)
        .with_partner(Partner::new("supplier").with_simulated_url(SIMULATED))
}

/// 測試完整週期：部署、改寫夥伴端點、執行測試案例、解除部署
#[test]
fn test_full_cycle() -> Result<()> {
    let dir = TempDir::new()?;
    let archive = build_archive(dir.path())?;
    let mut cycle = DeploymentCycle::new(RecordingDeployer::new(archive));

    let mut seen_addresses = Vec::new();
    let mut cases = vec![
        TestCase::new("supplier is simulated", |deployment: &Deployment| {
            let wsdl = std::fs::read_to_string(deployment.root().join("wsdl/supplier.wsdl"))?;
            seen_addresses.push(wsdl.matches(SIMULATED).count());
            Ok(())
        }),
        TestCase::new("always fails", |_: &Deployment| anyhow::bail!("assertion failed")),
    ];

    let report = cycle.run(&put(dir.path()), &mut cases)?;
    drop(cases);

    // 只改寫 supplier 連結解析到的 port
    assert_eq!(report.rewritten_endpoints, 1);
    assert_eq!(seen_addresses, vec![1]);
    assert_eq!(report.passed(), 1);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.cases[1].name, "always fails");
    assert!(!report.is_clean());
    assert!(report.undeploy_error.is_none());

    let deployer = cycle.into_inner();
    assert_eq!(
        deployer.calls,
        vec!["get_deployment", "deploy", "clean_up", "clean_up", "undeploy"]
    );
    Ok(())
}

/// 測試部署失敗時仍嘗試解除部署並回傳部署錯誤
#[test]
fn test_failed_deploy_still_undeploys() -> Result<()> {
    let dir = TempDir::new()?;
    let archive = build_archive(dir.path())?;
    let mut deployer = RecordingDeployer::new(archive);
    deployer.fail_deploy = true;
    let mut cycle = DeploymentCycle::new(deployer);

    let mut ran = false;
    let mut cases = vec![TestCase::new("never runs", |_: &Deployment| {
        ran = true;
        Ok(())
    })];

    let err = cycle.run(&put(dir.path()), &mut cases).unwrap_err();
    drop(cases);

    assert!(matches!(err, DeployError::DeploymentRejected { status: 500, .. }));
    assert!(!ran);
    assert_eq!(
        cycle.deployer().calls,
        vec!["get_deployment", "deploy", "undeploy"]
    );
    Ok(())
}

/// 測試解除部署失敗會記錄在報告中
#[test]
fn test_undeploy_failure_is_reported() -> Result<()> {
    let dir = TempDir::new()?;
    let archive = build_archive(dir.path())?;
    let mut deployer = RecordingDeployer::new(archive);
    deployer.fail_undeploy = true;
    let mut cycle = DeploymentCycle::new(deployer);

    let mut cases = vec![TestCase::new("passes", |_: &Deployment| Ok(()))];
    let report = cycle.run(&put(dir.path()), &mut cases)?;

    assert_eq!(report.passed(), 1);
    assert!(matches!(
        report.undeploy_error,
        Some(DeployError::UndeployFailed { .. })
    ));
    assert!(!report.is_clean());
    Ok(())
}

/// 測試沒有模擬位址的夥伴不會被改寫
#[test]
fn test_partners_without_simulated_url_are_left_alone() -> Result<()> {
    let dir = TempDir::new()?;
    let archive = build_archive(dir.path())?;
    let mut cycle = DeploymentCycle::new(RecordingDeployer::new(archive));

    let put = ProcessUnderTest::new("OrderProcess", dir.path()).with_partner(Partner::new("supplier"));
    let report = cycle.run(&put, &mut [])?;

    assert_eq!(report.rewritten_endpoints, 0);
    assert!(report.is_clean());
    Ok(())
}
