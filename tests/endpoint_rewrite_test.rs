mod common;

use anyhow::Result;
use bpel_deploy::core::{ArchiveBuilder, Deployment, ParseCache};
use bpel_deploy::{DeployError, Partner, PartnerLink, ProcessUnderTest, QName};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

const SIMULATED: &str = "http://localhost:7777/ws/Supplier";

fn supplier_service() -> QName {
    QName::new("urn:supplier", "SupplierService")
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

/// 測試未指定 port 時改寫服務下所有 port 的位址
#[test]
fn test_rewrite_every_port_of_service() -> Result<()> {
    let dir = TempDir::new()?;
    let archive = build_archive(dir.path())?;
    let deployment = Deployment::open(&put(dir.path()), &archive, None)?;

    let link = PartnerLink::new("supplier", supplier_service(), None);
    let count = deployment.replace_endpoint(&link, SIMULATED)?;

    assert_eq!(count, 2);
    let wsdl = std::fs::read_to_string(deployment.root().join("wsdl/supplier.wsdl"))?;
    assert_eq!(wsdl.matches(SIMULATED).count(), 2);
    assert!(!wsdl.contains("http://supplier.example.com"));
    // 其他屬性保持不變
    assert!(wsdl.contains(r#"<wsdl:port name="SupplierPortBackup" binding="sup:SupplierBinding">"#));
    assert!(wsdl.contains(r#"transport="http://schemas.xmlsoap.org/soap/http""#));
    Ok(())
}

/// 測試指定 port 時只改寫該 port
#[test]
fn test_rewrite_named_port_only() -> Result<()> {
    let dir = TempDir::new()?;
    let archive = build_archive(dir.path())?;
    let deployment = Deployment::open(&put(dir.path()), &archive, None)?;

    let link = PartnerLink::new(
        "supplier",
        supplier_service(),
        Some("SupplierPortBackup".to_string()),
    );
    let count = deployment.replace_endpoint(&link, SIMULATED)?;

    assert_eq!(count, 1);
    let wsdl = std::fs::read_to_string(deployment.root().join("wsdl/supplier.wsdl"))?;
    assert!(wsdl.contains(r#"location="http://supplier.example.com/a""#));
    assert!(wsdl.contains(&format!(r#"location="{}""#, SIMULATED)));
    assert!(!wsdl.contains("http://supplier.example.com/b"));
    Ok(())
}

/// 測試未宣告的服務
#[test]
fn test_unknown_service() -> Result<()> {
    let dir = TempDir::new()?;
    let archive = build_archive(dir.path())?;
    let deployment = Deployment::open(&put(dir.path()), &archive, None)?;

    let link = PartnerLink::new("ghost", QName::new("urn:ghost", "GhostService"), None);
    let err = deployment.replace_endpoint(&link, SIMULATED).unwrap_err();

    match err {
        DeployError::ServiceNotDeclared { service } => assert_eq!(service.local, "GhostService"),
        other => panic!("unexpected error: {}", other),
    }
    Ok(())
}

/// 測試改寫只作用在解壓縮的副本，原始封存檔不變
#[test]
fn test_source_archive_is_untouched() -> Result<()> {
    let dir = TempDir::new()?;
    let archive = build_archive(dir.path())?;
    let before = std::fs::read(&archive)?;

    let scratch = {
        let deployment = Deployment::open(&put(dir.path()), &archive, Some(dir.path()))?;
        let link = PartnerLink::new("supplier", supplier_service(), None);
        deployment.replace_endpoint(&link, SIMULATED)?;
        assert!(deployment.root().starts_with(dir.path()));
        deployment.root().to_path_buf()
    };

    assert_eq!(std::fs::read(&archive)?, before);
    assert!(common::zip_entry(&archive, "wsdl/supplier.wsdl").contains("http://supplier.example.com/a"));
    // 副本隨 Deployment 一併清除
    assert!(!scratch.exists());
    Ok(())
}

/// 測試目錄形式的部署直接在原處改寫
#[test]
fn test_directory_deployment_is_rewritten_in_place() -> Result<()> {
    let dir = TempDir::new()?;
    common::write_order_fixture(dir.path());
    let deployment = Deployment::open(&put(dir.path()), dir.path(), None)?;

    let link = PartnerLink::new("supplier", supplier_service(), Some("SupplierPort".to_string()));
    let partner = deployment.partner("supplier").expect("partner is declared");
    assert_eq!(deployment.replace_endpoints(&link, partner)?, 1);

    let wsdl = std::fs::read_to_string(dir.path().join("partners/supplier.wsdl"))?;
    assert!(wsdl.contains(SIMULATED));
    Ok(())
}

/// 測試部署中的夥伴連結由解壓縮後的 BPEL 解析而來
#[test]
fn test_partner_links_of_deployment() -> Result<()> {
    let dir = TempDir::new()?;
    let archive = build_archive(dir.path())?;
    let deployment = Deployment::open(&put(dir.path()), &archive, None)?;

    let links = deployment.partner_links()?;

    assert_eq!(links.len(), 2);
    let supplier = links.iter().find(|l| l.is_outbound()).unwrap();
    assert_eq!(supplier.name, "supplier");
    assert_eq!(supplier.service, supplier_service());
    assert_eq!(supplier.port.as_deref(), Some("SupplierPort"));
    assert_eq!(supplier.port_address(), Some("http://supplier.example.com/a"));
    Ok(())
}

/// 測試沒有模擬位址的夥伴不改寫
#[test]
fn test_partner_without_simulated_url() -> Result<()> {
    let dir = TempDir::new()?;
    let archive = build_archive(dir.path())?;
    let deployment = Deployment::open(&put(dir.path()), &archive, None)?;

    let link = PartnerLink::new("supplier", supplier_service(), None);
    let count = deployment.replace_endpoints(&link, &Partner::new("supplier"))?;

    assert_eq!(count, 0);
    Ok(())
}
