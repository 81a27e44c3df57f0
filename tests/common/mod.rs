#![allow(dead_code)]

use std::path::{Path, PathBuf};

pub const ORDER_BPEL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<process name="OrderProcess" targetNamespace="urn:order-process"
    xmlns="http://docs.oasis-open.org/wsbpel/2.0/process/executable"
    xmlns:ord="urn:orders" xmlns:sup="urn:supplier">
  <import importType="http://schemas.xmlsoap.org/wsdl/" namespace="urn:orders" location="orders.wsdl"/>
  <import importType="http://schemas.xmlsoap.org/wsdl/" namespace="urn:supplier" location="partners/supplier.wsdl"/>
  <partnerLinks>
    <partnerLink name="client" partnerLinkType="ord:OrderPLT" myRole="orderProvider"/>
    <partnerLink name="supplier" partnerLinkType="sup:SupplierPLT" partnerRole="supplier"/>
  </partnerLinks>
  <sequence name="main"/>
</process>
"#;

pub const ORDERS_WSDL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<wsdl:definitions targetNamespace="urn:orders"
    xmlns:wsdl="http://schemas.xmlsoap.org/wsdl/"
    xmlns:soap="http://schemas.xmlsoap.org/wsdl/soap/"
    xmlns:plnk="http://docs.oasis-open.org/wsbpel/2.0/plnktype"
    xmlns:xsd="http://www.w3.org/2001/XMLSchema"
    xmlns:ord="urn:orders">
  <plnk:partnerLinkType name="OrderPLT">
    <plnk:role name="orderProvider" portType="ord:OrderPortType"/>
  </plnk:partnerLinkType>
  <wsdl:types>
    <xsd:schema targetNamespace="urn:orders">
      <xsd:import namespace="urn:order-types" schemaLocation="types.xsd"/>
    </xsd:schema>
  </wsdl:types>
  <wsdl:portType name="OrderPortType"/>
  <wsdl:binding name="OrderBinding" type="ord:OrderPortType">
    <soap:binding style="document" transport="http://schemas.xmlsoap.org/soap/http"/>
  </wsdl:binding>
  <wsdl:service name="OrderService">
    <wsdl:port name="OrderPort" binding="ord:OrderBinding">
      <soap:address location="http://localhost:8080/active-bpel/services/OrderService"/>
    </wsdl:port>
  </wsdl:service>
</wsdl:definitions>
"#;

pub const SUPPLIER_WSDL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<wsdl:definitions targetNamespace="urn:supplier"
    xmlns:wsdl="http://schemas.xmlsoap.org/wsdl/"
    xmlns:soap="http://schemas.xmlsoap.org/wsdl/soap/"
    xmlns:plnk="http://docs.oasis-open.org/wsbpel/2.0/plnktype"
    xmlns:sup="urn:supplier">
  <wsdl:import namespace="urn:orders" location="../orders.wsdl"/>
  <plnk:partnerLinkType name="SupplierPLT">
    <plnk:role name="supplier" portType="sup:SupplierPortType"/>
  </plnk:partnerLinkType>
  <wsdl:portType name="SupplierPortType"/>
  <wsdl:binding name="SupplierBinding" type="sup:SupplierPortType">
    <soap:binding style="rpc" transport="http://schemas.xmlsoap.org/soap/http"/>
  </wsdl:binding>
  <wsdl:service name="SupplierService">
    <wsdl:port name="SupplierPort" binding="sup:SupplierBinding">
      <soap:address location="http://supplier.example.com/a"/>
    </wsdl:port>
    <wsdl:port name="SupplierPortBackup" binding="sup:SupplierBinding">
      <soap:address location="http://supplier.example.com/b"/>
    </wsdl:port>
  </wsdl:service>
</wsdl:definitions>
"#;

pub const TYPES_XSD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xsd:schema targetNamespace="urn:order-types" xmlns:xsd="http://www.w3.org/2001/XMLSchema">
  <xsd:import namespace="urn:common" schemaLocation="common.xsd"/>
  <xsd:element name="order" type="xsd:string"/>
</xsd:schema>
"#;

pub const COMMON_XSD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xsd:schema targetNamespace="urn:common" xmlns:xsd="http://www.w3.org/2001/XMLSchema">
  <xsd:element name="id" type="xsd:int"/>
</xsd:schema>
"#;

pub fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
}

/// Writes the order process and its dependencies; returns the process file.
///
/// order.bpel -> orders.wsdl -> types.xsd -> common.xsd
///            -> partners/supplier.wsdl -> ../orders.wsdl
pub fn write_order_fixture(dir: &Path) -> PathBuf {
    write(dir, "orders.wsdl", ORDERS_WSDL);
    write(dir, "partners/supplier.wsdl", SUPPLIER_WSDL);
    write(dir, "types.xsd", TYPES_XSD);
    write(dir, "common.xsd", COMMON_XSD);
    write(dir, "order.bpel", ORDER_BPEL)
}

pub fn zip_entry(archive: &Path, name: &str) -> String {
    use std::io::Read;
    let mut zip = zip::ZipArchive::new(std::fs::File::open(archive).unwrap()).unwrap();
    let mut entry = zip.by_name(name).unwrap();
    let mut content = String::new();
    entry.read_to_string(&mut content).unwrap();
    content
}

pub fn zip_entry_names(archive: &Path) -> Vec<String> {
    let mut zip = zip::ZipArchive::new(std::fs::File::open(archive).unwrap()).unwrap();
    (0..zip.len())
        .map(|i| zip.by_index(i).unwrap().name().to_string())
        .collect()
}
