//! Namespace-aware XML documents.
//!
//! Every dialect this crate touches (BPEL, WSDL, XML Schema and the two
//! ActiveBPEL descriptors) goes through [`XmlDocument`]: parsed with
//! `quick-xml`, kept as a small element tree, and written back out.

pub mod document;

pub use document::{Element, Node, XmlDocument};

/// Namespace URIs of the document dialects.
pub mod ns {
    pub const BPEL: &str = "http://docs.oasis-open.org/wsbpel/2.0/process/executable";
    pub const PARTNER_LINK_TYPE: &str = "http://docs.oasis-open.org/wsbpel/2.0/plnktype";
    pub const WSDL: &str = "http://schemas.xmlsoap.org/wsdl/";
    pub const WSDL_SOAP: &str = "http://schemas.xmlsoap.org/wsdl/soap/";
    pub const WSDL_SOAP12: &str = "http://schemas.xmlsoap.org/wsdl/soap12/";
    pub const XML_SCHEMA: &str = "http://www.w3.org/2001/XMLSchema";
    pub const XML: &str = "http://www.w3.org/XML/1998/namespace";
    pub const WS_ADDRESSING: &str = "http://schemas.xmlsoap.org/ws/2003/03/addressing";
    pub const CATALOG: &str = "http://schemas.active-endpoints.com/catalog/2006/07/catalog.xsd";
    pub const PROCESS_DESCRIPTOR: &str = "http://schemas.active-endpoints.com/pdd/2006/08/pdd.xsd";

    pub const BPEL_PREFIX: &str = "bpel";
}
