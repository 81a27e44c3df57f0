//! The two ActiveBPEL deployment descriptors: the file catalog
//! (`META-INF/catalog.xml`) and the process deployment descriptor
//! (`process.pdd`).
//!
//! Both are derived only from the dependency closure and the resolved
//! partner links, and are built in path order so that regenerating them from
//! the same inputs yields the same bytes.

use crate::core::resolver::DependencyClosure;
use crate::domain::model::{PartnerLink, QName};
use crate::utils::error::{DeployError, Result};
use crate::xml::{ns, Element, XmlDocument};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const PROCESS_DESCRIPTOR_ENTRY: &str = "process.pdd";
pub const CATALOG_ENTRY: &str = "META-INF/catalog.xml";
pub const WSDL_DIR: &str = "wsdl";
pub const BPEL_DIR: &str = "bpel";

const PROCESS_PREFIX: &str = "bpelproc";
const WSA_PREFIX: &str = "wsa";

/// Content written under `META-INF/catalog.xml`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CatalogEntry {
    /// The generated file catalog.
    #[default]
    Catalog,
    /// A second copy of the process descriptor, byte-compatible with the
    /// archives older ActiveBPEL deployers produced.
    ProcessDescriptor,
}

/// Base name of a file, as used for archive entries and catalog locations.
pub fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| DeployError::config(format!("{} has no file name", path.display())))
}

/// `<catalog>` with one `wsdlEntry` per interface definition followed by one
/// `schemaEntry` per schema. Same-named files from different directories
/// collide, since only the base name is kept.
pub fn file_catalog(closure: &DependencyClosure) -> Result<XmlDocument> {
    let mut catalog = Element::new("catalog", Some(ns::CATALOG)).with_namespace_decl("", ns::CATALOG);

    for path in closure.interfaces.keys() {
        catalog.push_child(catalog_entry("wsdlEntry", &file_name(path)?));
    }
    for path in &closure.schemas {
        catalog.push_child(catalog_entry("schemaEntry", &file_name(path)?));
    }

    Ok(XmlDocument::new(catalog))
}

fn catalog_entry(kind: &str, name: &str) -> Element {
    Element::new(kind, Some(ns::CATALOG))
        .with_attr("location", format!("project:/{}/{}", WSDL_DIR, name))
        .with_attr("classpath", format!("{}/{}", WSDL_DIR, name))
}

/// `(targetNamespace, name)` of a process definition.
pub fn process_qname(process: &XmlDocument) -> Result<QName> {
    let origin = process.path().unwrap_or_else(|| Path::new("<process>"));
    let root = process.root();
    let name = root
        .attribute("name")
        .ok_or_else(|| DeployError::malformed(origin, "process has no name"))?;
    Ok(QName::new(
        root.attribute("targetNamespace").unwrap_or_default(),
        name,
    ))
}

pub fn process_descriptor(
    process_file: &Path,
    process: &XmlDocument,
    partner_links: &[PartnerLink],
    closure: &DependencyClosure,
) -> Result<XmlDocument> {
    let qname = process_qname(process)?;

    let mut links = Element::new("partnerLinks", Some(ns::PROCESS_DESCRIPTOR));
    for link in partner_links {
        let mut element =
            Element::new("partnerLink", Some(ns::PROCESS_DESCRIPTOR)).with_attr("name", &link.name);
        if link.is_outbound() {
            element.push_child(partner_role(link));
        }
        if link.is_inbound() {
            element.push_child(my_role(link));
        }
        links.push_child(element);
    }

    let mut references = Element::new("references", Some(ns::PROCESS_DESCRIPTOR));
    for (path, definition) in &closure.interfaces {
        references.push_child(
            Element::new("wsdl", Some(ns::PROCESS_DESCRIPTOR))
                .with_attr("location", format!("project:/{}/{}", WSDL_DIR, file_name(path)?))
                .with_attr("namespace", &definition.target_namespace),
        );
    }

    let root = Element::new("process", Some(ns::PROCESS_DESCRIPTOR))
        .with_namespace_decl("", ns::PROCESS_DESCRIPTOR)
        .with_namespace_decl(ns::BPEL_PREFIX, ns::BPEL)
        .with_namespace_decl(PROCESS_PREFIX, &qname.namespace)
        .with_attr("persistenceType", "full")
        .with_attr("location", format!("{}/{}", BPEL_DIR, file_name(process_file)?))
        .with_attr("name", format!("{}:{}", PROCESS_PREFIX, qname.local))
        .with_child(links)
        .with_child(references);

    Ok(XmlDocument::new(root))
}

// static endpoint reference to the address the WSDL declares for the port
fn partner_role(link: &PartnerLink) -> Element {
    let wsa = |local: &str| Element::new(format!("{}:{}", WSA_PREFIX, local), Some(ns::WS_ADDRESSING));

    let reference = wsa("EndpointReference")
        .with_namespace_decl(WSA_PREFIX, ns::WS_ADDRESSING)
        .with_namespace_decl("s", &link.service.namespace)
        .with_child(wsa("Address").with_text(link.port_address().unwrap_or_default()))
        .with_child(
            wsa("ServiceName")
                .with_attr("PortName", link.port.as_deref().unwrap_or_default())
                .with_text(format!("s:{}", link.service.local)),
        );

    Element::new("partnerRole", Some(ns::PROCESS_DESCRIPTOR))
        .with_attr("endpointReference", "static")
        .with_attr("invokeHandler", "default:Address")
        .with_child(reference)
}

fn my_role(link: &PartnerLink) -> Element {
    let document_style = link
        .endpoint
        .as_ref()
        .is_some_and(|e| e.is_document_style());

    Element::new("myRole", Some(ns::PROCESS_DESCRIPTOR))
        .with_attr("allowedRoles", "")
        .with_attr("binding", if document_style { "MSG" } else { "RPC-LIT" })
        .with_attr("service", &link.service.local)
}
