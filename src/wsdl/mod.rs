//! Interface-definition (WSDL 1.1) documents.
//!
//! Only the parts the deployment pipeline needs are modelled: port types,
//! bindings with their SOAP style, services with port addresses, and the
//! extension elements registered with the [`WsdlReader`] (partner link types).

use crate::domain::model::{PartnerLinkType, QName};
use crate::utils::error::{DeployError, Result};
use crate::xml::{ns, Element, XmlDocument};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub name: QName,
    pub port_type: QName,
    pub style: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Port {
    pub name: String,
    pub binding: QName,
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    pub name: QName,
    pub ports: Vec<Port>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extension {
    PartnerLinkType(PartnerLinkType),
}

/// 解析後的 WSDL 定義
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    pub path: PathBuf,
    pub target_namespace: String,
    pub port_types: Vec<QName>,
    pub bindings: Vec<Binding>,
    pub services: Vec<Service>,
    pub extensions: Vec<Extension>,
}

impl Definition {
    pub fn has_port_type(&self, name: &QName) -> bool {
        self.port_types.contains(name)
    }

    pub fn binding(&self, name: &QName) -> Option<&Binding> {
        self.bindings.iter().find(|b| &b.name == name)
    }

    pub fn partner_link_types(&self) -> impl Iterator<Item = &PartnerLinkType> {
        self.extensions.iter().map(|ext| match ext {
            Extension::PartnerLinkType(plt) => plt,
        })
    }

    pub fn partner_link_type(&self, name: &QName) -> Option<&PartnerLinkType> {
        self.partner_link_types().find(|plt| &plt.name == name)
    }
}

pub type ExtensionDeserializer = fn(&Element, &str, &Path) -> Result<Extension>;

/// Deserializers for extension elements, keyed by element name.
#[derive(Debug, Default, Clone)]
pub struct ExtensionRegistry {
    deserializers: HashMap<QName, ExtensionDeserializer>,
}

impl ExtensionRegistry {
    pub fn register(&mut self, element: QName, deserializer: ExtensionDeserializer) {
        self.deserializers.insert(element, deserializer);
    }

    pub fn lookup(&self, element: &Element) -> Option<ExtensionDeserializer> {
        let key = QName::new(element.namespace().unwrap_or_default(), element.local_name());
        self.deserializers.get(&key).copied()
    }
}

#[derive(Debug, Clone)]
pub struct WsdlReader {
    extensions: ExtensionRegistry,
}

impl WsdlReader {
    pub fn new(extensions: ExtensionRegistry) -> Self {
        Self { extensions }
    }

    /// Reader with the partner-link-type deserializer registered, built once
    /// per process.
    pub fn shared() -> &'static WsdlReader {
        static READER: OnceLock<WsdlReader> = OnceLock::new();
        READER.get_or_init(|| {
            let mut registry = ExtensionRegistry::default();
            registry.register(
                QName::new(ns::PARTNER_LINK_TYPE, "partnerLinkType"),
                read_partner_link_type,
            );
            WsdlReader::new(registry)
        })
    }

    pub fn read(&self, path: &Path, doc: &XmlDocument) -> Result<Definition> {
        let root = doc.root();
        if !root.is(ns::WSDL, "definitions") {
            return Err(DeployError::malformed(path, "root element is not wsdl:definitions"));
        }
        let tns = root.attribute("targetNamespace").unwrap_or_default().to_string();

        let mut definition = Definition {
            path: path.to_path_buf(),
            target_namespace: tns.clone(),
            port_types: Vec::new(),
            bindings: Vec::new(),
            services: Vec::new(),
            extensions: Vec::new(),
        };

        for child in root.child_elements() {
            if child.namespace() == Some(ns::WSDL) {
                match child.local_name() {
                    "portType" => {
                        definition.port_types.push(QName::new(&tns, required(child, "name", path)?));
                    }
                    "binding" => definition.bindings.push(read_binding(child, &tns, path)?),
                    "service" => definition.services.push(read_service(child, &tns, path)?),
                    _ => {}
                }
            } else if let Some(deserialize) = self.extensions.lookup(child) {
                definition.extensions.push(deserialize(child, &tns, path)?);
            }
        }

        Ok(definition)
    }
}

fn required<'a>(element: &'a Element, attribute: &str, path: &Path) -> Result<&'a str> {
    element.attribute(attribute).ok_or_else(|| {
        DeployError::malformed(
            path,
            format!("<{}> is missing the '{}' attribute", element.name(), attribute),
        )
    })
}

fn required_qname(element: &Element, attribute: &str, path: &Path) -> Result<QName> {
    let raw = required(element, attribute, path)?;
    element.resolve_qname(raw).ok_or_else(|| {
        DeployError::malformed(path, format!("cannot resolve prefix of '{}'", raw))
    })
}

fn read_binding(element: &Element, tns: &str, path: &Path) -> Result<Binding> {
    let style = element
        .child_elements()
        .find(|e| {
            (e.namespace() == Some(ns::WSDL_SOAP) || e.namespace() == Some(ns::WSDL_SOAP12))
                && e.local_name() == "binding"
        })
        .and_then(|e| e.attribute("style"))
        .map(str::to_string);

    Ok(Binding {
        name: QName::new(tns, required(element, "name", path)?),
        port_type: required_qname(element, "type", path)?,
        style,
    })
}

fn read_service(element: &Element, tns: &str, path: &Path) -> Result<Service> {
    let mut ports = Vec::new();
    for port in element.children_named(ns::WSDL, "port") {
        let address = port
            .child_elements()
            .find(|e| {
                (e.namespace() == Some(ns::WSDL_SOAP) || e.namespace() == Some(ns::WSDL_SOAP12))
                    && e.local_name() == "address"
            })
            .and_then(|e| e.attribute("location"))
            .map(str::to_string);
        ports.push(Port {
            name: required(port, "name", path)?.to_string(),
            binding: required_qname(port, "binding", path)?,
            address,
        });
    }

    Ok(Service {
        name: QName::new(tns, required(element, "name", path)?),
        ports,
    })
}

fn read_partner_link_type(element: &Element, tns: &str, path: &Path) -> Result<Extension> {
    let mut roles = BTreeMap::new();
    for role in element.children_named(ns::PARTNER_LINK_TYPE, "role") {
        roles.insert(
            required(role, "name", path)?.to_string(),
            required_qname(role, "portType", path)?,
        );
    }

    Ok(Extension::PartnerLinkType(PartnerLinkType {
        name: QName::new(tns, required(element, "name", path)?),
        roles,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORDER_WSDL: &str = r#"<?xml version="1.0"?>
<definitions xmlns="http://schemas.xmlsoap.org/wsdl/"
    xmlns:soap="http://schemas.xmlsoap.org/wsdl/soap/"
    xmlns:plnk="http://docs.oasis-open.org/wsbpel/2.0/plnktype"
    xmlns:tns="urn:orders" targetNamespace="urn:orders">
  <plnk:partnerLinkType name="OrderPLT">
    <plnk:role name="client" portType="tns:OrderPortType"/>
  </plnk:partnerLinkType>
  <portType name="OrderPortType"/>
  <binding name="OrderBinding" type="tns:OrderPortType">
    <soap:binding style="document" transport="http://schemas.xmlsoap.org/soap/http"/>
  </binding>
  <service name="OrderService">
    <port name="OrderPort" binding="tns:OrderBinding">
      <soap:address location="http://localhost:7777/orders"/>
    </port>
  </service>
</definitions>"#;

    #[test]
    fn test_read_definition() {
        let path = Path::new("orders.wsdl");
        let doc = XmlDocument::parse_str(ORDER_WSDL, path).unwrap();
        let def = WsdlReader::shared().read(path, &doc).unwrap();

        assert_eq!(def.target_namespace, "urn:orders");
        assert!(def.has_port_type(&QName::new("urn:orders", "OrderPortType")));

        let binding = def.binding(&QName::new("urn:orders", "OrderBinding")).unwrap();
        assert_eq!(binding.port_type, QName::new("urn:orders", "OrderPortType"));
        assert_eq!(binding.style.as_deref(), Some("document"));

        let service = &def.services[0];
        assert_eq!(service.name, QName::new("urn:orders", "OrderService"));
        assert_eq!(
            service.ports[0].address.as_deref(),
            Some("http://localhost:7777/orders")
        );

        let plt = def
            .partner_link_type(&QName::new("urn:orders", "OrderPLT"))
            .unwrap();
        assert_eq!(
            plt.port_type_for("client"),
            Some(&QName::new("urn:orders", "OrderPortType"))
        );
    }

    #[test]
    fn test_unregistered_extensions_are_ignored() {
        let path = Path::new("orders.wsdl");
        let doc = XmlDocument::parse_str(ORDER_WSDL, path).unwrap();
        let def = WsdlReader::new(ExtensionRegistry::default())
            .read(path, &doc)
            .unwrap();
        assert!(def.extensions.is_empty());
    }

    #[test]
    fn test_rejects_non_wsdl_root() {
        let path = Path::new("schema.xsd");
        let doc = XmlDocument::parse_str(
            r#"<xsd:schema xmlns:xsd="http://www.w3.org/2001/XMLSchema"/>"#,
            path,
        )
        .unwrap();
        assert!(WsdlReader::shared().read(path, &doc).is_err());
    }
}
