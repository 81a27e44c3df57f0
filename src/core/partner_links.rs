use crate::core::resolver::DependencyClosure;
use crate::domain::model::{PartnerLink, PartnerLinkType, QName, ResolvedEndpoint};
use crate::utils::error::{DeployError, Result};
use crate::wsdl::{Port, Service};
use crate::xml::{ns, XmlDocument};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which role name keys the partner-link-type role map when resolving the
/// partner role of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PartnerRoleLookup {
    /// Look up the `partnerRole` name.
    #[default]
    PartnerRole,
    /// Look up the `myRole` name, as older ActiveBPEL deployers did.
    MyRole,
}

/// A `<partnerLink>` declaration read from a process definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartnerLinkDeclaration {
    pub name: String,
    pub partner_link_type: QName,
    pub my_role: Option<String>,
    pub partner_role: Option<String>,
}

/// Reads the `process/partnerLinks/partnerLink` declarations of a process.
pub fn declarations(process: &XmlDocument) -> Result<Vec<PartnerLinkDeclaration>> {
    let origin = process.path().unwrap_or_else(|| Path::new("<process>"));
    let root = process.root();
    if !root.is(ns::BPEL, "process") {
        return Ok(Vec::new());
    }

    let mut result = Vec::new();
    for link in root
        .children_named(ns::BPEL, "partnerLinks")
        .flat_map(|links| links.children_named(ns::BPEL, "partnerLink"))
    {
        let name = link
            .attribute("name")
            .ok_or_else(|| DeployError::malformed(origin, "<partnerLink> without a name"))?;
        let raw_type = link.attribute("partnerLinkType").ok_or_else(|| {
            DeployError::malformed(
                origin,
                format!("partner link '{}' has no partnerLinkType", name),
            )
        })?;
        let partner_link_type = link.resolve_qname(raw_type).ok_or_else(|| {
            DeployError::malformed(origin, format!("cannot resolve prefix of '{}'", raw_type))
        })?;

        result.push(PartnerLinkDeclaration {
            name: name.to_string(),
            partner_link_type,
            my_role: link.attribute("myRole").map(str::to_string),
            partner_role: link.attribute("partnerRole").map(str::to_string),
        });
    }
    Ok(result)
}

/// Maps partner link declarations onto concrete (service, port) pairs of the
/// interface definitions in a dependency closure.
pub struct PartnerLinkResolver<'a> {
    closure: &'a DependencyClosure,
    role_lookup: PartnerRoleLookup,
}

impl<'a> PartnerLinkResolver<'a> {
    pub fn new(closure: &'a DependencyClosure) -> Self {
        Self {
            closure,
            role_lookup: PartnerRoleLookup::default(),
        }
    }

    pub fn with_role_lookup(mut self, role_lookup: PartnerRoleLookup) -> Self {
        self.role_lookup = role_lookup;
        self
    }

    /// One entry per declared role: a link with both roles yields its
    /// `myRole` entry followed by its `partnerRole` entry.
    pub fn resolve(&self, process: &XmlDocument) -> Result<Vec<PartnerLink>> {
        let mut links = Vec::new();
        for declaration in declarations(process)? {
            let plt = self.find_partner_link_type(&declaration.partner_link_type)?;

            if let Some(my_role) = &declaration.my_role {
                let mut link = self.resolve_role(&declaration.name, plt, my_role)?;
                link.my_role = Some(my_role.clone());
                links.push(link);
            }

            if let Some(partner_role) = &declaration.partner_role {
                let key = match self.role_lookup {
                    PartnerRoleLookup::PartnerRole => partner_role,
                    PartnerRoleLookup::MyRole => declaration.my_role.as_ref().ok_or_else(|| {
                        DeployError::RoleNotDeclared {
                            partner_link_type: plt.name.clone(),
                            role: String::new(),
                        }
                    })?,
                };
                let mut link = self.resolve_role(&declaration.name, plt, key)?;
                link.partner_role = Some(partner_role.clone());
                links.push(link);
            }
        }

        tracing::debug!("Resolved {} partner link roles", links.len());
        Ok(links)
    }

    /// Resolves the links of every process definition in the closure.
    pub fn resolve_all(&self) -> Result<Vec<PartnerLink>> {
        let mut links = Vec::new();
        for process in self.closure.processes.values() {
            links.extend(self.resolve(process)?);
        }
        Ok(links)
    }

    fn resolve_role(&self, name: &str, plt: &PartnerLinkType, role: &str) -> Result<PartnerLink> {
        let port_type = plt
            .port_type_for(role)
            .ok_or_else(|| DeployError::RoleNotDeclared {
                partner_link_type: plt.name.clone(),
                role: role.to_string(),
            })?;
        let port_type = self.find_port_type(port_type)?;
        let (service, port) = self.find_service(port_type)?;

        let mut link = PartnerLink::new(name, service.name.clone(), Some(port.name.clone()));
        link.partner_link_type = Some(plt.name.clone());
        link.endpoint = Some(ResolvedEndpoint {
            binding: port.binding.clone(),
            address: port.address.clone(),
            style: self
                .closure
                .definitions()
                .find_map(|d| d.binding(&port.binding))
                .and_then(|b| b.style.clone()),
        });
        Ok(link)
    }

    /// First match in path order wins.
    pub fn find_partner_link_type(&self, name: &QName) -> Result<&'a PartnerLinkType> {
        self.closure
            .definitions()
            .find_map(|d| d.partner_link_type(name))
            .ok_or_else(|| DeployError::PartnerLinkTypeNotFound { name: name.clone() })
    }

    pub fn find_port_type<'q>(&self, name: &'q QName) -> Result<&'q QName> {
        if self.closure.definitions().any(|d| d.has_port_type(name)) {
            Ok(name)
        } else {
            Err(DeployError::PortTypeNotFound {
                port_type: name.clone(),
            })
        }
    }

    /// Collects the bindings over `port_type` across all definitions, then
    /// returns the first service port (document then port order) using one.
    /// Several candidates are not an error.
    pub fn find_service(&self, port_type: &QName) -> Result<(&'a Service, &'a Port)> {
        let bindings: Vec<&QName> = self
            .closure
            .definitions()
            .flat_map(|d| d.bindings.iter())
            .filter(|b| &b.port_type == port_type)
            .map(|b| &b.name)
            .collect();

        self.closure
            .definitions()
            .flat_map(|d| d.services.iter())
            .find_map(|service| {
                service
                    .ports
                    .iter()
                    .find(|port| bindings.contains(&&port.binding))
                    .map(|port| (service, port))
            })
            .ok_or_else(|| DeployError::ServiceNotFound {
                port_type: port_type.clone(),
            })
    }
}
