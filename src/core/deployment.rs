use crate::adapters::storage::ArchiveMount;
use crate::core::cache::ParseCache;
use crate::core::descriptors::WSDL_DIR;
use crate::core::partner_links::{PartnerLinkResolver, PartnerRoleLookup};
use crate::core::resolver::DependencyResolver;
use crate::domain::model::{Partner, PartnerLink, ProcessUnderTest, QName};
use crate::utils::error::{DeployError, Result};
use crate::wsdl::WsdlReader;
use crate::xml::{ns, XmlDocument};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

const WSDL_EXTENSION: &str = "wsdl";
const BPEL_EXTENSION: &str = "bpel";

/// A deployment archive opened as a directory tree, with every declared
/// service indexed to the WSDL file that declares it.
///
/// The index is built once when the deployment is opened; WSDL files added
/// to the tree later are not seen.
#[derive(Debug)]
pub struct Deployment {
    process_name: String,
    partners: Vec<Partner>,
    mount: ArchiveMount,
    services: BTreeMap<QName, PathBuf>,
    role_lookup: PartnerRoleLookup,
}

impl Deployment {
    pub fn open(put: &ProcessUnderTest, archive: &Path, scratch_parent: Option<&Path>) -> Result<Self> {
        let mount = ArchiveMount::open(archive, scratch_parent)?;
        let services = index_services(mount.root())?;
        tracing::debug!(
            "Indexed {} services under {}",
            services.len(),
            mount.root().display()
        );

        Ok(Self {
            process_name: put.name().to_string(),
            partners: put.partners().to_vec(),
            mount,
            services,
            role_lookup: PartnerRoleLookup::default(),
        })
    }

    pub fn with_role_lookup(mut self, role_lookup: PartnerRoleLookup) -> Self {
        self.role_lookup = role_lookup;
        self
    }

    pub fn process_name(&self) -> &str {
        &self.process_name
    }

    pub fn partners(&self) -> &[Partner] {
        &self.partners
    }

    pub fn partner(&self, name: &str) -> Option<&Partner> {
        self.partners.iter().find(|p| p.name == name)
    }

    /// The archive as given: a zip file or a directory.
    pub fn archive(&self) -> &Path {
        self.mount.archive()
    }

    /// Directory that rewrites are applied to.
    pub fn root(&self) -> &Path {
        self.mount.root()
    }

    pub fn into_mount(self) -> ArchiveMount {
        self.mount
    }

    pub fn service_document(&self, service: &QName) -> Option<&Path> {
        self.services.get(service).map(PathBuf::as_path)
    }

    pub fn services(&self) -> impl Iterator<Item = &QName> {
        self.services.keys()
    }

    /// Partner links of the process definitions in the tree, resolved
    /// against the WSDL files as they are on disk now. Imports missing at
    /// their relative location are looked up under `wsdl/`.
    pub fn partner_links(&self) -> Result<Vec<PartnerLink>> {
        let resolver = DependencyResolver::new(Arc::new(ParseCache::new()))
            .with_search_dir(self.root().join(WSDL_DIR));
        let mut links = Vec::new();

        for entry in WalkDir::new(self.root()).sort_by_file_name() {
            let entry = entry.map_err(walk_error)?;
            if !has_extension(entry.path(), BPEL_EXTENSION) {
                continue;
            }
            let closure = resolver.resolve(entry.path())?;
            links.extend(
                PartnerLinkResolver::new(&closure)
                    .with_role_lookup(self.role_lookup)
                    .resolve_all()?,
            );
        }
        Ok(links)
    }

    /// Uses the partner's simulated URL, if it has one.
    pub fn replace_endpoints(&self, link: &PartnerLink, partner: &Partner) -> Result<usize> {
        match &partner.simulated_url {
            Some(url) => self.replace_endpoint(link, url),
            None => {
                tracing::debug!("Partner {} has no simulated URL", partner.name);
                Ok(0)
            }
        }
    }

    /// Points the address of the link's port at `simulated_url`, or the
    /// addresses of every port of the service when the link names no port.
    /// Returns the number of rewritten ports.
    pub fn replace_endpoint(&self, link: &PartnerLink, simulated_url: &str) -> Result<usize> {
        let path = self
            .service_document(&link.service)
            .ok_or_else(|| DeployError::ServiceNotDeclared {
                service: link.service.clone(),
            })?;

        let text = std::fs::read_to_string(path).map_err(|e| DeployError::EndpointRewrite {
            path: path.to_path_buf(),
            message: "an I/O error occurred when reading the WSDL".to_string(),
            source: Some(e),
        })?;
        let mut doc = XmlDocument::parse_str(&text, path).map_err(|e| DeployError::EndpointRewrite {
            path: path.to_path_buf(),
            message: e.to_string(),
            source: None,
        })?;

        let mut rewritten = 0;
        for service in doc
            .root_mut()
            .child_elements_mut()
            .filter(|e| e.is(ns::WSDL, "service") && e.attribute("name") == Some(link.service.local.as_str()))
        {
            for port in service.child_elements_mut().filter(|e| e.is(ns::WSDL, "port")) {
                if let Some(wanted) = &link.port {
                    if port.attribute("name") != Some(wanted.as_str()) {
                        continue;
                    }
                }
                if let Some(address) = port.child_elements_mut().find(|e| e.local_name() == "address") {
                    address.set_attribute("location", simulated_url);
                    rewritten += 1;
                }
            }
        }

        let bytes = doc.to_bytes().map_err(|e| DeployError::EndpointRewrite {
            path: path.to_path_buf(),
            message: e.to_string(),
            source: None,
        })?;
        std::fs::write(path, bytes).map_err(|e| DeployError::EndpointRewrite {
            path: path.to_path_buf(),
            message: "an I/O error occurred when writing the WSDL".to_string(),
            source: Some(e),
        })?;

        tracing::info!(
            "🔀 {} -> {} ({} ports in {})",
            link.service,
            simulated_url,
            rewritten,
            path.display()
        );
        Ok(rewritten)
    }
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.is_file() && path.extension().is_some_and(|e| e == extension)
}

fn walk_error(e: walkdir::Error) -> DeployError {
    DeployError::IoError(std::io::Error::other(e.to_string()))
}

fn index_services(root: &Path) -> Result<BTreeMap<QName, PathBuf>> {
    let reader = WsdlReader::shared();
    let mut services = BTreeMap::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(walk_error)?;
        let path = entry.path();
        if !has_extension(path, WSDL_EXTENSION) {
            continue;
        }

        let doc = XmlDocument::from_file(path)?;
        let definition = reader.read(path, &doc)?;
        for service in definition.services {
            services.entry(service.name).or_insert_with(|| path.to_path_buf());
        }
    }
    Ok(services)
}
