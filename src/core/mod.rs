pub mod archive;
pub mod cache;
pub mod cycle;
pub mod deployment;
pub mod descriptors;
pub mod partner_links;
pub mod resolver;

pub use archive::{ArchiveBuilder, ArchiveManifest, BuildOptions};
pub use cache::ParseCache;
pub use cycle::{CycleReport, DeploymentCycle, TestCase};
pub use deployment::Deployment;
pub use descriptors::CatalogEntry;
pub use partner_links::{PartnerLinkResolver, PartnerRoleLookup};
pub use resolver::{DependencyClosure, DependencyResolver, DocumentKind};
pub use crate::utils::error::Result;
