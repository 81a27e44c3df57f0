pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;
pub mod wsdl;
pub mod xml;

#[cfg(feature = "cli")]
pub use config::Cli;

pub use adapters::engine::ActiveBpelDeployer;
pub use config::DeployerConfig;
pub use core::{ArchiveBuilder, Deployment, DeploymentCycle, ParseCache};
pub use domain::model::{Partner, PartnerLink, ProcessUnderTest, QName};
pub use domain::ports::ProcessDeployer;
pub use utils::error::{DeployError, Result};
