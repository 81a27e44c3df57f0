//! ActiveBPEL engine adapter: deployment over the DeployBPRService and
//! instance management over the ActiveBpelAdmin service.

pub mod client;
pub mod deployer;
pub mod lifecycle;
pub mod requests;

pub use client::EngineClient;
pub use deployer::{errors_in_summary, ActiveBpelDeployer};
pub use lifecycle::{ProcessLifecycle, TagPatternExtractor};
