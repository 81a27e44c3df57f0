pub mod engine;
pub mod storage;

pub use engine::{ActiveBpelDeployer, EngineClient, ProcessLifecycle};
pub use storage::ArchiveMount;
