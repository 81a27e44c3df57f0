use crate::core::deployment::Deployment;
use crate::domain::model::ProcessUnderTest;
use crate::utils::error::Result;

/// What a test runner needs from an engine-specific deployer.
pub trait ProcessDeployer {
    fn deploy(&mut self, put: &ProcessUnderTest) -> Result<()>;
    fn undeploy(&mut self, put: &ProcessUnderTest) -> Result<()>;
    fn get_deployment(&mut self, put: &ProcessUnderTest) -> Result<Deployment>;
    /// Terminates instances left running by the previous test case.
    fn clean_up_after_test_case(&mut self) -> Result<()>;
}

/// Pulls process instance ids out of an administration service response.
pub trait ProcessIdExtractor: Send + Sync {
    fn extract(&self, body: &str) -> Vec<u64>;
}
