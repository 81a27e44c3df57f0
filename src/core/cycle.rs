use crate::core::deployment::Deployment;
use crate::domain::model::ProcessUnderTest;
use crate::domain::ports::ProcessDeployer;
use crate::utils::error::{DeployError, Result};

/// A named test case run against a live deployment.
pub struct TestCase<'a> {
    name: String,
    run: Box<dyn FnMut(&Deployment) -> anyhow::Result<()> + 'a>,
}

impl<'a> TestCase<'a> {
    pub fn new(
        name: impl Into<String>,
        run: impl FnMut(&Deployment) -> anyhow::Result<()> + 'a,
    ) -> Self {
        Self {
            name: name.into(),
            run: Box::new(run),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug)]
pub struct CaseOutcome {
    pub name: String,
    pub result: anyhow::Result<()>,
}

#[derive(Debug, Default)]
pub struct CycleReport {
    pub cases: Vec<CaseOutcome>,
    pub rewritten_endpoints: usize,
    pub undeploy_error: Option<DeployError>,
}

impl CycleReport {
    pub fn passed(&self) -> usize {
        self.cases.iter().filter(|c| c.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.cases.len() - self.passed()
    }

    pub fn is_clean(&self) -> bool {
        self.failed() == 0 && self.undeploy_error.is_none()
    }
}

/// Deploy, rewire partners, run the cases, undeploy.
///
/// Undeploy is attempted whatever happened after a successful deploy. A
/// failed deploy skips straight to a best-effort undeploy and its error is
/// returned.
pub struct DeploymentCycle<D: ProcessDeployer> {
    deployer: D,
}

impl<D: ProcessDeployer> DeploymentCycle<D> {
    pub fn new(deployer: D) -> Self {
        Self { deployer }
    }

    pub fn deployer(&self) -> &D {
        &self.deployer
    }

    pub fn into_inner(self) -> D {
        self.deployer
    }

    pub fn run(&mut self, put: &ProcessUnderTest, cases: &mut [TestCase<'_>]) -> Result<CycleReport> {
        tracing::info!("🚀 Starting deployment cycle for {}", put.name());

        let deployment = self.deployer.get_deployment(put)?;

        if let Err(e) = self.deployer.deploy(put) {
            tracing::error!("❌ Deployment of {} failed: {}", put.name(), e);
            self.undeploy_best_effort(put);
            return Err(e);
        }

        let mut report = CycleReport::default();
        match rewire(&deployment) {
            Ok(count) => report.rewritten_endpoints = count,
            Err(e) => {
                self.undeploy_best_effort(put);
                return Err(e);
            }
        }

        for case in cases.iter_mut() {
            tracing::info!("🔍 Running test case {}", case.name);
            let result = (case.run)(&deployment);
            match &result {
                Ok(()) => tracing::info!("✅ {} passed", case.name),
                Err(e) => tracing::warn!("⚠️ {} failed: {:#}", case.name, e),
            }
            report.cases.push(CaseOutcome {
                name: case.name.clone(),
                result,
            });

            if let Err(e) = self.deployer.clean_up_after_test_case() {
                tracing::warn!("⚠️ Clean-up after {} failed: {}", case.name, e);
            }
        }

        if let Err(e) = self.deployer.undeploy(put) {
            tracing::error!("❌ Undeployment of {} failed: {}", put.name(), e);
            report.undeploy_error = Some(e);
        }

        tracing::info!(
            "🏁 Cycle finished: {} passed, {} failed",
            report.passed(),
            report.failed()
        );
        Ok(report)
    }

    fn undeploy_best_effort(&mut self, put: &ProcessUnderTest) {
        if let Err(e) = self.deployer.undeploy(put) {
            tracing::warn!("⚠️ Best-effort undeployment of {} failed: {}", put.name(), e);
        }
    }
}

// outbound links whose partner (same name as the link) has a simulated URL
fn rewire(deployment: &Deployment) -> Result<usize> {
    let mut rewritten = 0;
    for link in deployment.partner_links()? {
        if !link.is_outbound() {
            continue;
        }
        if let Some(partner) = deployment.partner(&link.name) {
            rewritten += deployment.replace_endpoints(&link, partner)?;
        }
    }
    Ok(rewritten)
}
