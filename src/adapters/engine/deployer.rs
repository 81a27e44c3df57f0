use crate::adapters::engine::client::EngineClient;
use crate::adapters::engine::lifecycle::ProcessLifecycle;
use crate::adapters::engine::requests;
use crate::config::DeployerConfig;
use crate::core::archive::ArchiveBuilder;
use crate::core::cache::ParseCache;
use crate::core::deployment::Deployment;
use crate::domain::model::{DeploymentRecord, ProcessUnderTest, RemoteCallResult};
use crate::domain::ports::ProcessDeployer;
use crate::utils::error::{DeployError, Result};
use crate::utils::validation::Validate;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

// encloses the error count in the (escaped) deployment summary
const ERRCOUNT_START: &str = "&lt;deploymentSummary numErrors=&quot;";
const ERRCOUNT_END: &str = "&quot";

const ARCHIVE_EXTENSION: &str = "bpr";

/// Whether a deployment response reports errors in its embedded summary.
///
/// A body without the marker reports none; a count that is not a number is
/// treated as an error.
pub fn errors_in_summary(body: &str) -> bool {
    let Some(start) = body.find(ERRCOUNT_START) else {
        return false;
    };
    let start = start + ERRCOUNT_START.len();
    let Some(len) = body[start..].find(ERRCOUNT_END) else {
        return false;
    };

    match body[start..start + len].trim().parse::<u64>() {
        Ok(count) => count > 0,
        Err(_) => {
            tracing::warn!("⚠️ Unreadable error count in deployment summary");
            true
        }
    }
}

/// Deploys `.bpr` archives to an ActiveBPEL engine.
///
/// The engine picks archives up from its deployment directory, so undeploying
/// deletes the copy there and then terminates whatever instances remain.
pub struct ActiveBpelDeployer {
    config: DeployerConfig,
    client: EngineClient,
    lifecycle: ProcessLifecycle,
    cache: Arc<ParseCache>,
    generated_archive: Option<PathBuf>,
    deployed: Option<DeploymentRecord>,
    current_process: Option<String>,
}

impl ActiveBpelDeployer {
    pub fn new(config: DeployerConfig) -> Result<Self> {
        config.validate()?;
        let client = EngineClient::new(Duration::from_secs(config.engine.timeout_seconds))?;
        let lifecycle = ProcessLifecycle::new(client.clone(), config.admin_service_url())?;

        Ok(Self {
            config,
            client,
            lifecycle,
            cache: ParseCache::global(),
            generated_archive: None,
            deployed: None,
            current_process: None,
        })
    }

    /// Replaces the process-wide parse cache.
    pub fn with_cache(mut self, cache: Arc<ParseCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_lifecycle(mut self, lifecycle: ProcessLifecycle) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    pub fn config(&self) -> &DeployerConfig {
        &self.config
    }

    pub fn lifecycle(&self) -> &ProcessLifecycle {
        &self.lifecycle
    }

    pub fn deployed(&self) -> Option<&DeploymentRecord> {
        self.deployed.as_ref()
    }

    /// Absolute path of the archive to deploy, building it from the process
    /// file when one is configured or when the archive is missing.
    pub fn archive_location(&mut self, put: &ProcessUnderTest) -> Result<PathBuf> {
        if let Some(archive) = self.generated_archive.as_ref().filter(|a| a.exists()) {
            return Ok(absolute(archive));
        }

        let base = put.base_dir();
        let process_file = self
            .config
            .deployment
            .process_file
            .as_ref()
            .map(|p| base.join(p));

        let archive = match &self.config.deployment.archive_file {
            Some(archive) => base.join(archive),
            None => {
                let process_file = process_file.as_ref().ok_or_else(|| {
                    DeployError::config("Either the archive or the process file needs to be set")
                })?;
                let stem = process_file
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| put.name().to_string());
                base.join(format!("{}.{}", stem, ARCHIVE_EXTENSION))
            }
        };

        if process_file.is_some() || !archive.exists() {
            let process_file = process_file.ok_or_else(|| {
                DeployError::config(format!(
                    "The archive {} does not exist, but the process file has not been set",
                    archive.display()
                ))
            })?;
            ArchiveBuilder::new(Arc::clone(&self.cache))
                .with_options(self.config.build_options())
                .build(&process_file, &archive)?;
            self.generated_archive = Some(archive.clone());
        }

        Ok(absolute(&archive))
    }

    fn upload(&self, archive: &Path, archive_name: &str) -> Result<RemoteCallResult> {
        let content = std::fs::read(archive)?;
        let request = requests::deploy_request(archive_name, &content);
        tracing::info!(
            "📤 Uploading {} ({} bytes) to {}",
            archive_name,
            content.len(),
            self.config.deployment_service_url()
        );
        self.client.post(
            &self.config.deployment_service_url(),
            &request.content_type,
            &request.body,
        )
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

impl ProcessDeployer for ActiveBpelDeployer {
    fn deploy(&mut self, put: &ProcessUnderTest) -> Result<()> {
        tracing::info!("🚀 Deploying {}", put.name());
        self.current_process = Some(put.name().to_string());

        let deployment_dir = self.config.deployment_directory()?;
        let archive = self.archive_location(put)?;
        if !archive.exists() {
            return Err(DeployError::ArchiveNotFound { path: archive });
        }
        let archive_name = crate::core::descriptors::file_name(&archive)?;

        let result = self.upload(&archive, &archive_name);
        if archive.exists() {
            if let Err(e) = std::fs::remove_file(&archive) {
                tracing::warn!("⚠️ Could not delete {}: {}", archive.display(), e);
            }
        }
        let result = result?;

        if !result.is_success() || errors_in_summary(&result.body) {
            return Err(DeployError::DeploymentRejected {
                status: result.status,
                body: result.body,
            });
        }

        let record = DeploymentRecord {
            process_name: put.name().to_string(),
            remote_path: deployment_dir.join(&archive_name),
            archive_name,
            deployed_at: chrono::Utc::now(),
        };
        tracing::info!("✅ Deployed {} as {}", put.name(), record.remote_path.display());
        self.deployed = Some(record);
        Ok(())
    }

    fn undeploy(&mut self, put: &ProcessUnderTest) -> Result<()> {
        let Some(record) = self.deployed.as_ref() else {
            tracing::debug!("Nothing deployed for {}, skipping undeploy", put.name());
            return Ok(());
        };

        tracing::info!("🗑️ Undeploying {}", put.name());
        if !record.remote_path.exists() {
            return Err(DeployError::UndeployFailed {
                process: put.name().to_string(),
                reason: format!("file {} not found", record.remote_path.display()),
            });
        }
        std::fs::remove_file(&record.remote_path).map_err(|e| DeployError::UndeployFailed {
            process: put.name().to_string(),
            reason: format!("file {} could not be deleted: {}", record.remote_path.display(), e),
        })?;
        // cleared only once the remote copy is gone
        self.deployed = None;

        self.lifecycle.terminate_all(put.name())?;
        Ok(())
    }

    fn get_deployment(&mut self, put: &ProcessUnderTest) -> Result<Deployment> {
        let archive = self.archive_location(put)?;
        Ok(
            Deployment::open(put, &archive, self.config.deployment.scratch_directory.as_deref())?
                .with_role_lookup(self.config.compat.partner_role_lookup),
        )
    }

    fn clean_up_after_test_case(&mut self) -> Result<()> {
        match &self.current_process {
            Some(name) => self.lifecycle.terminate_all(name).map(|_| ()),
            None => Ok(()),
        }
    }
}
