use crate::adapters::engine::client::EngineClient;
use crate::adapters::engine::requests::{self, TEXT_XML};
use crate::domain::model::RemoteCallResult;
use crate::domain::ports::ProcessIdExtractor;
use crate::utils::error::{DeployError, Result};
use regex::Regex;
use std::collections::HashSet;

const PROCESS_ID_PATTERN: &str = r"<[^>]*processId>\s*([0-9]+)\s*</[^>]+>";

/// Finds `...processId>NNN</...>` elements by pattern instead of parsing the
/// response. Unexpected nesting yields no ids rather than an error.
///
/// Ids come back in text order with repeats removed. An id that does not fit
/// in a `u64` is logged and skipped.
#[derive(Debug, Clone)]
pub struct TagPatternExtractor {
    pattern: Regex,
}

impl TagPatternExtractor {
    pub fn new() -> Result<Self> {
        Self::with_pattern(PROCESS_ID_PATTERN)
    }

    /// The first capture group must be the id.
    pub fn with_pattern(pattern: &str) -> Result<Self> {
        let pattern = Regex::new(pattern).map_err(|e| DeployError::InvalidConfigValueError {
            field: "process_id_pattern".to_string(),
            value: pattern.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { pattern })
    }
}

impl ProcessIdExtractor for TagPatternExtractor {
    fn extract(&self, body: &str) -> Vec<u64> {
        let mut seen = HashSet::new();
        let mut ids = Vec::new();
        for m in self.pattern.captures_iter(body).filter_map(|caps| caps.get(1)) {
            match m.as_str().trim().parse::<u64>() {
                Ok(id) => {
                    if seen.insert(id) {
                        ids.push(id);
                    }
                }
                Err(e) => tracing::warn!("⚠️ Ignoring process id '{}': {}", m.as_str(), e),
            }
        }
        ids
    }
}

/// 透過 ActiveBPEL 管理服務列出並終止執行中的流程實例
pub struct ProcessLifecycle {
    client: EngineClient,
    admin_url: String,
    extractor: Box<dyn ProcessIdExtractor>,
}

impl ProcessLifecycle {
    pub fn new(client: EngineClient, admin_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client,
            admin_url: admin_url.into(),
            extractor: Box::new(TagPatternExtractor::new()?),
        })
    }

    pub fn with_extractor(mut self, extractor: Box<dyn ProcessIdExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn admin_url(&self) -> &str {
        &self.admin_url
    }

    pub fn send_administrative_request(&self, body: &str) -> Result<RemoteCallResult> {
        self.client.post(&self.admin_url, TEXT_XML, body.as_bytes())
    }

    /// Ids of the running instances of `process_name`, in response order.
    pub fn list_running(&self, process_name: &str) -> Result<Vec<u64>> {
        let operation = format!("Listing running instances of {}", process_name);
        let response = self
            .send_administrative_request(&requests::process_list_request(process_name))
            .map_err(|e| lifecycle_failure(&operation, e))?;

        if !response.is_ok() {
            return Err(DeployError::LifecycleRejected {
                operation,
                status: response.status,
                body: response.body,
            });
        }

        let ids = self.extractor.extract(&response.body);
        tracing::debug!("{} running instances of {}: {:?}", ids.len(), process_name, ids);
        Ok(ids)
    }

    pub fn terminate_process(&self, pid: u64) -> Result<()> {
        let operation = format!("Terminating process #{}", pid);
        let response = self
            .client
            .post_once(
                &self.admin_url,
                TEXT_XML,
                requests::terminate_process_request(pid).as_bytes(),
            )
            .map_err(|e| lifecycle_failure(&operation, e))?;

        if !response.is_ok() {
            return Err(DeployError::LifecycleRejected {
                operation,
                status: response.status,
                body: response.body,
            });
        }
        tracing::debug!("Terminated process #{}", pid);
        Ok(())
    }

    /// Terminates instances one by one; the first failure stops the batch.
    pub fn terminate_all(&self, process_name: &str) -> Result<usize> {
        let ids = self.list_running(process_name)?;
        for pid in &ids {
            self.terminate_process(*pid)?;
        }
        if !ids.is_empty() {
            tracing::info!("🧹 Terminated {} instances of {}", ids.len(), process_name);
        }
        Ok(ids.len())
    }
}

fn lifecycle_failure(operation: &str, e: DeployError) -> DeployError {
    DeployError::LifecycleFailed {
        operation: operation.to_string(),
        reason: e.to_string(),
    }
}
