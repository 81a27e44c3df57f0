use crate::domain::model::RemoteCallResult;
use crate::utils::error::{DeployError, Result};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;

const SOAP_ACTION: &str = "SOAPAction";
const MAX_RETRIES: u32 = 1;

/// Blocking HTTP client for the engine's SOAP services.
///
/// Every request carries an empty `SOAPAction` header. Transport failures
/// (connect, timeout, broken body) are retried once by [`EngineClient::post`];
/// HTTP error statuses are returned to the caller as they are.
#[derive(Debug, Clone)]
pub struct EngineClient {
    http: Client,
}

impl EngineClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DeployError::config(format!("Cannot create HTTP client: {}", e)))?;
        Ok(Self { http })
    }

    pub fn post(&self, url: &str, content_type: &str, body: &[u8]) -> Result<RemoteCallResult> {
        let mut attempt = 0;
        loop {
            match self.send(url, content_type, body) {
                Ok(result) => return Ok(result),
                Err(e) if attempt < MAX_RETRIES => {
                    attempt += 1;
                    tracing::warn!("⚠️ Request to {} failed ({}), retrying", url, e);
                }
                Err(e) => {
                    return Err(DeployError::Transport {
                        url: url.to_string(),
                        source: e,
                    })
                }
            }
        }
    }

    /// Single attempt, no retry.
    pub fn post_once(&self, url: &str, content_type: &str, body: &[u8]) -> Result<RemoteCallResult> {
        self.send(url, content_type, body)
            .map_err(|e| DeployError::Transport {
                url: url.to_string(),
                source: e,
            })
    }

    fn send(
        &self,
        url: &str,
        content_type: &str,
        body: &[u8],
    ) -> std::result::Result<RemoteCallResult, reqwest::Error> {
        tracing::debug!("POST {} ({} bytes)", url, body.len());
        let response = self
            .http
            .post(url)
            .header(CONTENT_TYPE, content_type)
            .header(SOAP_ACTION, "")
            .body(body.to_vec())
            .send()?;

        let status = response.status().as_u16();
        let body = response.text()?;
        tracing::debug!("Response from {}: HTTP {}", url, status);
        Ok(RemoteCallResult { status, body })
    }
}
