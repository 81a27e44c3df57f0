use crate::domain::model::QName;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeployError {
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unknown namespace '{namespace}' in {}", path.display())]
    UnknownNamespace { path: PathBuf, namespace: String },

    #[error("Malformed document {}: {reason}", path.display())]
    MalformedDocument { path: PathBuf, reason: String },

    #[error("Partner link type {name} was not found")]
    PartnerLinkTypeNotFound { name: QName },

    #[error("Role '{role}' is not declared by partner link type {partner_link_type}")]
    RoleNotDeclared {
        partner_link_type: QName,
        role: String,
    },

    #[error("Port type {port_type} was not found")]
    PortTypeNotFound { port_type: QName },

    #[error("Could not find a service with a port of type {port_type}")]
    ServiceNotFound { port_type: QName },

    #[error("Could not generate the deployment archive: {message}")]
    ArchiveGeneration {
        message: String,
        #[source]
        source: Box<DeployError>,
    },

    #[error("Deployment archive {} does not exist", path.display())]
    ArchiveNotFound { path: PathBuf },

    #[error("Engine reported a deployment error (HTTP {status}): {body}")]
    DeploymentRejected { status: u16, body: String },

    #[error("Problem contacting the engine at {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{operation} failed (HTTP {status}): {body}")]
    LifecycleRejected {
        operation: String,
        status: u16,
        body: String,
    },

    #[error("{operation} failed: {reason}")]
    LifecycleFailed { operation: String, reason: String },

    #[error("Cannot undeploy {process}: {reason}")]
    UndeployFailed { process: String, reason: String },

    #[error("No deployed interface definition declares service {service}")]
    ServiceNotDeclared { service: QName },

    #[error("Endpoint rewrite failed for {}: {message}", path.display())]
    EndpointRewrite {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Resolution,
    ArchiveGeneration,
    DeploymentProtocol,
    Lifecycle,
    EndpointRewrite,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl DeployError {
    pub fn config(message: impl Into<String>) -> Self {
        DeployError::ConfigError {
            message: message.into(),
        }
    }

    pub fn malformed(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        DeployError::MalformedDocument {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// 將非解析類錯誤包成封存檔產生錯誤；解析錯誤維持原樣往上傳
    pub fn into_archive_generation(self, message: impl Into<String>) -> Self {
        match self.category() {
            ErrorCategory::Resolution
            | ErrorCategory::Configuration
            | ErrorCategory::ArchiveGeneration => self,
            _ => DeployError::ArchiveGeneration {
                message: message.into(),
                source: Box::new(self),
            },
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            DeployError::ConfigError { .. }
            | DeployError::MissingConfigError { .. }
            | DeployError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            DeployError::UnknownNamespace { .. }
            | DeployError::MalformedDocument { .. }
            | DeployError::PartnerLinkTypeNotFound { .. }
            | DeployError::RoleNotDeclared { .. }
            | DeployError::PortTypeNotFound { .. }
            | DeployError::ServiceNotFound { .. } => ErrorCategory::Resolution,
            DeployError::ArchiveGeneration { .. } => ErrorCategory::ArchiveGeneration,
            DeployError::ArchiveNotFound { .. }
            | DeployError::DeploymentRejected { .. }
            | DeployError::Transport { .. } => ErrorCategory::DeploymentProtocol,
            DeployError::LifecycleRejected { .. }
            | DeployError::LifecycleFailed { .. }
            | DeployError::UndeployFailed { .. } => ErrorCategory::Lifecycle,
            DeployError::ServiceNotDeclared { .. } | DeployError::EndpointRewrite { .. } => {
                ErrorCategory::EndpointRewrite
            }
            DeployError::ZipError(_)
            | DeployError::IoError(_)
            | DeployError::SerializationError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::EndpointRewrite => ErrorSeverity::Medium,
            ErrorCategory::DeploymentProtocol | ErrorCategory::Lifecycle => {
                if self.is_transient() {
                    ErrorSeverity::Medium
                } else {
                    ErrorSeverity::High
                }
            }
            ErrorCategory::Configuration
            | ErrorCategory::Resolution
            | ErrorCategory::ArchiveGeneration => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// Transport failures may succeed when retried later; engine rejections will not.
    pub fn is_transient(&self) -> bool {
        matches!(self, DeployError::Transport { .. })
    }

    /// Proximate HTTP status when the failure came from the engine.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            DeployError::DeploymentRejected { status, .. }
            | DeployError::LifecycleRejected { status, .. } => Some(*status),
            DeployError::Transport { source, .. } => source.status().map(|s| s.as_u16()),
            DeployError::ArchiveGeneration { source, .. } => source.status_code(),
            _ => None,
        }
    }

    /// Raw response text when the failure came from the engine.
    pub fn response_body(&self) -> Option<&str> {
        match self {
            DeployError::DeploymentRejected { body, .. }
            | DeployError::LifecycleRejected { body, .. } => Some(body),
            _ => None,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            DeployError::ConfigError { .. } | DeployError::MissingConfigError { .. } => {
                "Set the missing option in the config file, on the command line, or via CATALINA_HOME"
            }
            DeployError::InvalidConfigValueError { .. } => {
                "Fix the reported configuration value and run again"
            }
            DeployError::UnknownNamespace { .. } | DeployError::MalformedDocument { .. } => {
                "Check that every imported file is a BPEL, WSDL or XML Schema document"
            }
            DeployError::PartnerLinkTypeNotFound { .. }
            | DeployError::RoleNotDeclared { .. }
            | DeployError::PortTypeNotFound { .. }
            | DeployError::ServiceNotFound { .. } => {
                "Make sure the WSDL declaring the partner link type, port type and service is imported by the process"
            }
            DeployError::ArchiveGeneration { .. } => {
                "Check file permissions and free space in the output directory"
            }
            DeployError::ArchiveNotFound { .. } => {
                "Point deployment.archive_file at an existing archive or set deployment.process_file"
            }
            DeployError::DeploymentRejected { .. } => {
                "Inspect the engine response above; the engine rejected the archive"
            }
            DeployError::Transport { .. } => {
                "Make sure the engine is running and reachable at the configured host and port"
            }
            DeployError::LifecycleRejected { .. } | DeployError::LifecycleFailed { .. } => {
                "Check the engine administration service; remaining instances can be terminated by re-running"
            }
            DeployError::UndeployFailed { .. } => {
                "Remove the archive from the engine deployment directory manually"
            }
            DeployError::ServiceNotDeclared { .. } | DeployError::EndpointRewrite { .. } => {
                "Check that the deployment archive contains the WSDL declaring the partner service"
            }
            DeployError::ZipError(_) => "The archive may be corrupt; rebuild it",
            DeployError::IoError(_) => "Check file paths and permissions",
            DeployError::SerializationError(_) => "Report this as a bug",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        let base = match self.category() {
            ErrorCategory::Configuration => "Configuration problem",
            ErrorCategory::Resolution => "Could not resolve the process dependencies",
            ErrorCategory::ArchiveGeneration => "Could not build the deployment archive",
            ErrorCategory::DeploymentProtocol => "Deployment failed",
            ErrorCategory::Lifecycle => "Could not manage running process instances",
            ErrorCategory::EndpointRewrite => "Could not rewrite a partner endpoint",
            ErrorCategory::System => "System error",
        };
        format!("{}: {}", base, self)
    }
}

pub type Result<T> = std::result::Result<T, DeployError>;
