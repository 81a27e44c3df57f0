use crate::core::archive::BuildOptions;
use crate::core::descriptors::CatalogEntry;
use crate::core::partner_links::PartnerRoleLookup;
use crate::utils::error::{DeployError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_PROTOCOL: &str = "http";
pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DEPLOYMENT_SERVICE_PATH: &str = "/active-bpel/services/DeployBPRService";
pub const DEFAULT_ADMIN_SERVICE_PATH: &str = "/active-bpel/services/ActiveBpelAdmin";
pub const APPSERVER_HOME_VAR: &str = "CATALINA_HOME";
const APPSERVER_DEPLOY_SUBDIR: &str = "bpr";

/// ActiveBPEL 部署器設定
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployerConfig {
    pub engine: EngineConfig,
    pub deployment: DeploymentConfig,
    pub compat: CompatConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub deployment_service_path: String,
    pub admin_service_path: String,
    pub timeout_seconds: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            protocol: DEFAULT_PROTOCOL.to_string(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            deployment_service_path: DEFAULT_DEPLOYMENT_SERVICE_PATH.to_string(),
            admin_service_path: DEFAULT_ADMIN_SERVICE_PATH.to_string(),
            timeout_seconds: 120,
        }
    }
}

/// Either `archive_file` or `process_file` must be set by the time a process
/// is deployed; relative paths are taken from the process base directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploymentConfig {
    /// Directory the engine copies deployed archives into.
    pub directory: Option<PathBuf>,
    pub archive_file: Option<PathBuf>,
    pub process_file: Option<PathBuf>,
    /// Parent of the directories archives are unpacked into.
    pub scratch_directory: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompatConfig {
    pub partner_role_lookup: PartnerRoleLookup,
    pub catalog_entry: CatalogEntry,
}

impl DeployerConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| DeployError::ConfigError {
            message: format!("Cannot read {}: {}", path.as_ref().display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content)?;
        toml::from_str(&processed).map_err(|e| DeployError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${CATALINA_HOME})；未定義的變數保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| DeployError::config(e.to_string()))?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn engine_base_url(&self) -> String {
        format!(
            "{}://{}:{}",
            self.engine.protocol, self.engine.host, self.engine.port
        )
    }

    pub fn deployment_service_url(&self) -> String {
        format!("{}{}", self.engine_base_url(), self.engine.deployment_service_path)
    }

    pub fn admin_service_url(&self) -> String {
        format!("{}{}", self.engine_base_url(), self.engine.admin_service_path)
    }

    /// The configured directory, else `$CATALINA_HOME/bpr`.
    pub fn deployment_directory(&self) -> Result<PathBuf> {
        self.deployment_directory_with(std::env::var(APPSERVER_HOME_VAR).ok().as_deref())
    }

    pub fn deployment_directory_with(&self, appserver_home: Option<&str>) -> Result<PathBuf> {
        if let Some(dir) = &self.deployment.directory {
            return Ok(dir.clone());
        }
        match appserver_home {
            Some(home) if !home.is_empty() => Ok(Path::new(home).join(APPSERVER_DEPLOY_SUBDIR)),
            _ => Err(DeployError::MissingConfigError {
                field: format!("deployment.directory (or {})", APPSERVER_HOME_VAR),
            }),
        }
    }

    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            role_lookup: self.compat.partner_role_lookup,
            catalog_entry: self.compat.catalog_entry,
        }
    }
}

impl Validate for DeployerConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_one_of("engine.protocol", &self.engine.protocol, &["http", "https"])?;
        validation::validate_non_empty_string("engine.host", &self.engine.host)?;
        validation::validate_range("engine.port", self.engine.port, 1, u16::MAX)?;
        validation::validate_range("engine.timeout_seconds", self.engine.timeout_seconds, 1, 3600)?;
        validation::validate_service_path(
            "engine.deployment_service_path",
            &self.engine.deployment_service_path,
        )?;
        validation::validate_service_path("engine.admin_service_path", &self.engine.admin_service_path)?;
        validation::validate_url("engine.deployment_service_path", &self.deployment_service_url())?;
        validation::validate_url("engine.admin_service_path", &self.admin_service_url())?;

        let paths = [
            ("deployment.directory", &self.deployment.directory),
            ("deployment.archive_file", &self.deployment.archive_file),
            ("deployment.process_file", &self.deployment.process_file),
            ("deployment.scratch_directory", &self.deployment.scratch_directory),
        ];
        for (field, path) in paths {
            if let Some(path) = path {
                validation::validate_path(field, &path.to_string_lossy())?;
            }
        }
        Ok(())
    }
}
