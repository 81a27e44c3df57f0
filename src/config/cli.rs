use crate::config::DeployerConfig;
use crate::utils::error::Result;
use crate::utils::logger::LogFormat;
use crate::utils::validation::Validate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "bpel-deploy")]
#[command(about = "Builds, deploys and manages BPEL processes on an ActiveBPEL engine")]
pub struct Cli {
    /// TOML configuration file
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    #[arg(long, short, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, value_enum, default_value = "compact", global = true)]
    pub log_format: LogFormat,

    #[command(flatten)]
    pub overrides: Overrides,

    #[command(subcommand)]
    pub command: Command,
}

/// 命令列參數覆寫設定檔中的值
#[derive(Debug, Clone, Default, Args)]
pub struct Overrides {
    #[arg(long)]
    pub engine_protocol: Option<String>,

    #[arg(long)]
    pub engine_host: Option<String>,

    #[arg(long)]
    pub engine_port: Option<u16>,

    #[arg(long)]
    pub deployment_service_path: Option<String>,

    #[arg(long)]
    pub admin_service_path: Option<String>,

    #[arg(long)]
    pub deployment_directory: Option<PathBuf>,

    #[arg(long)]
    pub archive_file: Option<PathBuf>,

    #[arg(long)]
    pub process_file: Option<PathBuf>,

    #[arg(long)]
    pub scratch_directory: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build a deployment archive from a process definition
    Build {
        process: PathBuf,
        /// Defaults to the process file name with a .bpr extension
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Deploy a process using the configured archive or process file
    Deploy {
        #[arg(long)]
        name: String,
        /// Base directory for relative archive and process paths
        #[arg(long)]
        base_dir: Option<PathBuf>,
    },
    /// List running instances of a process
    Instances {
        process_name: String,
        #[arg(long)]
        json: bool,
    },
    /// Terminate all running instances of a process
    Terminate { process_name: String },
    /// Point a partner service in an archive or unpacked directory at another URL
    RewriteEndpoint {
        archive: PathBuf,
        /// Service name in {namespace}local form
        #[arg(long)]
        service: String,
        #[arg(long)]
        port: Option<String>,
        #[arg(long)]
        url: String,
    },
}

impl Cli {
    /// Config file (or defaults) with the command-line overrides applied,
    /// validated.
    pub fn load_config(&self) -> Result<DeployerConfig> {
        let mut config = match &self.config {
            Some(path) => DeployerConfig::from_file(path)?,
            None => DeployerConfig::default(),
        };
        self.overrides.apply(&mut config);
        config.validate()?;
        Ok(config)
    }
}

impl Overrides {
    pub fn apply(&self, config: &mut DeployerConfig) {
        if let Some(protocol) = &self.engine_protocol {
            config.engine.protocol = protocol.clone();
        }
        if let Some(host) = &self.engine_host {
            config.engine.host = host.clone();
        }
        if let Some(port) = self.engine_port {
            config.engine.port = port;
        }
        if let Some(path) = &self.deployment_service_path {
            config.engine.deployment_service_path = path.clone();
        }
        if let Some(path) = &self.admin_service_path {
            config.engine.admin_service_path = path.clone();
        }
        if let Some(dir) = &self.deployment_directory {
            config.deployment.directory = Some(dir.clone());
        }
        if let Some(archive) = &self.archive_file {
            config.deployment.archive_file = Some(archive.clone());
        }
        if let Some(process) = &self.process_file {
            config.deployment.process_file = Some(process.clone());
        }
        if let Some(scratch) = &self.scratch_directory {
            config.deployment.scratch_directory = Some(scratch.clone());
        }
    }
}
