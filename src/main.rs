use bpel_deploy::adapters::engine::{ActiveBpelDeployer, EngineClient, ProcessLifecycle};
use bpel_deploy::config::{Cli, Command, DeployerConfig};
use bpel_deploy::core::{ArchiveBuilder, Deployment, ParseCache};
use bpel_deploy::domain::model::{PartnerLink, ProcessUnderTest, QName};
use bpel_deploy::domain::ports::ProcessDeployer;
use bpel_deploy::utils::error::{DeployError, ErrorSeverity, Result};
use bpel_deploy::utils::logger;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

fn main() {
    let cli = Cli::parse();

    // 初始化日誌
    logger::init_cli_logger(cli.verbose, cli.log_format);
    tracing::info!("Starting bpel-deploy CLI");
    if cli.verbose {
        tracing::debug!("CLI arguments: {:?}", cli);
    }

    let result = cli.load_config().and_then(|config| run(&cli.command, config));

    if let Err(e) = result {
        // 記錄詳細錯誤信息
        tracing::error!(
            "❌ {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        if let Some(status) = e.status_code() {
            tracing::error!("Engine answered HTTP {}", status);
        }
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        if let Some(body) = e.response_body() {
            eprintln!("{}", body);
        }
        eprintln!("💡 建議: {}", e.recovery_suggestion());

        // 根據錯誤嚴重程度決定退出碼
        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }
}

fn run(command: &Command, config: DeployerConfig) -> Result<()> {
    match command {
        Command::Build { process, output } => {
            let output = output
                .clone()
                .unwrap_or_else(|| process.with_extension("bpr"));
            let manifest = ArchiveBuilder::new(ParseCache::global())
                .with_options(config.build_options())
                .build(process, &output)?;

            println!("✅ Archive built: {}", manifest.archive.display());
            for entry in &manifest.entries {
                println!("   {}", entry);
            }
        }
        Command::Deploy { name, base_dir } => {
            let base_dir = match base_dir {
                Some(dir) => dir.clone(),
                None => std::env::current_dir()?,
            };
            let put = ProcessUnderTest::new(name.clone(), base_dir);
            let mut deployer = ActiveBpelDeployer::new(config)?;
            deployer.deploy(&put)?;

            if let Some(record) = deployer.deployed() {
                println!("✅ {} deployed", record.process_name);
                println!("📁 Remote archive: {}", record.remote_path.display());
            }
        }
        Command::Instances { process_name, json } => {
            let ids = lifecycle(&config)?.list_running(process_name)?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&ids)?);
            } else if ids.is_empty() {
                println!("No running instances of {}", process_name);
            } else {
                for id in ids {
                    println!("{}", id);
                }
            }
        }
        Command::Terminate { process_name } => {
            let count = lifecycle(&config)?.terminate_all(process_name)?;
            println!("✅ Terminated {} instances of {}", count, process_name);
        }
        Command::RewriteEndpoint {
            archive,
            service,
            port,
            url,
        } => {
            let service: QName = service.parse().map_err(|reason: String| {
                DeployError::InvalidConfigValueError {
                    field: "--service".to_string(),
                    value: service.clone(),
                    reason,
                }
            })?;
            let put = ProcessUnderTest::new(service.local.clone(), PathBuf::from("."));
            let deployment = Deployment::open(
                &put,
                archive,
                config.deployment.scratch_directory.as_deref(),
            )?;
            let link = PartnerLink::new(service.local.clone(), service, port.clone());
            let count = deployment.replace_endpoint(&link, url)?;

            println!("✅ Rewrote {} ports", count);
            println!("📁 {}", deployment.root().display());
            // keep the unpacked copy around for inspection
            if let bpel_deploy::adapters::ArchiveMount::Unpacked { scratch, .. } =
                deployment.into_mount()
            {
                let _ = scratch.keep();
            }
        }
    }
    Ok(())
}

fn lifecycle(config: &DeployerConfig) -> Result<ProcessLifecycle> {
    let client = EngineClient::new(Duration::from_secs(config.engine.timeout_seconds))?;
    ProcessLifecycle::new(client, config.admin_service_url())
}
