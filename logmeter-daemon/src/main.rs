use anyhow::Result;
use clap::Parser;

use logmeter_core::config::LogmeterConfig;
use logmeter_daemon::cli::DaemonCli;
use logmeter_daemon::logging;
use logmeter_daemon::orchestrator::{Orchestrator, validate_config};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    // Layering: file (optional) < LOGMETER_* env < command-line flags
    let mut config = match &cli.config {
        Some(path) => LogmeterConfig::from_file(path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config '{}': {}", path.display(), e))?,
        None => LogmeterConfig::default(),
    };
    config.apply_env_overrides();
    cli.apply_overrides(&mut config);
    validate_config(&config).map_err(|e| anyhow::anyhow!("invalid configuration: {}", e))?;

    if cli.validate {
        println!("configuration is valid");
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    logging::init_tracing(&config.general)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        auth_log = %config.sources.auth_log,
        request_log = %config.sources.request_log,
        from_start = config.sources.from_start,
        "logmeter-daemon starting"
    );

    let mut orchestrator = Orchestrator::build_from_config(config).await?;
    orchestrator.run().await
}
