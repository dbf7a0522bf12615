//! Pipeline orchestration -- assembly and lifecycle management.
//!
//! The [`Orchestrator`] is the central coordinator of `logmeter-daemon`.
//! It validates configuration, installs the metrics recorder, builds the
//! source pipeline supervisor, and runs the main loop until shutdown.
//!
//! # Startup Order
//!
//! 1. Metrics recorder and HTTP listener
//! 2. GeoIP database (shared, opened once by the supervisor)
//! 3. Source pipelines (auth, request); one failing does not block the other
//!
//! # Shutdown Order
//!
//! 1. Source pipelines (tail released, queued lines drained)
//! 2. GeoIP database closed after the last pipeline stopped

use std::future::Future;
use std::time::{Duration, Instant};

use anyhow::Result;

use logmeter_core::config::LogmeterConfig;
use logmeter_log_pipeline::{PipelineConfig, Supervisor, auth_ruleset, request_ruleset};

use crate::health::{DaemonHealth, PipelineHealth, aggregate_status, log_health};
use crate::metrics_server;

/// Interval between periodic health checks.
const DEFAULT_HEALTH_INTERVAL: Duration = Duration::from_secs(30);

/// The main daemon orchestrator.
pub struct Orchestrator {
    /// Loaded and validated configuration.
    config: LogmeterConfig,
    /// Source pipelines and the shared GeoIP handle.
    supervisor: Supervisor,
    /// Daemon start time (for uptime reporting).
    start_time: Instant,
    /// Interval between health log lines.
    health_interval: Duration,
}

impl Orchestrator {
    /// Build from an already-loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration validation fails
    /// - The metrics recorder cannot be installed
    /// - The request pattern is invalid or the GeoIP database cannot be opened
    pub async fn build_from_config(config: LogmeterConfig) -> Result<Self> {
        validate_config(&config)?;

        if config.metrics.enabled {
            metrics_server::install_metrics_recorder(&config.metrics)?;
        } else {
            tracing::info!("metrics endpoint disabled");
        }

        let pipeline_config = PipelineConfig::from_core(&config);
        let supervisor = Supervisor::from_config(&pipeline_config)
            .map_err(|e| anyhow::anyhow!("failed to build source pipelines: {}", e))?;

        tracing::info!(
            pipelines = supervisor.count(),
            geoip = supervisor.geo().is_some(),
            "orchestrator initialized"
        );

        Ok(Self {
            config,
            supervisor,
            start_time: Instant::now(),
            health_interval: DEFAULT_HEALTH_INTERVAL,
        })
    }

    /// Override the periodic health check interval.
    pub fn with_health_interval(mut self, interval: Duration) -> Self {
        self.health_interval = interval;
        self
    }

    /// Start all pipelines and block until `SIGTERM` or `SIGINT`.
    pub async fn run(&mut self) -> Result<()> {
        let signal = wait_for_shutdown_signal()?;
        self.run_until(async move {
            let name = signal.await;
            tracing::info!(signal = name, "shutdown signal received");
        })
        .await
    }

    /// Start all pipelines and run until `shutdown` completes.
    ///
    /// # Errors
    ///
    /// Returns an error if no pipeline could be started, or if stopping
    /// the pipelines fails.
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tracing::info!("starting source pipelines");
        let report = self.supervisor.start_all().await;
        if !report.any_started() {
            let reasons = report
                .failed
                .iter()
                .map(|(name, e)| format!("{name}: {e}"))
                .collect::<Vec<_>>()
                .join("; ");
            if let Err(e) = self.supervisor.stop_all().await {
                tracing::error!(error = %e, "cleanup after failed startup also failed");
            }
            return Err(anyhow::anyhow!("no source pipeline could be started: {}", reasons));
        }
        tracing::info!(
            started = ?report.started,
            failed = report.failed.len(),
            "entering main loop"
        );

        let mut ticker = tokio::time::interval(self.health_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first tick completes immediately.
        ticker.tick().await;

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                () = &mut shutdown => break,
                _ = ticker.tick() => {
                    let health = self.health().await;
                    log_health(&health);
                }
            }
        }

        self.shutdown().await
    }

    /// Stop all pipelines, then close the shared GeoIP database.
    async fn shutdown(&mut self) -> Result<()> {
        tracing::info!("stopping all source pipelines");
        self.supervisor.stop_all().await?;
        tracing::info!(
            uptime_secs = self.start_time.elapsed().as_secs(),
            "logmeter-daemon shut down"
        );
        Ok(())
    }

    /// Get the current aggregated health status.
    pub async fn health(&self) -> DaemonHealth {
        let pipelines: Vec<PipelineHealth> = self
            .supervisor
            .health_check_all()
            .await
            .into_iter()
            .map(|(name, state, status)| PipelineHealth {
                name,
                state,
                status,
            })
            .collect();

        DaemonHealth {
            status: aggregate_status(&pipelines),
            uptime_secs: self.start_time.elapsed().as_secs(),
            pipelines,
        }
    }

    /// Get a reference to the loaded configuration.
    pub fn config(&self) -> &LogmeterConfig {
        &self.config
    }
}

/// Run every check that can fail before any file or socket is opened.
///
/// Covers the core configuration, the derived pipeline configuration, and
/// compilation of the rule sets for each configured source. Source paths
/// are not checked for existence.
///
/// # Errors
///
/// Returns the first validation failure.
pub fn validate_config(config: &LogmeterConfig) -> Result<()> {
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

    let pipeline_config = PipelineConfig::from_core(config);
    pipeline_config
        .validate()
        .map_err(|e| anyhow::anyhow!("pipeline config validation failed: {}", e))?;

    if pipeline_config.auth_log_path().is_some() {
        auth_ruleset().map_err(|e| anyhow::anyhow!("auth rules failed to compile: {}", e))?;
    }
    if pipeline_config.request_log_path().is_some() {
        request_ruleset(&pipeline_config.request_pattern)
            .map_err(|e| anyhow::anyhow!("request pattern rejected: {}", e))?;
    }
    Ok(())
}

/// Install SIGTERM/SIGINT handlers and return a future resolving to the
/// name of the first signal received.
///
/// # Errors
///
/// Returns an error if signal handlers cannot be installed.
#[cfg(unix)]
fn wait_for_shutdown_signal() -> Result<impl Future<Output = &'static str>> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(async move {
        tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        }
    })
}

#[cfg(not(unix))]
fn wait_for_shutdown_signal() -> Result<impl Future<Output = &'static str>> {
    Ok(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
        }
        "CTRL_C"
    })
}
