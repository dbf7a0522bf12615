//! Prometheus metrics HTTP server.
//!
//! Uses the built-in HTTP listener from `metrics-exporter-prometheus`
//! to expose the counters recorded by the source pipelines.
//!
//! # Usage
//!
//! ```ignore
//! let config = MetricsConfig::default();
//! install_metrics_recorder(&config)?;
//! // After this, all metrics::counter!() calls are recorded
//! ```

use std::net::SocketAddr;

use anyhow::Result;
use logmeter_core::config::MetricsConfig;
use metrics_exporter_prometheus::PrometheusBuilder;

/// Resolve the listener socket address from the metrics configuration.
pub fn listen_socket(config: &MetricsConfig) -> Result<SocketAddr> {
    let ip: std::net::IpAddr = config
        .listen_addr
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid metrics listen address '{}': {}", config.listen_addr, e))?;
    Ok(SocketAddr::new(ip, config.port))
}

/// Install the global metrics recorder and start the HTTP listener.
///
/// This function should be called once per process.
///
/// # Errors
///
/// - The listen address is invalid
/// - Socket binding fails
/// - Global recorder is already installed
pub fn install_metrics_recorder(config: &MetricsConfig) -> Result<()> {
    let addr = listen_socket(config)?;

    if config.endpoint != "/metrics" {
        // The built-in listener serves the same payload on every path.
        tracing::info!(
            endpoint = %config.endpoint,
            "custom metrics endpoint configured; the listener answers scrapes on any path"
        );
    }

    if addr.ip().is_unspecified() {
        tracing::warn!(
            listen_addr = %addr,
            "metrics endpoint is exposed on all interfaces; restrict listen_addr in untrusted networks"
        );
    }

    tracing::info!(listen_addr = %addr, "installing Prometheus metrics recorder");

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("failed to install metrics recorder: {}", e))?;

    logmeter_core::metrics::describe_all();

    tracing::info!(
        listen_addr = %addr,
        endpoint = %config.endpoint,
        "Prometheus metrics endpoint active"
    );

    Ok(())
}
