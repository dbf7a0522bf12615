//! CLI argument definitions for logmeter-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.
//! Every flag is optional and, when given, overrides the configuration file
//! and `LOGMETER_*` environment variables.

use std::path::PathBuf;

use clap::Parser;

use logmeter_core::config::{LogmeterConfig, split_csv};

/// Log line classifier and Prometheus exporter.
///
/// Tails an authentication log and/or an HTTP request log, classifies each
/// line, optionally geolocates the remote address and exposes the
/// resulting counters on a Prometheus scrape endpoint.
#[derive(Parser, Debug, Default)]
#[command(name = "logmeter-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to an optional logmeter.toml configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Port for the Prometheus metrics listener.
    #[arg(long)]
    pub port: Option<u16>,

    /// Address the metrics listener binds to.
    #[arg(long)]
    pub listen_addr: Option<String>,

    /// Path served for metrics scrapes.
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Path to the authentication log (e.g. /var/log/auth.log).
    #[arg(long = "auth")]
    pub auth_log: Option<String>,

    /// Path to the HTTP request log.
    #[arg(long = "request")]
    pub request_log: Option<String>,

    /// Regex used to match each request line.
    ///
    /// Must declare the named groups domain, ip_address, status and method.
    #[arg(long = "request-regex")]
    pub request_pattern: Option<String>,

    /// Comma-separated IP addresses excluded from geolocation.
    #[arg(long)]
    pub excluded_ips: Option<String>,

    /// Path to a MaxMind City .mmdb file. Geolocation is disabled without it.
    #[arg(long)]
    pub geodb: Option<String>,

    /// Read log files from the beginning instead of the end.
    #[arg(long)]
    pub debug: bool,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate configuration and exit without starting the daemon.
    #[arg(long)]
    pub validate: bool,
}

impl DaemonCli {
    /// Apply command-line overrides on top of the loaded configuration.
    pub fn apply_overrides(&self, config: &mut LogmeterConfig) {
        if let Some(port) = self.port {
            config.metrics.port = port;
        }
        if let Some(addr) = &self.listen_addr {
            config.metrics.listen_addr.clone_from(addr);
        }
        if let Some(endpoint) = &self.endpoint {
            config.metrics.endpoint.clone_from(endpoint);
        }
        if let Some(path) = &self.auth_log {
            config.sources.auth_log.clone_from(path);
        }
        if let Some(path) = &self.request_log {
            config.sources.request_log.clone_from(path);
        }
        if let Some(pattern) = self.request_pattern.as_deref().filter(|p| !p.is_empty()) {
            config.sources.request_pattern = pattern.to_owned();
        }
        if let Some(ips) = &self.excluded_ips {
            config.enrichment.excluded_ips = split_csv(ips);
        }
        if let Some(path) = &self.geodb {
            config.enrichment.geoip_db.clone_from(path);
        }
        if self.debug {
            config.sources.from_start = true;
        }
        if let Some(level) = &self.log_level {
            config.general.log_level.clone_from(level);
        }
        if let Some(format) = &self.log_format {
            config.general.log_format.clone_from(format);
        }
    }
}
