//! Aggregated health check reporting.
//!
//! Polls each source pipeline's `health_check()` and produces a unified
//! [`DaemonHealth`] report. The overall daemon status is the worst status
//! among all registered pipelines.
//!
//! # Aggregation Rule
//!
//! - All Healthy -> Healthy
//! - Any Degraded, none Unhealthy -> Degraded(reason)
//! - Any Unhealthy -> Unhealthy(reason)

use serde::Serialize;

use logmeter_core::pipeline::{HealthStatus, PipelineState};

/// Aggregated health report for the entire daemon.
#[derive(Debug, Clone, Serialize)]
pub struct DaemonHealth {
    /// Overall daemon health status (worst of all pipelines).
    pub status: HealthStatus,
    /// Daemon uptime in seconds since start.
    pub uptime_secs: u64,
    /// Per-pipeline health reports.
    pub pipelines: Vec<PipelineHealth>,
}

/// Health status for a single source pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineHealth {
    /// Pipeline name (e.g., "auth", "request").
    pub name: String,
    /// Lifecycle state at the time of the check.
    pub state: PipelineState,
    /// Current health status of the pipeline.
    pub status: HealthStatus,
}

/// Aggregate pipeline health statuses into a single status.
///
/// Returns the worst status found: Unhealthy > Degraded > Healthy.
/// The reason lists every pipeline at the reported level.
pub fn aggregate_status(pipelines: &[PipelineHealth]) -> HealthStatus {
    let worst = pipelines
        .iter()
        .fold(HealthStatus::Healthy, |acc, p| acc.worst(p.status.clone()));

    let reasons = |unhealthy: bool| {
        pipelines
            .iter()
            .filter_map(|p| match &p.status {
                HealthStatus::Unhealthy(reason) if unhealthy => Some(format!("{}: {}", p.name, reason)),
                HealthStatus::Degraded(reason) if !unhealthy => Some(format!("{}: {}", p.name, reason)),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("; ")
    };

    match worst {
        HealthStatus::Healthy => HealthStatus::Healthy,
        HealthStatus::Degraded(_) => HealthStatus::Degraded(reasons(false)),
        HealthStatus::Unhealthy(_) => HealthStatus::Unhealthy(reasons(true)),
    }
}

/// Log an aggregated health report at a level matching its severity.
pub fn log_health(health: &DaemonHealth) {
    match &health.status {
        HealthStatus::Healthy => tracing::debug!(
            uptime_secs = health.uptime_secs,
            pipelines = health.pipelines.len(),
            "daemon healthy"
        ),
        status => tracing::warn!(
            uptime_secs = health.uptime_secs,
            status = %status,
            "daemon health degraded"
        ),
    }
}
