//! Read-only view composition over the run store.
//!
//! No caching anywhere: every call re-walks the filesystem. The dashboard
//! serves low-frequency human traffic, not a hot path, and a reader may
//! observe a run mid-write since the pipeline writes files sequentially.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::config::RouterConfig;
use crate::store::{RunDetail, RunStore, RunSummary, Status, StoreError};

/// Bounds for the per-status "latest runs" listing.
const MIN_LIMIT: i64 = 1;
const MAX_LIMIT: i64 = 50;

/// Configured model names echoed in the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelConfig {
    pub author: String,
    pub reproduce: String,
    pub security: String,
}

/// One status bucket in the snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSummary {
    pub root: String,
    pub total_runs: usize,
    pub latest: Vec<RunSummary>,
}

/// Per-status breakdown, serialized in lifecycle order.
#[derive(Debug, Clone, Serialize)]
pub struct StatusBreakdown {
    pub incoming: StatusSummary,
    pub approved: StatusSummary,
    pub rejected: StatusSummary,
    pub reports: StatusSummary,
}

/// Point-in-time dashboard snapshot for one project.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub project: String,
    pub workspace: String,
    pub default_models: ModelConfig,
    pub status: StatusBreakdown,
    pub timestamp: u64,
}

/// Build the dashboard summary for one project.
///
/// `limit` is clamped to `[1, 50]` before use.
pub fn summary(
    store: &RunStore,
    config: &RouterConfig,
    project: &str,
    limit: i64,
) -> Result<DashboardSnapshot, StoreError> {
    store.ensure_layout()?;
    let limit = limit.clamp(MIN_LIMIT, MAX_LIMIT) as usize;

    Ok(DashboardSnapshot {
        project: project.to_string(),
        workspace: store.root().display().to_string(),
        default_models: ModelConfig {
            author: config.author_model.clone(),
            reproduce: config.reproduce_model.clone(),
            security: config.security_model.clone(),
        },
        status: StatusBreakdown {
            incoming: status_summary(store, Status::Incoming, project, limit)?,
            approved: status_summary(store, Status::Approved, project, limit)?,
            rejected: status_summary(store, Status::Rejected, project, limit)?,
            reports: status_summary(store, Status::Reports, project, limit)?,
        },
        timestamp: unix_now(),
    })
}

/// Full detail for a single run; lookup failures propagate unchanged.
pub fn detail(
    store: &RunStore,
    status: &str,
    project: &str,
    run_id: &str,
) -> Result<RunDetail, StoreError> {
    store.run_detail(status, project, run_id)
}

fn status_summary(
    store: &RunStore,
    status: Status,
    project: &str,
    limit: usize,
) -> Result<StatusSummary, StoreError> {
    let mut runs = store.list_runs(status, project)?;
    let total_runs = runs.len();
    runs.truncate(limit);
    Ok(StatusSummary {
        root: store.status_dir(status).join(project).display().to_string(),
        total_runs,
        latest: runs,
    })
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}
