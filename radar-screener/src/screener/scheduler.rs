//! Screener scheduler module.
//!
//! Re-runs the pipeline on a fixed interval against a (cached) snapshot
//! source and keeps the latest result in memory. A failed fetch is logged
//! as an upstream notice; the loop keeps going.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use radar_common::Error as RadarError;

use crate::data::SnapshotSource;

use super::engine::{ScreenerPipeline, ScreenerResult};

/// Completed runs kept in memory.
const MAX_HISTORY: usize = 100;

// ============================================================================
// Scheduler State
// ============================================================================

/// State of the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchedulerState {
    /// Waiting for the next tick
    Idle,
    /// Fetching and screening
    Running,
    /// Refresh loop ended
    Stopped,
}

impl std::fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Scheduler status information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerStatus {
    pub state: SchedulerState,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_run_id: Option<String>,
    pub last_candidate_count: Option<usize>,
    pub consecutive_failures: u32,
    pub error_message: Option<String>,
}

impl Default for SchedulerStatus {
    fn default() -> Self {
        Self {
            state: SchedulerState::Idle,
            last_run_at: None,
            last_run_id: None,
            last_candidate_count: None,
            consecutive_failures: 0,
            error_message: None,
        }
    }
}

// ============================================================================
// Run History
// ============================================================================

/// Record of a completed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunHistoryEntry {
    pub id: String,
    pub completed_at: DateTime<Utc>,
    pub duration_secs: f64,
    pub total_records: usize,
    pub candidate_count: usize,
    pub momentum_count: usize,
}

impl From<&ScreenerResult> for RunHistoryEntry {
    fn from(result: &ScreenerResult) -> Self {
        Self {
            id: result.id.clone(),
            completed_at: result.completed_at,
            duration_secs: result.duration_secs,
            total_records: result.total_records,
            candidate_count: result.rows.len(),
            momentum_count: result.momentum().len(),
        }
    }
}

// ============================================================================
// Screener Scheduler
// ============================================================================

/// Periodic refresh of one universe.
pub struct ScreenerScheduler {
    source: Arc<dyn SnapshotSource>,
    pipeline: Arc<ScreenerPipeline>,
    status: Arc<RwLock<SchedulerStatus>>,
    history: Arc<RwLock<Vec<RunHistoryEntry>>>,
    latest_result: Arc<RwLock<Option<ScreenerResult>>>,
}

impl ScreenerScheduler {
    /// Create a new scheduler.
    pub fn new(source: Arc<dyn SnapshotSource>, pipeline: ScreenerPipeline) -> Self {
        Self {
            source,
            pipeline: Arc::new(pipeline),
            status: Arc::new(RwLock::new(SchedulerStatus::default())),
            history: Arc::new(RwLock::new(Vec::new())),
            latest_result: Arc::new(RwLock::new(None)),
        }
    }

    pub fn pipeline(&self) -> &ScreenerPipeline {
        &self.pipeline
    }

    /// Get current scheduler status.
    pub async fn status(&self) -> SchedulerStatus {
        self.status.read().await.clone()
    }

    /// Get run history, most recent first.
    pub async fn history(&self, limit: usize) -> Vec<RunHistoryEntry> {
        let history = self.history.read().await;
        history.iter().rev().take(limit).cloned().collect()
    }

    /// Get the latest result.
    pub async fn latest_result(&self) -> Option<ScreenerResult> {
        self.latest_result.read().await.clone()
    }

    /// Fetch one batch and screen it.
    ///
    /// On a fetch failure the previous result is kept and the error returned.
    pub async fn run_once(&self) -> Result<ScreenerResult> {
        {
            let mut status = self.status.write().await;
            status.state = SchedulerState::Running;
        }

        let fetched = self
            .source
            .fetch()
            .await
            .with_context(|| format!("Upstream source '{}' unavailable", self.source.name()));

        let records = match fetched {
            Ok(records) => records,
            Err(e) => {
                if is_upstream(&e) {
                    warn!(source = self.source.name(), error = %e, "Upstream source unavailable, keeping last result");
                } else {
                    warn!(source = self.source.name(), error = %e, "Snapshot fetch failed");
                }
                let mut status = self.status.write().await;
                status.state = SchedulerState::Idle;
                status.consecutive_failures += 1;
                status.error_message = Some(format!("{:#}", e));
                return Err(e);
            }
        };

        let result = self.pipeline.run(&records);

        {
            let mut status = self.status.write().await;
            status.state = SchedulerState::Idle;
            status.last_run_at = Some(result.completed_at);
            status.last_run_id = Some(result.id.clone());
            status.last_candidate_count = Some(result.rows.len());
            status.consecutive_failures = 0;
            status.error_message = None;
        }

        {
            let mut history = self.history.write().await;
            history.push(RunHistoryEntry::from(&result));
            if history.len() > MAX_HISTORY {
                history.remove(0);
            }
        }

        *self.latest_result.write().await = Some(result.clone());

        Ok(result)
    }

    /// Refresh on `interval` until `shutdown` resolves.
    ///
    /// `on_result` sees every successful run. The first tick fires at once.
    pub async fn run_until<F, C>(&self, interval: Duration, shutdown: F, mut on_result: C)
    where
        F: Future<Output = ()>,
        C: FnMut(&ScreenerResult),
    {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        info!(
            source = self.source.name(),
            interval_secs = interval.as_secs(),
            "Screener refresh loop started"
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!(source = self.source.name(), "Screener refresh loop stopping");
                    break;
                }
                _ = ticker.tick() => {
                    match self.run_once().await {
                        Ok(result) => {
                            debug!(summary = %result.summary(), "Refresh complete");
                            on_result(&result);
                        }
                        // Already logged by run_once; keep the last good result.
                        Err(_) => continue,
                    }
                }
            }
        }

        self.status.write().await.state = SchedulerState::Stopped;
    }

    /// Refresh on `interval` until Ctrl-C.
    pub async fn run_forever<C>(&self, interval: Duration, on_result: C)
    where
        C: FnMut(&ScreenerResult),
    {
        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        };
        self.run_until(interval, shutdown, on_result).await;
    }
}

/// Whether any error in the chain is an upstream failure.
fn is_upstream(err: &anyhow::Error) -> bool {
    err.chain()
        .any(|cause| cause.downcast_ref::<RadarError>().is_some_and(RadarError::is_upstream))
}

// ============================================================================
// Tests
// ============================================================================
