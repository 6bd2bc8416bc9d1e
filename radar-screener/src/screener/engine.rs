//! Screener engine module.
//!
//! Runs one batch of raw records through the whole pipeline:
//! validate → score → filter → cluster/label → alerts.

use chrono::{DateTime, Utc};
use radar_common::validation::{Validate, ValidationResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::data::{InstrumentSnapshot, RawRecord};

use super::alert::{AlertEvaluator, AlertSet};
use super::cluster::{ClusterAssignment, ClusteringSummary, Label, MomentumClusterer};
use super::config::ScreenerConfig;
use super::filter::{CandidateFilter, FilterResult, FilterStage};
use super::scoring::ScoreEngine;

// ============================================================================
// Screener Result
// ============================================================================

/// Result of one screener run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenerResult {
    /// Run ID (timestamp-based)
    pub id: String,
    /// Universe the batch came from, when known
    pub universe: Option<String>,
    /// Candidates sorted by score descending, with their labels
    pub rows: Vec<ClusterAssignment>,
    /// Threshold alerts, when an alert score is configured
    pub alerts: Option<AlertSet>,
    /// Funnel: input, validation, volume floor, change floor
    pub filter_results: Vec<FilterResult>,
    /// What clustering found; `None` when it was skipped
    pub clustering: Option<ClusteringSummary>,
    /// Raw records received
    pub total_records: usize,
    /// Configuration used
    pub config_summary: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_secs: f64,
}

impl ScreenerResult {
    /// Rows labeled momentum, in score order.
    pub fn momentum(&self) -> Vec<&ClusterAssignment> {
        self.rows.iter().filter(|r| r.is_momentum()).collect()
    }

    /// Get the top N rows by score.
    pub fn top(&self, n: usize) -> Vec<&ClusterAssignment> {
        self.rows.iter().take(n).collect()
    }

    /// Rows carrying a given label.
    pub fn by_label(&self, label: Label) -> Vec<&ClusterAssignment> {
        self.rows.iter().filter(|r| r.label == label).collect()
    }

    /// Whether clustering ran for this batch.
    pub fn was_clustered(&self) -> bool {
        self.clustering.is_some()
    }

    /// Summary string for logging.
    pub fn summary(&self) -> String {
        let momentum = self.momentum().len();
        let alerts = self.alerts.as_ref().map_or(0, AlertSet::len);
        format!(
            "Screened {} records in {:.3}s: {} candidates, {} momentum, {} alerts",
            self.total_records,
            self.duration_secs,
            self.rows.len(),
            momentum,
            alerts
        )
    }
}

// ============================================================================
// Screener Pipeline
// ============================================================================

/// The screener pipeline.
///
/// Holds no mutable state, so one pipeline can serve any number of batches
/// and be shared between tasks.
#[derive(Debug, Clone)]
pub struct ScreenerPipeline {
    config: ScreenerConfig,
    universe: Option<String>,
    scorer: ScoreEngine,
    filter: CandidateFilter,
    clusterer: MomentumClusterer,
    alerts: Option<AlertEvaluator>,
}

impl ScreenerPipeline {
    /// Create a pipeline; the configuration is validated first.
    pub fn new(config: ScreenerConfig) -> ValidationResult<Self> {
        config.validate()?;

        Ok(Self {
            scorer: ScoreEngine::new(config.weights),
            filter: CandidateFilter::new(config.min_volume, config.min_change),
            clusterer: MomentumClusterer::new(&config),
            alerts: config.alert_min_score.map(AlertEvaluator::new),
            universe: None,
            config,
        })
    }

    /// Tag results with the universe name.
    pub fn with_universe(mut self, universe: impl Into<String>) -> Self {
        self.universe = Some(universe.into());
        self
    }

    pub fn config(&self) -> &ScreenerConfig {
        &self.config
    }

    pub fn universe(&self) -> Option<&str> {
        self.universe.as_deref()
    }

    /// Run the pipeline over raw records.
    ///
    /// Malformed records are dropped one by one with a warning.
    pub fn run(&self, records: &[RawRecord]) -> ScreenerResult {
        let started_at = Utc::now();

        let snapshots: Vec<InstrumentSnapshot> = records
            .iter()
            .filter_map(|raw| match InstrumentSnapshot::try_from(raw) {
                Ok(snapshot) => Some(snapshot),
                Err(e) => {
                    warn!(error = %e, "Dropping malformed record");
                    None
                }
            })
            .collect();

        let funnel = vec![
            FilterResult::new(FilterStage::Input, records.len(), records.len()),
            FilterResult::new(FilterStage::Validation, records.len(), snapshots.len()),
        ];

        self.execute(started_at, records.len(), &snapshots, funnel)
    }

    /// Run the pipeline over already validated snapshots.
    pub fn run_snapshots(&self, snapshots: &[InstrumentSnapshot]) -> ScreenerResult {
        let started_at = Utc::now();
        let funnel = vec![
            FilterResult::new(FilterStage::Input, snapshots.len(), snapshots.len()),
            FilterResult::new(FilterStage::Validation, snapshots.len(), snapshots.len()),
        ];
        self.execute(started_at, snapshots.len(), snapshots, funnel)
    }

    fn execute(
        &self,
        started_at: DateTime<Utc>,
        total_records: usize,
        snapshots: &[InstrumentSnapshot],
        mut filter_results: Vec<FilterResult>,
    ) -> ScreenerResult {
        let id = format!("scan_{}", started_at.format("%Y%m%d_%H%M%S%3f"));
        debug!(
            scan_id = %id,
            universe = self.universe.as_deref().unwrap_or("-"),
            records = total_records,
            valid = snapshots.len(),
            "Starting screener run"
        );

        // Phase 1: score the whole valid batch
        let scored = self.scorer.score_batch(snapshots);

        // Phase 2: floors and ranking
        let (candidates, floor_results) = self.filter.apply(&scored);
        filter_results.extend(floor_results);
        debug!(candidates = candidates.len(), "Filtering complete");

        // Phase 3: alerts read the same candidate set as clustering
        let alerts = self.alerts.map(|evaluator| evaluator.evaluate(&candidates));

        // Phase 4: cluster and label, or mark the batch as too small
        let (rows, clustering) = self.clusterer.label(candidates);

        let completed_at = Utc::now();
        let duration_secs = (completed_at - started_at).num_milliseconds() as f64 / 1000.0;

        let result = ScreenerResult {
            id,
            universe: self.universe.clone(),
            rows,
            alerts,
            filter_results,
            clustering,
            total_records,
            config_summary: self.config.summary(),
            started_at,
            completed_at,
            duration_secs,
        };

        info!(
            scan_id = %result.id,
            universe = result.universe.as_deref().unwrap_or("-"),
            candidates = result.rows.len(),
            momentum = result.momentum().len(),
            clustered = result.was_clustered(),
            "Screener run complete"
        );

        result
    }
}

// ============================================================================
// Tests
// ============================================================================
