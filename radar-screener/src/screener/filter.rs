//! Candidate filtering for the screener.
//!
//! Two independent floors decide which scored instruments are candidates:
//! 1. Volume floor: `volume > min_volume` (exclusive)
//! 2. Change floor: `change_pct >= min_change` (inclusive)
//!
//! Survivors are ranked by score, descending, with ties kept in batch order.

use serde::{Deserialize, Serialize};

use super::scoring::ScoredInstrument;

// ============================================================================
// Filter Stage
// ============================================================================

/// Filter stage identifier for tracking where instruments are eliminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterStage {
    /// Raw records received from the source
    Input,
    /// Records that converted into complete snapshots
    Validation,
    /// Volume floor
    Volume,
    /// Change floor
    Change,
}

impl std::fmt::Display for FilterStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Input => write!(f, "Input"),
            Self::Validation => write!(f, "Validation"),
            Self::Volume => write!(f, "Volume floor"),
            Self::Change => write!(f, "Change floor"),
        }
    }
}

// ============================================================================
// Filter Result
// ============================================================================

/// Result of a filtering stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterResult {
    /// Stage name
    pub stage: FilterStage,
    /// Number of instruments that passed this stage
    pub passed: usize,
    /// Number of instruments eliminated at this stage
    pub eliminated: usize,
    /// Elimination rate (%)
    pub elimination_rate: f64,
}

impl FilterResult {
    pub fn new(stage: FilterStage, input_count: usize, passed_count: usize) -> Self {
        let eliminated = input_count.saturating_sub(passed_count);
        let elimination_rate = if input_count > 0 {
            (eliminated as f64 / input_count as f64) * 100.0
        } else {
            0.0
        };

        Self {
            stage,
            passed: passed_count,
            eliminated,
            elimination_rate,
        }
    }
}

// ============================================================================
// Candidate Filter
// ============================================================================

/// Applies the volume and change floors.
#[derive(Debug, Clone, Copy)]
pub struct CandidateFilter {
    min_volume: f64,
    min_change: f64,
}

impl CandidateFilter {
    pub fn new(min_volume: f64, min_change: f64) -> Self {
        Self {
            min_volume,
            min_change,
        }
    }

    pub fn passes_volume(&self, row: &ScoredInstrument) -> bool {
        row.snapshot.volume > self.min_volume
    }

    pub fn passes_change(&self, row: &ScoredInstrument) -> bool {
        row.snapshot.change_pct >= self.min_change
    }

    /// Filter and rank the scored batch.
    ///
    /// Returns the ranked candidates and one funnel entry per floor.
    pub fn apply(&self, scored: &[ScoredInstrument]) -> (Vec<ScoredInstrument>, Vec<FilterResult>) {
        let input_count = scored.len();

        let after_volume: Vec<&ScoredInstrument> =
            scored.iter().filter(|r| self.passes_volume(r)).collect();
        let volume_result = FilterResult::new(FilterStage::Volume, input_count, after_volume.len());

        let mut candidates: Vec<ScoredInstrument> = after_volume
            .iter()
            .filter(|r| self.passes_change(r))
            .map(|r| (*r).clone())
            .collect();
        let change_result =
            FilterResult::new(FilterStage::Change, after_volume.len(), candidates.len());

        rank_by_score(&mut candidates);

        (candidates, vec![volume_result, change_result])
    }
}

/// Sort descending by score; `sort_by` is stable so ties keep batch order.
pub fn rank_by_score(rows: &mut [ScoredInstrument]) {
    rows.sort_by(|a, b| b.score.total_cmp(&a.score));
}

// ============================================================================
// Tests
// ============================================================================
