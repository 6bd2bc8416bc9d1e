//! Composite momentum score.
//!
//! `score = change_pct * w_change + volume_score * w_volume + rank_score * w_rank`
//! where `volume_score` is the volume divided by the batch maximum and
//! `rank_score` is the reciprocal rank.

use serde::{Deserialize, Serialize};

use crate::data::InstrumentSnapshot;

use super::config::ScoringWeights;

/// A snapshot with its score components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredInstrument {
    #[serde(flatten)]
    pub snapshot: InstrumentSnapshot,
    /// Volume divided by the batch maximum, in [0, 1]
    pub volume_score: f64,
    /// `1 / rank`, or 0 without a rank
    pub rank_score: f64,
    pub score: f64,
}

/// Scores a batch of snapshots with fixed weights.
#[derive(Debug, Clone, Copy)]
pub struct ScoreEngine {
    weights: ScoringWeights,
}

impl ScoreEngine {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> ScoringWeights {
        self.weights
    }

    /// Score every snapshot of the batch, preserving batch order.
    pub fn score_batch(&self, snapshots: &[InstrumentSnapshot]) -> Vec<ScoredInstrument> {
        let max_volume = snapshots.iter().map(|s| s.volume).fold(0.0_f64, f64::max);

        snapshots
            .iter()
            .map(|snapshot| {
                let volume_score = if max_volume > 0.0 {
                    snapshot.volume / max_volume
                } else {
                    0.0
                };
                let rank_score = snapshot.rank.map_or(0.0, |r| 1.0 / f64::from(r));

                ScoredInstrument {
                    snapshot: snapshot.clone(),
                    volume_score,
                    rank_score,
                    score: self.combine(snapshot.change_pct, volume_score, rank_score),
                }
            })
            .collect()
    }

    fn combine(&self, change_pct: f64, volume_score: f64, rank_score: f64) -> f64 {
        change_pct * self.weights.change
            + volume_score * self.weights.volume
            + rank_score * self.weights.rank
    }
}
