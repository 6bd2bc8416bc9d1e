//! Hard-threshold alerts.
//!
//! Independent of clustering: an alert fires for every candidate whose score
//! reaches `min_score`, whatever its cluster label.

use serde::{Deserialize, Serialize};

use super::filter::rank_by_score;
use super::scoring::ScoredInstrument;

/// Alert subset of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertSet {
    pub min_score: f64,
    /// Sorted descending by score
    pub alerts: Vec<ScoredInstrument>,
}

impl AlertSet {
    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.alerts.iter().map(|a| a.snapshot.symbol.as_str()).collect()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AlertEvaluator {
    min_score: f64,
}

impl AlertEvaluator {
    pub fn new(min_score: f64) -> Self {
        Self { min_score }
    }

    pub fn evaluate(&self, candidates: &[ScoredInstrument]) -> AlertSet {
        let mut alerts: Vec<ScoredInstrument> = candidates
            .iter()
            .filter(|c| c.score >= self.min_score)
            .cloned()
            .collect();
        rank_by_score(&mut alerts);

        AlertSet {
            min_score: self.min_score,
            alerts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::InstrumentSnapshot;

    fn scored(symbol: &str, score: f64) -> ScoredInstrument {
        ScoredInstrument {
            snapshot: InstrumentSnapshot {
                rank: None,
                name: symbol.to_string(),
                symbol: symbol.to_string(),
                price: 1.0,
                change_pct: 0.0,
                volume: 1.0,
            },
            volume_score: 0.0,
            rank_score: 0.0,
            score,
        }
    }

    fn batch() -> Vec<ScoredInstrument> {
        vec![
            scored("A", 12.0),
            scored("B", 40.0),
            scored("C", 30.0),
            scored("D", 30.0),
        ]
    }

    #[test]
    fn test_threshold_is_inclusive_and_sorted() {
        let set = AlertEvaluator::new(30.0).evaluate(&batch());
        assert_eq!(set.symbols(), vec!["B", "C", "D"]);
        assert!(set.alerts.iter().all(|a| a.score >= 30.0));
    }

    #[test]
    fn test_raising_threshold_never_grows_subset() {
        let rows = batch();
        let mut previous = usize::MAX;
        for threshold in [0.0, 12.0, 20.0, 30.0, 35.0, 40.0, 41.0] {
            let set = AlertEvaluator::new(threshold).evaluate(&rows);
            assert!(set.len() <= previous);
            previous = set.len();
        }
        assert_eq!(previous, 0);
    }

    #[test]
    fn test_empty_input() {
        let set = AlertEvaluator::new(0.0).evaluate(&[]);
        assert!(set.is_empty());
    }
}
