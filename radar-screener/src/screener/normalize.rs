//! Feature extraction and standardization for clustering input.
//!
//! Each feature is rescaled independently to zero mean and unit population
//! variance across the candidate set. A feature with no spread contributes a
//! constant 0.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use super::config::ScoringProfile;
use super::scoring::ScoredInstrument;

/// A numeric column fed to the clusterer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Feature {
    ChangePct,
    Volume,
    Rank,
    Score,
}

impl Feature {
    /// Feature set of a scoring profile, in column order.
    pub fn for_profile(profile: ScoringProfile) -> &'static [Feature] {
        match profile {
            ScoringProfile::Ranked => &[Self::ChangePct, Self::Volume, Self::Rank, Self::Score],
            ScoringProfile::Unranked => &[Self::ChangePct, Self::Volume, Self::Score],
        }
    }

    /// Raw value of this feature, `None` when the instrument lacks it.
    fn value(self, row: &ScoredInstrument) -> Option<f64> {
        match self {
            Self::ChangePct => Some(row.snapshot.change_pct),
            Self::Volume => Some(row.snapshot.volume),
            Self::Rank => row.snapshot.rank.map(f64::from),
            Self::Score => Some(row.score),
        }
    }
}

/// Standardized feature matrix, one row per instrument.
#[derive(Debug, Clone)]
pub struct StandardizedFeatures {
    pub features: Vec<Feature>,
    /// `matrix[[i, j]]` is feature `j` of instrument `i`
    pub matrix: Array2<f64>,
    /// Column means used for centering
    pub means: Vec<f64>,
    /// Column population standard deviations; 0 marks a constant column
    pub std_devs: Vec<f64>,
}

impl StandardizedFeatures {
    pub fn dimensions(&self) -> usize {
        self.features.len()
    }

    /// Mean of the per-column variances after scaling.
    ///
    /// Constant columns contribute 0, scaled columns contribute 1.
    pub fn mean_variance(&self) -> f64 {
        if self.features.is_empty() {
            return 0.0;
        }
        let scaled = self.std_devs.iter().filter(|s| **s > 0.0).count();
        scaled as f64 / self.features.len() as f64
    }
}

/// Builds and standardizes the clustering feature matrix.
#[derive(Debug, Clone)]
pub struct FeatureNormalizer {
    features: &'static [Feature],
}

impl FeatureNormalizer {
    pub fn new(profile: ScoringProfile) -> Self {
        Self {
            features: Feature::for_profile(profile),
        }
    }

    pub fn features(&self) -> &[Feature] {
        self.features
    }

    /// Extract one column, imputing missing values with the column mean.
    fn column(&self, feature: Feature, rows: &[ScoredInstrument]) -> Vec<f64> {
        let values: Vec<Option<f64>> = rows.iter().map(|r| feature.value(r)).collect();
        let present: Vec<f64> = values.iter().flatten().copied().collect();
        let fill = if present.is_empty() {
            0.0
        } else {
            present.iter().mean()
        };
        values.into_iter().map(|v| v.unwrap_or(fill)).collect()
    }

    /// Standardize the profile's features over `rows`.
    pub fn fit_transform(&self, rows: &[ScoredInstrument]) -> StandardizedFeatures {
        let mut matrix = Array2::zeros((rows.len(), self.features.len()));
        let mut means = Vec::with_capacity(self.features.len());
        let mut std_devs = Vec::with_capacity(self.features.len());

        for (j, feature) in self.features.iter().enumerate() {
            let column = self.column(*feature, rows);
            let (mean, std_dev) = column_moments(&column);

            for (out, value) in matrix.column_mut(j).iter_mut().zip(&column) {
                *out = if std_dev > 0.0 {
                    (value - mean) / std_dev
                } else {
                    0.0
                };
            }

            means.push(mean);
            std_devs.push(std_dev);
        }

        StandardizedFeatures {
            features: self.features.to_vec(),
            matrix,
            means,
            std_devs,
        }
    }
}

/// Population mean and standard deviation of a column.
///
/// A spread indistinguishable from rounding noise is reported as 0.
fn column_moments(column: &[f64]) -> (f64, f64) {
    if column.is_empty() {
        return (0.0, 0.0);
    }

    let mean = column.iter().mean();
    let std_dev = column.iter().population_std_dev();
    let noise_floor = 10.0 * f64::EPSILON * mean.abs().max(1.0);

    if !std_dev.is_finite() || std_dev <= noise_floor {
        (mean, 0.0)
    } else {
        (mean, std_dev)
    }
}
