//! Momentum clustering.
//!
//! Candidates are partitioned with k-means over standardized features. The
//! clusters carry no meaning of their own: the cluster with the highest mean
//! score is designated "momentum" after the fact, ties going to the lowest
//! cluster id.
//!
//! # Algorithm
//!
//! ```text
//! candidates ──▶ FeatureNormalizer ──▶ Array2 ──▶ linfa KMeans (k-means++, n_init runs)
//!                                                     ▲
//!                                            StdRng(random_seed)
//!                                                     │
//!            labels ◀── mean score per cluster ◀── canonical ids
//! ```

use linfa::traits::{Fit, Predict};
use linfa::DatasetBase;
use linfa_clustering::KMeans as LinfaKMeans;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::config::ScreenerConfig;
use super::normalize::FeatureNormalizer;
use super::scoring::ScoredInstrument;

/// Relative tolerance on centroid movement, scaled by the data variance.
const RELATIVE_TOLERANCE: f64 = 1e-4;

// ============================================================================
// Labels
// ============================================================================

/// Heuristic label of a screened instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    /// Member of the highest mean-score cluster
    Momentum,
    /// Member of any other cluster
    Neutral,
    /// Too few candidates to cluster
    InsufficientData,
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Momentum => write!(f, "Momentum"),
            Self::Neutral => write!(f, "Neutral"),
            Self::InsufficientData => write!(f, "Insufficient data"),
        }
    }
}

/// A scored candidate with its cluster and label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterAssignment {
    #[serde(flatten)]
    pub scored: ScoredInstrument,
    /// Present only when clustering ran
    pub cluster_id: Option<usize>,
    pub label: Label,
}

impl ClusterAssignment {
    pub fn symbol(&self) -> &str {
        &self.scored.snapshot.symbol
    }

    pub fn score(&self) -> f64 {
        self.scored.score
    }

    pub fn is_momentum(&self) -> bool {
        self.label == Label::Momentum
    }
}

// ============================================================================
// K-Means
// ============================================================================

/// Outcome of one k-means fit.
#[derive(Debug, Clone)]
pub struct KMeansFit {
    /// Cluster index per point
    pub labels: Vec<usize>,
    /// One centroid per row
    pub centroids: Array2<f64>,
    /// Sum of squared distances of points to their centroid
    pub inertia: f64,
}

impl KMeansFit {
    pub fn cluster_count(&self) -> usize {
        self.centroids.nrows()
    }
}

/// Seeded k-means over a feature matrix, backed by `linfa-clustering`.
#[derive(Debug, Clone)]
pub struct KMeans {
    k: usize,
    n_init: usize,
    max_iterations: usize,
    seed: u64,
}

impl KMeans {
    pub fn new(k: usize, n_init: usize, max_iterations: usize, seed: u64) -> Self {
        Self {
            k: k.max(1),
            n_init: n_init.max(1),
            max_iterations: max_iterations.max(1),
            seed,
        }
    }

    /// Fit `points` (one row per instrument), keeping the lowest-inertia run
    /// out of `n_init`.
    ///
    /// `k` is clamped to the number of distinct points. Cluster ids of the
    /// result are numbered by first appearance in `points`.
    pub fn fit(&self, points: ArrayView2<'_, f64>, mean_variance: f64) -> KMeansFit {
        if points.nrows() == 0 {
            return KMeansFit {
                labels: Vec::new(),
                centroids: Array2::zeros((0, points.ncols())),
                inertia: 0.0,
            };
        }

        let k = self.k.min(distinct_rows(points));
        if k == 1 {
            return single_cluster(points);
        }

        let tolerance = (RELATIVE_TOLERANCE * mean_variance).max(f64::EPSILON);
        let dataset = DatasetBase::from(points.to_owned());

        let fitted = LinfaKMeans::params_with_rng(k, StdRng::seed_from_u64(self.seed))
            .n_runs(self.n_init)
            .max_n_iterations(self.max_iterations as u64)
            .tolerance(tolerance)
            .fit(&dataset);

        let model = match fitted {
            Ok(model) => model,
            Err(e) => {
                warn!(error = %e, k, "k-means fit failed, falling back to one cluster");
                return single_cluster(points);
            }
        };

        let labels: Array1<usize> = model.predict(dataset.records());
        let labels = labels.to_vec();
        let centroids = model.centroids().to_owned();
        let inertia = inertia(points, &labels, &centroids);
        debug!(k, inertia, "k-means fit");

        canonicalize(KMeansFit {
            labels,
            centroids,
            inertia,
        })
    }
}

fn distinct_rows(points: ArrayView2<'_, f64>) -> usize {
    let mut seen: Vec<ArrayView1<'_, f64>> = Vec::new();
    for row in points.outer_iter() {
        if !seen.iter().any(|s| *s == row) {
            seen.push(row);
        }
    }
    seen.len()
}

fn inertia(points: ArrayView2<'_, f64>, labels: &[usize], centroids: &Array2<f64>) -> f64 {
    points
        .outer_iter()
        .zip(labels)
        .map(|(point, label)| {
            let diff = &point - &centroids.row(*label);
            diff.dot(&diff)
        })
        .sum()
}

/// Every point in cluster 0 around the column means.
fn single_cluster(points: ArrayView2<'_, f64>) -> KMeansFit {
    let centroid = points
        .mean_axis(Axis(0))
        .unwrap_or_else(|| Array1::zeros(points.ncols()));
    let centroids = centroid.insert_axis(Axis(0));
    let labels = vec![0; points.nrows()];
    let inertia = inertia(points, &labels, &centroids);

    KMeansFit {
        labels,
        centroids,
        inertia,
    }
}

/// Renumber clusters by first appearance so ids do not depend on seeding order.
fn canonicalize(fit: KMeansFit) -> KMeansFit {
    let k = fit.cluster_count();
    let mut mapping: Vec<Option<usize>> = vec![None; k];
    let mut next = 0;

    for label in &fit.labels {
        if mapping[*label].is_none() {
            mapping[*label] = Some(next);
            next += 1;
        }
    }
    for slot in mapping.iter_mut() {
        if slot.is_none() {
            *slot = Some(next);
            next += 1;
        }
    }

    let mapping: Vec<usize> = mapping.into_iter().flatten().collect();
    let mut centroids = Array2::zeros(fit.centroids.raw_dim());
    for (old, centroid) in fit.centroids.outer_iter().enumerate() {
        centroids.row_mut(mapping[old]).assign(&centroid);
    }

    KMeansFit {
        labels: fit.labels.iter().map(|l| mapping[*l]).collect(),
        centroids,
        inertia: fit.inertia,
    }
}

// ============================================================================
// Momentum Clusterer
// ============================================================================

/// Size and mean score of one cluster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterStats {
    pub cluster_id: usize,
    pub size: usize,
    pub mean_score: f64,
}

/// What the clusterer did with a candidate set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusteringSummary {
    /// Non-empty clusters, ordered by id
    pub clusters: Vec<ClusterStats>,
    pub momentum_cluster: usize,
    pub inertia: f64,
}

/// Labels candidates as momentum or neutral.
#[derive(Debug, Clone)]
pub struct MomentumClusterer {
    normalizer: FeatureNormalizer,
    kmeans: KMeans,
    min_cluster_sample: usize,
}

impl MomentumClusterer {
    pub fn new(config: &ScreenerConfig) -> Self {
        Self {
            normalizer: FeatureNormalizer::new(config.profile),
            kmeans: KMeans::new(
                config.cluster_count,
                config.n_init,
                config.max_iterations,
                config.random_seed,
            ),
            min_cluster_sample: config.min_cluster_sample,
        }
    }

    /// Whether `count` candidates are enough to cluster.
    pub fn can_cluster(&self, count: usize) -> bool {
        count >= self.min_cluster_sample
    }

    /// Label the candidates, preserving their order.
    pub fn label(&self, candidates: Vec<ScoredInstrument>) -> (Vec<ClusterAssignment>, Option<ClusteringSummary>) {
        if candidates.is_empty() || !self.can_cluster(candidates.len()) {
            let rows = candidates
                .into_iter()
                .map(|scored| ClusterAssignment {
                    scored,
                    cluster_id: None,
                    label: Label::InsufficientData,
                })
                .collect();
            return (rows, None);
        }

        let features = self.normalizer.fit_transform(&candidates);
        let fit = self.kmeans.fit(features.matrix.view(), features.mean_variance());

        let clusters = cluster_stats(&candidates, &fit.labels, fit.cluster_count());
        let momentum_cluster = select_momentum_cluster(&clusters);

        debug!(
            candidates = candidates.len(),
            clusters = clusters.len(),
            momentum_cluster,
            inertia = fit.inertia,
            "Clustering complete"
        );

        let rows = candidates
            .into_iter()
            .zip(&fit.labels)
            .map(|(scored, cluster)| ClusterAssignment {
                scored,
                cluster_id: Some(*cluster),
                label: if *cluster == momentum_cluster {
                    Label::Momentum
                } else {
                    Label::Neutral
                },
            })
            .collect();

        let summary = ClusteringSummary {
            clusters,
            momentum_cluster,
            inertia: fit.inertia,
        };
        (rows, Some(summary))
    }
}

fn cluster_stats(rows: &[ScoredInstrument], labels: &[usize], k: usize) -> Vec<ClusterStats> {
    let mut sums = vec![0.0; k];
    let mut sizes = vec![0usize; k];
    for (row, label) in rows.iter().zip(labels) {
        sums[*label] += row.score;
        sizes[*label] += 1;
    }

    (0..k)
        .filter(|id| sizes[*id] > 0)
        .map(|id| ClusterStats {
            cluster_id: id,
            size: sizes[id],
            mean_score: sums[id] / sizes[id] as f64,
        })
        .collect()
}

/// Highest mean score wins; on a tie the lowest cluster id wins.
pub fn select_momentum_cluster(clusters: &[ClusterStats]) -> usize {
    let mut ordered: Vec<&ClusterStats> = clusters.iter().collect();
    ordered.sort_by_key(|c| c.cluster_id);

    let mut best: Option<&ClusterStats> = None;
    for stats in ordered {
        match best {
            Some(b) if stats.mean_score <= b.mean_score => {}
            _ => best = Some(stats),
        }
    }
    best.map_or(0, |b| b.cluster_id)
}

// ============================================================================
// Tests
// ============================================================================
