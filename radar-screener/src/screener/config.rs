//! Screener configuration module.
//!
//! Defines the options of one pipeline run and resolves them from a
//! configured universe, filling gaps with the scoring profile's defaults.

use radar_common::config::UniverseConfig;
use radar_common::validation::{collect_errors, Validate, ValidationError, ValidationResult};
use serde::{Deserialize, Serialize};

// ============================================================================
// Scoring Profile
// ============================================================================

/// Which score formula and clustering feature set apply to a universe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoringProfile {
    /// Universes with a market-cap rank (e.g. crypto)
    Ranked,
    /// Universes without a rank concept (e.g. equities)
    Unranked,
}

impl ScoringProfile {
    /// Default score weights for this profile.
    pub fn default_weights(self) -> ScoringWeights {
        match self {
            Self::Ranked => ScoringWeights {
                change: 0.5,
                volume: 30.0,
                rank: 10.0,
            },
            Self::Unranked => ScoringWeights {
                change: 0.6,
                volume: 40.0,
                rank: 0.0,
            },
        }
    }
}

impl std::fmt::Display for ScoringProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ranked => write!(f, "ranked"),
            Self::Unranked => write!(f, "unranked"),
        }
    }
}

impl std::str::FromStr for ScoringProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ranked" => Ok(Self::Ranked),
            "unranked" => Ok(Self::Unranked),
            _ => Err(format!("Unknown scoring profile: {}", s)),
        }
    }
}

/// Weights of the linear score combination.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    /// Multiplier for the change percentage
    pub change: f64,
    /// Multiplier for the batch-normalized volume
    pub volume: f64,
    /// Multiplier for the reciprocal rank
    pub rank: f64,
}

// ============================================================================
// Screener Configuration
// ============================================================================

/// Options for one screener pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenerConfig {
    /// Scoring profile
    pub profile: ScoringProfile,

    /// Score weights (defaults to the profile's weights)
    pub weights: ScoringWeights,

    /// Exclusive volume floor
    pub min_volume: f64,

    /// Inclusive change floor (%)
    pub min_change: f64,

    /// Number of clusters
    pub cluster_count: usize,

    /// Minimum candidates before clustering runs
    pub min_cluster_sample: usize,

    /// Seed for cluster initialization
    pub random_seed: u64,

    /// Number of clustering restarts; the lowest-inertia run wins
    pub n_init: usize,

    /// Iteration cap per restart
    pub max_iterations: usize,

    /// Score threshold for alerts (alerts disabled when unset)
    pub alert_min_score: Option<f64>,
}

impl ScreenerConfig {
    /// Default options for a profile.
    pub fn for_profile(profile: ScoringProfile) -> Self {
        Self {
            profile,
            weights: profile.default_weights(),
            min_volume: default_min_volume(),
            min_change: default_min_change(),
            cluster_count: default_cluster_count(),
            min_cluster_sample: default_min_cluster_sample(),
            random_seed: default_random_seed(),
            n_init: default_n_init(),
            max_iterations: default_max_iterations(),
            alert_min_score: None,
        }
    }

    /// Resolve options from a configured universe.
    ///
    /// The result is validated before it is returned.
    pub fn from_universe(universe: &UniverseConfig) -> ValidationResult<Self> {
        let profile = match universe.profile.as_deref() {
            Some(p) => p.parse::<ScoringProfile>().map_err(|reason| {
                ValidationError::invalid(format!("{}.profile", universe.name), reason)
            })?,
            None => ScoringProfile::Ranked,
        };

        let mut config = Self::for_profile(profile);
        if let Some(weights) = &universe.weights {
            config.weights.change = weights.change.unwrap_or(config.weights.change);
            config.weights.volume = weights.volume.unwrap_or(config.weights.volume);
            config.weights.rank = weights.rank.unwrap_or(config.weights.rank);
        }
        config.min_volume = universe.min_volume.unwrap_or(config.min_volume);
        config.min_change = universe.min_change.unwrap_or(config.min_change);
        config.cluster_count = universe.cluster_count.unwrap_or(config.cluster_count);
        config.min_cluster_sample = universe
            .min_cluster_sample
            .unwrap_or(config.min_cluster_sample);
        config.random_seed = universe.random_seed.unwrap_or(config.random_seed);
        config.n_init = universe.n_init.unwrap_or(config.n_init);
        config.max_iterations = universe.max_iterations.unwrap_or(config.max_iterations);
        config.alert_min_score = universe.alert_min_score;

        config.validate()?;
        Ok(config)
    }

    /// Builder-style setter for the filter floors.
    pub fn with_floors(mut self, min_volume: f64, min_change: f64) -> Self {
        self.min_volume = min_volume;
        self.min_change = min_change;
        self
    }

    /// Builder-style setter for the alert threshold.
    pub fn with_alert_min_score(mut self, min_score: f64) -> Self {
        self.alert_min_score = Some(min_score);
        self
    }

    /// One-line summary for logs and reports.
    pub fn summary(&self) -> String {
        format!(
            "profile={}, volume>{}, change>={}%, k={}",
            self.profile, self.min_volume, self.min_change, self.cluster_count
        )
    }
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self::for_profile(ScoringProfile::Ranked)
    }
}

fn default_min_volume() -> f64 {
    50_000_000.0
}

fn default_min_change() -> f64 {
    2.0
}

fn default_cluster_count() -> usize {
    3
}

fn default_min_cluster_sample() -> usize {
    3
}

fn default_random_seed() -> u64 {
    42
}

fn default_n_init() -> usize {
    10
}

fn default_max_iterations() -> usize {
    300
}

impl Validate for ScreenerConfig {
    fn validate(&self) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if !self.min_volume.is_finite() || self.min_volume < 0.0 {
            errors.push(ValidationError::invalid(
                "min_volume",
                format!("must be a finite number >= 0, got {}", self.min_volume),
            ));
        }

        if !self.min_change.is_finite() {
            errors.push(ValidationError::invalid(
                "min_change",
                "must be a finite number",
            ));
        }

        for (field, value) in [
            ("weights.change", self.weights.change),
            ("weights.volume", self.weights.volume),
            ("weights.rank", self.weights.rank),
        ] {
            if !value.is_finite() {
                errors.push(ValidationError::invalid(field, "must be a finite number"));
            }
        }

        for (field, value) in [
            ("cluster_count", self.cluster_count),
            ("min_cluster_sample", self.min_cluster_sample),
            ("n_init", self.n_init),
            ("max_iterations", self.max_iterations),
        ] {
            if value < 1 {
                errors.push(ValidationError::invalid(field, "must be at least 1"));
            }
        }

        if let Some(min_score) = self.alert_min_score {
            if !min_score.is_finite() {
                errors.push(ValidationError::invalid(
                    "alert_min_score",
                    "must be a finite number",
                ));
            }
        }

        collect_errors(errors)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use radar_common::config::WeightsConfig;

    #[test]
    fn test_default_config() {
        let config = ScreenerConfig::default();
        assert_eq!(config.profile, ScoringProfile::Ranked);
        assert!((config.min_volume - 50_000_000.0).abs() < 0.001);
        assert!((config.min_change - 2.0).abs() < 0.001);
        assert_eq!(config.cluster_count, 3);
        assert_eq!(config.min_cluster_sample, 3);
        assert_eq!(config.random_seed, 42);
        assert_eq!(config.n_init, 10);
        assert!(config.alert_min_score.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_profile_weights() {
        let ranked = ScoringProfile::Ranked.default_weights();
        assert!((ranked.change - 0.5).abs() < 1e-12);
        assert!((ranked.volume - 30.0).abs() < 1e-12);
        assert!((ranked.rank - 10.0).abs() < 1e-12);

        let unranked = ScoringProfile::Unranked.default_weights();
        assert!((unranked.change - 0.6).abs() < 1e-12);
        assert!((unranked.volume - 40.0).abs() < 1e-12);
        assert_eq!(unranked.rank, 0.0);
    }

    #[test]
    fn test_profile_parse() {
        assert_eq!("Ranked".parse::<ScoringProfile>(), Ok(ScoringProfile::Ranked));
        assert_eq!("unranked".parse::<ScoringProfile>(), Ok(ScoringProfile::Unranked));
        assert!("flat".parse::<ScoringProfile>().is_err());
    }

    #[test]
    fn test_negative_min_volume_rejected() {
        let config = ScreenerConfig::default().with_floors(-1.0, 2.0);
        let err = config.validate().unwrap_err();
        assert_eq!(err.fields(), vec!["min_volume"]);
    }

    #[test]
    fn test_zero_cluster_count_rejected() {
        let mut config = ScreenerConfig::default();
        config.cluster_count = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("cluster_count"));
    }

    #[test]
    fn test_multiple_invalid_fields_reported() {
        let mut config = ScreenerConfig::default();
        config.min_change = f64::NAN;
        config.n_init = 0;
        let err = config.validate().unwrap_err();
        assert_eq!(err.fields(), vec!["min_change", "n_init"]);
    }

    #[test]
    fn test_from_universe_applies_overrides() {
        let universe = UniverseConfig {
            name: "us_stocks".into(),
            source: "us_stocks.json".into(),
            profile: Some("unranked".into()),
            min_volume: Some(0.0),
            min_change: Some(-100.0),
            alert_min_score: Some(35.0),
            weights: Some(WeightsConfig {
                volume: Some(25.0),
                ..Default::default()
            }),
            ..Default::default()
        };

        let config = ScreenerConfig::from_universe(&universe).unwrap();
        assert_eq!(config.profile, ScoringProfile::Unranked);
        assert!((config.weights.volume - 25.0).abs() < 1e-12);
        assert!((config.weights.change - 0.6).abs() < 1e-12);
        assert_eq!(config.min_volume, 0.0);
        assert_eq!(config.min_change, -100.0);
        assert_eq!(config.alert_min_score, Some(35.0));
        assert_eq!(config.cluster_count, 3);
    }

    #[test]
    fn test_from_universe_rejects_invalid_values() {
        let universe = UniverseConfig {
            name: "crypto".into(),
            source: "crypto.json".into(),
            min_cluster_sample: Some(0),
            ..Default::default()
        };
        let err = ScreenerConfig::from_universe(&universe).unwrap_err();
        assert_eq!(err.fields(), vec!["min_cluster_sample"]);
    }

    #[test]
    fn test_config_serialization() {
        let config = ScreenerConfig::default().with_alert_min_score(30.0);
        let json = serde_json::to_string_pretty(&config).unwrap();
        assert!(json.contains("\"profile\": \"ranked\""));

        let parsed: ScreenerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.alert_min_score, Some(30.0));
    }
}
