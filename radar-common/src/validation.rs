//! Configuration validation.
//!
//! Every section is checked before any snapshot is processed. Errors name
//! the offending field so they can be shown to the operator as-is.

use std::collections::HashSet;
use thiserror::Error;

use crate::config::{Config, DataConfig, ObservabilityConfig, UniverseConfig};

/// Configuration validation error.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Configuration conflict: {reason}")]
    Conflict { reason: String },

    #[error("Multiple validation errors: {0:?}")]
    Multiple(Vec<ValidationError>),
}

impl ValidationError {
    /// Shorthand for an `InvalidValue` error.
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Field names referenced by this error.
    pub fn fields(&self) -> Vec<&str> {
        match self {
            Self::MissingField { field } | Self::InvalidValue { field, .. } => vec![field],
            Self::Conflict { .. } => Vec::new(),
            Self::Multiple(errors) => errors.iter().flat_map(|e| e.fields()).collect(),
        }
    }
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Trait for validatable configuration sections.
pub trait Validate {
    /// Validate this configuration section.
    fn validate(&self) -> ValidationResult<()>;
}

/// Collapse a list of errors into a single result.
pub fn collect_errors(mut errors: Vec<ValidationError>) -> ValidationResult<()> {
    if errors.is_empty() {
        Ok(())
    } else if errors.len() == 1 {
        Err(errors.remove(0))
    } else {
        Err(ValidationError::Multiple(errors))
    }
}

impl Validate for Config {
    fn validate(&self) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = self.observability.validate() {
            errors.push(e);
        }

        if let Err(e) = self.data.validate() {
            errors.push(e);
        }

        for (idx, universe) in self.universes.iter().enumerate() {
            if let Err(e) = validate_universe(idx, universe) {
                errors.push(e);
            }
        }

        let mut seen = HashSet::new();
        for universe in &self.universes {
            if !seen.insert(universe.name.to_lowercase()) {
                errors.push(ValidationError::Conflict {
                    reason: format!("universe '{}' is defined more than once", universe.name),
                });
            }
        }

        collect_errors(errors)
    }
}

impl Config {
    /// Load and validate configuration.
    pub fn load_and_validate(path: Option<&std::path::Path>) -> anyhow::Result<Self> {
        let config = Self::load_with_env(path)?;
        config.validate().map_err(|e| anyhow::anyhow!("{}", e))?;
        Ok(config)
    }
}

impl Validate for ObservabilityConfig {
    fn validate(&self) -> ValidationResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ValidationError::invalid(
                "observability.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.log_format.to_lowercase().as_str()) {
            return Err(ValidationError::invalid(
                "observability.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        Ok(())
    }
}

impl Validate for DataConfig {
    fn validate(&self) -> ValidationResult<()> {
        if self.snapshot_dir.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "data.snapshot_dir".into(),
            });
        }

        if self.refresh_interval_secs == 0 {
            return Err(ValidationError::invalid(
                "data.refresh_interval_secs",
                "must be greater than 0",
            ));
        }

        Ok(())
    }
}

/// Host-level checks for one universe entry. Screener option ranges are
/// checked by the screener crate once profile defaults are resolved.
fn validate_universe(idx: usize, universe: &UniverseConfig) -> ValidationResult<()> {
    let prefix = format!("universes[{}]", idx);

    if universe.name.trim().is_empty() {
        return Err(ValidationError::MissingField {
            field: format!("{}.name", prefix),
        });
    }

    if universe.source.trim().is_empty() {
        return Err(ValidationError::MissingField {
            field: format!("{}.source", prefix),
        });
    }

    if let Some(profile) = &universe.profile {
        if !matches!(profile.to_lowercase().as_str(), "ranked" | "unranked") {
            return Err(ValidationError::invalid(
                format!("{}.profile", prefix),
                "must be one of: ranked, unranked",
            ));
        }
    }

    if let Some(ttl) = universe.cache_ttl_secs {
        if ttl <= 0 {
            return Err(ValidationError::invalid(
                format!("{}.cache_ttl_secs", prefix),
                "must be greater than 0",
            ));
        }
    }

    if universe.display_limit == Some(0) {
        return Err(ValidationError::invalid(
            format!("{}.display_limit", prefix),
            "must be greater than 0",
        ));
    }

    Ok(())
}
