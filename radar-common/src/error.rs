//! Error types for the Market Radar workspace.

use thiserror::Error;

/// Result type alias using the radar error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for radar crates.
#[derive(Error, Debug)]
pub enum Error {
    /// Snapshot document has the wrong shape
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Upstream market data source failed or is unreachable
    #[error("External service error: {0}")]
    External(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create an error with additional context.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Check if this error came from an upstream data source.
    pub fn is_upstream(&self) -> bool {
        match self {
            Self::External(_) => true,
            Self::WithContext { source, .. } => source.is_upstream(),
            _ => false,
        }
    }
}

/// Extension trait for adding context to any error type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_context(context))
    }
}
