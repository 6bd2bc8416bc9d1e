//! Market data module.
//!
//! Defines the row-level snapshot record, the raw record it is parsed from,
//! and the sources that supply batches of raw records.

pub mod cache;
pub mod source;

pub use cache::{CacheStats, CachedSource, SnapshotCache};
pub use source::{parse_records, JsonFileSource, SnapshotSource, StaticSource};

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Raw Record
// ============================================================================

/// A market record as delivered by an upstream source.
///
/// Every numeric field is optional; completeness is checked when the record
/// is converted into an [`InstrumentSnapshot`]. Common market-data field
/// names are accepted as aliases.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Market-cap rank (1 = largest)
    #[serde(default, alias = "market_cap_rank")]
    pub rank: Option<u32>,

    /// Display name
    #[serde(default)]
    pub name: Option<String>,

    /// Ticker symbol
    #[serde(default)]
    pub symbol: Option<String>,

    /// Current price in the reference currency
    #[serde(default, alias = "current_price", alias = "last_price", alias = "lastPrice")]
    pub price: Option<f64>,

    /// Price change over the lookback window (%)
    #[serde(default, alias = "price_change_percentage_24h")]
    pub change_pct: Option<f64>,

    /// Previous close, used to derive `change_pct` when it is missing
    #[serde(default, alias = "previousClose")]
    pub previous_close: Option<f64>,

    /// Traded volume over the lookback window
    #[serde(default, alias = "total_volume")]
    pub volume: Option<f64>,
}

impl RawRecord {
    /// Identifier used in logs for this record.
    pub fn label(&self) -> &str {
        self.symbol
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or("<unknown>")
    }

    /// Change percentage, derived from the previous close when not given.
    pub fn effective_change_pct(&self) -> Option<f64> {
        if self.change_pct.is_some() {
            return self.change_pct;
        }

        match (self.price, self.previous_close) {
            (Some(price), Some(prev)) if prev != 0.0 => Some((price - prev) / prev * 100.0),
            _ => None,
        }
    }
}

// ============================================================================
// Instrument Snapshot
// ============================================================================

/// One instrument's market data at one refresh cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentSnapshot {
    /// Market-cap rank, absent for universes without a rank concept
    pub rank: Option<u32>,
    pub name: String,
    /// Upper-cased ticker
    pub symbol: String,
    pub price: f64,
    pub change_pct: f64,
    pub volume: f64,
}

/// Why a raw record could not become a snapshot.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    #[error("record {record} is missing required field '{field}'")]
    MissingField { record: String, field: &'static str },

    #[error("record {record} has invalid {field}: {value}")]
    InvalidValue {
        record: String,
        field: &'static str,
        value: f64,
    },
}

impl TryFrom<&RawRecord> for InstrumentSnapshot {
    type Error = RecordError;

    fn try_from(raw: &RawRecord) -> Result<Self, Self::Error> {
        let record = raw.label().to_string();
        let missing = |field: &'static str| RecordError::MissingField {
            record: record.clone(),
            field,
        };
        let invalid = |field: &'static str, value: f64| RecordError::InvalidValue {
            record: record.clone(),
            field,
            value,
        };

        let symbol = raw
            .symbol
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| missing("symbol"))?
            .to_uppercase();

        let name = raw
            .name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| symbol.clone());

        let price = raw.price.ok_or_else(|| missing("price"))?;
        if !price.is_finite() || price <= 0.0 {
            return Err(invalid("price", price));
        }

        let change_pct = raw
            .effective_change_pct()
            .ok_or_else(|| missing("change_pct"))?;
        if !change_pct.is_finite() {
            return Err(invalid("change_pct", change_pct));
        }

        let volume = raw.volume.ok_or_else(|| missing("volume"))?;
        if !volume.is_finite() || volume < 0.0 {
            return Err(invalid("volume", volume));
        }

        Ok(Self {
            // Rank 0 carries no ordering information.
            rank: raw.rank.filter(|r| *r > 0),
            name,
            symbol,
            price,
            change_pct,
            volume,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
