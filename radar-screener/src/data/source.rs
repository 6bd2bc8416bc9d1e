//! Snapshot source abstraction.
//!
//! A source hands the pipeline one batch of raw records per call. Network
//! retrieval lives outside this crate; the bundled sources read a JSON file
//! or serve a fixed batch.

use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;
use radar_common::{Error as RadarError, ResultExt};
use serde_json::Value;
use tracing::{debug, warn};

use super::RawRecord;

/// Supplier of raw market records.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Source name, used as the cache key and in logs.
    fn name(&self) -> &str;

    /// Fetch the current batch of raw records.
    async fn fetch(&self) -> Result<Vec<RawRecord>>;
}

/// Parse a JSON array into raw records, dropping elements that do not fit
/// the record shape.
pub fn parse_records(value: Value) -> radar_common::Result<Vec<RawRecord>> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("data") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(RadarError::InvalidInput(
                    "expected a JSON array of records or an object with a 'data' array".into(),
                ))
            }
        },
        _ => {
            return Err(RadarError::InvalidInput(
                "expected a JSON array of records".into(),
            ))
        }
    };

    let total = items.len();
    let records: Vec<RawRecord> = items
        .into_iter()
        .enumerate()
        .filter_map(|(idx, item)| match serde_json::from_value::<RawRecord>(item) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(index = idx, error = %e, "Dropping unparseable record");
                None
            }
        })
        .collect();

    debug!(total, parsed = records.len(), "Parsed raw records");
    Ok(records)
}

// ============================================================================
// JSON File Source
// ============================================================================

/// Reads a batch from a JSON file on every fetch.
pub struct JsonFileSource {
    name: String,
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> radar_common::Result<Vec<RawRecord>> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            RadarError::External(format!(
                "cannot read snapshots from {}: {}",
                self.path.display(),
                e
            ))
        })?;

        let value: Value = serde_json::from_str(&content)
            .context(format!("Failed to parse snapshots from {}", self.path.display()))?;

        parse_records(value).context(format!("Invalid snapshot file {}", self.path.display()))
    }
}

#[async_trait]
impl SnapshotSource for JsonFileSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<RawRecord>> {
        Ok(self.read().await?)
    }
}

// ============================================================================
// Static Source
// ============================================================================

/// Serves the same in-memory batch on every fetch.
pub struct StaticSource {
    name: String,
    records: Vec<RawRecord>,
}

impl StaticSource {
    pub fn new(name: impl Into<String>, records: Vec<RawRecord>) -> Self {
        Self {
            name: name.into(),
            records,
        }
    }
}

#[async_trait]
impl SnapshotSource for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<RawRecord>> {
        Ok(self.records.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_records_drops_bad_rows() {
        let value = json!([
            { "symbol": "btc", "price": 1.0, "change_pct": 2.0, "volume": 3.0 },
            { "symbol": "eth", "price": "not a number" },
            { "symbol": "sol", "rank": -4 },
            { "symbol": "ada", "change_pct": null }
        ]);
        let records = parse_records(value).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].symbol.as_deref(), Some("btc"));
        assert_eq!(records[1].symbol.as_deref(), Some("ada"));
        assert!(records[1].change_pct.is_none());
    }

    #[test]
    fn test_parse_records_accepts_data_envelope() {
        let value = json!({ "data": [{ "symbol": "AAPL" }] });
        assert_eq!(parse_records(value).unwrap().len(), 1);
    }

    #[test]
    fn test_parse_records_rejects_scalar() {
        let err = parse_records(json!(42)).unwrap_err();
        assert!(matches!(err, RadarError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_json_file_source_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crypto.json");
        std::fs::write(
            &path,
            r#"[{ "symbol": "btc", "current_price": 10.0, "price_change_percentage_24h": 1.5, "total_volume": 100.0 }]"#,
        )
        .unwrap();

        let source = JsonFileSource::new("crypto", &path);
        let records = source.fetch().await.unwrap();
        assert_eq!(source.name(), "crypto");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].price, Some(10.0));
    }

    #[tokio::test]
    async fn test_json_file_source_missing_file() {
        let source = JsonFileSource::new("crypto", "/nonexistent/radar/crypto.json");
        let err = source.fetch().await.unwrap_err();
        assert!(err.to_string().contains("cannot read snapshots"));
        assert!(err
            .downcast_ref::<RadarError>()
            .is_some_and(RadarError::is_upstream));
    }

    #[tokio::test]
    async fn test_json_file_source_malformed_file_is_not_upstream() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crypto.json");
        std::fs::write(&path, "[{ \"symbol\": ").unwrap();

        let err = JsonFileSource::new("crypto", &path).fetch().await.unwrap_err();
        let radar = err.downcast_ref::<RadarError>().unwrap();
        assert!(!radar.is_upstream());
        assert!(matches!(
            radar,
            RadarError::WithContext { source, .. } if matches!(**source, RadarError::Json(_))
        ));
        assert!(err.to_string().starts_with("Failed to parse snapshots from"));
    }

    #[tokio::test]
    async fn test_json_file_source_wrong_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crypto.json");
        std::fs::write(&path, r#"{ "status": "ok" }"#).unwrap();

        let err = JsonFileSource::new("crypto", &path).fetch().await.unwrap_err();
        let radar = err.downcast_ref::<RadarError>().unwrap();
        assert!(matches!(
            radar,
            RadarError::WithContext { source, .. } if matches!(**source, RadarError::InvalidInput(_))
        ));
        assert!(err.to_string().contains("Invalid snapshot file"));
    }

    #[test]
    fn test_static_source_repeats_batch() {
        let source = StaticSource::new("fixed", vec![RawRecord::default(); 3]);
        let first = tokio_test::block_on(source.fetch()).unwrap();
        let second = tokio_test::block_on(source.fetch()).unwrap();
        assert_eq!(first.len(), 3);
        assert_eq!(first, second);
    }
}
