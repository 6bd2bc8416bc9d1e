//! Market Radar Library
//!
//! Momentum screening over market snapshots: every refresh scores a batch of
//! instruments, filters it by volume and change floors, clusters the
//! survivors and flags the high-score cluster as "momentum".
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    market-radar (Rust Service)                      │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────┐     │
//! │  │  Snapshot       │  │  Screener       │  │  Report         │     │
//! │  │  Source + Cache │─▶│  Pipeline       │─▶│  (md / json)    │     │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────┘     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Concepts
//!
//! ## Scoring profiles
//! - **Ranked**: universes with a market-cap rank, rank enters score and features
//! - **Unranked**: universes without one, scored on change and volume only
//!
//! ## Labels
//! - **Momentum**: member of the cluster with the highest mean score
//! - **Neutral**: any other clustered candidate
//! - **Insufficient data**: too few candidates to cluster

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod data;
pub mod screener;

use anyhow::{Context, Result};
use radar_common::config::{Config, UniverseConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::data::{CachedSource, JsonFileSource, SnapshotSource};
use crate::screener::{ScreenerConfig, ScreenerPipeline, ScreenerReport, ScreenerResult, ScreenerScheduler};

/// Cache TTL when a universe does not set one.
const DEFAULT_CACHE_TTL_SECS: i64 = 120;

// ============================================================================
// Universe Runtime
// ============================================================================

/// One configured universe, wired to its source and pipeline.
pub struct UniverseRuntime {
    pub name: String,
    pub display_limit: Option<usize>,
    pub scheduler: ScreenerScheduler,
}

impl UniverseRuntime {
    /// Build the runtime for a universe entry.
    ///
    /// The snapshot file is resolved relative to the configured snapshot
    /// directory and wrapped in a TTL cache.
    pub fn from_config(config: &Config, universe: &UniverseConfig) -> Result<Self> {
        let screener_config = ScreenerConfig::from_universe(universe)
            .with_context(|| format!("Invalid screener options for universe '{}'", universe.name))?;
        let pipeline = ScreenerPipeline::new(screener_config)
            .with_context(|| format!("Invalid pipeline for universe '{}'", universe.name))?
            .with_universe(&universe.name);

        let path = config.snapshot_dir().join(&universe.source);
        let ttl = universe.cache_ttl_secs.unwrap_or(DEFAULT_CACHE_TTL_SECS);
        let source: Arc<dyn SnapshotSource> =
            Arc::new(CachedSource::new(JsonFileSource::new(&universe.name, path), ttl));

        Ok(Self {
            name: universe.name.clone(),
            display_limit: universe.display_limit,
            scheduler: ScreenerScheduler::new(source, pipeline),
        })
    }

    /// Render a result with this universe's display limit.
    pub fn report(&self, result: ScreenerResult) -> ScreenerReport {
        ScreenerReport::new(result).with_display_limit(self.display_limit)
    }
}

// ============================================================================
// Radar Service
// ============================================================================

/// All configured universes.
pub struct RadarService {
    config: Config,
    universes: Vec<UniverseRuntime>,
}

impl RadarService {
    /// Build runtimes for every universe, or only for `only` when given.
    pub fn new(config: Config, only: Option<&str>) -> Result<Self> {
        let selected: Vec<&UniverseConfig> = match only {
            Some(name) => vec![config
                .universe(name)
                .with_context(|| format!("Unknown universe: {}", name))?],
            None => config.universes.iter().collect(),
        };

        let universes = selected
            .into_iter()
            .map(|u| UniverseRuntime::from_config(&config, u))
            .collect::<Result<Vec<_>>>()?;

        info!(universes = universes.len(), "Market radar initialized");

        Ok(Self { config, universes })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn universes(&self) -> &[UniverseRuntime] {
        &self.universes
    }

    /// Run every universe once.
    ///
    /// An unavailable source is logged and skipped; the other universes
    /// still run.
    pub async fn scan(&self) -> Vec<(&UniverseRuntime, ScreenerResult)> {
        let mut results = Vec::with_capacity(self.universes.len());
        for universe in &self.universes {
            match universe.scheduler.run_once().await {
                Ok(result) => results.push((universe, result)),
                Err(e) => warn!(universe = %universe.name, error = %e, "Universe skipped"),
            }
        }
        results
    }

    /// Refresh every universe on the configured interval until Ctrl-C.
    pub async fn watch<C>(&self, on_result: C)
    where
        C: Fn(&UniverseRuntime, &ScreenerResult),
    {
        let interval = Duration::from_secs(self.config.data.refresh_interval_secs.max(1));
        let loops = self.universes.iter().map(|universe| {
            let on_result = &on_result;
            async move {
                universe
                    .scheduler
                    .run_forever(interval, |result| on_result(universe, result))
                    .await;
            }
        });
        futures::future::join_all(loops).await;
    }
}
