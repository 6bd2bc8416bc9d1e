//! Momentum Screener Module.
//!
//! Turns one batch of market snapshots into a ranked, labeled candidate
//! list plus threshold alerts.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Screener Pipeline                          │
//! ├───────────────────────────────────────────────────────────────────┤
//! │                                                                   │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐            │
//! │  │ RawRecord   │───▶│ ScoreEngine │───▶│ Candidate   │            │
//! │  │ validation  │    │ (profile)   │    │ Filter      │            │
//! │  └─────────────┘    └─────────────┘    └──────┬──────┘            │
//! │                                               │                   │
//! │                     ┌─────────────────────────┴─────────┐         │
//! │                     ▼                                   ▼         │
//! │             ┌───────────────┐                   ┌─────────────┐   │
//! │             │ Momentum      │                   │ Alert       │   │
//! │             │ Clusterer     │                   │ Evaluator   │   │
//! │             │ (k-means)     │                   │ (threshold) │   │
//! │             └───────────────┘                   └─────────────┘   │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use radar_screener::screener::{ScreenerConfig, ScreenerPipeline, ScoringProfile};
//!
//! let config = ScreenerConfig::for_profile(ScoringProfile::Ranked);
//! let pipeline = ScreenerPipeline::new(config)?;
//!
//! let result = pipeline.run(&records);
//! for row in result.momentum() {
//!     println!("{} {:.2}", row.symbol(), row.score());
//! }
//! ```

pub mod alert;
pub mod cluster;
pub mod config;
pub mod engine;
pub mod filter;
pub mod normalize;
pub mod report;
pub mod scheduler;
pub mod scoring;

pub use alert::{AlertEvaluator, AlertSet};
pub use cluster::{ClusterAssignment, ClusterStats, ClusteringSummary, KMeans, Label, MomentumClusterer};
pub use config::{ScoringProfile, ScoringWeights, ScreenerConfig};
pub use engine::{ScreenerPipeline, ScreenerResult};
pub use filter::{CandidateFilter, FilterResult, FilterStage};
pub use normalize::{Feature, FeatureNormalizer, StandardizedFeatures};
pub use report::{ReportFormat, ScreenerReport};
pub use scheduler::{SchedulerState, SchedulerStatus, ScreenerScheduler};
pub use scoring::{ScoreEngine, ScoredInstrument};
