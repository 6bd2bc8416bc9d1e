//! Report generation module for screener results.
//!
//! Generates reports in two formats:
//! - Markdown (for terminals and documentation)
//! - JSON (for programmatic use)

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::cluster::ClusterAssignment;
use super::engine::ScreenerResult;

/// Rows shown per table when no display limit is set.
const DEFAULT_TABLE_ROWS: usize = 50;

// ============================================================================
// Report Format
// ============================================================================

/// Supported report formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    /// Markdown format (human-readable)
    Markdown,
    /// JSON format (machine-readable)
    Json,
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Markdown => write!(f, "markdown"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "markdown" | "md" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown report format: {}", s)),
        }
    }
}

// ============================================================================
// Screener Report
// ============================================================================

/// Report generator for screener results.
pub struct ScreenerReport {
    result: ScreenerResult,
    display_limit: Option<usize>,
}

impl ScreenerReport {
    /// Create a new report from screener results.
    pub fn new(result: ScreenerResult) -> Self {
        Self {
            result,
            display_limit: None,
        }
    }

    /// Cap the number of rows shown in each Markdown table.
    pub fn with_display_limit(mut self, limit: Option<usize>) -> Self {
        self.display_limit = limit;
        self
    }

    /// Generate report in the specified format.
    pub fn generate(&self, format: ReportFormat) -> String {
        match format {
            ReportFormat::Markdown => self.to_markdown(),
            ReportFormat::Json => self.to_json(),
        }
    }

    /// Save report to file.
    pub fn save_to_file(&self, path: &Path, format: ReportFormat) -> Result<PathBuf> {
        let content = self.generate(format);
        let extension = match format {
            ReportFormat::Markdown => "md",
            ReportFormat::Json => "json",
        };

        let file_path = if path.extension().is_none() {
            path.with_extension(extension)
        } else {
            path.to_path_buf()
        };

        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create report directory")?;
        }

        std::fs::write(&file_path, content).context("Failed to write report file")?;

        Ok(file_path)
    }

    fn table_rows(&self) -> usize {
        self.display_limit.unwrap_or(DEFAULT_TABLE_ROWS)
    }

    /// Generate markdown report.
    pub fn to_markdown(&self) -> String {
        let result = &self.result;
        let mut md = String::new();

        // Header
        let title = match &result.universe {
            Some(universe) => format!("# Momentum Radar: {}\n\n", universe),
            None => "# Momentum Radar\n\n".to_string(),
        };
        md.push_str(&title);
        md.push_str(&format!(
            "**Scan ID**: {}\n**Time**: {}\n**Duration**: {:.3}s\n\n",
            result.id,
            result.completed_at.format("%Y-%m-%d %H:%M:%S"),
            result.duration_secs
        ));

        // Summary
        md.push_str("## Summary\n\n");
        md.push_str(&format!("- **Records**: {}\n", result.total_records));
        md.push_str(&format!("- **Candidates**: {}\n", result.rows.len()));
        md.push_str(&format!("- **Momentum**: {}\n", result.momentum().len()));
        md.push_str(&format!("- **Configuration**: {}\n\n", result.config_summary));

        // Filter funnel
        md.push_str("### Filter Funnel\n\n");
        md.push_str("| Stage | Passed | Eliminated | Rate |\n");
        md.push_str("|-------|--------|------------|------|\n");
        for fr in &result.filter_results {
            md.push_str(&format!(
                "| {} | {} | {} | {:.1}% |\n",
                fr.stage, fr.passed, fr.eliminated, fr.elimination_rate
            ));
        }
        md.push('\n');

        // Momentum table
        md.push_str("## Momentum\n\n");
        let momentum = result.momentum();
        if result.rows.is_empty() {
            md.push_str("_No instrument passed the filters._\n\n");
        } else if !result.was_clustered() {
            md.push_str(&format!(
                "_Insufficient data: {} candidates, clustering skipped._\n\n",
                result.rows.len()
            ));
        } else {
            push_table(&mut md, momentum.into_iter().take(self.table_rows()));
        }

        // Alerts
        if let Some(alerts) = &result.alerts {
            md.push_str(&format!("## Alerts (score >= {:.2})\n\n", alerts.min_score));
            if alerts.is_empty() {
                md.push_str("_No alerts._\n\n");
            } else {
                md.push_str("| Symbol | Name | Change% | Score |\n");
                md.push_str("|--------|------|---------|-------|\n");
                for alert in alerts.alerts.iter().take(self.table_rows()) {
                    md.push_str(&format!(
                        "| {} | {} | {:+.2}% | {:.2} |\n",
                        alert.snapshot.symbol,
                        alert.snapshot.name,
                        alert.snapshot.change_pct,
                        alert.score
                    ));
                }
                md.push('\n');
            }
        }

        // Every candidate
        if !result.rows.is_empty() {
            md.push_str("## Candidates\n\n");
            push_table(&mut md, result.top(self.table_rows()).into_iter());
        }

        // Footer
        md.push_str("---\n\n");
        md.push_str(&format!(
            "*Report generated at {} UTC*\n",
            Utc::now().format("%Y-%m-%d %H:%M:%S")
        ));

        md
    }

    /// Generate JSON report.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.result).unwrap_or_else(|_| "{}".to_string())
    }

    /// Get the underlying result.
    pub fn result(&self) -> &ScreenerResult {
        &self.result
    }
}

fn push_table<'a>(md: &mut String, rows: impl Iterator<Item = &'a ClusterAssignment>) {
    md.push_str("| Rank | Name | Symbol | Price | Change% | Volume | Score | Label |\n");
    md.push_str("|------|------|--------|-------|---------|--------|-------|-------|\n");
    for row in rows {
        let snapshot = &row.scored.snapshot;
        md.push_str(&format!(
            "| {} | {} | {} | {} | {:+.2}% | {} | {:.2} | {} |\n",
            snapshot.rank.map_or_else(|| "-".to_string(), |r| r.to_string()),
            snapshot.name,
            snapshot.symbol,
            format_price(snapshot.price),
            snapshot.change_pct,
            format_volume(snapshot.volume),
            row.scored.score,
            row.label
        ));
    }
    md.push('\n');
}

/// Fine-grained decimals for sub-unit prices.
fn format_price(price: f64) -> String {
    if price < 1.0 {
        format!("{:.6}", price)
    } else {
        format!("{:.2}", price)
    }
}

/// Compact volume with a K/M/B suffix.
fn format_volume(volume: f64) -> String {
    let abs = volume.abs();
    if abs >= 1e9 {
        format!("{:.2}B", volume / 1e9)
    } else if abs >= 1e6 {
        format!("{:.2}M", volume / 1e6)
    } else if abs >= 1e3 {
        format!("{:.2}K", volume / 1e3)
    } else {
        format!("{:.0}", volume)
    }
}

// ============================================================================
// Tests
// ============================================================================
