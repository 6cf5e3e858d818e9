//! Analysis configuration shared by every pipeline stage.
//!
//! Loaded from an optional JSON file; any field left out of the file keeps
//! its default.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AnalysisError, Result};

// ── BucketScheme ──────────────────────────────────────────────────────────────

/// Fixed-threshold binning over a positive numeric column.
///
/// Buckets are half-open on the left and closed on the right:
/// `(lower, t0]`, `(t0, t1]`, …, `(t_last, ∞)`. Values `<= lower` are outside
/// the scheme's domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketScheme {
    pub lower: f64,
    pub thresholds: Vec<f64>,
    pub labels: Vec<String>,
}

impl BucketScheme {
    /// Revenue buckets: (0,10], (10,50], (50,200], (200,∞).
    pub fn revenue_default() -> Self {
        Self {
            lower: 0.0,
            thresholds: vec![10.0, 50.0, 200.0],
            labels: vec![
                "Low (£0-10)".to_string(),
                "Medium (£10-50)".to_string(),
                "High (£50-200)".to_string(),
                "Very High (£200+)".to_string(),
            ],
        }
    }

    /// Quantity buckets: (0,5], (5,20], (20,100], (100,∞).
    pub fn quantity_default() -> Self {
        Self {
            lower: 0.0,
            thresholds: vec![5.0, 20.0, 100.0],
            labels: vec![
                "Small (1-5)".to_string(),
                "Medium (6-20)".to_string(),
                "Large (21-100)".to_string(),
                "Bulk (100+)".to_string(),
            ],
        }
    }

    /// Label of the bucket containing `value`, or `None` when `value` is not
    /// above `lower` (or is NaN).
    pub fn assign(&self, value: f64) -> Option<&str> {
        if value.is_nan() || value <= self.lower {
            return None;
        }
        let idx = self
            .thresholds
            .iter()
            .position(|&t| value <= t)
            .unwrap_or(self.thresholds.len());
        self.labels.get(idx).map(String::as_str)
    }

    /// Check that thresholds increase strictly from `lower` and that there is
    /// exactly one label per bucket.
    pub fn validate(&self, name: &str) -> Result<()> {
        if self.labels.len() != self.thresholds.len() + 1 {
            return Err(AnalysisError::Config(format!(
                "{name}: expected {} labels for {} thresholds, found {}",
                self.thresholds.len() + 1,
                self.thresholds.len(),
                self.labels.len()
            )));
        }
        let mut previous = self.lower;
        for &t in &self.thresholds {
            if !t.is_finite() || t <= previous {
                return Err(AnalysisError::Config(format!(
                    "{name}: thresholds must be finite and strictly increasing above {}",
                    self.lower
                )));
            }
            previous = t;
        }
        Ok(())
    }
}

// ── ExpansionWeights ──────────────────────────────────────────────────────────

/// Weights of the composite expansion score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExpansionWeights {
    pub quantity: f64,
    pub revenue: f64,
    pub avg_order_value: f64,
}

impl Default for ExpansionWeights {
    fn default() -> Self {
        Self {
            quantity: 0.4,
            revenue: 0.3,
            avg_order_value: 0.3,
        }
    }
}

// ── AnalysisConfig ────────────────────────────────────────────────────────────

/// Explicit configuration passed into each stage of the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// The single country treated as the home market.
    pub domestic_country: String,
    pub revenue_buckets: BucketScheme,
    pub quantity_buckets: BucketScheme,
    /// Row count of every "top N" report and chart.
    pub top_n: usize,
    /// Calendar year analysed by the seasonal report.
    pub analysis_year: i32,
    pub expansion_weights: ExpansionWeights,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            domestic_country: "United Kingdom".to_string(),
            revenue_buckets: BucketScheme::revenue_default(),
            quantity_buckets: BucketScheme::quantity_default(),
            top_n: 10,
            analysis_year: 2011,
            expansion_weights: ExpansionWeights::default(),
        }
    }
}

impl AnalysisConfig {
    /// Load a configuration file. Fields absent from the file keep their
    /// defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AnalysisError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: AnalysisConfig = serde_json::from_str(&content)?;
        debug!("Loaded analysis configuration from {}", path.display());
        Ok(config)
    }

    /// Reject configurations that would make a stage ill-defined.
    pub fn validate(&self) -> Result<()> {
        if self.domestic_country.trim().is_empty() {
            return Err(AnalysisError::Config(
                "domestic_country must not be empty".to_string(),
            ));
        }
        if self.top_n == 0 {
            return Err(AnalysisError::Config("top_n must be at least 1".to_string()));
        }
        self.revenue_buckets.validate("revenue_buckets")?;
        self.quantity_buckets.validate("quantity_buckets")?;

        let w = &self.expansion_weights;
        let weights = [w.quantity, w.revenue, w.avg_order_value];
        if weights.iter().any(|x| !x.is_finite() || *x < 0.0) || weights.iter().sum::<f64>() <= 0.0
        {
            return Err(AnalysisError::Config(
                "expansion_weights must be non-negative with a positive sum".to_string(),
            ));
        }
        Ok(())
    }

    /// Case-sensitive exact match against the domestic market.
    pub fn is_domestic(&self, country: &str) -> bool {
        country == self.domestic_country
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
