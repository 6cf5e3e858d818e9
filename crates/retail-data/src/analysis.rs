//! Main analysis pipeline.
//!
//! Runs load → clean → enrich → report → insight and returns an
//! [`AnalysisResult`] ready for export.

use std::path::Path;
use std::time::Instant;

use chrono::Utc;
use retail_core::config::AnalysisConfig;
use retail_core::models::{EnrichedRecord, Transaction};
use retail_core::Result;
use serde::Serialize;
use tracing::info;

use crate::cleaner::{clean, CleaningAudit};
use crate::enricher::Enricher;
use crate::insights::{derive_insights, BusinessInsights};
use crate::reader::load_transactions;
use crate::reports::{build_reports, BusinessReports};

// ── Public types ──────────────────────────────────────────────────────────────

/// Metadata produced alongside the analysis result.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisMetadata {
    /// ISO-8601 timestamp when this result was generated.
    pub generated_at: String,
    /// Display form of the source path.
    pub source: String,
    /// Header row of the source, in source order.
    pub source_columns: Vec<String>,
    pub cleaning: CleaningAudit,
    /// Wall-clock seconds spent reading the source.
    pub load_time_seconds: f64,
    /// Wall-clock seconds spent cleaning and enriching.
    pub transform_time_seconds: f64,
    /// Wall-clock seconds spent building reports and insights.
    pub aggregate_time_seconds: f64,
}

/// The complete output of [`analyze_retail`].
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    /// Cleaned and enriched rows in source order.
    pub records: Vec<EnrichedRecord>,
    pub reports: BusinessReports,
    pub insights: BusinessInsights,
    pub metadata: AnalysisMetadata,
}

// ── Public functions ──────────────────────────────────────────────────────────

/// Run the full analysis pipeline over the source at `path`.
pub fn analyze_retail(path: &Path, config: &AnalysisConfig) -> Result<AnalysisResult> {
    let load_start = Instant::now();
    let source = load_transactions(path)?;
    let load_time = load_start.elapsed().as_secs_f64();

    let mut result = analyze_transactions(source.records, config)?;
    result.metadata.source = path.display().to_string();
    result.metadata.source_columns = source.columns;
    result.metadata.load_time_seconds = load_time;
    Ok(result)
}

/// Run clean → enrich → report → insight over already-loaded transactions.
pub fn analyze_transactions(
    transactions: Vec<Transaction>,
    config: &AnalysisConfig,
) -> Result<AnalysisResult> {
    config.validate()?;

    // ── Clean and enrich ──────────────────────────────────────────────────────
    let transform_start = Instant::now();
    let cleaned = clean(transactions);
    let records = Enricher::new(config).enrich(&cleaned.records)?;
    let transform_time = transform_start.elapsed().as_secs_f64();

    // ── Reports and insights ──────────────────────────────────────────────────
    let aggregate_start = Instant::now();
    let reports = build_reports(&records, config)?;
    let insights = derive_insights(&records, &reports, config);
    let aggregate_time = aggregate_start.elapsed().as_secs_f64();

    info!(
        "Analysed {} of {} rows: {} international markets, {} customers",
        records.len(),
        cleaned.audit.input_rows,
        reports.countries.len(),
        reports.customers.len()
    );

    let metadata = AnalysisMetadata {
        generated_at: Utc::now().to_rfc3339(),
        source: String::new(),
        source_columns: Vec::new(),
        cleaning: cleaned.audit,
        load_time_seconds: 0.0,
        transform_time_seconds: transform_time,
        aggregate_time_seconds: aggregate_time,
    };

    Ok(AnalysisResult {
        records,
        reports,
        insights,
        metadata,
    })
}
