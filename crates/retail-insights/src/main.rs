mod bootstrap;

use anyhow::{Context, Result};
use retail_core::config::AnalysisConfig;
use retail_core::formatting::{format_count, format_currency_whole, format_percent};
use retail_core::settings::Settings;
use retail_runtime::orchestrator::{ReportOrchestrator, RunOptions, RunSummary};

fn main() -> Result<()> {
    let settings = Settings::load();
    bootstrap::setup_logging(&settings.log_level)?;

    tracing::info!("Retail Insights v{} starting", env!("CARGO_PKG_VERSION"));

    let config = settings
        .analysis_config()
        .context("invalid analysis configuration")?;
    tracing::info!(
        "Year: {}, top-N: {}, domestic market: {}",
        config.analysis_year,
        config.top_n,
        config.domestic_country
    );

    let options = RunOptions {
        input: settings.input.clone(),
        output_dir: settings.output_dir.clone(),
        render_charts: !settings.no_charts,
    };
    let summary = ReportOrchestrator::new(config.clone(), options)
        .run()
        .with_context(|| format!("analysis of {} failed", settings.input.display()))?;

    for line in console_summary(&summary, &config) {
        println!("{line}");
    }
    Ok(())
}

/// Short human-readable recap printed after a successful run.
fn console_summary(summary: &RunSummary, config: &AnalysisConfig) -> Vec<String> {
    let analysis = &summary.analysis;
    let audit = &analysis.metadata.cleaning;
    let overall = &analysis.insights.overall;

    let mut lines = vec![
        "=".repeat(60),
        "RETAIL ANALYSIS COMPLETE".to_string(),
        "=".repeat(60),
        format!(
            "Rows: {} loaded, {} removed, {} analysed",
            format_count(audit.input_rows as u64),
            format_count(audit.removed() as u64),
            format_count(audit.retained as u64)
        ),
        format!(
            "Revenue: {} ({} international)",
            format_currency_whole(overall.total_revenue),
            format_percent(overall.international_share)
        ),
    ];

    if let Some(peak) = &analysis.insights.seasonal.peak {
        lines.push(format!(
            "Peak month {}: {} ({})",
            config.analysis_year,
            peak.month_name,
            format_currency_whole(peak.revenue)
        ));
    }
    if let Some(top) = analysis.reports.countries.first() {
        lines.push(format!(
            "Top international market: {} ({})",
            top.country,
            format_currency_whole(top.total_revenue)
        ));
    }
    if let Some(best) = analysis.insights.expansion.top_scores.first() {
        lines.push(format!(
            "Top expansion opportunity: {} (score {:.2})",
            best.country, best.expansion_score
        ));
    }

    lines.push(String::new());
    lines.push("Generated files:".to_string());
    for path in &summary.artifacts {
        lines.push(format!("  - {}", path.display()));
    }
    lines
}
