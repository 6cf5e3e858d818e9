//! Plain-text reports.

use std::path::{Path, PathBuf};

use retail_core::config::AnalysisConfig;
use retail_core::formatting::{
    format_count, format_currency, format_currency_whole, format_number, format_percent,
};
use retail_core::Result;
use retail_data::analysis::AnalysisResult;
use retail_data::insights::BusinessInsights;
use tracing::info;

use crate::export::export_error;

pub const PREPARATION_SUMMARY_FILE: &str = "Data_Preparation_Summary.txt";
pub const INSIGHTS_REPORT_FILE: &str = "Business_Insights_Report.txt";

const RULE: &str = "============================================================";

/// Writes the text artifacts of a run into one directory.
pub struct TextReporter {
    output_dir: PathBuf,
}

impl TextReporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn write_preparation_summary(
        &self,
        result: &AnalysisResult,
        files: &[PathBuf],
    ) -> Result<PathBuf> {
        let path = self.output_dir.join(PREPARATION_SUMMARY_FILE);
        write_text(&path, &render_preparation_summary(result, files))?;
        Ok(path)
    }

    pub fn write_insights_report(
        &self,
        insights: &BusinessInsights,
        config: &AnalysisConfig,
    ) -> Result<PathBuf> {
        let path = self.output_dir.join(INSIGHTS_REPORT_FILE);
        write_text(&path, &render_insights_report(insights, config))?;
        Ok(path)
    }
}

fn write_text(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content).map_err(|e| export_error(path, e))?;
    info!("Wrote {}", path.display());
    Ok(())
}

// ── Rendering ─────────────────────────────────────────────────────────────────

/// Record counts, removals, date range, distinct counts and the list of
/// generated files.
pub fn render_preparation_summary(result: &AnalysisResult, files: &[PathBuf]) -> String {
    let overall = &result.insights.overall;
    let audit = &result.metadata.cleaning;

    let date_range = match (overall.first_invoice, overall.last_invoice) {
        (Some(first), Some(last)) => format!("{} to {}", first, last),
        _ => "n/a".to_string(),
    };

    let mut lines = vec![
        "DATA PREPARATION SUMMARY".to_string(),
        RULE.to_string(),
        String::new(),
        format!("Source: {}", result.metadata.source),
        format!("Generated: {}", result.metadata.generated_at),
        String::new(),
        format!("Records Loaded: {}", format_count(audit.input_rows as u64)),
        format!(
            "Removed (quantity < 1): {}",
            format_count(audit.removed_quantity as u64)
        ),
        format!(
            "Removed (unit price <= 0): {}",
            format_count(audit.removed_price as u64)
        ),
        format!(
            "Total Records After Cleaning: {}",
            format_count(overall.records as u64)
        ),
        format!("Date Range: {}", date_range),
        format!("Countries: {}", overall.unique_countries),
        format!("Customers: {}", format_count(overall.unique_customers as u64)),
        format!("Products: {}", format_count(overall.unique_products as u64)),
        format!("Orders: {}", format_count(overall.unique_orders as u64)),
        format!("Total Revenue: {}", format_currency(overall.total_revenue)),
        String::new(),
        "FILES CREATED".to_string(),
        RULE.to_string(),
    ];

    for (i, file) in files.iter().enumerate() {
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.display().to_string());
        lines.push(format!("{:>2}. {}", i + 1, name));
    }

    lines.extend([
        String::new(),
        "DATA QUALITY NOTES".to_string(),
        RULE.to_string(),
        "- Rows with quantity < 1 or unit price <= 0 were removed".to_string(),
        "- Missing CustomerIDs are reported as 'Unknown' in CustomerID_Clean".to_string(),
        "- All monetary values are in British Pounds (£)".to_string(),
        "- Revenue = Quantity x UnitPrice, computed after cleaning".to_string(),
        String::new(),
    ]);

    lines.join("\n")
}

/// The headline figures of every insight section.
pub fn render_insights_report(insights: &BusinessInsights, config: &AnalysisConfig) -> String {
    let mut lines = vec![
        "BUSINESS INSIGHTS REPORT".to_string(),
        RULE.to_string(),
        String::new(),
    ];

    // ── Seasonal ──────────────────────────────────────────────────────────────
    let s = &insights.seasonal;
    lines.push(format!("SEASONAL REVENUE ({})", s.year));
    match (&s.peak, &s.low) {
        (Some(peak), Some(low)) => {
            lines.push(format!(
                "Peak Revenue Month: {} ({})",
                peak.month_name,
                format_currency_whole(peak.revenue)
            ));
            lines.push(format!(
                "Lowest Revenue Month: {} ({})",
                low.month_name,
                format_currency_whole(low.revenue)
            ));
        }
        _ => lines.push(format!("No transactions recorded in {}", s.year)),
    }
    if let Some(cv) = s.coefficient_of_variation {
        lines.push(format!(
            "Revenue Variation: {} coefficient of variation",
            format_percent(cv)
        ));
    }
    lines.push(format!(
        "Q4 Contribution: {} of annual revenue",
        format_percent(s.q4_share)
    ));
    let growth: Vec<String> = s
        .growth
        .iter()
        .filter_map(|g| {
            g.growth_pct
                .map(|pct| format!("  {}: {:+.1}%", g.month_name, pct))
        })
        .collect();
    if !growth.is_empty() {
        lines.push("Month-over-Month Growth:".to_string());
        lines.extend(growth);
    }
    lines.push(String::new());

    // ── International ─────────────────────────────────────────────────────────
    let m = &insights.markets;
    lines.push(format!(
        "INTERNATIONAL MARKETS (excluding {})",
        config.domestic_country
    ));
    for (i, c) in m.top_markets.iter().enumerate() {
        lines.push(format!(
            "  {}. {}: {} revenue, {} units",
            i + 1,
            c.country,
            format_currency_whole(c.total_revenue),
            format_count(c.total_quantity.max(0) as u64)
        ));
    }
    lines.push(format!(
        "Market Concentration: top {} = {} of top-{} international revenue",
        m.top_markets.len(),
        format_percent(m.top_share),
        config.top_n
    ));
    lines.push(String::new());

    // ── Customers ─────────────────────────────────────────────────────────────
    let c = &insights.customers;
    lines.push("CUSTOMERS".to_string());
    lines.push(format!(
        "Top {} customers generate {} ({} of customer revenue)",
        c.top_n,
        format_currency_whole(c.top_revenue),
        format_percent(c.top_share)
    ));
    lines.push(format!(
        "Average top customer value: {}",
        format_currency_whole(c.mean_top_revenue)
    ));
    lines.push(format!(
        "Average orders per top customer: {}",
        format_number(c.mean_top_orders, 1)
    ));
    lines.push(format!(
        "Top customer concentration: {} of revenue",
        format_percent(c.largest_share)
    ));
    lines.push(String::new());

    // ── Expansion ─────────────────────────────────────────────────────────────
    let e = &insights.expansion;
    lines.push("HIGH-DEMAND MARKETS".to_string());
    for d in &e.high_demand {
        lines.push(format!(
            "  - {}: {} units, {} avg order",
            d.country,
            format_count(d.total_quantity.max(0) as u64),
            format_currency_whole(d.avg_order_value)
        ));
    }
    lines.push("TOP EXPANSION OPPORTUNITIES (composite score)".to_string());
    for (i, x) in e.top_scores.iter().enumerate() {
        lines.push(format!(
            "  {}. {} (Score: {:.2})",
            i + 1,
            x.country,
            x.expansion_score
        ));
    }
    lines.push(String::new());

    // ── Overall ───────────────────────────────────────────────────────────────
    let o = &insights.overall;
    lines.push("CURRENT BUSINESS METRICS".to_string());
    lines.push(format!(
        "Total Revenue: {}",
        format_currency_whole(o.total_revenue)
    ));
    lines.push(format!(
        "International Revenue: {} of total",
        format_percent(o.international_share)
    ));
    lines.push(format!(
        "Customer Base: {} unique customers",
        format_count(o.unique_customers as u64)
    ));
    lines.push(format!("Geographic Reach: {} countries", o.unique_countries));
    if let (Some(first), Some(last)) = (o.first_invoice, o.last_invoice) {
        lines.push(format!(
            "Period: {} to {}",
            first.format("%Y-%m-%d"),
            last.format("%Y-%m-%d")
        ));
    }
    lines.push(String::new());

    lines.join("\n")
}
