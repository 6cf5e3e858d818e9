//! PNG charts rendered with plotters.

use std::error::Error;
use std::path::{Path, PathBuf};

use plotters::prelude::*;
use retail_core::formatting::{format_count, format_currency_compact};
use retail_core::{AnalysisError, Result};
use retail_data::reports::{BusinessReports, CountryRow, CustomerRow, DemandRow, MonthlyRow};
use tracing::info;

use crate::export::export_error;

type DrawResult = std::result::Result<(), Box<dyn Error>>;

const CHART_SIZE: (u32, u32) = (1400, 800);

pub fn monthly_chart_file(year: i32) -> String {
    format!("Q1_{year}_Monthly_Revenue_Trend.png")
}

pub fn countries_chart_file(top_n: usize) -> String {
    format!("Q2_Top_{top_n}_Countries_Revenue_Quantity.png")
}

pub fn customers_chart_file(top_n: usize) -> String {
    format!("Q3_Top_{top_n}_Customers_Revenue.png")
}

pub const DEMAND_CHART_FILE: &str = "Q4_Country_Demand_Analysis.png";

/// Renders the four report charts into one directory.
pub struct ChartRenderer {
    output_dir: PathBuf,
    top_n: usize,
    domestic_country: String,
}

impl ChartRenderer {
    pub fn new(output_dir: impl Into<PathBuf>, top_n: usize, domestic_country: &str) -> Self {
        Self {
            output_dir: output_dir.into(),
            top_n,
            domestic_country: domestic_country.to_string(),
        }
    }

    /// Render every chart that has data. Empty reports are skipped rather
    /// than drawn as blank images.
    pub fn render_all(&self, reports: &BusinessReports, year: i32) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        if !reports.monthly.is_empty() {
            written.push(self.monthly_revenue(&reports.monthly, year)?);
        }
        if !reports.countries.is_empty() {
            written.push(self.top_countries(&reports.countries)?);
        }
        if !reports.customers.is_empty() {
            written.push(self.top_customers(&reports.customers)?);
        }
        if !reports.demand.is_empty() {
            written.push(self.country_demand(&reports.demand)?);
        }
        Ok(written)
    }

    /// Line chart of revenue per month.
    pub fn monthly_revenue(&self, rows: &[MonthlyRow], year: i32) -> Result<PathBuf> {
        let path = self.output_dir.join(monthly_chart_file(year));
        require_rows(&path, rows.len())?;
        let title = format!("Monthly Revenue Trend for {year}");
        draw_monthly(&path, &title, rows).map_err(|e| export_error(&path, e))?;
        info!("Saved chart {}", path.display());
        Ok(path)
    }

    /// Revenue bars with a units line for the top international markets.
    pub fn top_countries(&self, rows: &[CountryRow]) -> Result<PathBuf> {
        let path = self.output_dir.join(countries_chart_file(self.top_n));
        require_rows(&path, rows.len())?;
        let rows = &rows[..self.top_n.min(rows.len())];
        let title = format!(
            "Top {} Countries by Revenue and Quantity Sold (Excluding {})",
            rows.len(),
            self.domestic_country
        );
        draw_countries(&path, &title, rows).map_err(|e| export_error(&path, e))?;
        info!("Saved chart {}", path.display());
        Ok(path)
    }

    /// Horizontal revenue bars for the top customers, highest first.
    pub fn top_customers(&self, rows: &[CustomerRow]) -> Result<PathBuf> {
        let path = self.output_dir.join(customers_chart_file(self.top_n));
        require_rows(&path, rows.len())?;
        let rows = &rows[..self.top_n.min(rows.len())];
        let title = format!("Top {} Revenue Generating Customers", rows.len());
        draw_customers(&path, &title, rows).map_err(|e| export_error(&path, e))?;
        info!("Saved chart {}", path.display());
        Ok(path)
    }

    /// Revenue against units per market; bubble area follows order count.
    pub fn country_demand(&self, rows: &[DemandRow]) -> Result<PathBuf> {
        let path = self.output_dir.join(DEMAND_CHART_FILE);
        require_rows(&path, rows.len())?;
        let title = format!(
            "Product Demand by Country (bubble size = unique orders, excluding {})",
            self.domestic_country
        );
        draw_demand(&path, &title, rows).map_err(|e| export_error(&path, e))?;
        info!("Saved chart {}", path.display());
        Ok(path)
    }
}

// ── Drawing ───────────────────────────────────────────────────────────────────

fn draw_monthly(path: &Path, title: &str, rows: &[MonthlyRow]) -> DrawResult {
    let max = rows.iter().map(|r| r.total_revenue).fold(0.0, f64::max);

    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 28))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(90)
        .build_cartesian_2d(0u32..13u32, 0f64..padded_upper(max))?;

    chart
        .configure_mesh()
        .x_labels(14)
        .x_label_formatter(&|m: &u32| short_month(*m).to_string())
        .y_label_formatter(&|v: &f64| format_currency_compact(*v))
        .x_desc("Month")
        .y_desc("Revenue (£)")
        .axis_desc_style(("sans-serif", 16))
        .draw()?;

    let points: Vec<(u32, f64)> = rows.iter().map(|r| (r.month, r.total_revenue)).collect();
    chart.draw_series(LineSeries::new(points.iter().copied(), BLUE.stroke_width(3)))?;
    chart.draw_series(
        points
            .iter()
            .map(|&(m, v)| Circle::new((m, v), 6, BLUE.filled())),
    )?;
    chart.draw_series(points.iter().map(|&(m, v)| {
        Text::new(
            format_currency_compact(v),
            (m, v),
            ("sans-serif", 13).into_font(),
        )
    }))?;

    root.present()?;
    Ok(())
}

fn draw_countries(path: &Path, title: &str, rows: &[CountryRow]) -> DrawResult {
    let n = rows.len() as u32;
    let names: Vec<String> = rows.iter().map(|r| truncate_label(&r.country, 14)).collect();
    let max_revenue = rows.iter().map(|r| r.total_revenue).fold(0.0, f64::max);
    let max_quantity = rows.iter().map(|r| r.total_quantity as f64).fold(0.0, f64::max);
    let label = |v: &SegmentValue<u32>| match v {
        SegmentValue::CenterOf(i) => names.get(*i as usize).cloned().unwrap_or_default(),
        _ => String::new(),
    };

    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled(title, ("sans-serif", 28))?;
    let (upper, lower) = root.split_vertically((CHART_SIZE.1 * 3 / 5) as i32);

    let mut revenue = ChartBuilder::on(&upper)
        .margin(15)
        .x_label_area_size(10)
        .y_label_area_size(90)
        .build_cartesian_2d((0u32..n).into_segmented(), 0f64..padded_upper(max_revenue))?;
    revenue
        .configure_mesh()
        .disable_x_mesh()
        // Country names are drawn once, under the quantity panel.
        .x_labels(n as usize + 1)
        .x_label_formatter(&|_: &SegmentValue<u32>| String::new())
        .y_label_formatter(&|v: &f64| format_currency_compact(*v))
        .y_desc("Revenue (£)")
        .axis_desc_style(("sans-serif", 16))
        .draw()?;
    revenue.draw_series(rows.iter().enumerate().map(|(i, r)| {
        let i = i as u32;
        let mut bar = Rectangle::new(
            [
                (SegmentValue::Exact(i), 0.0),
                (SegmentValue::Exact(i + 1), r.total_revenue),
            ],
            RGBColor(70, 130, 180).filled(),
        );
        bar.set_margin(0, 0, 8, 8);
        bar
    }))?;

    let mut quantity = ChartBuilder::on(&lower)
        .margin(15)
        .x_label_area_size(60)
        .y_label_area_size(90)
        .build_cartesian_2d((0u32..n).into_segmented(), 0f64..padded_upper(max_quantity))?;
    quantity
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n as usize + 1)
        .x_label_formatter(&label)
        .y_label_formatter(&|v: &f64| format_count(v.max(0.0) as u64))
        .x_desc("Country")
        .y_desc("Quantity Sold")
        .axis_desc_style(("sans-serif", 16))
        .draw()?;
    let points: Vec<(SegmentValue<u32>, f64)> = rows
        .iter()
        .enumerate()
        .map(|(i, r)| (SegmentValue::CenterOf(i as u32), r.total_quantity as f64))
        .collect();
    quantity.draw_series(LineSeries::new(
        points.iter().cloned(),
        RGBColor(255, 127, 14).stroke_width(3),
    ))?;
    quantity.draw_series(
        points
            .iter()
            .cloned()
            .map(|p| Circle::new(p, 5, RGBColor(255, 127, 14).filled())),
    )?;

    root.present()?;
    Ok(())
}

fn draw_customers(path: &Path, title: &str, rows: &[CustomerRow]) -> DrawResult {
    let n = rows.len() as u32;
    let max = rows.iter().map(|r| r.total_revenue).fold(0.0, f64::max);
    // Highest revenue at the top of the chart.
    let names: Vec<String> = rows
        .iter()
        .rev()
        .map(|r| format!("Customer {}", r.customer_id))
        .collect();
    let label = |v: &SegmentValue<u32>| match v {
        SegmentValue::CenterOf(i) => names.get(*i as usize).cloned().unwrap_or_default(),
        _ => String::new(),
    };

    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 28))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(160)
        .build_cartesian_2d(0f64..padded_upper(max), (0u32..n).into_segmented())?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(n as usize + 1)
        .y_label_formatter(&label)
        .x_label_formatter(&|v: &f64| format_currency_compact(*v))
        .x_desc("Total Revenue (£)")
        .axis_desc_style(("sans-serif", 16))
        .draw()?;

    chart.draw_series(rows.iter().rev().enumerate().map(|(i, r)| {
        let i = i as u32;
        let mut bar = Rectangle::new(
            [
                (0.0, SegmentValue::Exact(i)),
                (r.total_revenue, SegmentValue::Exact(i + 1)),
            ],
            RGBColor(46, 139, 87).filled(),
        );
        bar.set_margin(6, 6, 0, 0);
        bar
    }))?;

    root.present()?;
    Ok(())
}

fn draw_demand(path: &Path, title: &str, rows: &[DemandRow]) -> DrawResult {
    let max_revenue = rows.iter().map(|r| r.total_revenue).fold(0.0, f64::max);
    let max_quantity = rows.iter().map(|r| r.total_quantity as f64).fold(0.0, f64::max);
    let max_orders = rows.iter().map(|r| r.unique_orders).max().unwrap_or(0);

    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 28))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(90)
        .build_cartesian_2d(0f64..padded_upper(max_revenue), 0f64..padded_upper(max_quantity))?;

    chart
        .configure_mesh()
        .x_label_formatter(&|v: &f64| format_currency_compact(*v))
        .y_label_formatter(&|v: &f64| format_count(v.max(0.0) as u64))
        .x_desc("Total Revenue (£)")
        .y_desc("Total Quantity Demanded")
        .axis_desc_style(("sans-serif", 16))
        .draw()?;

    chart.draw_series(rows.iter().enumerate().map(|(i, r)| {
        let style = Palette99::pick(i).mix(0.7).filled();
        EmptyElement::at((r.total_revenue, r.total_quantity as f64))
            + Circle::new((0, 0), bubble_radius(r.unique_orders, max_orders), style)
            + Text::new(r.country.clone(), (8, -8), ("sans-serif", 13).into_font())
    }))?;

    root.present()?;
    Ok(())
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn require_rows(path: &Path, len: usize) -> Result<()> {
    if len == 0 {
        return Err(AnalysisError::Export {
            path: path.to_path_buf(),
            reason: "no rows to chart".to_string(),
        });
    }
    Ok(())
}

/// Axis upper bound with 10% headroom; `1.0` for an all-zero series.
pub fn padded_upper(max: f64) -> f64 {
    if max.is_finite() && max > 0.0 {
        max * 1.1
    } else {
        1.0
    }
}

/// Bubble radius in pixels, area proportional to `orders`.
pub fn bubble_radius(orders: u64, max_orders: u64) -> i32 {
    const MIN_RADIUS: f64 = 4.0;
    const MAX_RADIUS: f64 = 45.0;
    if max_orders == 0 {
        return MIN_RADIUS as i32;
    }
    let scale = (orders as f64 / max_orders as f64).sqrt();
    (MIN_RADIUS + scale * (MAX_RADIUS - MIN_RADIUS)).round() as i32
}

/// Three-letter month label for axis ticks; empty outside 1–12.
pub fn short_month(month: u32) -> &'static str {
    const NAMES: [&str; 12] = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];
    month
        .checked_sub(1)
        .and_then(|i| NAMES.get(i as usize))
        .copied()
        .unwrap_or("")
}

fn truncate_label(label: &str, max_chars: usize) -> String {
    if label.chars().count() <= max_chars {
        label.to_string()
    } else {
        let head: String = label.chars().take(max_chars.saturating_sub(1)).collect();
        format!("{head}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use retail_core::config::AnalysisConfig;
    use retail_core::models::Transaction;
    use retail_data::analysis::analyze_transactions;
    use tempfile::TempDir;

    #[test]
    fn test_padded_upper() {
        assert!((padded_upper(100.0) - 110.0).abs() < 1e-9);
        assert_eq!(padded_upper(0.0), 1.0);
        assert_eq!(padded_upper(f64::NAN), 1.0);
    }

    #[test]
    fn test_bubble_radius_scales_with_orders() {
        assert_eq!(bubble_radius(0, 0), 4);
        assert_eq!(bubble_radius(100, 100), 45);
        let small = bubble_radius(1, 100);
        let mid = bubble_radius(25, 100);
        assert!(small < mid && mid < 45);
    }

    #[test]
    fn test_short_month() {
        assert_eq!(short_month(1), "Jan");
        assert_eq!(short_month(12), "Dec");
        assert_eq!(short_month(0), "");
        assert_eq!(short_month(13), "");
    }

    #[test]
    fn test_truncate_label() {
        assert_eq!(truncate_label("France", 14), "France");
        assert_eq!(truncate_label("United Arab Emirates", 10), "United Ar…");
    }

    #[test]
    fn test_chart_file_names() {
        assert_eq!(monthly_chart_file(2011), "Q1_2011_Monthly_Revenue_Trend.png");
        assert_eq!(countries_chart_file(10), "Q2_Top_10_Countries_Revenue_Quantity.png");
        assert_eq!(customers_chart_file(10), "Q3_Top_10_Customers_Revenue.png");
    }

    #[test]
    fn test_empty_series_is_export_error() {
        let tmp = TempDir::new().unwrap();
        let renderer = ChartRenderer::new(tmp.path(), 10, "United Kingdom");
        let err = renderer.top_countries(&[]).unwrap_err();
        assert!(matches!(err, AnalysisError::Export { .. }));
        assert!(!tmp.path().join(countries_chart_file(10)).exists());
    }

    fn populated_reports() -> BusinessReports {
        let at = |m, d| {
            NaiveDate::from_ymd_opt(2011, m, d)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap()
        };
        let tx = |invoice: &str, customer, country: &str, qty, price, date| Transaction {
            invoice_no: invoice.to_string(),
            stock_code: "22633".to_string(),
            description: Some("HAND WARMER".to_string()),
            quantity: qty,
            unit_price: price,
            invoice_date: date,
            customer_id: customer,
            country: country.to_string(),
        };
        let rows = vec![
            tx("1", Some(17850), "United Kingdom", 6, 2.55, at(1, 4)),
            tx("2", Some(12583), "Germany", 2, 5.0, at(3, 1)),
            tx("3", Some(12583), "Germany", 1, 10.0, at(3, 5)),
            tx("4", Some(12680), "France", 12, 1.25, at(11, 7)),
            tx("5", None, "Spain", 3, 4.0, at(6, 2)),
        ];
        analyze_transactions(rows, &AnalysisConfig::default())
            .unwrap()
            .reports
    }

    #[test]
    fn test_render_all_draws_every_chart() {
        let tmp = TempDir::new().unwrap();
        let renderer = ChartRenderer::new(tmp.path(), 10, "United Kingdom");
        let reports = populated_reports();
        assert_eq!(reports.countries.len(), 3);

        let written = renderer.render_all(&reports, 2011).unwrap();

        assert_eq!(written.len(), 4);
        for name in [
            monthly_chart_file(2011),
            countries_chart_file(10),
            customers_chart_file(10),
            DEMAND_CHART_FILE.to_string(),
        ] {
            let path = tmp.path().join(&name);
            assert!(written.contains(&path), "{name} not reported");
            assert!(std::fs::metadata(&path).unwrap().len() > 0, "{name} is empty");
        }
    }

    #[test]
    fn test_top_countries_single_market() {
        let tmp = TempDir::new().unwrap();
        let renderer = ChartRenderer::new(tmp.path(), 10, "United Kingdom");
        let reports = populated_reports();
        let path = renderer.top_countries(&reports.countries[..1]).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_render_all_skips_empty_reports() {
        let tmp = TempDir::new().unwrap();
        let renderer = ChartRenderer::new(tmp.path(), 10, "United Kingdom");
        let written = renderer
            .render_all(&BusinessReports::default(), 2011)
            .unwrap();
        assert!(written.is_empty());
    }
}
