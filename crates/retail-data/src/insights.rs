//! Headline business figures derived from the reports.

use std::collections::HashSet;

use chrono::NaiveDateTime;
use retail_core::config::AnalysisConfig;
use retail_core::formatting::percentage;
use retail_core::models::EnrichedRecord;
use serde::Serialize;

use crate::reports::{
    BusinessReports, CountryRow, CustomerRow, DemandRow, ExpansionRow, MonthlyRow,
};

/// Markets listed in the international section.
pub const TOP_MARKETS: usize = 3;
/// Markets listed in each expansion section.
pub const TOP_EXPANSION: usize = 5;

// ── Seasonal ──────────────────────────────────────────────────────────────────

/// Revenue of one month, as referenced by the seasonal insight.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthPoint {
    pub month_name: String,
    pub revenue: f64,
}

/// Month-over-month revenue change, in percent. `None` for the first month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthGrowth {
    pub month_name: String,
    pub growth_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonalInsight {
    pub year: i32,
    pub total_revenue: f64,
    pub peak: Option<MonthPoint>,
    pub low: Option<MonthPoint>,
    pub growth: Vec<MonthGrowth>,
    /// Sample standard deviation over mean of monthly revenue, in percent.
    pub coefficient_of_variation: Option<f64>,
    /// October–December share of the year's revenue, in percent.
    pub q4_share: f64,
}

impl SeasonalInsight {
    pub fn from_monthly(year: i32, monthly: &[MonthlyRow]) -> Self {
        let revenues: Vec<f64> = monthly.iter().map(|m| m.total_revenue).collect();
        let total_revenue = sum_of(revenues.iter().copied());

        let point = |m: &MonthlyRow| MonthPoint {
            month_name: m.month_name.clone(),
            revenue: m.total_revenue,
        };
        // First occurrence wins on ties.
        let peak = monthly
            .iter()
            .fold(None::<&MonthlyRow>, |best, m| match best {
                Some(b) if b.total_revenue >= m.total_revenue => Some(b),
                _ => Some(m),
            })
            .map(point);
        let low = monthly
            .iter()
            .fold(None::<&MonthlyRow>, |best, m| match best {
                Some(b) if b.total_revenue <= m.total_revenue => Some(b),
                _ => Some(m),
            })
            .map(point);

        let growth = monthly
            .iter()
            .enumerate()
            .map(|(i, m)| MonthGrowth {
                month_name: m.month_name.clone(),
                growth_pct: i
                    .checked_sub(1)
                    .map(|p| monthly[p].total_revenue)
                    .filter(|prev| *prev != 0.0)
                    .map(|prev| (m.total_revenue - prev) / prev * 100.0),
            })
            .collect();

        let q4_revenue = sum_of(
            monthly
                .iter()
                .filter(|m| m.month >= 10)
                .map(|m| m.total_revenue),
        );

        Self {
            year,
            total_revenue,
            peak,
            low,
            growth,
            coefficient_of_variation: coefficient_of_variation(&revenues),
            q4_share: percentage(q4_revenue, total_revenue, 2),
        }
    }
}

/// Float total starting from `+0.0`; `Iterator::sum` yields `-0.0` when empty.
fn sum_of(values: impl IntoIterator<Item = f64>) -> f64 {
    values.into_iter().fold(0.0, |acc, v| acc + v)
}

/// Sample standard deviation divided by the mean, in percent.
///
/// `None` with fewer than two values or a zero mean.
pub fn coefficient_of_variation(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if mean == 0.0 {
        return None;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(variance.sqrt() / mean * 100.0)
}

// ── International markets ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketInsight {
    pub top_markets: Vec<CountryRow>,
    /// Revenue of the listed markets as a share of the top-N markets.
    pub top_share: f64,
}

impl MarketInsight {
    pub fn from_countries(countries: &[CountryRow], top_n: usize) -> Self {
        let top_n_revenue = sum_of(countries.iter().take(top_n).map(|c| c.total_revenue));
        let top_markets: Vec<CountryRow> =
            countries.iter().take(TOP_MARKETS.min(top_n)).cloned().collect();
        let listed = sum_of(top_markets.iter().map(|c| c.total_revenue));
        Self {
            top_share: percentage(listed, top_n_revenue, 2),
            top_markets,
        }
    }
}

// ── Customers ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerInsight {
    pub top_n: usize,
    pub top_revenue: f64,
    /// Top-N revenue as a share of all identified-customer revenue.
    pub top_share: f64,
    pub mean_top_revenue: f64,
    pub mean_top_orders: f64,
    /// Largest single customer's share of identified-customer revenue.
    pub largest_share: f64,
}

impl CustomerInsight {
    pub fn from_customers(customers: &[CustomerRow], top_n: usize) -> Self {
        let all_revenue = sum_of(customers.iter().map(|c| c.total_revenue));
        let top = &customers[..top_n.min(customers.len())];
        let top_revenue = sum_of(top.iter().map(|c| c.total_revenue));
        let top_orders: u64 = top.iter().map(|c| c.unique_orders).sum();
        let count = top.len().max(1) as f64;

        Self {
            top_n: top.len(),
            top_revenue,
            top_share: percentage(top_revenue, all_revenue, 2),
            mean_top_revenue: top_revenue / count,
            mean_top_orders: top_orders as f64 / count,
            largest_share: percentage(
                top.first().map(|c| c.total_revenue).unwrap_or(0.0),
                all_revenue,
                2,
            ),
        }
    }
}

// ── Expansion ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpansionInsight {
    pub high_demand: Vec<DemandRow>,
    pub top_scores: Vec<ExpansionRow>,
}

impl ExpansionInsight {
    pub fn from_reports(demand: &[DemandRow], expansion: &[ExpansionRow]) -> Self {
        Self {
            high_demand: demand.iter().take(TOP_EXPANSION).cloned().collect(),
            top_scores: expansion.iter().take(TOP_EXPANSION).cloned().collect(),
        }
    }
}

// ── Overall ───────────────────────────────────────────────────────────────────

/// Whole-dataset totals over the enriched table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverallInsight {
    pub records: usize,
    pub total_revenue: f64,
    pub total_quantity: i64,
    pub international_revenue: f64,
    pub international_share: f64,
    pub unique_orders: usize,
    pub unique_customers: usize,
    pub unique_countries: usize,
    pub unique_products: usize,
    pub first_invoice: Option<NaiveDateTime>,
    pub last_invoice: Option<NaiveDateTime>,
}

impl OverallInsight {
    pub fn from_records(records: &[EnrichedRecord]) -> Self {
        let mut orders = HashSet::new();
        let mut customers = HashSet::new();
        let mut countries = HashSet::new();
        let mut products = HashSet::new();
        let mut total_revenue = 0.0;
        let mut international_revenue = 0.0;
        let mut total_quantity = 0i64;
        let mut first_invoice: Option<NaiveDateTime> = None;
        let mut last_invoice: Option<NaiveDateTime> = None;

        for r in records {
            let t = &r.transaction;
            orders.insert(t.invoice_no.as_str());
            if let Some(id) = t.customer_id {
                customers.insert(id);
            }
            countries.insert(t.country.as_str());
            products.insert(t.stock_code.as_str());

            total_revenue += r.revenue;
            total_quantity = total_quantity.saturating_add(t.quantity);
            if !r.is_domestic() {
                international_revenue += r.revenue;
            }

            first_invoice = Some(first_invoice.map_or(t.invoice_date, |d| d.min(t.invoice_date)));
            last_invoice = Some(last_invoice.map_or(t.invoice_date, |d| d.max(t.invoice_date)));
        }

        Self {
            records: records.len(),
            total_revenue,
            total_quantity,
            international_revenue,
            international_share: percentage(international_revenue, total_revenue, 2),
            unique_orders: orders.len(),
            unique_customers: customers.len(),
            unique_countries: countries.len(),
            unique_products: products.len(),
            first_invoice,
            last_invoice,
        }
    }
}

// ── BusinessInsights ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BusinessInsights {
    pub seasonal: SeasonalInsight,
    pub markets: MarketInsight,
    pub customers: CustomerInsight,
    pub expansion: ExpansionInsight,
    pub overall: OverallInsight,
}

pub fn derive_insights(
    records: &[EnrichedRecord],
    reports: &BusinessReports,
    config: &AnalysisConfig,
) -> BusinessInsights {
    BusinessInsights {
        seasonal: SeasonalInsight::from_monthly(config.analysis_year, &reports.monthly),
        markets: MarketInsight::from_countries(&reports.countries, config.top_n),
        customers: CustomerInsight::from_customers(&reports.customers, config.top_n),
        expansion: ExpansionInsight::from_reports(&reports.demand, &reports.expansion),
        overall: OverallInsight::from_records(records),
    }
}
