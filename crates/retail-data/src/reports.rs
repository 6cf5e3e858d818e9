//! The four business reports plus the expansion ranking.
//!
//! Each report is one [`Aggregator`] pass converted into typed rows whose
//! serde names are the exported column headers.

use retail_core::config::AnalysisConfig;
use retail_core::models::{EnrichedRecord, Field, Value};
use retail_core::Result;
use serde::Serialize;
use tracing::{debug, warn};

use crate::aggregator::{AggregateRow, AggregateTable, Aggregator, SortOrder, TieBreak};

// ── Row types ─────────────────────────────────────────────────────────────────

/// Revenue and activity for one month of the analysis year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyRow {
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "Month")]
    pub month: u32,
    #[serde(rename = "MonthName")]
    pub month_name: String,
    #[serde(rename = "YearMonth")]
    pub year_month: String,
    #[serde(rename = "Total_Revenue")]
    pub total_revenue: f64,
    #[serde(rename = "Total_Quantity")]
    pub total_quantity: i64,
    #[serde(rename = "Unique_Orders")]
    pub unique_orders: u64,
    #[serde(rename = "Unique_Customers")]
    pub unique_customers: u64,
}

/// Revenue ranking of one international market.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryRow {
    #[serde(rename = "Country")]
    pub country: String,
    #[serde(rename = "Total_Revenue")]
    pub total_revenue: f64,
    #[serde(rename = "Total_Quantity")]
    pub total_quantity: i64,
    #[serde(rename = "Unique_Orders")]
    pub unique_orders: u64,
    #[serde(rename = "Unique_Customers")]
    pub unique_customers: u64,
    #[serde(rename = "Revenue_Rank")]
    pub revenue_rank: u32,
}

/// Revenue ranking of one identified customer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerRow {
    #[serde(rename = "CustomerID")]
    pub customer_id: u64,
    #[serde(rename = "Total_Revenue")]
    pub total_revenue: f64,
    #[serde(rename = "Total_Quantity")]
    pub total_quantity: i64,
    #[serde(rename = "Unique_Orders")]
    pub unique_orders: u64,
    #[serde(rename = "Country")]
    pub country: String,
    #[serde(rename = "Revenue_Rank")]
    pub revenue_rank: u32,
}

/// Unit demand of one international market.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemandRow {
    #[serde(rename = "Country")]
    pub country: String,
    #[serde(rename = "Total_Quantity_Demanded")]
    pub total_quantity: i64,
    #[serde(rename = "Total_Revenue")]
    pub total_revenue: f64,
    #[serde(rename = "Unique_Orders")]
    pub unique_orders: u64,
    #[serde(rename = "Unique_Customers")]
    pub unique_customers: u64,
    #[serde(rename = "Unique_Products")]
    pub unique_products: u64,
    #[serde(rename = "Demand_Rank")]
    pub demand_rank: u32,
    #[serde(rename = "Avg_Order_Value")]
    pub avg_order_value: f64,
    #[serde(rename = "Avg_Quantity_Per_Order")]
    pub avg_quantity_per_order: f64,
}

/// Composite expansion score of one international market.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpansionRow {
    #[serde(rename = "Country")]
    pub country: String,
    #[serde(rename = "Total_Quantity")]
    pub total_quantity: i64,
    #[serde(rename = "Total_Revenue")]
    pub total_revenue: f64,
    #[serde(rename = "Unique_Orders")]
    pub unique_orders: u64,
    #[serde(rename = "Unique_Customers")]
    pub unique_customers: u64,
    #[serde(rename = "Avg_Order_Value")]
    pub avg_order_value: f64,
    #[serde(rename = "Customer_Penetration")]
    pub customer_penetration: f64,
    #[serde(rename = "Expansion_Score")]
    pub expansion_score: f64,
}

/// All report tables of one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BusinessReports {
    pub monthly: Vec<MonthlyRow>,
    /// Every international market, ranked by revenue.
    pub countries: Vec<CountryRow>,
    /// Every identified customer, ranked by revenue.
    pub customers: Vec<CustomerRow>,
    /// Every international market, ranked by units.
    pub demand: Vec<DemandRow>,
    /// Every international market, ranked by expansion score.
    pub expansion: Vec<ExpansionRow>,
}

/// Build every report from the enriched table.
pub fn build_reports(records: &[EnrichedRecord], config: &AnalysisConfig) -> Result<BusinessReports> {
    let reports = BusinessReports {
        monthly: monthly_report(records, config.analysis_year)?,
        countries: country_report(records)?,
        customers: customer_report(records)?,
        demand: demand_report(records)?,
        expansion: expansion_report(records, config)?,
    };
    debug!(
        "Built reports: {} months, {} countries, {} customers",
        reports.monthly.len(),
        reports.countries.len(),
        reports.customers.len()
    );
    Ok(reports)
}

// ── Report builders ───────────────────────────────────────────────────────────

/// Monthly totals for `year`, ordered by month.
pub fn monthly_report(records: &[EnrichedRecord], year: i32) -> Result<Vec<MonthlyRow>> {
    let table = Aggregator::group_by([Field::Year, Field::Month, Field::MonthName, Field::YearMonth])
        .filter(move |r| r.calendar.year == year)
        .sum("Total_Revenue", Field::Revenue)
        .sum("Total_Quantity", Field::Quantity)
        .distinct("Unique_Orders", Field::InvoiceNo)
        .distinct("Unique_Customers", Field::CustomerId)
        .run(records)?
        .sort_by_key();

    if table.is_empty() {
        warn!("No transactions fall in analysis year {year}");
    }

    let cols = Columns::new(
        &table,
        &["Total_Revenue", "Total_Quantity", "Unique_Orders", "Unique_Customers"],
    )?;
    Ok(table
        .rows()
        .iter()
        .map(|row| MonthlyRow {
            year: int(&row.key[0]) as i32,
            month: int(&row.key[1]) as u32,
            month_name: row.key[2].to_string(),
            year_month: row.key[3].to_string(),
            total_revenue: cols.float(row, 0),
            total_quantity: cols.int(row, 1),
            unique_orders: cols.count(row, 2),
            unique_customers: cols.count(row, 3),
        })
        .collect())
}

/// International markets by revenue, descending.
pub fn country_report(records: &[EnrichedRecord]) -> Result<Vec<CountryRow>> {
    let table = Aggregator::group_by([Field::Country])
        .filter(|r| !r.is_domestic())
        .sum("Total_Revenue", Field::Revenue)
        .sum("Total_Quantity", Field::Quantity)
        .distinct("Unique_Orders", Field::InvoiceNo)
        .distinct("Unique_Customers", Field::CustomerId)
        .run(records)?
        .sort_by("Total_Revenue", SortOrder::Descending, TieBreak::KeyAscending)?
        .assign_rank("Revenue_Rank");

    let cols = Columns::new(
        &table,
        &[
            "Total_Revenue",
            "Total_Quantity",
            "Unique_Orders",
            "Unique_Customers",
            "Revenue_Rank",
        ],
    )?;
    Ok(table
        .rows()
        .iter()
        .map(|row| CountryRow {
            country: row.key[0].to_string(),
            total_revenue: cols.float(row, 0),
            total_quantity: cols.int(row, 1),
            unique_orders: cols.count(row, 2),
            unique_customers: cols.count(row, 3),
            revenue_rank: cols.int(row, 4) as u32,
        })
        .collect())
}

/// Identified customers by revenue, descending, with the first country each
/// was seen in.
pub fn customer_report(records: &[EnrichedRecord]) -> Result<Vec<CustomerRow>> {
    let table = Aggregator::group_by([Field::CustomerId])
        .filter(|r| r.has_customer_id())
        .sum("Total_Revenue", Field::Revenue)
        .sum("Total_Quantity", Field::Quantity)
        .distinct("Unique_Orders", Field::InvoiceNo)
        .first("Country", Field::Country)
        .run(records)?
        .sort_by("Total_Revenue", SortOrder::Descending, TieBreak::KeyAscending)?
        .assign_rank("Revenue_Rank");

    let cols = Columns::new(
        &table,
        &[
            "Total_Revenue",
            "Total_Quantity",
            "Unique_Orders",
            "Country",
            "Revenue_Rank",
        ],
    )?;
    Ok(table
        .rows()
        .iter()
        .map(|row| CustomerRow {
            customer_id: int(&row.key[0]) as u64,
            total_revenue: cols.float(row, 0),
            total_quantity: cols.int(row, 1),
            unique_orders: cols.count(row, 2),
            country: cols.text(row, 3),
            revenue_rank: cols.int(row, 4) as u32,
        })
        .collect())
}

/// International markets by units, descending.
pub fn demand_report(records: &[EnrichedRecord]) -> Result<Vec<DemandRow>> {
    let table = international_base(records)?
        .sort_by("Total_Quantity", SortOrder::Descending, TieBreak::KeyAscending)?
        .assign_rank("Demand_Rank")
        .derive_ratio("Avg_Order_Value", "Total_Revenue", "Unique_Orders")?
        .derive_ratio("Avg_Quantity_Per_Order", "Total_Quantity", "Unique_Orders")?;

    let cols = Columns::new(
        &table,
        &[
            "Total_Quantity",
            "Total_Revenue",
            "Unique_Orders",
            "Unique_Customers",
            "Unique_Products",
            "Demand_Rank",
            "Avg_Order_Value",
            "Avg_Quantity_Per_Order",
        ],
    )?;
    Ok(table
        .rows()
        .iter()
        .map(|row| DemandRow {
            country: row.key[0].to_string(),
            total_quantity: cols.int(row, 0),
            total_revenue: cols.float(row, 1),
            unique_orders: cols.count(row, 2),
            unique_customers: cols.count(row, 3),
            unique_products: cols.count(row, 4),
            demand_rank: cols.int(row, 5) as u32,
            avg_order_value: cols.float(row, 6),
            avg_quantity_per_order: cols.float(row, 7),
        })
        .collect())
}

/// International markets by composite expansion score, descending.
pub fn expansion_report(
    records: &[EnrichedRecord],
    config: &AnalysisConfig,
) -> Result<Vec<ExpansionRow>> {
    let w = config.expansion_weights;
    let table = international_base(records)?
        .derive_ratio("Avg_Order_Value", "Total_Revenue", "Unique_Orders")?
        .derive_ratio("Customer_Penetration", "Unique_Customers", "Unique_Orders")?
        .derive_composite_score(
            "Expansion_Score",
            &[
                ("Total_Quantity", w.quantity),
                ("Total_Revenue", w.revenue),
                ("Avg_Order_Value", w.avg_order_value),
            ],
        )?
        .sort_by("Expansion_Score", SortOrder::Descending, TieBreak::KeyAscending)?;

    let cols = Columns::new(
        &table,
        &[
            "Total_Quantity",
            "Total_Revenue",
            "Unique_Orders",
            "Unique_Customers",
            "Avg_Order_Value",
            "Customer_Penetration",
            "Expansion_Score",
        ],
    )?;
    Ok(table
        .rows()
        .iter()
        .map(|row| ExpansionRow {
            country: row.key[0].to_string(),
            total_quantity: cols.int(row, 0),
            total_revenue: cols.float(row, 1),
            unique_orders: cols.count(row, 2),
            unique_customers: cols.count(row, 3),
            avg_order_value: cols.float(row, 4),
            customer_penetration: cols.float(row, 5),
            expansion_score: cols.float(row, 6),
        })
        .collect())
}

fn international_base(records: &[EnrichedRecord]) -> Result<AggregateTable> {
    Aggregator::group_by([Field::Country])
        .filter(|r| !r.is_domestic())
        .sum("Total_Quantity", Field::Quantity)
        .sum("Total_Revenue", Field::Revenue)
        .distinct("Unique_Orders", Field::InvoiceNo)
        .distinct("Unique_Customers", Field::CustomerId)
        .distinct("Unique_Products", Field::StockCode)
        .run(records)
}

// ── Row decoding ──────────────────────────────────────────────────────────────

/// Metric positions resolved once per table.
struct Columns(Vec<usize>);

impl Columns {
    fn new(table: &AggregateTable, names: &[&str]) -> Result<Self> {
        names
            .iter()
            .map(|n| table.column(n))
            .collect::<Result<Vec<_>>>()
            .map(Columns)
    }

    fn value<'r>(&self, row: &'r AggregateRow, i: usize) -> &'r Value {
        &row.values[self.0[i]]
    }

    fn float(&self, row: &AggregateRow, i: usize) -> f64 {
        self.value(row, i).as_f64().unwrap_or(0.0)
    }

    fn int(&self, row: &AggregateRow, i: usize) -> i64 {
        int(self.value(row, i))
    }

    fn count(&self, row: &AggregateRow, i: usize) -> u64 {
        self.int(row, i).max(0) as u64
    }

    fn text(&self, row: &AggregateRow, i: usize) -> String {
        self.value(row, i).to_string()
    }
}

fn int(value: &Value) -> i64 {
    match value {
        Value::Int(i) => *i,
        Value::Float(f) => *f as i64,
        _ => 0,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaner::clean;
    use crate::enricher::Enricher;
    use chrono::NaiveDate;
    use retail_core::models::Transaction;

    fn tx(
        invoice: &str,
        stock: &str,
        customer: Option<u64>,
        country: &str,
        qty: i64,
        price: f64,
        (y, m, d): (i32, u32, u32),
    ) -> Transaction {
        Transaction {
            invoice_no: invoice.to_string(),
            stock_code: stock.to_string(),
            description: None,
            quantity: qty,
            unit_price: price,
            invoice_date: NaiveDate::from_ymd_opt(y, m, d)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
            customer_id: customer,
            country: country.to_string(),
        }
    }

    fn enriched(rows: Vec<Transaction>) -> Vec<EnrichedRecord> {
        let cleaned = clean(rows);
        Enricher::new(&AnalysisConfig::default())
            .enrich(&cleaned.records)
            .expect("enrich")
    }

    fn sample() -> Vec<EnrichedRecord> {
        enriched(vec![
            tx("1", "A1", Some(100), "United Kingdom", 10, 3.0, (2011, 1, 5)),
            tx("2", "A1", Some(200), "Germany", 2, 5.0, (2011, 3, 1)),
            tx("3", "B2", Some(200), "Germany", 1, 10.0, (2011, 3, 5)),
            tx("4", "A1", Some(300), "France", 20, 1.0, (2011, 2, 7)),
            tx("4", "C3", Some(300), "France", 5, 2.0, (2011, 2, 7)),
            tx("5", "A1", None, "Spain", 1, 4.0, (2010, 12, 1)),
        ])
    }

    #[test]
    fn test_reference_scenario() {
        let records = enriched(vec![
            tx("1", "X", Some(1), "Germany", 2, 5.0, (2011, 3, 1)),
            tx("2", "X", Some(1), "Germany", -1, 5.0, (2011, 3, 2)),
            tx("3", "X", Some(2), "France", 3, 0.0, (2011, 3, 3)),
            tx("4", "X", Some(1), "Germany", 1, 10.0, (2011, 3, 5)),
        ]);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].revenue, 10.0);
        assert_eq!(records[1].revenue, 10.0);

        let countries = country_report(&records).unwrap();
        assert_eq!(countries.len(), 1);
        assert_eq!(countries[0].country, "Germany");
        assert_eq!(countries[0].total_revenue, 20.0);
        assert_eq!(countries[0].total_quantity, 3);
        assert_eq!(countries[0].unique_orders, 2);
        assert_eq!(countries[0].revenue_rank, 1);
    }

    #[test]
    fn test_monthly_report_filters_year_and_sorts_by_month() {
        let monthly = monthly_report(&sample(), 2011).unwrap();
        let months: Vec<u32> = monthly.iter().map(|m| m.month).collect();
        assert_eq!(months, vec![1, 2, 3]);
        assert_eq!(monthly[1].month_name, "February");
        assert_eq!(monthly[1].year_month, "2011-02");
        assert_eq!(monthly[1].total_quantity, 25);
        assert_eq!(monthly[1].unique_orders, 1);
        assert!((monthly[2].total_revenue - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_monthly_report_empty_year() {
        assert!(monthly_report(&sample(), 1999).unwrap().is_empty());
    }

    #[test]
    fn test_country_report_excludes_domestic() {
        let countries = country_report(&sample()).unwrap();
        assert!(countries.iter().all(|c| c.country != "United Kingdom"));
        let names: Vec<&str> = countries.iter().map(|c| c.country.as_str()).collect();
        // France 30, Germany 20, Spain 4
        assert_eq!(names, vec!["France", "Germany", "Spain"]);
        let ranks: Vec<u32> = countries.iter().map(|c| c.revenue_rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
        assert_eq!(countries[2].unique_customers, 0);
    }

    #[test]
    fn test_customer_report() {
        let customers = customer_report(&sample()).unwrap();
        assert_eq!(customers.len(), 3);
        assert_eq!(customers[0].customer_id, 100);
        assert_eq!(customers[0].country, "United Kingdom");
        assert_eq!(customers[1].customer_id, 300);
        assert_eq!(customers[1].unique_orders, 1);
        assert_eq!(customers[2].customer_id, 200);
        assert_eq!(customers[2].revenue_rank, 3);
    }

    #[test]
    fn test_customer_revenue_conservation() {
        let records = sample();
        let customers = customer_report(&records).unwrap();
        let grouped: f64 = customers.iter().map(|c| c.total_revenue).sum();
        let direct: f64 = records
            .iter()
            .filter(|r| r.has_customer_id())
            .map(|r| r.revenue)
            .sum();
        assert!((grouped - direct).abs() < 1e-9);
    }

    #[test]
    fn test_demand_report() {
        let demand = demand_report(&sample()).unwrap();
        assert_eq!(demand[0].country, "France");
        assert_eq!(demand[0].total_quantity, 25);
        assert_eq!(demand[0].unique_products, 2);
        assert_eq!(demand[0].demand_rank, 1);
        assert!((demand[0].avg_order_value - 30.0).abs() < 1e-9);
        assert!((demand[0].avg_quantity_per_order - 25.0).abs() < 1e-9);
        assert_eq!(demand[1].country, "Germany");
        assert!((demand[1].avg_order_value - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_expansion_report_scores() {
        let expansion = expansion_report(&sample(), &AnalysisConfig::default()).unwrap();
        assert_eq!(expansion.len(), 3);
        // France holds the maximum of quantity, revenue and order value.
        assert_eq!(expansion[0].country, "France");
        assert_eq!(expansion[0].expansion_score, 1.0);
        for row in &expansion {
            assert!((0.0..=1.0).contains(&row.expansion_score));
        }
        assert!((expansion[1].customer_penetration - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_reports_with_only_domestic_rows() {
        let records = enriched(vec![tx(
            "1",
            "A",
            Some(1),
            "United Kingdom",
            1,
            1.0,
            (2011, 1, 1),
        )]);
        let reports = build_reports(&records, &AnalysisConfig::default()).unwrap();
        assert!(reports.countries.is_empty());
        assert!(reports.demand.is_empty());
        assert!(reports.expansion.is_empty());
        assert_eq!(reports.customers.len(), 1);
    }
}
