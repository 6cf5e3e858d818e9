//! Derived analysis columns.
//!
//! Turns cleaned transactions into [`EnrichedRecord`]s: revenue, calendar
//! decomposition, customer key, stock-code category, domestic/international
//! split and the revenue and quantity buckets.

use std::sync::OnceLock;

use regex::Regex;
use retail_core::calendar::CalendarParts;
use retail_core::config::AnalysisConfig;
use retail_core::models::{CountryGroup, EnrichedRecord, Transaction};
use retail_core::{AnalysisError, Result};
use tracing::debug;

/// Category used for stock codes that do not start with a letter.
pub const NUMERIC_CATEGORY: &str = "Numeric";

fn category_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z]+").expect("regex is valid"))
}

/// Maximal leading run of ASCII letters, or [`NUMERIC_CATEGORY`].
///
/// ```
/// use retail_data::enricher::stock_code_category;
///
/// assert_eq!(stock_code_category("85123A"), "Numeric");
/// assert_eq!(stock_code_category("POST"), "POST");
/// ```
pub fn stock_code_category(code: &str) -> String {
    category_pattern()
        .find(code.trim())
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| NUMERIC_CATEGORY.to_string())
}

/// Applies the configured derivations to cleaned rows.
pub struct Enricher<'a> {
    config: &'a AnalysisConfig,
}

impl<'a> Enricher<'a> {
    pub fn new(config: &'a AnalysisConfig) -> Self {
        Self { config }
    }

    /// Enrich every row, failing on the first row that falls outside a
    /// bucket scheme's domain.
    ///
    /// Row numbers in errors are 1-based positions in `transactions`.
    pub fn enrich(&self, transactions: &[Transaction]) -> Result<Vec<EnrichedRecord>> {
        let records = transactions
            .iter()
            .enumerate()
            .map(|(i, t)| self.enrich_one(t, i + 1))
            .collect::<Result<Vec<_>>>()?;

        debug!(
            "Enriched {} rows ({} domestic)",
            records.len(),
            records.iter().filter(|r| r.is_domestic()).count()
        );
        Ok(records)
    }

    fn enrich_one(&self, t: &Transaction, row: usize) -> Result<EnrichedRecord> {
        let revenue = t.quantity as f64 * t.unit_price;

        let revenue_bucket = self
            .config
            .revenue_buckets
            .assign(revenue)
            .ok_or_else(|| {
                AnalysisError::malformed(
                    row,
                    "Revenue",
                    revenue.to_string(),
                    "outside the revenue bucket range",
                )
            })?
            .to_string();
        let quantity_bucket = self
            .config
            .quantity_buckets
            .assign(t.quantity as f64)
            .ok_or_else(|| {
                AnalysisError::malformed(
                    row,
                    "Quantity",
                    t.quantity.to_string(),
                    "outside the quantity bucket range",
                )
            })?
            .to_string();

        let country_group = if self.config.is_domestic(&t.country) {
            CountryGroup::Domestic
        } else {
            CountryGroup::International
        };

        Ok(EnrichedRecord {
            revenue,
            calendar: CalendarParts::from_datetime(&t.invoice_date),
            customer: t.customer_id.into(),
            stock_category: stock_code_category(&t.stock_code),
            country_group,
            revenue_bucket,
            quantity_bucket,
            transaction: t.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use retail_core::models::CustomerKey;

    fn tx(stock: &str, quantity: i64, unit_price: f64, country: &str) -> Transaction {
        Transaction {
            invoice_no: "536365".to_string(),
            stock_code: stock.to_string(),
            description: Some("ITEM".to_string()),
            quantity,
            unit_price,
            invoice_date: NaiveDate::from_ymd_opt(2011, 3, 1)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
            customer_id: Some(12345),
            country: country.to_string(),
        }
    }

    #[test]
    fn test_stock_code_category() {
        assert_eq!(stock_code_category("85123A"), "Numeric");
        assert_eq!(stock_code_category("POST"), "POST");
        assert_eq!(stock_code_category("DCGS0003"), "DCGS");
        assert_eq!(stock_code_category("C2"), "C");
        assert_eq!(stock_code_category(""), "Numeric");
    }

    #[test]
    fn test_enrich_derives_columns() {
        let config = AnalysisConfig::default();
        let records = Enricher::new(&config)
            .enrich(&[tx("85123A", 6, 2.55, "United Kingdom"), tx("POST", 1, 18.0, "France")])
            .expect("enrich");

        let uk = &records[0];
        assert!((uk.revenue - 6.0 * 2.55).abs() < 1e-12);
        assert_eq!(uk.stock_category, "Numeric");
        assert_eq!(uk.country_group, CountryGroup::Domestic);
        assert_eq!(uk.customer, CustomerKey::Known(12345));
        assert_eq!(uk.calendar.year_month, "2011-03");
        assert_eq!(uk.revenue_bucket, "Medium (£10-50)");
        assert_eq!(uk.quantity_bucket, "Medium (6-20)");

        let fr = &records[1];
        assert_eq!(fr.stock_category, "POST");
        assert_eq!(fr.country_group, CountryGroup::International);
        assert_eq!(fr.quantity_bucket, "Small (1-5)");
    }

    #[test]
    fn test_revenue_is_quantity_times_price() {
        let config = AnalysisConfig::default();
        let rows = vec![tx("A", 3, 0.85, "EIRE"), tx("B", 12, 1.25, "EIRE")];
        let records = Enricher::new(&config).enrich(&rows).expect("enrich");
        for (r, t) in records.iter().zip(&rows) {
            assert_eq!(r.revenue, t.quantity as f64 * t.unit_price);
        }
    }

    #[test]
    fn test_revenue_bucket_boundaries() {
        let config = AnalysisConfig::default();
        let records = Enricher::new(&config)
            .enrich(&[tx("A", 1, 10.0, "Spain"), tx("A", 1, 10.01, "Spain")])
            .expect("enrich");
        assert_eq!(records[0].revenue_bucket, "Low (£0-10)");
        assert_eq!(records[1].revenue_bucket, "Medium (£10-50)");
    }

    #[test]
    fn test_domestic_match_is_case_sensitive() {
        let config = AnalysisConfig::default();
        let records = Enricher::new(&config)
            .enrich(&[tx("A", 1, 1.0, "united kingdom")])
            .expect("enrich");
        assert_eq!(records[0].country_group, CountryGroup::International);
    }

    #[test]
    fn test_missing_customer_becomes_unknown() {
        let config = AnalysisConfig::default();
        let mut row = tx("A", 1, 1.0, "Spain");
        row.customer_id = None;
        let records = Enricher::new(&config).enrich(&[row]).expect("enrich");
        assert_eq!(records[0].customer, CustomerKey::Unknown);
        assert!(!records[0].has_customer_id());
    }

    #[test]
    fn test_out_of_domain_value_is_malformed() {
        let config = AnalysisConfig::default();
        let err = Enricher::new(&config)
            .enrich(&[tx("A", 2, 1.0, "Spain"), tx("A", 0, 1.0, "Spain")])
            .unwrap_err();
        match err {
            AnalysisError::MalformedRecord { row, column, .. } => {
                assert_eq!(row, 2);
                assert_eq!(column, "Revenue");
            }
            other => panic!("expected MalformedRecord, got {other:?}"),
        }
    }
}
