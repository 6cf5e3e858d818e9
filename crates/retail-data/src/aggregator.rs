//! Generic group-by over enriched records.
//!
//! One [`Aggregator`] call groups rows by one or more [`Field`]s and applies
//! named reductions. The resulting [`AggregateTable`] is then ordered and
//! decorated (rank, ratios, composite score, top-N) by consuming methods
//! that each return a new table.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use retail_core::models::{EnrichedRecord, Field, Value};
use retail_core::{AnalysisError, Result};

// ── Reductions ────────────────────────────────────────────────────────────────

/// How a metric column is reduced over the rows of one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    /// Numeric sum; missing values are skipped.
    Sum(Field),
    /// Number of distinct non-missing values.
    DistinctCount(Field),
    /// First non-missing value in input order.
    First(Field),
}

/// A named reduction producing one metric column.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSpec {
    pub name: String,
    pub reduction: Reduction,
}

enum Accumulator {
    Sum { int: i64, float: f64, saw_float: bool },
    Distinct(HashSet<Value>),
    First(Option<Value>),
}

impl Accumulator {
    fn new(reduction: Reduction) -> Self {
        match reduction {
            Reduction::Sum(_) => Accumulator::Sum {
                int: 0,
                float: 0.0,
                saw_float: false,
            },
            Reduction::DistinctCount(_) => Accumulator::Distinct(HashSet::new()),
            Reduction::First(_) => Accumulator::First(None),
        }
    }

    /// Fold one value in. `None` when an integer sum overflows `i64`.
    fn add(&mut self, value: Value) -> Option<()> {
        match self {
            Accumulator::Sum {
                int,
                float,
                saw_float,
            } => match value {
                Value::Int(i) => *int = int.checked_add(i)?,
                Value::Float(f) => {
                    *float += f;
                    *saw_float = true;
                }
                _ => {}
            },
            Accumulator::Distinct(seen) => {
                if !value.is_missing() {
                    seen.insert(value);
                }
            }
            Accumulator::First(slot) => {
                if slot.is_none() && !value.is_missing() {
                    *slot = Some(value);
                }
            }
        }
        Some(())
    }

    fn finish(self) -> Value {
        match self {
            Accumulator::Sum {
                int,
                float,
                saw_float,
            } => {
                if saw_float {
                    Value::Float(int as f64 + float)
                } else {
                    Value::Int(int)
                }
            }
            Accumulator::Distinct(seen) => Value::Int(seen.len() as i64),
            Accumulator::First(slot) => slot.unwrap_or(Value::Missing),
        }
    }
}

fn is_summable(field: Field) -> bool {
    matches!(
        field,
        Field::Quantity
            | Field::UnitPrice
            | Field::Revenue
            | Field::Year
            | Field::Month
            | Field::Quarter
            | Field::WeekOfYear
    )
}

// ── Aggregator ────────────────────────────────────────────────────────────────

type RowFilter<'a> = Box<dyn Fn(&EnrichedRecord) -> bool + 'a>;

/// Builder for a single group-by pass.
///
/// ```
/// use retail_core::models::Field;
/// use retail_data::aggregator::Aggregator;
///
/// let table = Aggregator::group_by([Field::Country])
///     .sum("Total_Revenue", Field::Revenue)
///     .distinct("Unique_Orders", Field::InvoiceNo)
///     .run(&[])
///     .unwrap();
/// assert!(table.is_empty());
/// ```
pub struct Aggregator<'a> {
    keys: Vec<Field>,
    metrics: Vec<MetricSpec>,
    filter: Option<RowFilter<'a>>,
}

impl<'a> Aggregator<'a> {
    pub fn group_by(keys: impl IntoIterator<Item = Field>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
            metrics: Vec::new(),
            filter: None,
        }
    }

    /// Only aggregate rows for which `predicate` holds.
    pub fn filter(mut self, predicate: impl Fn(&EnrichedRecord) -> bool + 'a) -> Self {
        self.filter = Some(Box::new(predicate));
        self
    }

    pub fn metric(mut self, name: impl Into<String>, reduction: Reduction) -> Self {
        self.metrics.push(MetricSpec {
            name: name.into(),
            reduction,
        });
        self
    }

    pub fn sum(self, name: impl Into<String>, field: Field) -> Self {
        self.metric(name, Reduction::Sum(field))
    }

    pub fn distinct(self, name: impl Into<String>, field: Field) -> Self {
        self.metric(name, Reduction::DistinctCount(field))
    }

    pub fn first(self, name: impl Into<String>, field: Field) -> Self {
        self.metric(name, Reduction::First(field))
    }

    /// Group `records` and reduce each group. Groups appear in the order
    /// their key was first seen.
    pub fn run(self, records: &[EnrichedRecord]) -> Result<AggregateTable> {
        if self.keys.is_empty() {
            return Err(AnalysisError::Config(
                "aggregation needs at least one key field".to_string(),
            ));
        }
        for spec in &self.metrics {
            if let Reduction::Sum(field) = spec.reduction {
                if !is_summable(field) {
                    return Err(AnalysisError::Config(format!(
                        "metric {} cannot sum non-numeric field {}",
                        spec.name, field
                    )));
                }
            }
        }

        let mut index: HashMap<Vec<Value>, usize> = HashMap::new();
        let mut groups: Vec<(Vec<Value>, Vec<Accumulator>)> = Vec::new();

        for record in records {
            if let Some(predicate) = &self.filter {
                if !predicate(record) {
                    continue;
                }
            }

            let key: Vec<Value> = self.keys.iter().map(|f| record.value(*f)).collect();
            let slot = match index.get(&key) {
                Some(&slot) => slot,
                None => {
                    let accumulators = self
                        .metrics
                        .iter()
                        .map(|m| Accumulator::new(m.reduction))
                        .collect();
                    groups.push((key.clone(), accumulators));
                    index.insert(key, groups.len() - 1);
                    groups.len() - 1
                }
            };

            let accumulators = &mut groups[slot].1;
            for (acc, spec) in accumulators.iter_mut().zip(&self.metrics) {
                let field = match spec.reduction {
                    Reduction::Sum(f) | Reduction::DistinctCount(f) | Reduction::First(f) => f,
                };
                acc.add(record.value(field)).ok_or_else(|| {
                    AnalysisError::DegenerateAggregation(format!(
                        "metric {} overflows a 64-bit integer",
                        spec.name
                    ))
                })?;
            }
        }

        let rows = groups
            .into_iter()
            .map(|(key, accumulators)| AggregateRow {
                key,
                values: accumulators.into_iter().map(Accumulator::finish).collect(),
            })
            .collect();

        Ok(AggregateTable {
            key_names: self.keys.iter().map(|f| f.name().to_string()).collect(),
            metric_names: self.metrics.into_iter().map(|m| m.name).collect(),
            rows,
        })
    }
}

// ── AggregateTable ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Secondary ordering applied when two rows have equal sort metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TieBreak {
    /// Keep the current (first-seen) order.
    InputOrder,
    /// Order tied rows by group key, ascending.
    KeyAscending,
}

/// One output group: its key values and its metric values.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRow {
    pub key: Vec<Value>,
    pub values: Vec<Value>,
}

/// Result of an [`Aggregator`] run.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateTable {
    key_names: Vec<String>,
    metric_names: Vec<String>,
    rows: Vec<AggregateRow>,
}

impl AggregateTable {
    pub fn key_names(&self) -> &[String] {
        &self.key_names
    }

    pub fn metric_names(&self) -> &[String] {
        &self.metric_names
    }

    pub fn rows(&self) -> &[AggregateRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of metric `name` within [`AggregateRow::values`].
    pub fn column(&self, name: &str) -> Result<usize> {
        self.metric_names
            .iter()
            .position(|m| m == name)
            .ok_or_else(|| AnalysisError::UnknownColumn(name.to_string()))
    }

    /// Numeric values of one metric, missing values read as `0.0`.
    pub fn column_f64(&self, name: &str) -> Result<Vec<f64>> {
        let idx = self.column(name)?;
        Ok(self
            .rows
            .iter()
            .map(|r| r.values[idx].as_f64().unwrap_or(0.0))
            .collect())
    }

    /// Sum of one metric over all rows.
    pub fn total(&self, name: &str) -> Result<f64> {
        Ok(self.column_f64(name)?.iter().fold(0.0, |acc, v| acc + v))
    }

    /// Stable sort by one metric.
    pub fn sort_by(mut self, metric: &str, order: SortOrder, tie_break: TieBreak) -> Result<Self> {
        let idx = self.column(metric)?;
        self.rows.sort_by(|a, b| {
            let primary = compare_values(&a.values[idx], &b.values[idx]);
            let primary = match order {
                SortOrder::Ascending => primary,
                SortOrder::Descending => primary.reverse(),
            };
            primary.then_with(|| match tie_break {
                TieBreak::InputOrder => Ordering::Equal,
                TieBreak::KeyAscending => a.key.cmp(&b.key),
            })
        });
        Ok(self)
    }

    /// Stable sort by the group key, ascending.
    pub fn sort_by_key(mut self) -> Self {
        self.rows.sort_by(|a, b| a.key.cmp(&b.key));
        self
    }

    /// Append a 1-based position column reflecting the current order.
    pub fn assign_rank(mut self, name: &str) -> Self {
        for (i, row) in self.rows.iter_mut().enumerate() {
            row.values.push(Value::Int(i as i64 + 1));
        }
        self.metric_names.push(name.to_string());
        self
    }

    /// Append `numerator / denominator` for every row.
    ///
    /// Fails with [`AnalysisError::DegenerateAggregation`] if any row has a
    /// zero denominator.
    pub fn derive_ratio(mut self, name: &str, numerator: &str, denominator: &str) -> Result<Self> {
        let num = self.column(numerator)?;
        let den = self.column(denominator)?;

        let mut ratios = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            let n = row.values[num].as_f64().unwrap_or(0.0);
            let d = row.values[den].as_f64().unwrap_or(0.0);
            if d == 0.0 {
                return Err(AnalysisError::DegenerateAggregation(format!(
                    "{name}: {denominator} is zero for group {}",
                    describe_key(&row.key)
                )));
            }
            ratios.push(n / d);
        }

        for (row, ratio) in self.rows.iter_mut().zip(ratios) {
            row.values.push(Value::Float(ratio));
        }
        self.metric_names.push(name.to_string());
        Ok(self)
    }

    /// Append a weighted blend of max-normalised metrics.
    ///
    /// Each metric is divided by its maximum over the current rows, then the
    /// weighted sum is divided by the total weight, so a row holding the
    /// maximum of every contributing metric scores exactly `1.0`. With
    /// non-negative metrics every score lies in `[0, 1]`.
    pub fn derive_composite_score(mut self, name: &str, weights: &[(&str, f64)]) -> Result<Self> {
        let weight_sum: f64 = weights.iter().map(|(_, w)| w).sum();
        if weights.is_empty() || weights.iter().any(|(_, w)| *w < 0.0) || weight_sum <= 0.0 {
            return Err(AnalysisError::Config(format!(
                "{name}: weights must be non-negative with a positive sum"
            )));
        }

        let mut columns = Vec::with_capacity(weights.len());
        for (metric, weight) in weights {
            let values = self.column_f64(metric)?;
            if !values.is_empty() {
                let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                if max <= 0.0 {
                    return Err(AnalysisError::DegenerateAggregation(format!(
                        "{name}: maximum of {metric} is {max}, cannot normalise"
                    )));
                }
                columns.push((values, max, *weight));
            }
        }

        for (i, row) in self.rows.iter_mut().enumerate() {
            let blended: f64 = columns
                .iter()
                .map(|(values, max, weight)| weight * (values[i] / max))
                .sum();
            row.values.push(Value::Float(blended / weight_sum));
        }
        self.metric_names.push(name.to_string());
        Ok(self)
    }

    /// Keep only the first `n` rows.
    pub fn truncate(mut self, n: usize) -> Self {
        self.rows.truncate(n);
        self
    }
}

/// Numeric values compare numerically across `Int`/`Float`; everything else
/// falls back to [`Value`]'s ordering.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        _ => a.cmp(b),
    }
}

fn describe_key(key: &[Value]) -> String {
    key.iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("/")
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enricher::Enricher;
    use chrono::NaiveDate;
    use retail_core::config::AnalysisConfig;
    use retail_core::models::Transaction;

    fn tx(invoice: &str, customer: Option<u64>, country: &str, qty: i64, price: f64) -> Transaction {
        Transaction {
            invoice_no: invoice.to_string(),
            stock_code: "22000".to_string(),
            description: None,
            quantity: qty,
            unit_price: price,
            invoice_date: NaiveDate::from_ymd_opt(2011, 3, 1)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            customer_id: customer,
            country: country.to_string(),
        }
    }

    fn enrich(rows: &[Transaction]) -> Vec<EnrichedRecord> {
        Enricher::new(&AnalysisConfig::default())
            .enrich(rows)
            .expect("enrich")
    }

    fn sample() -> Vec<EnrichedRecord> {
        enrich(&[
            tx("1", Some(10), "Germany", 2, 5.0),
            tx("2", Some(11), "France", 1, 3.0),
            tx("3", Some(10), "Germany", 1, 10.0),
            tx("3", None, "Germany", 4, 1.0),
            tx("4", None, "Spain", 10, 2.0),
            tx("5", Some(12), "France", 6, 2.5),
        ])
    }

    fn country_table(records: &[EnrichedRecord]) -> AggregateTable {
        Aggregator::group_by([Field::Country])
            .sum("Total_Revenue", Field::Revenue)
            .sum("Total_Quantity", Field::Quantity)
            .distinct("Unique_Orders", Field::InvoiceNo)
            .distinct("Unique_Customers", Field::CustomerId)
            .run(records)
            .expect("aggregate")
    }

    fn keys(table: &AggregateTable) -> Vec<String> {
        table.rows().iter().map(|r| r.key[0].to_string()).collect()
    }

    #[test]
    fn test_groups_in_first_seen_order() {
        let table = country_table(&sample());
        assert_eq!(keys(&table), vec!["Germany", "France", "Spain"]);
        assert_eq!(
            table.metric_names(),
            &["Total_Revenue", "Total_Quantity", "Unique_Orders", "Unique_Customers"]
        );
    }

    #[test]
    fn test_reductions() {
        let table = country_table(&sample());
        let germany = &table.rows()[0];
        assert_eq!(germany.values[0], Value::Float(24.0));
        assert_eq!(germany.values[1], Value::Int(7));
        assert_eq!(germany.values[2], Value::Int(2));
        // Missing customer ids do not count as customers.
        assert_eq!(germany.values[3], Value::Int(1));

        let spain = &table.rows()[2];
        assert_eq!(spain.values[3], Value::Int(0));
    }

    #[test]
    fn test_conservation_of_revenue() {
        let records = sample();
        let table = country_table(&records);
        let grouped = table.total("Total_Revenue").unwrap();
        let direct: f64 = records.iter().map(|r| r.revenue).sum();
        assert!((grouped - direct).abs() < 1e-9);
    }

    #[test]
    fn test_filter_restricts_rows() {
        let records = sample();
        let table = Aggregator::group_by([Field::Country])
            .filter(|r| r.has_customer_id())
            .sum("Total_Revenue", Field::Revenue)
            .run(&records)
            .unwrap();
        assert_eq!(keys(&table), vec!["Germany", "France"]);
        assert_eq!(table.rows()[0].values[0], Value::Float(20.0));
    }

    #[test]
    fn test_first_takes_first_non_missing() {
        let records = sample();
        let table = Aggregator::group_by([Field::InvoiceNo])
            .first("Customer", Field::CustomerId)
            .first("Description", Field::Description)
            .run(&records)
            .unwrap();
        assert_eq!(table.rows()[2].values[0], Value::Int(10));
        assert!(table.rows()[0].values[1].is_missing());
    }

    #[test]
    fn test_multi_field_key() {
        let records = sample();
        let table = Aggregator::group_by([Field::Year, Field::Month, Field::YearMonth])
            .sum("Total_Quantity", Field::Quantity)
            .run(&records)
            .unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.key_names(), &["Year", "Month", "YearMonth"]);
        assert_eq!(table.rows()[0].key[2], Value::Text("2011-03".to_string()));
        assert_eq!(table.rows()[0].values[0], Value::Int(24));
    }

    #[test]
    fn test_sum_of_text_field_is_rejected() {
        let err = Aggregator::group_by([Field::Country])
            .sum("Bad", Field::Description)
            .run(&sample())
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Config(_)));
    }

    #[test]
    fn test_integer_sum_overflow_is_degenerate() {
        let records = enrich(&[
            tx("1", Some(10), "Germany", i64::MAX, 1.0),
            tx("2", Some(10), "Germany", 1, 1.0),
        ]);
        let err = Aggregator::group_by([Field::Country])
            .sum("Total_Quantity", Field::Quantity)
            .run(&records)
            .unwrap_err();
        assert!(matches!(err, AnalysisError::DegenerateAggregation(ref m) if m.contains("Total_Quantity")));
    }

    #[test]
    fn test_unknown_column() {
        let table = country_table(&sample());
        let err = table.sort_by("Nope", SortOrder::Descending, TieBreak::InputOrder).unwrap_err();
        assert!(matches!(err, AnalysisError::UnknownColumn(ref c) if c == "Nope"));
    }

    #[test]
    fn test_sort_descending_and_rank() {
        let table = country_table(&sample())
            .sort_by("Total_Revenue", SortOrder::Descending, TieBreak::KeyAscending)
            .unwrap()
            .assign_rank("Revenue_Rank");
        // Germany 24, Spain 20, France 18
        assert_eq!(keys(&table), vec!["Germany", "Spain", "France"]);
        let ranks = table.column_f64("Revenue_Rank").unwrap();
        assert_eq!(ranks, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_rank_is_permutation() {
        let table = country_table(&sample())
            .sort_by("Total_Quantity", SortOrder::Descending, TieBreak::KeyAscending)
            .unwrap()
            .assign_rank("Rank");
        let mut ranks: Vec<i64> = table
            .rows()
            .iter()
            .map(|r| match r.values.last() {
                Some(Value::Int(rank)) => *rank,
                other => panic!("rank column holds {other:?}"),
            })
            .collect();
        ranks.sort_unstable();
        assert_eq!(ranks, (1..=table.len() as i64).collect::<Vec<_>>());
    }

    #[test]
    fn test_tie_break_modes() {
        let records = enrich(&[
            tx("1", Some(1), "Norway", 1, 5.0),
            tx("2", Some(2), "Austria", 1, 5.0),
        ]);
        let by_input = country_table(&records)
            .sort_by("Total_Revenue", SortOrder::Descending, TieBreak::InputOrder)
            .unwrap();
        assert_eq!(keys(&by_input), vec!["Norway", "Austria"]);

        let by_key = country_table(&records)
            .sort_by("Total_Revenue", SortOrder::Descending, TieBreak::KeyAscending)
            .unwrap();
        assert_eq!(keys(&by_key), vec!["Austria", "Norway"]);
    }

    #[test]
    fn test_sort_ascending() {
        let table = country_table(&sample())
            .sort_by("Total_Revenue", SortOrder::Ascending, TieBreak::KeyAscending)
            .unwrap();
        assert_eq!(keys(&table), vec!["France", "Spain", "Germany"]);
    }

    #[test]
    fn test_derive_ratio() {
        let table = country_table(&sample())
            .derive_ratio("Avg_Order_Value", "Total_Revenue", "Unique_Orders")
            .unwrap();
        let aov = table.column_f64("Avg_Order_Value").unwrap();
        assert!((aov[0] - 12.0).abs() < 1e-12);
        assert!((aov[1] - 9.0).abs() < 1e-12);
        assert!((aov[2] - 20.0).abs() < 1e-12);
    }

    #[test]
    fn test_derive_ratio_zero_denominator() {
        let err = country_table(&sample())
            .derive_ratio("Revenue_Per_Customer", "Total_Revenue", "Unique_Customers")
            .unwrap_err();
        assert!(matches!(err, AnalysisError::DegenerateAggregation(_)));
    }

    #[test]
    fn test_composite_score_bounds() {
        let table = country_table(&sample())
            .derive_ratio("Avg_Order_Value", "Total_Revenue", "Unique_Orders")
            .unwrap()
            .derive_composite_score(
                "Score",
                &[
                    ("Total_Quantity", 0.4),
                    ("Total_Revenue", 0.3),
                    ("Avg_Order_Value", 0.3),
                ],
            )
            .unwrap();
        for score in table.column_f64("Score").unwrap() {
            assert!((0.0..=1.0).contains(&score), "score {score} out of range");
        }
    }

    #[test]
    fn test_composite_score_is_one_at_every_maximum() {
        let records = enrich(&[
            tx("1", Some(1), "Sweden", 10, 10.0),
            tx("2", Some(2), "Italy", 1, 1.0),
        ]);
        let table = country_table(&records)
            .derive_ratio("Avg_Order_Value", "Total_Revenue", "Unique_Orders")
            .unwrap()
            .derive_composite_score(
                "Score",
                &[
                    ("Total_Quantity", 0.4),
                    ("Total_Revenue", 0.3),
                    ("Avg_Order_Value", 0.3),
                ],
            )
            .unwrap();
        let scores = table.column_f64("Score").unwrap();
        assert_eq!(scores[0], 1.0);
        assert!(scores[1] < 1.0);
    }

    #[test]
    fn test_composite_score_zero_max() {
        let records = enrich(&[tx("1", None, "Spain", 1, 1.0)]);
        let err = country_table(&records)
            .derive_composite_score("Score", &[("Unique_Customers", 1.0)])
            .unwrap_err();
        assert!(matches!(err, AnalysisError::DegenerateAggregation(_)));
    }

    #[test]
    fn test_composite_score_empty_table() {
        let table = country_table(&[])
            .derive_composite_score("Score", &[("Total_Revenue", 1.0)])
            .unwrap();
        assert!(table.is_empty());
        assert!(table.column("Score").is_ok());
    }

    #[test]
    fn test_truncate() {
        let table = country_table(&sample()).truncate(2);
        assert_eq!(table.len(), 2);
        let all = country_table(&sample()).truncate(10);
        assert_eq!(all.len(), 3);
    }
}
