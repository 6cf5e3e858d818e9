use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::calendar::CalendarParts;

/// A single invoice line-item as read from the source table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Invoice number; shared by every line of one order.
    pub invoice_no: String,
    /// Product stock code.
    pub stock_code: String,
    /// Product description, absent when the cell is empty.
    #[serde(default)]
    pub description: Option<String>,
    /// Units purchased. Negative for returns in the raw data.
    pub quantity: i64,
    /// Price per unit in pounds sterling.
    pub unit_price: f64,
    /// Wall-clock time the invoice was raised.
    pub invoice_date: NaiveDateTime,
    /// Customer identifier, absent for guest purchases.
    #[serde(default)]
    pub customer_id: Option<u64>,
    /// Country the customer is located in.
    pub country: String,
}

/// Customer identity with an explicit variant for guest purchases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CustomerKey {
    Known(u64),
    Unknown,
}

impl CustomerKey {
    pub fn is_known(&self) -> bool {
        matches!(self, CustomerKey::Known(_))
    }
}

impl From<Option<u64>> for CustomerKey {
    fn from(id: Option<u64>) -> Self {
        id.map_or(CustomerKey::Unknown, CustomerKey::Known)
    }
}

impl fmt::Display for CustomerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CustomerKey::Known(id) => write!(f, "{}", id),
            CustomerKey::Unknown => f.write_str("Unknown"),
        }
    }
}

/// Domestic vs international split of the country column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CountryGroup {
    Domestic,
    International,
}

impl fmt::Display for CountryGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CountryGroup::Domestic => f.write_str("Domestic"),
            CountryGroup::International => f.write_str("International"),
        }
    }
}

/// A cleaned transaction carrying every derived analysis column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedRecord {
    pub transaction: Transaction,
    /// `quantity × unit_price`.
    pub revenue: f64,
    pub calendar: CalendarParts,
    pub customer: CustomerKey,
    /// Leading alphabetic prefix of the stock code, or `"Numeric"`.
    pub stock_category: String,
    pub country_group: CountryGroup,
    pub revenue_bucket: String,
    pub quantity_bucket: String,
}

impl EnrichedRecord {
    pub fn has_customer_id(&self) -> bool {
        self.customer.is_known()
    }

    pub fn is_domestic(&self) -> bool {
        self.country_group == CountryGroup::Domestic
    }

    /// Read one column as a dynamically typed [`Value`].
    pub fn value(&self, field: Field) -> Value {
        let t = &self.transaction;
        match field {
            Field::InvoiceNo => Value::Text(t.invoice_no.clone()),
            Field::StockCode => Value::Text(t.stock_code.clone()),
            Field::Description => t
                .description
                .as_ref()
                .map_or(Value::Missing, |d| Value::Text(d.clone())),
            Field::Quantity => Value::Int(t.quantity),
            Field::InvoiceDate => Value::DateTime(t.invoice_date),
            Field::UnitPrice => Value::Float(t.unit_price),
            Field::CustomerId => t
                .customer_id
                .map_or(Value::Missing, |id| Value::Int(id as i64)),
            Field::Country => Value::Text(t.country.clone()),
            Field::Revenue => Value::Float(self.revenue),
            Field::Year => Value::Int(i64::from(self.calendar.year)),
            Field::Month => Value::Int(i64::from(self.calendar.month)),
            Field::MonthName => Value::Text(self.calendar.month_name.to_string()),
            Field::Quarter => Value::Int(i64::from(self.calendar.quarter)),
            Field::DayOfWeek => Value::Text(self.calendar.day_of_week.to_string()),
            Field::Date => Value::Date(self.calendar.date),
            Field::YearMonth => Value::Text(self.calendar.year_month.clone()),
            Field::WeekOfYear => Value::Int(i64::from(self.calendar.iso_week)),
            Field::HasCustomerId => Value::Bool(self.has_customer_id()),
            Field::CustomerKey => Value::Text(self.customer.to_string()),
            Field::StockCategory => Value::Text(self.stock_category.clone()),
            Field::IsDomestic => Value::Bool(self.is_domestic()),
            Field::CountryGroup => Value::Text(self.country_group.to_string()),
            Field::RevenueBucket => Value::Text(self.revenue_bucket.clone()),
            Field::QuantityBucket => Value::Text(self.quantity_bucket.clone()),
        }
    }
}

// ── Field ─────────────────────────────────────────────────────────────────────

/// Every column of an [`EnrichedRecord`], in master-export order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    InvoiceNo,
    StockCode,
    Description,
    Quantity,
    InvoiceDate,
    UnitPrice,
    CustomerId,
    Country,
    Revenue,
    Year,
    Month,
    MonthName,
    Quarter,
    DayOfWeek,
    Date,
    YearMonth,
    WeekOfYear,
    HasCustomerId,
    CustomerKey,
    StockCategory,
    IsDomestic,
    CountryGroup,
    RevenueBucket,
    QuantityBucket,
}

impl Field {
    /// All fields in export order.
    pub const ALL: [Field; 24] = [
        Field::InvoiceNo,
        Field::StockCode,
        Field::Description,
        Field::Quantity,
        Field::InvoiceDate,
        Field::UnitPrice,
        Field::CustomerId,
        Field::Country,
        Field::Revenue,
        Field::Year,
        Field::Month,
        Field::MonthName,
        Field::Quarter,
        Field::DayOfWeek,
        Field::Date,
        Field::YearMonth,
        Field::WeekOfYear,
        Field::HasCustomerId,
        Field::CustomerKey,
        Field::StockCategory,
        Field::IsDomestic,
        Field::CountryGroup,
        Field::RevenueBucket,
        Field::QuantityBucket,
    ];

    /// Column header used in exported tables.
    pub fn name(&self) -> &'static str {
        match self {
            Field::InvoiceNo => "InvoiceNo",
            Field::StockCode => "StockCode",
            Field::Description => "Description",
            Field::Quantity => "Quantity",
            Field::InvoiceDate => "InvoiceDate",
            Field::UnitPrice => "UnitPrice",
            Field::CustomerId => "CustomerID",
            Field::Country => "Country",
            Field::Revenue => "Revenue",
            Field::Year => "Year",
            Field::Month => "Month",
            Field::MonthName => "MonthName",
            Field::Quarter => "Quarter",
            Field::DayOfWeek => "DayOfWeek",
            Field::Date => "Date",
            Field::YearMonth => "YearMonth",
            Field::WeekOfYear => "WeekOfYear",
            Field::HasCustomerId => "HasCustomerID",
            Field::CustomerKey => "CustomerID_Clean",
            Field::StockCategory => "StockCode_Category",
            Field::IsDomestic => "IsDomestic",
            Field::CountryGroup => "CountryGroup",
            Field::RevenueBucket => "Revenue_Category",
            Field::QuantityBucket => "Quantity_Category",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Value ─────────────────────────────────────────────────────────────────────

/// A dynamically typed cell used for group keys and aggregate metrics.
///
/// Floats compare and hash by bit pattern so that values can key a map.
#[derive(Debug, Clone, Serialize)]
pub enum Value {
    Missing,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Value {
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Numeric view of the value; integers widen to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    fn variant_rank(&self) -> u8 {
        match self {
            Value::Missing => 0,
            Value::Bool(_) => 1,
            Value::Int(_) => 2,
            Value::Float(_) => 3,
            Value::Text(_) => 4,
            Value::Date(_) => 5,
            Value::DateTime(_) => 6,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.variant_rank().hash(state);
        match self {
            Value::Missing => {}
            Value::Bool(b) => b.hash(state),
            Value::Int(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Text(s) => s.hash(state),
            Value::Date(d) => d.hash(state),
            Value::DateTime(dt) => dt.hash(state),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Date(a), Value::Date(b)) => a.cmp(b),
            (Value::DateTime(a), Value::DateTime(b)) => a.cmp(b),
            _ => self.variant_rank().cmp(&other.variant_rank()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Missing => Ok(()),
            Value::Bool(b) => f.write_str(if *b { "True" } else { "False" }),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(s) => f.write_str(s),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn sample_record(customer_id: Option<u64>) -> EnrichedRecord {
        let invoice_date = NaiveDate::from_ymd_opt(2011, 3, 1)
            .unwrap()
            .and_hms_opt(8, 26, 0)
            .unwrap();
        EnrichedRecord {
            transaction: Transaction {
                invoice_no: "536365".to_string(),
                stock_code: "85123A".to_string(),
                description: None,
                quantity: 6,
                unit_price: 2.55,
                invoice_date,
                customer_id,
                country: "Germany".to_string(),
            },
            revenue: 6.0 * 2.55,
            calendar: CalendarParts::from_datetime(&invoice_date),
            customer: customer_id.into(),
            stock_category: "Numeric".to_string(),
            country_group: CountryGroup::International,
            revenue_bucket: "Medium (£10-50)".to_string(),
            quantity_bucket: "Medium (6-20)".to_string(),
        }
    }

    #[test]
    fn test_customer_key_display() {
        assert_eq!(CustomerKey::Known(17850).to_string(), "17850");
        assert_eq!(CustomerKey::Unknown.to_string(), "Unknown");
        assert_eq!(CustomerKey::from(None), CustomerKey::Unknown);
    }

    #[test]
    fn test_record_value_lookup() {
        let record = sample_record(Some(12345));
        assert_eq!(record.value(Field::Country), Value::Text("Germany".to_string()));
        assert_eq!(record.value(Field::Quantity), Value::Int(6));
        assert_eq!(record.value(Field::CustomerId), Value::Int(12345));
        assert_eq!(record.value(Field::YearMonth), Value::Text("2011-03".to_string()));
        assert_eq!(record.value(Field::HasCustomerId), Value::Bool(true));
        assert!(record.value(Field::Description).is_missing());
    }

    #[test]
    fn test_missing_customer_is_missing_value() {
        let record = sample_record(None);
        assert!(record.value(Field::CustomerId).is_missing());
        assert_eq!(record.value(Field::CustomerKey), Value::Text("Unknown".to_string()));
        assert!(!record.has_customer_id());
    }

    #[test]
    fn test_value_hash_eq_consistent_for_floats() {
        let mut set = HashSet::new();
        set.insert(Value::Float(1.5));
        set.insert(Value::Float(1.5));
        set.insert(Value::Int(1));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_value_ordering_within_variant() {
        assert!(Value::Text("France".into()) < Value::Text("Germany".into()));
        assert!(Value::Float(2.0) > Value::Float(1.0));
        assert!(Value::Missing < Value::Int(0));
    }

    #[test]
    fn test_field_names_are_unique() {
        let names: HashSet<&str> = Field::ALL.iter().map(|f| f.name()).collect();
        assert_eq!(names.len(), Field::ALL.len());
    }
}
