//! Reference catalogue of every column in the master export.

use crate::models::Field;

/// One row of the data dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DictionaryEntry {
    pub field: Field,
    pub data_type: &'static str,
    pub description: &'static str,
    pub use_case: &'static str,
}

impl DictionaryEntry {
    pub fn field_name(&self) -> &'static str {
        self.field.name()
    }
}

const fn entry(
    field: Field,
    data_type: &'static str,
    description: &'static str,
    use_case: &'static str,
) -> DictionaryEntry {
    DictionaryEntry {
        field,
        data_type,
        description,
        use_case,
    }
}

/// The fixed data dictionary, in master-export column order.
pub const DATA_DICTIONARY: [DictionaryEntry; 24] = [
    entry(
        Field::InvoiceNo,
        "Text",
        "Invoice number shared by every line of one transaction",
        "Transaction identification, Order analysis",
    ),
    entry(
        Field::StockCode,
        "Text",
        "Product stock code",
        "Product analysis, Inventory tracking",
    ),
    entry(
        Field::Description,
        "Text",
        "Product description",
        "Product analysis, Text mining",
    ),
    entry(
        Field::Quantity,
        "Number",
        "Units purchased on the line (cleaned: >= 1)",
        "Sales volume analysis, Demand forecasting",
    ),
    entry(
        Field::InvoiceDate,
        "Date/Time",
        "Date and time the invoice was raised",
        "Time series analysis, Seasonality",
    ),
    entry(
        Field::UnitPrice,
        "Currency",
        "Price per unit (cleaned: > 0)",
        "Pricing analysis, Revenue calculation",
    ),
    entry(
        Field::CustomerId,
        "Number",
        "Customer identifier, empty for guest purchases",
        "Customer segmentation, Retention analysis",
    ),
    entry(
        Field::Country,
        "Text",
        "Country the customer is located in",
        "Geographic analysis, Market expansion",
    ),
    entry(
        Field::Revenue,
        "Currency",
        "Derived: Quantity x UnitPrice",
        "Revenue analysis, Profitability",
    ),
    entry(
        Field::Year,
        "Number",
        "Calendar year of InvoiceDate",
        "Annual trends, Year-over-year comparison",
    ),
    entry(
        Field::Month,
        "Number",
        "Month number (1-12) of InvoiceDate",
        "Monthly trends, Seasonality",
    ),
    entry(
        Field::MonthName,
        "Text",
        "Month name of InvoiceDate",
        "Seasonal analysis, Month comparison",
    ),
    entry(
        Field::Quarter,
        "Number",
        "Quarter (1-4) of InvoiceDate",
        "Quarterly reporting, Business cycles",
    ),
    entry(
        Field::DayOfWeek,
        "Text",
        "Weekday name of InvoiceDate",
        "Day-of-week patterns, Operational planning",
    ),
    entry(
        Field::Date,
        "Date",
        "Calendar date of InvoiceDate without the time",
        "Daily analysis, Calendar visualization",
    ),
    entry(
        Field::YearMonth,
        "Text",
        "Period key in YYYY-MM format",
        "Monthly trending, Period comparison",
    ),
    entry(
        Field::WeekOfYear,
        "Number",
        "ISO week number of InvoiceDate",
        "Weekly patterns, Short-term trends",
    ),
    entry(
        Field::HasCustomerId,
        "Boolean",
        "TRUE when CustomerID is present",
        "Customer data quality analysis",
    ),
    entry(
        Field::CustomerKey,
        "Text",
        "CustomerID, or \"Unknown\" for guest purchases",
        "Customer analysis including unknowns",
    ),
    entry(
        Field::StockCategory,
        "Text",
        "Leading letters of StockCode, \"Numeric\" when there are none",
        "Product categorization, SKU analysis",
    ),
    entry(
        Field::IsDomestic,
        "Boolean",
        "TRUE when Country is the domestic market",
        "Domestic vs International analysis",
    ),
    entry(
        Field::CountryGroup,
        "Text",
        "Domestic or International",
        "Market segmentation, Geographic focus",
    ),
    entry(
        Field::RevenueBucket,
        "Text",
        "Revenue binned into fixed ranges",
        "Revenue segmentation, Value analysis",
    ),
    entry(
        Field::QuantityBucket,
        "Text",
        "Quantity binned into fixed ranges",
        "Order size analysis, Bulk vs Retail",
    ),
];
