//! Flat-file exports.
//!
//! Every table is written with the `csv` crate under a fixed file name in
//! the output directory. Report rows serialize through their serde names.

use std::path::{Path, PathBuf};

use retail_core::dictionary::DATA_DICTIONARY;
use retail_core::models::{EnrichedRecord, Field};
use retail_core::{AnalysisError, Result};
use retail_data::reports::{CountryRow, CustomerRow, DemandRow, MonthlyRow};
use serde::Serialize;
use tracing::info;

pub const MASTER_FILE: &str = "Master_Cleaned_Retail_Data.csv";
pub const COUNTRIES_FILE: &str = "Q2_Countries_Revenue_Analysis.csv";
pub const CUSTOMERS_FILE: &str = "Q3_Customer_Revenue_Analysis.csv";
pub const DEMAND_FILE: &str = "Q4_Country_Demand_Analysis.csv";
pub const DICTIONARY_FILE: &str = "Data_Dictionary.csv";

pub fn year_slice_file(year: i32) -> String {
    format!("cleaned_retail_data_{year}.csv")
}

pub fn monthly_file(year: i32) -> String {
    format!("Q1_{year}_Monthly_Data.csv")
}

/// Writes the tabular artifacts of a run into one directory.
pub struct CsvExporter {
    output_dir: PathBuf,
}

impl CsvExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Every enriched row with all derived columns.
    pub fn write_master(&self, records: &[EnrichedRecord]) -> Result<PathBuf> {
        self.write_records(MASTER_FILE, records.iter())
    }

    /// Enriched rows whose invoice falls in `year`.
    pub fn write_year_slice(&self, records: &[EnrichedRecord], year: i32) -> Result<PathBuf> {
        self.write_records(
            &year_slice_file(year),
            records.iter().filter(|r| r.calendar.year == year),
        )
    }

    pub fn write_monthly(&self, rows: &[MonthlyRow], year: i32) -> Result<PathBuf> {
        self.write_rows(&monthly_file(year), rows, MONTHLY_HEADER)
    }

    pub fn write_countries(&self, rows: &[CountryRow]) -> Result<PathBuf> {
        self.write_rows(COUNTRIES_FILE, rows, COUNTRY_HEADER)
    }

    pub fn write_customers(&self, rows: &[CustomerRow]) -> Result<PathBuf> {
        self.write_rows(CUSTOMERS_FILE, rows, CUSTOMER_HEADER)
    }

    pub fn write_demand(&self, rows: &[DemandRow]) -> Result<PathBuf> {
        self.write_rows(DEMAND_FILE, rows, DEMAND_HEADER)
    }

    /// The fixed data dictionary.
    pub fn write_dictionary(&self) -> Result<PathBuf> {
        let path = self.output_dir.join(DICTIONARY_FILE);
        let mut writer = csv::Writer::from_path(&path).map_err(|e| export_error(&path, e))?;
        writer
            .write_record(["Field_Name", "Data_Type", "Description", "Use_Case"])
            .map_err(|e| export_error(&path, e))?;
        for entry in DATA_DICTIONARY.iter() {
            writer
                .write_record([
                    entry.field_name(),
                    entry.data_type,
                    entry.description,
                    entry.use_case,
                ])
                .map_err(|e| export_error(&path, e))?;
        }
        writer.flush().map_err(|e| export_error(&path, e))?;
        info!("Wrote {}", path.display());
        Ok(path)
    }

    // ── Private helpers ───────────────────────────────────────────────────────

    fn write_records<'r>(
        &self,
        file_name: &str,
        records: impl Iterator<Item = &'r EnrichedRecord>,
    ) -> Result<PathBuf> {
        let path = self.output_dir.join(file_name);
        let mut writer = csv::Writer::from_path(&path).map_err(|e| export_error(&path, e))?;
        writer
            .write_record(Field::ALL.iter().map(|f| f.name()))
            .map_err(|e| export_error(&path, e))?;

        let mut count = 0usize;
        for record in records {
            writer
                .write_record(Field::ALL.iter().map(|f| record.value(*f).to_string()))
                .map_err(|e| export_error(&path, e))?;
            count += 1;
        }
        writer.flush().map_err(|e| export_error(&path, e))?;
        info!("Wrote {} rows to {}", count, path.display());
        Ok(path)
    }

    /// Serialize typed rows. The header is written explicitly so that an
    /// empty report still carries its column names.
    fn write_rows<T: Serialize>(&self, file_name: &str, rows: &[T], header: &[&str]) -> Result<PathBuf> {
        let path = self.output_dir.join(file_name);
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&path)
            .map_err(|e| export_error(&path, e))?;
        writer
            .write_record(header)
            .map_err(|e| export_error(&path, e))?;
        for row in rows {
            writer.serialize(row).map_err(|e| export_error(&path, e))?;
        }
        writer.flush().map_err(|e| export_error(&path, e))?;
        info!("Wrote {} rows to {}", rows.len(), path.display());
        Ok(path)
    }
}

const MONTHLY_HEADER: &[&str] = &[
    "Year",
    "Month",
    "MonthName",
    "YearMonth",
    "Total_Revenue",
    "Total_Quantity",
    "Unique_Orders",
    "Unique_Customers",
];

const COUNTRY_HEADER: &[&str] = &[
    "Country",
    "Total_Revenue",
    "Total_Quantity",
    "Unique_Orders",
    "Unique_Customers",
    "Revenue_Rank",
];

const CUSTOMER_HEADER: &[&str] = &[
    "CustomerID",
    "Total_Revenue",
    "Total_Quantity",
    "Unique_Orders",
    "Country",
    "Revenue_Rank",
];

const DEMAND_HEADER: &[&str] = &[
    "Country",
    "Total_Quantity_Demanded",
    "Total_Revenue",
    "Unique_Orders",
    "Unique_Customers",
    "Unique_Products",
    "Demand_Rank",
    "Avg_Order_Value",
    "Avg_Quantity_Per_Order",
];

pub(crate) fn export_error(path: &Path, reason: impl std::fmt::Display) -> AnalysisError {
    AnalysisError::Export {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}
