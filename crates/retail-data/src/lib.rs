//! Data layer for the retail analysis pipeline.
//!
//! Loads the raw invoice log, filters invalid rows, derives analysis
//! columns, groups them into the business reports and computes the headline
//! insights.

pub mod aggregator;
pub mod analysis;
pub mod cleaner;
pub mod enricher;
pub mod insights;
pub mod reader;
pub mod reports;

pub use retail_core as core;
