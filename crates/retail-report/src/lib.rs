//! Output layer: CSV tables, PNG charts and plain-text reports.

pub mod charts;
pub mod export;
pub mod summary;
