//! Shared foundations for the retail analysis workspace.
//!
//! Holds the error type, the transaction and enriched-record model, analysis
//! configuration and CLI settings, calendar helpers, report formatting and
//! the fixed data dictionary.

pub mod calendar;
pub mod config;
pub mod dictionary;
pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;

pub use error::{AnalysisError, Result};
