//! Runtime orchestration layer.
//!
//! Runs the analysis pipeline once and hands its results to every exporter.

pub mod orchestrator;

pub use retail_core as core;
pub use retail_data as data;
