//! Batch orchestrator.
//!
//! Runs [`analyze_retail`] and writes every artifact (CSV tables, charts,
//! text reports and a JSON run manifest) into the output directory.

use std::path::{Path, PathBuf};

use retail_core::config::AnalysisConfig;
use retail_core::Result;
use retail_data::analysis::{analyze_retail, AnalysisMetadata, AnalysisResult};
use retail_report::charts::ChartRenderer;
use retail_report::export::CsvExporter;
use retail_report::summary::TextReporter;
use serde::Serialize;
use tracing::{debug, info};

pub const MANIFEST_FILE: &str = "Run_Manifest.json";

// ── Public types ──────────────────────────────────────────────────────────────

/// Where to read from and write to.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub render_charts: bool,
}

/// Outcome of one batch run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub analysis: AnalysisResult,
    /// Every file written, in write order.
    pub artifacts: Vec<PathBuf>,
}

/// Serialized alongside the artifacts so a run can be audited later.
#[derive(Debug, Serialize)]
struct RunManifest<'a> {
    metadata: &'a AnalysisMetadata,
    config: &'a AnalysisConfig,
    artifacts: Vec<String>,
}

// ── ReportOrchestrator ────────────────────────────────────────────────────────

/// Single-pass batch coordinator.
pub struct ReportOrchestrator {
    config: AnalysisConfig,
    options: RunOptions,
}

impl ReportOrchestrator {
    pub fn new(config: AnalysisConfig, options: RunOptions) -> Self {
        Self { config, options }
    }

    /// Analyse the input and write every artifact.
    ///
    /// The output directory is created if absent. Any failure aborts the run;
    /// files already written are left in place.
    pub fn run(&self) -> Result<RunSummary> {
        let analysis = analyze_retail(&self.options.input, &self.config)?;

        let output_dir = &self.options.output_dir;
        std::fs::create_dir_all(output_dir)?;
        debug!("Writing artifacts to {}", output_dir.display());

        let mut artifacts = self.export_tables(&analysis, output_dir)?;

        if self.options.render_charts {
            let renderer =
                ChartRenderer::new(output_dir, self.config.top_n, &self.config.domestic_country);
            artifacts.extend(renderer.render_all(&analysis.reports, self.config.analysis_year)?);
        }

        let text = TextReporter::new(output_dir);
        artifacts.push(text.write_insights_report(&analysis.insights, &self.config)?);
        // The summary lists everything written before it, itself included.
        let summary_path = output_dir.join(retail_report::summary::PREPARATION_SUMMARY_FILE);
        let mut listed = artifacts.clone();
        listed.push(summary_path);
        artifacts.push(text.write_preparation_summary(&analysis, &listed)?);

        artifacts.push(self.write_manifest(&analysis, &artifacts)?);

        info!(
            "Run complete: {} artifacts in {}",
            artifacts.len(),
            output_dir.display()
        );
        Ok(RunSummary {
            analysis,
            artifacts,
        })
    }

    // ── Private implementation ────────────────────────────────────────────────

    fn export_tables(&self, analysis: &AnalysisResult, output_dir: &Path) -> Result<Vec<PathBuf>> {
        let year = self.config.analysis_year;
        let reports = &analysis.reports;
        let csv = CsvExporter::new(output_dir);

        Ok(vec![
            csv.write_master(&analysis.records)?,
            csv.write_year_slice(&analysis.records, year)?,
            csv.write_monthly(&reports.monthly, year)?,
            csv.write_countries(&reports.countries)?,
            csv.write_customers(&reports.customers)?,
            csv.write_demand(&reports.demand)?,
            csv.write_dictionary()?,
        ])
    }

    fn write_manifest(&self, analysis: &AnalysisResult, artifacts: &[PathBuf]) -> Result<PathBuf> {
        let path = self.options.output_dir.join(MANIFEST_FILE);
        let manifest = RunManifest {
            metadata: &analysis.metadata,
            config: &self.config,
            artifacts: artifacts.iter().map(|p| p.display().to_string()).collect(),
        };
        let json = serde_json::to_string_pretty(&manifest)?;
        std::fs::write(&path, json)?;
        Ok(path)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use retail_core::AnalysisError;
    use tempfile::TempDir;

    const CSV: &str = "\
InvoiceNo,StockCode,Description,Quantity,InvoiceDate,UnitPrice,CustomerID,Country
536365,85123A,WHITE HANGING HEART,6,12/1/2010 8:26,2.55,17850,United Kingdom
540001,22633,HAND WARMER,2,3/1/2011 9:00,5.0,12583,Germany
C540002,22633,HAND WARMER,-1,3/2/2011 9:00,5.0,12583,Germany
540003,POST,POSTAGE,3,3/3/2011 10:00,0,12583,France
540004,22633,HAND WARMER,1,3/5/2011 11:00,10.0,,Germany
540005,21000,PAPER CHAIN,12,11/7/2011 12:00,1.25,12680,France
";

    fn setup() -> (TempDir, RunOptions) {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("online_retail_data.csv");
        std::fs::write(&input, CSV).unwrap();
        let options = RunOptions {
            input,
            output_dir: tmp.path().join("out"),
            render_charts: false,
        };
        (tmp, options)
    }

    fn read_csv(path: &Path) -> Vec<csv::StringRecord> {
        csv::Reader::from_path(path)
            .unwrap()
            .records()
            .map(|r| r.unwrap())
            .collect()
    }

    #[test]
    fn test_run_writes_every_artifact() {
        let (_tmp, options) = setup();
        let out = options.output_dir.clone();
        let summary = ReportOrchestrator::new(AnalysisConfig::default(), options)
            .run()
            .expect("run");

        for name in [
            "Master_Cleaned_Retail_Data.csv",
            "cleaned_retail_data_2011.csv",
            "Q1_2011_Monthly_Data.csv",
            "Q2_Countries_Revenue_Analysis.csv",
            "Q3_Customer_Revenue_Analysis.csv",
            "Q4_Country_Demand_Analysis.csv",
            "Data_Dictionary.csv",
            "Data_Preparation_Summary.txt",
            "Business_Insights_Report.txt",
            MANIFEST_FILE,
        ] {
            assert!(out.join(name).exists(), "{name} missing");
        }
        assert_eq!(summary.artifacts.len(), 10);
        assert!(!out.join(retail_report::charts::DEMAND_CHART_FILE).exists());
    }

    #[test]
    fn test_run_with_charts_writes_images() {
        let (_tmp, mut options) = setup();
        options.render_charts = true;
        let out = options.output_dir.clone();
        let summary = ReportOrchestrator::new(AnalysisConfig::default(), options)
            .run()
            .expect("run");

        for name in [
            retail_report::charts::monthly_chart_file(2011),
            retail_report::charts::countries_chart_file(10),
            retail_report::charts::customers_chart_file(10),
            retail_report::charts::DEMAND_CHART_FILE.to_string(),
        ] {
            let path = out.join(&name);
            assert!(path.exists(), "{name} missing");
            assert!(summary.artifacts.contains(&path));
        }
        assert_eq!(summary.artifacts.len(), 14);

        let report = std::fs::read_to_string(out.join("Business_Insights_Report.txt")).unwrap();
        assert!(!report.contains("-0.0%"));
    }

    #[test]
    fn test_run_country_report_contents() {
        let (_tmp, options) = setup();
        let out = options.output_dir.clone();
        ReportOrchestrator::new(AnalysisConfig::default(), options)
            .run()
            .expect("run");

        let rows = read_csv(&out.join("Q2_Countries_Revenue_Analysis.csv"));
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][0], "Germany");
        assert_eq!(rows[0][1].parse::<f64>().unwrap(), 20.0);
        assert_eq!(&rows[0][2], "3");
        assert_eq!(&rows[0][3], "2");
        assert_eq!(&rows[1][0], "France");

        let master = read_csv(&out.join("Master_Cleaned_Retail_Data.csv"));
        assert_eq!(master.len(), 4);
        let year_slice = read_csv(&out.join("cleaned_retail_data_2011.csv"));
        assert_eq!(year_slice.len(), 3);
    }

    #[test]
    fn test_run_respects_domestic_override() {
        let (_tmp, options) = setup();
        let out = options.output_dir.clone();
        let config = AnalysisConfig {
            domestic_country: "Germany".to_string(),
            ..Default::default()
        };
        ReportOrchestrator::new(config, options).run().expect("run");

        let rows = read_csv(&out.join("Q2_Countries_Revenue_Analysis.csv"));
        let countries: Vec<&str> = rows.iter().map(|r| &r[0]).collect();
        assert_eq!(countries, vec!["United Kingdom", "France"]);
    }

    #[test]
    fn test_run_manifest_is_json() {
        let (_tmp, options) = setup();
        let out = options.output_dir.clone();
        ReportOrchestrator::new(AnalysisConfig::default(), options)
            .run()
            .expect("run");

        let text = std::fs::read_to_string(out.join(MANIFEST_FILE)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["metadata"]["cleaning"]["input_rows"], 6);
        assert_eq!(value["config"]["domestic_country"], "United Kingdom");
        assert_eq!(value["artifacts"].as_array().unwrap().len(), 9);
    }

    #[test]
    fn test_run_missing_input() {
        let tmp = TempDir::new().unwrap();
        let options = RunOptions {
            input: tmp.path().join("absent.csv"),
            output_dir: tmp.path().join("out"),
            render_charts: false,
        };
        let err = ReportOrchestrator::new(AnalysisConfig::default(), options)
            .run()
            .unwrap_err();
        assert!(matches!(err, AnalysisError::SourceNotFound(_)));
        assert!(!tmp.path().join("out").exists());
    }
}
