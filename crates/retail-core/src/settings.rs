use clap::Parser;
use std::path::PathBuf;

use crate::config::AnalysisConfig;
use crate::error::Result;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Batch analysis of an online-retail transaction log
#[derive(Parser, Debug, Clone)]
#[command(
    name = "retail-insights",
    about = "Batch analysis of an online-retail transaction log",
    version
)]
pub struct Settings {
    /// Transaction source (CSV or spreadsheet)
    #[arg(short, long, default_value = "online_retail_data.csv")]
    pub input: PathBuf,

    /// Directory that receives every generated artifact
    #[arg(short, long, default_value = "output")]
    pub output_dir: PathBuf,

    /// JSON analysis configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Year analysed by the seasonal report (overrides the config file)
    #[arg(long)]
    pub year: Option<i32>,

    /// Row count of the top-N reports (overrides the config file)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub top_n: Option<u32>,

    /// Domestic market excluded from international reports (overrides the config file)
    #[arg(long)]
    pub domestic_country: Option<String>,

    /// Skip chart rendering
    #[arg(long)]
    pub no_charts: bool,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Settings {
    /// Parse process arguments and apply the `--debug` override.
    pub fn load() -> Self {
        Self::resolve(Settings::parse())
    }

    /// Same as [`Settings::load`] with an explicit argument list.
    pub fn load_from_args<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::resolve(Settings::parse_from(args))
    }

    fn resolve(mut settings: Settings) -> Self {
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }

    /// Build the effective [`AnalysisConfig`]: the config file (or defaults),
    /// then CLI overrides. CLI always wins. The result is validated.
    pub fn analysis_config(&self) -> Result<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::load_from(path)?,
            None => AnalysisConfig::default(),
        };

        if let Some(year) = self.year {
            config.analysis_year = year;
        }
        if let Some(top_n) = self.top_n {
            config.top_n = top_n as usize;
        }
        if let Some(country) = &self.domestic_country {
            config.domestic_country = country.clone();
        }

        config.validate()?;
        Ok(config)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
