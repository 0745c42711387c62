//! Pipeline orchestration
//!
//! This module provides the public API for edakit. It drives a table from
//! a flat file to a finished [`Report`].

use crate::config::PipelineConfig;
use crate::datasets::{self, DatasetProfile, PopulationProfile, RetailProfile};
use crate::derive::ColumnDeriver;
use crate::error::PipelineError;
use crate::loader::TableLoader;
use crate::report::{Report, ReportAssembler};
use crate::types::Table;
use std::path::Path;

/// Build the online-retail report for a CSV file with default settings.
///
/// # Example
/// ```ignore
/// let report = retail_report("data/online_retail.csv")?;
/// let json = ReportEncoder::to_json_string(&report, OutputFormat::JsonPretty)?;
/// ```
pub fn retail_report(path: impl AsRef<Path>) -> Result<Report, PipelineError> {
    let table = TableLoader::from_path(path)?;
    run_profile(&table, &RetailProfile, &PipelineConfig::default())
}

/// Build the world-population report for a CSV file with default settings.
pub fn population_report(path: impl AsRef<Path>) -> Result<Report, PipelineError> {
    let table = TableLoader::from_path(path)?;
    run_profile(&table, &PopulationProfile, &PipelineConfig::default())
}

/// Load a CSV file, detect its dataset and build the matching report
pub fn analyze_file(path: impl AsRef<Path>, config: &PipelineConfig) -> Result<Report, PipelineError> {
    let table = TableLoader::from_path(path)?;
    let profile = datasets::detect(&table)?;
    run_profile(&table, profile, config)
}

/// Run one profile against a loaded table.
///
/// Pipeline stages:
/// 1. Validate that the table has the profile's required columns
/// 2. ColumnDeriver - Append derived columns
/// 3. ReportAssembler - Evaluate every metric in order
pub fn run_profile(
    table: &Table,
    profile: &dyn DatasetProfile,
    config: &PipelineConfig,
) -> Result<Report, PipelineError> {
    // Stage 1: Schema check
    profile.validate(table)?;

    // Stage 2: Derived columns
    let derived = ColumnDeriver::derive(table, &profile.derived_columns(config))?;

    // Stage 3: Metrics
    let report = ReportAssembler::assemble(&derived, &profile.metrics(config), config.mode)?;

    tracing::info!(
        dataset = profile.name(),
        rows = table.row_count(),
        metrics = report.len(),
        complete = report.is_complete(),
        "pipeline finished"
    );
    Ok(report)
}

/// Reusable runner bound to one configuration
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    config: PipelineConfig,
}

impl Analyzer {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Analyze a table with an explicit profile, or the detected one
    pub fn analyze(
        &self,
        table: &Table,
        profile: Option<&dyn DatasetProfile>,
    ) -> Result<Report, PipelineError> {
        let profile = match profile {
            Some(profile) => profile,
            None => datasets::detect(table)?,
        };
        run_profile(table, profile, &self.config)
    }

    pub fn analyze_file(&self, path: impl AsRef<Path>) -> Result<Report, PipelineError> {
        analyze_file(path, &self.config)
    }
}
