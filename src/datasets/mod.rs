//! Dataset profiles
//!
//! A profile bundles everything needed to analyze one kind of table: the
//! columns it must have, the columns derived before evaluation and the
//! ordered list of metrics that make up its report.

mod population;
mod retail;

pub use population::PopulationProfile;
pub use retail::RetailProfile;

use crate::config::PipelineConfig;
use crate::derive::DerivedColumn;
use crate::error::LoadError;
use crate::metric::MetricDefinition;
use crate::types::Table;

/// Trait for dataset-specific metric catalogs
pub trait DatasetProfile: Send + Sync {
    /// Short identifier, also accepted by [`by_name`]
    fn name(&self) -> &'static str;

    /// Columns the input table must provide
    fn required_columns(&self) -> &'static [&'static str];

    /// Columns computed before any metric runs, in dependency order
    fn derived_columns(&self, config: &PipelineConfig) -> Vec<DerivedColumn>;

    /// Metrics of the report, in output order
    fn metrics(&self, config: &PipelineConfig) -> Vec<MetricDefinition>;

    /// Check that `table` has every required column
    fn validate(&self, table: &Table) -> Result<(), LoadError> {
        match self
            .required_columns()
            .iter()
            .find(|column| !table.has_column(column))
        {
            Some(column) => Err(LoadError::MissingColumn {
                dataset: self.name().to_string(),
                column: column.to_string(),
            }),
            None => Ok(()),
        }
    }
}

static RETAIL: RetailProfile = RetailProfile;
static POPULATION: PopulationProfile = PopulationProfile;

/// Every built-in profile, in detection order
pub fn all() -> [&'static dyn DatasetProfile; 2] {
    [&RETAIL, &POPULATION]
}

/// Look up a profile by its name
pub fn by_name(name: &str) -> Option<&'static dyn DatasetProfile> {
    all().into_iter().find(|profile| profile.name() == name)
}

/// Pick the first profile whose required columns are all present
pub fn detect(table: &Table) -> Result<&'static dyn DatasetProfile, LoadError> {
    let profile = all()
        .into_iter()
        .find(|profile| profile.validate(table).is_ok())
        .ok_or(LoadError::UnknownDataset)?;
    tracing::debug!(dataset = profile.name(), "detected dataset");
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;
    use std::collections::HashSet;

    fn table_with(columns: &[&str]) -> Table {
        Table::from_rows(columns, vec![vec![Value::Null; columns.len()]]).unwrap()
    }

    #[test]
    fn test_detect_retail() {
        let table = table_with(RETAIL.required_columns());
        assert_eq!(detect(&table).unwrap().name(), "retail");
    }

    #[test]
    fn test_detect_population() {
        let table = table_with(POPULATION.required_columns());
        assert_eq!(detect(&table).unwrap().name(), "population");
    }

    #[test]
    fn test_detect_unknown() {
        let table = table_with(&["a", "b"]);
        assert!(matches!(detect(&table), Err(LoadError::UnknownDataset)));
    }

    #[test]
    fn test_validate_names_missing_column() {
        let table = table_with(&["InvoiceNo"]);
        let err = RETAIL.validate(&table).unwrap_err();
        assert!(matches!(
            err,
            LoadError::MissingColumn { dataset, column } if dataset == "retail" && column == "StockCode"
        ));
    }

    #[test]
    fn test_by_name() {
        assert_eq!(by_name("population").unwrap().name(), "population");
        assert!(by_name("weather").is_none());
    }

    #[test]
    fn test_metric_names_unique() {
        let config = PipelineConfig::default();
        for profile in all() {
            let metrics = profile.metrics(&config);
            let names: HashSet<&str> = metrics.iter().map(|m| m.name.as_str()).collect();
            assert_eq!(names.len(), metrics.len(), "{}", profile.name());
        }
    }
}
