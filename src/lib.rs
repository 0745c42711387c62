//! edakit - Exploratory data analysis reports for tabular data
//!
//! edakit turns a flat file into a JSON report through a deterministic
//! pipeline: loading → column derivation → metric evaluation → report
//! assembly → encoding.
//!
//! ## Modules
//!
//! - **Core**: tables, metric definitions and the pure aggregation functions
//! - **Datasets**: ready-made metric catalogs (online retail, world population)

pub mod config;
pub mod datasets;
pub mod derive;
pub mod encoder;
pub mod error;
pub mod evaluator;
pub mod loader;
pub mod metric;
pub mod pipeline;
pub mod report;
pub mod types;

pub use config::PipelineConfig;
pub use datasets::{DatasetProfile, PopulationProfile, RetailProfile};
pub use derive::{ColumnDeriver, DerivedColumn, Formula, UndefinedPolicy};
pub use encoder::{OutputFormat, ReportEncoder};
pub use error::{ComputeError, ConfigError, LoadError, PipelineError, SerializationError};
pub use loader::TableLoader;
pub use metric::{Aggregation, GroupKey, GroupOrder, MetricDefinition, Predicate, SortOrder};
pub use pipeline::{analyze_file, population_report, retail_report, run_profile, Analyzer};
pub use report::{EvaluationMode, Report, ReportAssembler};
pub use types::{Column, ColumnType, MetricResult, Number, Table, Value};

/// edakit version
pub const EDAKIT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name reported by the CLI
pub const PRODUCER_NAME: &str = "edakit";
