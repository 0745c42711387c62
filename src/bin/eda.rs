//! eda CLI - Command-line interface for edakit
//!
//! Commands:
//! - analyze: Build the JSON report for a CSV file
//! - inspect: Show the inferred schema of a CSV file
//! - metrics: List the metrics of a dataset profile

use clap::{Parser, Subcommand, ValueEnum};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use edakit::datasets::{self, DatasetProfile};
use edakit::error::{ComputeError, ConfigError, LoadError, PipelineError, SerializationError};
use edakit::evaluator;
use edakit::{
    run_profile, EvaluationMode, OutputFormat, PipelineConfig, ReportEncoder, Table, TableLoader,
    EDAKIT_VERSION, PRODUCER_NAME,
};
use tracing_subscriber::EnvFilter;

/// eda - Exploratory data analysis reports for CSV files
#[derive(Parser)]
#[command(name = "eda")]
#[command(version = EDAKIT_VERSION)]
#[command(about = "Aggregate tabular data into EDA reports", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the JSON report for a CSV file
    Analyze {
        /// Input CSV file (use - for stdin)
        input: PathBuf,

        /// Dataset profile to apply
        #[arg(long, value_enum, default_value = "auto")]
        dataset: DatasetArg,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value = "json-pretty")]
        format: FormatArg,

        /// Record failing metrics in the report instead of aborting
        #[arg(long)]
        best_effort: bool,

        /// JSON config file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Size of top-N rankings
        #[arg(long)]
        top_n: Option<usize>,
    },

    /// Show the inferred schema of a CSV file
    Inspect {
        /// Input CSV file (use - for stdin)
        input: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the metrics of a dataset profile
    Metrics {
        /// Dataset profile (auto lists every profile)
        #[arg(value_enum, default_value = "auto")]
        dataset: DatasetArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum DatasetArg {
    /// Detect from the header
    Auto,
    /// Online retail invoice lines
    Retail,
    /// World population by country
    Population,
}

impl DatasetArg {
    fn profile(self) -> Option<&'static dyn DatasetProfile> {
        match self {
            DatasetArg::Auto => None,
            DatasetArg::Retail => datasets::by_name("retail"),
            DatasetArg::Population => datasets::by_name("population"),
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    /// Single-line JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

impl From<FormatArg> for OutputFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Json => OutputFormat::Json,
            FormatArg::JsonPretty => OutputFormat::JsonPretty,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr; `RUST_LOG` wins over `-v`
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}

fn run(cli: Cli) -> Result<(), EdaCliError> {
    match cli.command {
        Commands::Analyze {
            input,
            dataset,
            output,
            format,
            best_effort,
            config,
            top_n,
        } => cmd_analyze(
            &input,
            dataset,
            &output,
            format.into(),
            best_effort,
            config.as_deref(),
            top_n,
        ),
        Commands::Inspect { input, json } => cmd_inspect(&input, json),
        Commands::Metrics { dataset } => cmd_metrics(dataset),
    }
}

fn cmd_analyze(
    input: &Path,
    dataset: DatasetArg,
    output: &Path,
    format: OutputFormat,
    best_effort: bool,
    config_path: Option<&Path>,
    top_n: Option<usize>,
) -> Result<(), EdaCliError> {
    let mut config = match config_path {
        Some(path) => PipelineConfig::from_path(path)?,
        None => PipelineConfig::default(),
    };
    if best_effort {
        config.mode = EvaluationMode::BestEffort;
    }
    if let Some(n) = top_n {
        config.top_n = n;
    }
    config.validate()?;

    let table = load_table(input)?;
    let profile = match dataset.profile() {
        Some(profile) => profile,
        None => datasets::detect(&table)?,
    };
    tracing::info!(dataset = profile.name(), "analyzing {}", input.display());

    let report = run_profile(&table, profile, &config)?;
    for (metric, error) in report.errors() {
        tracing::warn!(metric, %error, "metric recorded as failed");
    }

    if is_stdio(output) {
        let json = ReportEncoder::to_json_string(&report, format)?;
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{json}")?;
        stdout.flush()?;
    } else {
        ReportEncoder::write_to_path(&report, output, format)?;
    }

    Ok(())
}

fn cmd_inspect(input: &Path, json: bool) -> Result<(), EdaCliError> {
    let table = load_table(input)?;
    let nulls = evaluator::null_counts(&table);

    let report = InspectReport {
        producer: PRODUCER_NAME.to_string(),
        version: EDAKIT_VERSION.to_string(),
        rows: table.row_count(),
        dataset: datasets::detect(&table).ok().map(|p| p.name().to_string()),
        columns: table
            .columns()
            .iter()
            .zip(&nulls)
            .map(|(column, (_, count))| ColumnReport {
                name: column.name.clone(),
                dtype: column.dtype.as_str().to_string(),
                nulls: count.as_f64() as usize,
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Schema Report");
        println!("=============");
        println!("Rows:    {}", report.rows);
        println!("Dataset: {}", report.dataset.as_deref().unwrap_or("unknown"));
        println!("\nColumns:");
        for column in &report.columns {
            println!("  - {} ({}): {} nulls", column.name, column.dtype, column.nulls);
        }
    }

    Ok(())
}

fn cmd_metrics(dataset: DatasetArg) -> Result<(), EdaCliError> {
    let config = PipelineConfig::default();
    let profiles: Vec<&'static dyn DatasetProfile> = match dataset.profile() {
        Some(profile) => vec![profile],
        None => datasets::all().to_vec(),
    };

    for profile in profiles {
        println!("{}:", profile.name());
        for metric in profile.metrics(&config) {
            println!("  {}", metric.name);
        }
    }

    Ok(())
}

fn is_stdio(path: &Path) -> bool {
    path.as_os_str() == "-"
}

fn load_table(input: &Path) -> Result<Table, EdaCliError> {
    if is_stdio(input) {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(TableLoader::parse_str(&buffer)?)
    } else {
        Ok(TableLoader::from_path(input)?)
    }
}

// Error handling

#[derive(Debug)]
enum EdaCliError {
    Io(io::Error),
    Config(ConfigError),
    Load(LoadError),
    Compute(ComputeError),
    Serialization(SerializationError),
    Json(serde_json::Error),
}

impl From<io::Error> for EdaCliError {
    fn from(e: io::Error) -> Self {
        EdaCliError::Io(e)
    }
}

impl From<ConfigError> for EdaCliError {
    fn from(e: ConfigError) -> Self {
        EdaCliError::Config(e)
    }
}

impl From<LoadError> for EdaCliError {
    fn from(e: LoadError) -> Self {
        EdaCliError::Load(e)
    }
}

impl From<SerializationError> for EdaCliError {
    fn from(e: SerializationError) -> Self {
        EdaCliError::Serialization(e)
    }
}

impl From<serde_json::Error> for EdaCliError {
    fn from(e: serde_json::Error) -> Self {
        EdaCliError::Json(e)
    }
}

impl From<PipelineError> for EdaCliError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::Load(e) => EdaCliError::Load(e),
            PipelineError::Compute(e) => EdaCliError::Compute(e),
            PipelineError::Serialization(e) => EdaCliError::Serialization(e),
            PipelineError::Config(e) => EdaCliError::Config(e),
        }
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<EdaCliError> for CliError {
    fn from(e: EdaCliError) -> Self {
        match e {
            EdaCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            EdaCliError::Config(e) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check the config file fields and values".to_string()),
            },
            EdaCliError::Load(LoadError::UnknownDataset) => CliError {
                code: "UNKNOWN_DATASET".to_string(),
                message: LoadError::UnknownDataset.to_string(),
                hint: Some("Pass --dataset explicitly or run 'eda inspect' on the file".to_string()),
            },
            EdaCliError::Load(e) => CliError {
                code: "LOAD_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Ensure the input is a CSV file with a header row".to_string()),
            },
            EdaCliError::Compute(e) => CliError {
                code: "COMPUTE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Retry with --best-effort to keep the other metrics".to_string()),
            },
            EdaCliError::Serialization(e) => CliError {
                code: "SERIALIZATION_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Use ratio_policy \"null\" or \"fail\" to avoid non-finite values".to_string()),
            },
            EdaCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct InspectReport {
    producer: String,
    version: String,
    rows: usize,
    dataset: Option<String>,
    columns: Vec<ColumnReport>,
}

#[derive(serde::Serialize)]
struct ColumnReport {
    name: String,
    dtype: String,
    nulls: usize,
}
