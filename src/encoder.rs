//! Report encoding
//!
//! This module turns a [`Report`] into JSON. It is the only place where
//! group keys become strings and numbers are checked for finiteness, so
//! every metric is coerced the same way.

use crate::error::SerializationError;
use crate::report::Report;
use crate::types::{
    CategoricalSummary, ColumnSummary, CorrelationMatrix, MetricResult, Number, Summary, Value,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value as Json};
use std::io::Write;
use std::path::Path;

/// Layout of the encoded document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Single line
    #[default]
    Json,
    /// Indented, one field per line
    JsonPretty,
}

/// JSON encoder for metric reports
pub struct ReportEncoder;

impl ReportEncoder {
    /// Encode a report as an ordered JSON object keyed by metric name
    pub fn to_value(report: &Report) -> Result<Json, SerializationError> {
        let mut document = Map::new();
        for (name, outcome) in report.entries() {
            let encoded = match outcome {
                Ok(result) => encode_result(name, result)?,
                Err(e) => json!({ "error": e.to_string() }),
            };
            document.insert(name.clone(), encoded);
        }
        Ok(Json::Object(document))
    }

    /// Encode to a JSON string
    pub fn to_json_string(report: &Report, format: OutputFormat) -> Result<String, SerializationError> {
        let value = Self::to_value(report)?;
        let text = match format {
            OutputFormat::Json => serde_json::to_string(&value)?,
            OutputFormat::JsonPretty => serde_json::to_string_pretty(&value)?,
        };
        Ok(text)
    }

    /// Encode and write to `path`.
    ///
    /// The document is written to a temporary file next to `path` and moved
    /// into place, so `path` is either fully written or left untouched.
    pub fn write_to_path(
        report: &Report,
        path: impl AsRef<Path>,
        format: OutputFormat,
    ) -> Result<(), SerializationError> {
        let path = path.as_ref();
        let mut text = Self::to_json_string(report, format)?;
        text.push('\n');

        let io_error = |source: std::io::Error| SerializationError::Io {
            path: path.to_path_buf(),
            source,
        };
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut file = tempfile::NamedTempFile::new_in(dir).map_err(io_error)?;
        file.write_all(text.as_bytes()).map_err(io_error)?;
        file.persist(path).map_err(|e| io_error(e.error))?;

        tracing::info!(path = %path.display(), metrics = report.len(), "wrote report");
        Ok(())
    }
}

fn encode_result(metric: &str, result: &MetricResult) -> Result<Json, SerializationError> {
    match result {
        MetricResult::Scalar(n) => encode_number(metric, *n),
        MetricResult::Grouped(groups) => {
            let mut object = Map::new();
            for (key, value) in groups {
                let key = encode_key(metric, key)?;
                if object.contains_key(&key) {
                    return Err(SerializationError::DuplicateKey {
                        metric: metric.to_string(),
                        key,
                    });
                }
                object.insert(key, encode_number(metric, *value)?);
            }
            Ok(Json::Object(object))
        }
        MetricResult::Summary(summary) => encode_summary(metric, summary),
        MetricResult::Summaries(summaries) => {
            let mut object = Map::new();
            for (column, summary) in summaries {
                let encoded = match summary {
                    ColumnSummary::Numeric(summary) => encode_summary(metric, summary)?,
                    ColumnSummary::Categorical(summary) => encode_categorical(summary),
                };
                object.insert(column.clone(), encoded);
            }
            Ok(Json::Object(object))
        }
        MetricResult::Matrix(matrix) => encode_matrix(metric, matrix),
    }
}

fn encode_number(metric: &str, n: Number) -> Result<Json, SerializationError> {
    match n {
        Number::Int(v) => Ok(Json::from(v)),
        Number::Float(v) => encode_float(metric, v),
    }
}

fn encode_float(metric: &str, v: f64) -> Result<Json, SerializationError> {
    serde_json::Number::from_f64(v)
        .map(Json::Number)
        .ok_or_else(|| SerializationError::NonFinite {
            metric: metric.to_string(),
        })
}

fn encode_key(metric: &str, key: &Value) -> Result<String, SerializationError> {
    match key {
        Value::Float(v) if !v.is_finite() => Err(SerializationError::NonFinite {
            metric: metric.to_string(),
        }),
        other => Ok(other.to_string()),
    }
}

fn encode_summary(metric: &str, summary: &Summary) -> Result<Json, SerializationError> {
    let std = match summary.std {
        Some(v) => encode_float(metric, v)?,
        None => Json::Null,
    };
    Ok(json!({
        "count": summary.count,
        "mean": encode_float(metric, summary.mean)?,
        "std": std,
        "min": encode_float(metric, summary.min)?,
        "25%": encode_float(metric, summary.q25)?,
        "50%": encode_float(metric, summary.median)?,
        "75%": encode_float(metric, summary.q75)?,
        "max": encode_float(metric, summary.max)?,
    }))
}

fn encode_categorical(summary: &CategoricalSummary) -> Json {
    json!({
        "count": summary.count,
        "unique": summary.unique,
        "top": summary.top.to_string(),
        "freq": summary.freq,
    })
}

fn encode_matrix(metric: &str, matrix: &CorrelationMatrix) -> Result<Json, SerializationError> {
    let data = matrix
        .values
        .iter()
        .map(|row| {
            row.iter()
                .map(|cell| match cell {
                    Some(v) => encode_float(metric, *v),
                    None => Ok(Json::Null),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Json::Array)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(json!({
        "columns": matrix.columns,
        "data": data,
    }))
}
