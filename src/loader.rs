//! Flat-file loading
//!
//! Reads comma-separated text into a [`Table`]. Fields may be quoted (with
//! `""` escapes and embedded line breaks). Column types are inferred from the
//! non-empty cells of each column: integers, then floats, then date-times,
//! then dates, falling back to text. Each temporal column is read with the
//! one format that fits all of its cells. Empty cells become nulls.

use crate::error::LoadError;
use crate::types::{Column, ColumnType, Table, Value};
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y"];

/// Loader for comma-separated files with a header row
pub struct TableLoader;

impl TableLoader {
    /// Read and parse a file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Table, LoadError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let table = Self::parse_str(&text)?;
        tracing::info!(
            path = %path.display(),
            rows = table.row_count(),
            columns = table.column_count(),
            "loaded table"
        );
        Ok(table)
    }

    /// Parse CSV text
    pub fn parse_str(text: &str) -> Result<Table, LoadError> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let mut records = parse_records(text)?.into_iter();

        let Some((_, header)) = records.next() else {
            return Err(LoadError::MissingHeader);
        };
        if header.iter().all(|h| h.trim().is_empty()) {
            return Err(LoadError::MissingHeader);
        }

        let names: Vec<String> = header.into_iter().map(|h| h.trim().to_string()).collect();
        let mut seen = HashSet::new();
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(LoadError::DuplicateColumn(name.clone()));
            }
        }

        let mut raw_rows: Vec<Vec<String>> = Vec::new();
        for (line, fields) in records {
            if fields.len() == 1 && fields[0].is_empty() {
                continue;
            }
            if fields.len() != names.len() {
                return Err(LoadError::RaggedRow {
                    line,
                    expected: names.len(),
                    found: fields.len(),
                });
            }
            raw_rows.push(fields);
        }

        let parsers: Vec<CellParser> = (0..names.len())
            .map(|idx| infer_column(raw_rows.iter().map(|row| row[idx].as_str())))
            .collect();

        let rows = raw_rows
            .into_iter()
            .map(|row| {
                row.iter()
                    .zip(&parsers)
                    .map(|(cell, parser)| convert(cell, *parser))
                    .collect()
            })
            .collect();

        let columns = names
            .into_iter()
            .zip(parsers)
            .map(|(name, parser)| Column::new(name, parser.dtype()))
            .collect();

        Ok(Table::new(columns, rows)?)
    }
}

/// Split text into records, each tagged with the 1-based line it starts on
fn parse_records(text: &str) -> Result<Vec<(usize, Vec<String>)>, LoadError> {
    let mut records = Vec::new();
    let mut fields: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut record_line = 1;
    let mut quote_line = 1;
    let mut chars = text.chars().peekable();
    let mut pending = false;

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() => {
                in_quotes = true;
                quote_line = line;
                pending = true;
            }
            ',' => {
                fields.push(std::mem::take(&mut field));
                pending = true;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                fields.push(std::mem::take(&mut field));
                records.push((record_line, std::mem::take(&mut fields)));
                line += 1;
                record_line = line;
                pending = false;
            }
            _ => {
                field.push(c);
                pending = true;
            }
        }
    }

    if in_quotes {
        return Err(LoadError::UnterminatedQuote { line: quote_line });
    }
    if pending || !field.is_empty() {
        fields.push(field);
        records.push((record_line, fields));
    }

    Ok(records)
}

/// How every cell of one column is read.
///
/// A column commits to a single format, so a day-first and a month-first
/// reading never mix within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellParser {
    Empty,
    Int,
    Float,
    DateTime(&'static str),
    Date(&'static str),
    /// Date-times where some cells carry only the date part
    DateOrDateTime {
        datetime: &'static str,
        date: &'static str,
    },
    Text,
}

impl CellParser {
    fn dtype(self) -> ColumnType {
        match self {
            CellParser::Empty => ColumnType::Empty,
            CellParser::Int => ColumnType::Int,
            CellParser::Float => ColumnType::Float,
            CellParser::DateTime(_) | CellParser::DateOrDateTime { .. } => ColumnType::DateTime,
            CellParser::Date(_) => ColumnType::Date,
            CellParser::Text => ColumnType::Text,
        }
    }

    /// Typed value of a trimmed, non-empty cell; `None` if it does not fit
    fn parse(self, cell: &str) -> Option<Value> {
        match self {
            CellParser::Int => cell.parse().ok().map(Value::Int),
            CellParser::Float => parse_float(cell).map(Value::Float),
            CellParser::DateTime(fmt) => NaiveDateTime::parse_from_str(cell, fmt)
                .ok()
                .map(Value::DateTime),
            CellParser::Date(fmt) => NaiveDate::parse_from_str(cell, fmt).ok().map(Value::Date),
            CellParser::DateOrDateTime { datetime, date } => {
                let at_midnight = || {
                    NaiveDate::parse_from_str(cell, date)
                        .ok()
                        .and_then(|d| d.and_hms_opt(0, 0, 0))
                };
                NaiveDateTime::parse_from_str(cell, datetime)
                    .ok()
                    .or_else(at_midnight)
                    .map(Value::DateTime)
            }
            CellParser::Text | CellParser::Empty => None,
        }
    }

    /// Typed readings tried in order of preference
    fn candidates() -> impl Iterator<Item = CellParser> {
        let datetimes = DATETIME_FORMATS.iter().copied().map(CellParser::DateTime);
        let dates = DATE_FORMATS.iter().copied().map(CellParser::Date);
        let mixed = DATETIME_FORMATS.iter().copied().flat_map(|datetime| {
            DATE_FORMATS
                .iter()
                .copied()
                .filter(move |date| datetime.starts_with(*date))
                .map(move |date| CellParser::DateOrDateTime { datetime, date })
        });

        [CellParser::Int, CellParser::Float]
            .into_iter()
            .chain(datetimes)
            .chain(dates)
            .chain(mixed)
    }
}

fn infer_column<'a>(cells: impl Iterator<Item = &'a str> + Clone) -> CellParser {
    let present = cells.map(str::trim).filter(|c| !c.is_empty());
    if present.clone().next().is_none() {
        return CellParser::Empty;
    }

    CellParser::candidates()
        .find(|parser| present.clone().all(|c| parser.parse(c).is_some()))
        .unwrap_or(CellParser::Text)
}

fn convert(cell: &str, parser: CellParser) -> Value {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    parser
        .parse(trimmed)
        .unwrap_or_else(|| Value::Text(cell.to_string()))
}

/// Finite decimal number; spellings like "inf" or "NaN" stay text
fn parse_float(cell: &str) -> Option<f64> {
    cell.parse::<f64>().ok().filter(|v| v.is_finite())
}
