//! Core types for the edakit pipeline
//!
//! This module defines the data that flows through each stage of a run:
//! cell values, the immutable table, and the metric results collected into a
//! report.

use crate::error::ComputeError;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A single typed cell
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of the value; `None` for null and non-numeric cells
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Calendar date of a date or date-time value
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            Value::DateTime(dt) => Some(dt.date()),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Int(_) => 1,
            Value::Float(_) => 2,
            Value::Text(_) => 3,
            Value::Date(_) => 4,
            Value::DateTime(_) => 5,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => signless_zero(*a).total_cmp(&signless_zero(*b)),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Date(a), Value::Date(b)) => a.cmp(b),
            (Value::DateTime(a), Value::DateTime(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Value::Null => {}
            Value::Int(v) => v.hash(state),
            Value::Float(v) => signless_zero(*v).to_bits().hash(state),
            Value::Text(s) => s.hash(state),
            Value::Date(d) => d.hash(state),
            Value::DateTime(dt) => dt.hash(state),
        }
    }
}

/// `-0.0` and `0.0` are the same key
fn signless_zero(v: f64) -> f64 {
    if v == 0.0 {
        0.0
    } else {
        v
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(s) => f.write_str(s),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S")),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

/// Inferred type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Int,
    Float,
    Text,
    Date,
    DateTime,
    /// Every cell is null
    Empty,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Int => "int",
            ColumnType::Float => "float",
            ColumnType::Text => "text",
            ColumnType::Date => "date",
            ColumnType::DateTime => "datetime",
            ColumnType::Empty => "empty",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Int | ColumnType::Float)
    }

    /// Narrowest type that can hold every non-null value
    pub fn infer<'a>(values: impl IntoIterator<Item = &'a Value>) -> Self {
        values
            .into_iter()
            .filter_map(Self::of)
            .fold(ColumnType::Empty, Self::unify)
    }

    /// Whether a column of this type can hold `value`
    pub fn admits(&self, value: &Value) -> bool {
        match Self::of(value) {
            None => true,
            Some(t) => self.unify(t) == *self,
        }
    }

    fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Int(_) => Some(ColumnType::Int),
            Value::Float(_) => Some(ColumnType::Float),
            Value::Text(_) => Some(ColumnType::Text),
            Value::Date(_) => Some(ColumnType::Date),
            Value::DateTime(_) => Some(ColumnType::DateTime),
        }
    }

    fn unify(self, other: Self) -> Self {
        match (self, other) {
            (ColumnType::Empty, t) | (t, ColumnType::Empty) => t,
            (a, b) if a == b => a,
            (ColumnType::Int, ColumnType::Float) | (ColumnType::Float, ColumnType::Int) => {
                ColumnType::Float
            }
            (ColumnType::Date, ColumnType::DateTime) | (ColumnType::DateTime, ColumnType::Date) => {
                ColumnType::DateTime
            }
            _ => ColumnType::Text,
        }
    }
}

/// Column metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub dtype: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, dtype: ColumnType) -> Self {
        Self {
            name: name.into(),
            dtype,
        }
    }
}

/// Immutable, row-ordered table with a fixed column set
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Build a table, checking that every row has one value per column and
    /// that each value fits its column's type
    pub fn new(columns: Vec<Column>, rows: Vec<Vec<Value>>) -> Result<Self, ComputeError> {
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(ComputeError::DuplicateColumn(column.name.clone()));
            }
        }

        for (idx, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(ComputeError::SchemaMismatch {
                    row: idx,
                    expected: columns.len(),
                    found: row.len(),
                });
            }
            for (column, value) in columns.iter().zip(row) {
                if !column.dtype.admits(value) {
                    return Err(ComputeError::TypeMismatch {
                        row: idx,
                        column: column.name.clone(),
                        expected: column.dtype.as_str(),
                    });
                }
            }
        }

        Ok(Self { columns, rows })
    }

    /// Build a table from column names and rows, inferring column types from the values
    pub fn from_rows(names: &[&str], rows: Vec<Vec<Value>>) -> Result<Self, ComputeError> {
        let columns = names
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let dtype = ColumnType::infer(rows.iter().filter_map(|row| row.get(idx)));
                Column::new(*name, dtype)
            })
            .collect();
        Self::new(columns, rows)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column_index(&self, name: &str) -> Result<usize, ComputeError> {
        self.columns
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| ComputeError::UnknownColumn(name.to_string()))
    }

    pub fn column(&self, name: &str) -> Result<&Column, ComputeError> {
        let idx = self.column_index(name)?;
        Ok(&self.columns[idx])
    }

    /// Values of one column, in row order
    pub fn values(&self, name: &str) -> Result<impl Iterator<Item = &Value> + '_, ComputeError> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(move |row| &row[idx]))
    }

    pub fn row(&self, index: usize) -> Option<Row<'_>> {
        (index < self.rows.len()).then_some(Row { table: self, index })
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        (0..self.rows.len()).map(move |index| Row { table: self, index })
    }

    /// Return a copy of this table with one extra column appended
    pub fn with_column(&self, column: Column, values: Vec<Value>) -> Result<Table, ComputeError> {
        if self.has_column(&column.name) {
            return Err(ComputeError::DuplicateColumn(column.name));
        }
        if values.len() != self.rows.len() {
            return Err(ComputeError::SchemaMismatch {
                row: values.len().min(self.rows.len()),
                expected: self.rows.len(),
                found: values.len(),
            });
        }
        if let Some(row) = values.iter().position(|v| !column.dtype.admits(v)) {
            return Err(ComputeError::TypeMismatch {
                row,
                column: column.name,
                expected: column.dtype.as_str(),
            });
        }

        let mut columns = self.columns.clone();
        columns.push(column);

        let rows = self
            .rows
            .iter()
            .zip(values)
            .map(|(row, value)| {
                let mut row = row.clone();
                row.push(value);
                row
            })
            .collect();

        Ok(Table { columns, rows })
    }
}

/// Borrowed view of one table row
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    table: &'a Table,
    index: usize,
}

impl<'a> Row<'a> {
    /// Position of this row in the table
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn get(&self, column: &str) -> Result<&'a Value, ComputeError> {
        let idx = self.table.column_index(column)?;
        Ok(&self.table.rows[self.index][idx])
    }

    pub fn values(&self) -> &'a [Value] {
        &self.table.rows[self.index]
    }
}

/// Scalar metric value; integer aggregates stay integers
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(&self) -> f64 {
        match self {
            Number::Int(v) => *v as f64,
            Number::Float(v) => *v,
        }
    }

    pub fn is_finite(&self) -> bool {
        match self {
            Number::Int(_) => true,
            Number::Float(v) => v.is_finite(),
        }
    }

    /// Order by numeric value, NaN sorting above every other float
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a.cmp(b),
            _ => self.as_f64().total_cmp(&other.as_f64()),
        }
    }
}

impl From<usize> for Number {
    fn from(v: usize) -> Self {
        Number::Int(v as i64)
    }
}

impl From<f64> for Number {
    fn from(v: f64) -> Self {
        Number::Float(v)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(v) => write!(f, "{v}"),
            Number::Float(v) => write!(f, "{v}"),
        }
    }
}

/// Descriptive statistics of one numeric column
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    /// Non-null values
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; undefined for a single value
    pub std: Option<f64>,
    pub min: f64,
    /// Quartiles, linearly interpolated between the closest ranks
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

/// Frequency profile of one text or date column
#[derive(Debug, Clone, PartialEq)]
pub struct CategoricalSummary {
    /// Non-null values
    pub count: usize,
    pub unique: usize,
    /// Most frequent value; the first seen wins a tie
    pub top: Value,
    pub freq: usize,
}

/// Per-column entry of a table-wide description
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnSummary {
    Numeric(Summary),
    Categorical(CategoricalSummary),
}

/// Pairwise Pearson correlation between numeric columns
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    /// `values[i][j]` is the coefficient of `columns[i]` against `columns[j]`
    pub values: Vec<Vec<Option<f64>>>,
}

/// Ordered mapping from group key to aggregate
pub type Grouped = Vec<(Value, Number)>;

/// Output of a single metric
#[derive(Debug, Clone, PartialEq)]
pub enum MetricResult {
    Scalar(Number),
    Grouped(Grouped),
    Summary(Summary),
    Summaries(Vec<(String, ColumnSummary)>),
    Matrix(CorrelationMatrix),
}

impl MetricResult {
    pub fn as_scalar(&self) -> Option<Number> {
        match self {
            MetricResult::Scalar(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_grouped(&self) -> Option<&Grouped> {
        match self {
            MetricResult::Grouped(g) => Some(g),
            _ => None,
        }
    }

    pub fn shape(&self) -> &'static str {
        match self {
            MetricResult::Scalar(_) => "scalar",
            MetricResult::Grouped(_) => "grouped",
            MetricResult::Summary(_) => "summary",
            MetricResult::Summaries(_) => "summaries",
            MetricResult::Matrix(_) => "matrix",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> Table {
        Table::from_rows(
            &["Country", "Qty"],
            vec![
                vec!["UK".into(), Value::Int(10)],
                vec!["UK".into(), Value::Int(-3)],
                vec!["FR".into(), Value::Int(5)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_from_rows_infers_types() {
        let table = sample_table();
        assert_eq!(table.column("Country").unwrap().dtype, ColumnType::Text);
        assert_eq!(table.column("Qty").unwrap().dtype, ColumnType::Int);
        assert_eq!(table.row_count(), 3);
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let result = Table::from_rows(&["a", "b"], vec![vec![Value::Int(1)]]);
        assert!(matches!(
            result,
            Err(ComputeError::SchemaMismatch { row: 0, expected: 2, found: 1 })
        ));
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let result = Table::from_rows(&["a", "a"], vec![]);
        assert_eq!(result, Err(ComputeError::DuplicateColumn("a".to_string())));
    }

    #[test]
    fn test_with_column_leaves_input_untouched() {
        let table = sample_table();
        let extended = table
            .with_column(
                Column::new("Flag", ColumnType::Int),
                vec![Value::Int(1), Value::Int(0), Value::Int(1)],
            )
            .unwrap();

        assert_eq!(table.column_count(), 2);
        assert_eq!(extended.column_count(), 3);
        assert_eq!(extended.row(1).unwrap().get("Flag").unwrap(), &Value::Int(0));
    }

    #[test]
    fn test_mixed_numeric_column_is_float() {
        let dtype = ColumnType::infer(&[Value::Int(1), Value::Null, Value::Float(2.5)]);
        assert_eq!(dtype, ColumnType::Float);
        assert_eq!(ColumnType::infer(&[Value::Null]), ColumnType::Empty);
        assert_eq!(
            ColumnType::infer(&[Value::Int(1), Value::from("x")]),
            ColumnType::Text
        );
    }

    #[test]
    fn test_values_must_fit_declared_type() {
        let result = Table::new(
            vec![Column::new("g", ColumnType::Text), Column::new("v", ColumnType::Int)],
            vec![
                vec!["a".into(), Value::Int(1)],
                vec!["a".into(), Value::Float(2.5)],
            ],
        );
        assert_eq!(
            result,
            Err(ComputeError::TypeMismatch {
                row: 1,
                column: "v".to_string(),
                expected: "int",
            })
        );

        // widening is allowed: ints in a float column, dates in a date-time column
        let day = NaiveDate::from_ymd_opt(2010, 12, 1).unwrap();
        let widened = Table::new(
            vec![Column::new("v", ColumnType::Float), Column::new("d", ColumnType::DateTime)],
            vec![vec![Value::Int(1), Value::Date(day)], vec![Value::Null, Value::Null]],
        );
        assert!(widened.is_ok());

        let table = sample_table();
        assert!(matches!(
            table.with_column(
                Column::new("Flag", ColumnType::Int),
                vec![Value::Int(1), Value::from("x"), Value::Int(0)],
            ),
            Err(ComputeError::TypeMismatch { row: 1, .. })
        ));
    }

    #[test]
    fn test_signed_zero_is_one_key() {
        assert_eq!(Value::Float(0.0), Value::Float(-0.0));

        let distinct: HashSet<Value> = [Value::Float(0.0), Value::Float(-0.0)].into_iter().collect();
        assert_eq!(distinct.len(), 1);
    }

    #[test]
    fn test_value_display() {
        let date = NaiveDate::from_ymd_opt(2010, 12, 1).unwrap();
        assert_eq!(Value::Date(date).to_string(), "2010-12-01");
        assert_eq!(
            Value::DateTime(date.and_hms_opt(8, 26, 0).unwrap()).to_string(),
            "2010-12-01T08:26:00"
        );
        assert_eq!(Value::Float(1.5).to_string(), "1.5");
    }
}
