//! Derived columns
//!
//! This module computes new columns row by row from existing ones:
//! - products (revenue = quantity × unit price)
//! - quotients (population per km²)
//! - percent change between two columns
//! - calendar date of a timestamp
//!
//! Division by zero is never silent: every derived column carries an
//! [`UndefinedPolicy`] that decides between failing, an IEEE sentinel, or null.

use crate::error::ComputeError;
use crate::evaluator;
use crate::types::{Row, Table, Value};
use serde::{Deserialize, Serialize};

/// What a derived column holds where its formula divides by zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndefinedPolicy {
    /// Abort the derivation with [`ComputeError::DivisionByZero`]
    Fail,
    /// Store `±inf` (or NaN for `0 / 0`)
    Infinity,
    /// Store null, so the row drops out of sums and rankings
    #[default]
    Null,
}

/// Row-wise formula over existing columns
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Formula {
    Product { left: String, right: String },
    Quotient { numerator: String, denominator: String },
    /// `(to - from) / from * 100`
    PercentChange { from: String, to: String },
    DateOf { column: String },
}

impl Formula {
    pub fn product(left: impl Into<String>, right: impl Into<String>) -> Self {
        Formula::Product {
            left: left.into(),
            right: right.into(),
        }
    }

    pub fn quotient(numerator: impl Into<String>, denominator: impl Into<String>) -> Self {
        Formula::Quotient {
            numerator: numerator.into(),
            denominator: denominator.into(),
        }
    }

    pub fn percent_change(from: impl Into<String>, to: impl Into<String>) -> Self {
        Formula::PercentChange {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Columns the formula reads
    pub fn inputs(&self) -> Vec<&str> {
        match self {
            Formula::Product { left, right } => vec![left.as_str(), right.as_str()],
            Formula::Quotient {
                numerator,
                denominator,
            } => vec![numerator.as_str(), denominator.as_str()],
            Formula::PercentChange { from, to } => vec![from.as_str(), to.as_str()],
            Formula::DateOf { column } => vec![column.as_str()],
        }
    }

    /// Evaluate for one row; a null input yields null
    pub fn evaluate(&self, row: Row<'_>, policy: UndefinedPolicy) -> Result<Value, ComputeError> {
        match self {
            Formula::Product { left, right } => {
                match (row.get(left)?, row.get(right)?) {
                    (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
                    (Value::Int(a), Value::Int(b)) => a
                        .checked_mul(*b)
                        .map(Value::Int)
                        .ok_or_else(|| ComputeError::Overflow(format!("{left} * {right}"))),
                    (a, b) => Ok(Value::Float(numeric(a, left)? * numeric(b, right)?)),
                }
            }
            Formula::Quotient {
                numerator,
                denominator,
            } => {
                let (Some(num), Some(den)) = (
                    optional_numeric(row.get(numerator)?, numerator)?,
                    optional_numeric(row.get(denominator)?, denominator)?,
                ) else {
                    return Ok(Value::Null);
                };
                divide(num, den, policy)
            }
            Formula::PercentChange { from, to } => {
                let (Some(start), Some(end)) = (
                    optional_numeric(row.get(from)?, from)?,
                    optional_numeric(row.get(to)?, to)?,
                ) else {
                    return Ok(Value::Null);
                };
                match divide(end - start, start, policy)? {
                    Value::Float(change) => Ok(Value::Float(change * 100.0)),
                    other => Ok(other),
                }
            }
            Formula::DateOf { column } => match row.get(column)? {
                Value::Null => Ok(Value::Null),
                value => value
                    .date()
                    .map(Value::Date)
                    .ok_or_else(|| ComputeError::NotADate(column.clone())),
            },
        }
    }
}

/// A named column computed from a [`Formula`] under an explicit [`UndefinedPolicy`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedColumn {
    pub name: String,
    pub formula: Formula,
    pub on_undefined: UndefinedPolicy,
}

impl DerivedColumn {
    pub fn new(name: impl Into<String>, formula: Formula, on_undefined: UndefinedPolicy) -> Self {
        Self {
            name: name.into(),
            formula,
            on_undefined,
        }
    }

    /// Return a copy of `table` with this column appended
    pub fn apply(&self, table: &Table) -> Result<Table, ComputeError> {
        evaluator::derived_column(table, &self.name, |row| {
            self.formula.evaluate(row, self.on_undefined)
        })
    }
}

/// Applies derived columns in declaration order, so later columns may read earlier ones
pub struct ColumnDeriver;

impl ColumnDeriver {
    pub fn derive(table: &Table, columns: &[DerivedColumn]) -> Result<Table, ComputeError> {
        let mut current = table.clone();
        for column in columns {
            current = column.apply(&current)?;
            tracing::debug!(column = %column.name, "derived column");
        }
        Ok(current)
    }
}

fn divide(numerator: f64, denominator: f64, policy: UndefinedPolicy) -> Result<Value, ComputeError> {
    match evaluator::ratio(numerator, denominator) {
        Ok(q) => Ok(Value::Float(q)),
        Err(e) => match policy {
            UndefinedPolicy::Fail => Err(e),
            UndefinedPolicy::Infinity => Ok(Value::Float(numerator / denominator)),
            UndefinedPolicy::Null => Ok(Value::Null),
        },
    }
}

fn numeric(value: &Value, column: &str) -> Result<f64, ComputeError> {
    value
        .as_f64()
        .ok_or_else(|| ComputeError::NonNumeric(column.to_string()))
}

fn optional_numeric(value: &Value, column: &str) -> Result<Option<f64>, ComputeError> {
    match value {
        Value::Null => Ok(None),
        other => numeric(other, column).map(Some),
    }
}
