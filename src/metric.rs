//! Metric definitions
//!
//! A metric is a named, declarative description of one aggregate over a
//! table: an optional grouping key, an aggregation operator, the order of
//! the grouped output and an optional top-N limit. Evaluation is delegated to
//! the functions in [`evaluator`](crate::evaluator) and never mutates the
//! table.

use crate::error::ComputeError;
use crate::evaluator;
use crate::types::{MetricResult, Number, Table, Value};

/// Row filter used by counting metrics.
///
/// Predicates are total: a null cell only ever matches [`Predicate::IsNull`].
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    LessThan(f64),
    GreaterThan(f64),
    Equals(Value),
    StartsWith(String),
    IsNull,
    NotNull,
}

impl Predicate {
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Predicate::IsNull => value.is_null(),
            Predicate::NotNull => !value.is_null(),
            Predicate::LessThan(bound) => value.as_f64().is_some_and(|v| v < *bound),
            Predicate::GreaterThan(bound) => value.as_f64().is_some_and(|v| v > *bound),
            Predicate::Equals(expected) => match (value.as_f64(), expected.as_f64()) {
                (Some(v), Some(e)) => v == e,
                _ => !value.is_null() && value == expected,
            },
            Predicate::StartsWith(prefix) => value.as_str().is_some_and(|s| s.starts_with(prefix)),
        }
    }
}

/// Key used to partition rows before aggregating
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupKey {
    /// Raw value of a column
    Column(String),
    /// Calendar date of a date or date-time column
    DateOf(String),
}

impl GroupKey {
    pub fn column(name: impl Into<String>) -> Self {
        GroupKey::Column(name.into())
    }

    pub fn date_of(name: impl Into<String>) -> Self {
        GroupKey::DateOf(name.into())
    }

    /// Column the key is read from
    pub fn source_column(&self) -> &str {
        match self {
            GroupKey::Column(name) | GroupKey::DateOf(name) => name,
        }
    }

    /// Key for one cell; `Value::Null` means the row is not grouped
    pub(crate) fn key_of(&self, value: &Value) -> Value {
        match self {
            GroupKey::Column(_) => match value {
                Value::Float(v) if *v == 0.0 => Value::Float(0.0),
                other => other.clone(),
            },
            GroupKey::DateOf(_) => value.date().map(Value::Date).unwrap_or(Value::Null),
        }
    }
}

/// Direction of a ranking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Order of a grouped result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupOrder {
    /// Order in which each group first appears in the table
    #[default]
    FirstSeen,
    /// Natural order of the group keys
    KeyAscending,
    ValueAscending,
    ValueDescending,
}

impl From<SortOrder> for GroupOrder {
    fn from(order: SortOrder) -> Self {
        match order {
            SortOrder::Ascending => GroupOrder::ValueAscending,
            SortOrder::Descending => GroupOrder::ValueDescending,
        }
    }
}

/// Aggregation operator of a metric
#[derive(Debug, Clone, PartialEq)]
pub enum Aggregation {
    /// Number of rows
    Count,
    CountDistinct { column: String },
    CountMatching { column: String, predicate: Predicate },
    Sum { column: String },
    Mean { column: String },
    Std { column: String },
    Min { column: String },
    Max { column: String },
    Describe { column: String },
    /// `describe` over every numeric column
    DescribeAll,
    /// Quotient of two scalar aggregations
    Ratio {
        numerator: Box<Aggregation>,
        denominator: Box<Aggregation>,
    },
    /// Null cells per column
    NullCounts,
    /// Sum of several columns, keyed by column name
    ColumnSums { columns: Vec<String> },
    Correlation,
    Histogram { column: String, bins: usize },
}

impl Aggregation {
    pub fn count_distinct(column: impl Into<String>) -> Self {
        Aggregation::CountDistinct {
            column: column.into(),
        }
    }

    pub fn count_matching(column: impl Into<String>, predicate: Predicate) -> Self {
        Aggregation::CountMatching {
            column: column.into(),
            predicate,
        }
    }

    pub fn sum(column: impl Into<String>) -> Self {
        Aggregation::Sum {
            column: column.into(),
        }
    }

    pub fn describe(column: impl Into<String>) -> Self {
        Aggregation::Describe {
            column: column.into(),
        }
    }

    pub fn ratio(numerator: Aggregation, denominator: Aggregation) -> Self {
        Aggregation::Ratio {
            numerator: Box::new(numerator),
            denominator: Box::new(denominator),
        }
    }

    pub fn histogram(column: impl Into<String>, bins: usize) -> Self {
        Aggregation::Histogram {
            column: column.into(),
            bins,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Aggregation::Count => "count",
            Aggregation::CountDistinct { .. } => "nunique",
            Aggregation::CountMatching { .. } => "count_matching",
            Aggregation::Sum { .. } => "sum",
            Aggregation::Mean { .. } => "mean",
            Aggregation::Std { .. } => "std",
            Aggregation::Min { .. } => "min",
            Aggregation::Max { .. } => "max",
            Aggregation::Describe { .. } => "describe",
            Aggregation::DescribeAll => "describe_all",
            Aggregation::Ratio { .. } => "ratio",
            Aggregation::NullCounts => "null_counts",
            Aggregation::ColumnSums { .. } => "column_sums",
            Aggregation::Correlation => "correlation",
            Aggregation::Histogram { .. } => "histogram",
        }
    }

    /// Evaluate an ungrouped aggregation that must produce a single number
    fn scalar(&self, table: &Table) -> Result<Number, ComputeError> {
        match self {
            Aggregation::Count => Ok(Number::from(table.row_count())),
            Aggregation::CountDistinct { column } => {
                evaluator::count_distinct(table, column).map(Number::from)
            }
            Aggregation::CountMatching { column, predicate } => {
                evaluator::count_matching(table, column, predicate).map(Number::from)
            }
            Aggregation::Sum { column } => evaluator::sum(table, column),
            Aggregation::Mean { column } => evaluator::mean(table, column).map(Number::Float),
            Aggregation::Std { column } => evaluator::std(table, column).map(Number::Float),
            Aggregation::Min { column } => evaluator::min(table, column),
            Aggregation::Max { column } => evaluator::max(table, column),
            Aggregation::Ratio {
                numerator,
                denominator,
            } => {
                let num = numerator.scalar(table)?;
                let den = denominator.scalar(table)?;
                evaluator::ratio(num.as_f64(), den.as_f64()).map(Number::Float)
            }
            other => Err(ComputeError::InvalidArgument(format!(
                "{} does not produce a scalar",
                other.label()
            ))),
        }
    }
}

/// Named, pure computation over a table
#[derive(Debug, Clone, PartialEq)]
pub struct MetricDefinition {
    pub name: String,
    pub group_by: Option<GroupKey>,
    pub aggregation: Aggregation,
    pub order: GroupOrder,
    /// Keep only the first `limit` groups after ordering
    pub limit: Option<usize>,
}

impl MetricDefinition {
    pub fn new(name: impl Into<String>, aggregation: Aggregation) -> Self {
        Self {
            name: name.into(),
            group_by: None,
            aggregation,
            order: GroupOrder::FirstSeen,
            limit: None,
        }
    }

    pub fn grouped_by(mut self, key: GroupKey) -> Self {
        self.group_by = Some(key);
        self
    }

    pub fn ordered(mut self, order: GroupOrder) -> Self {
        self.order = order;
        self
    }

    /// Keep the `n` groups with the largest (or smallest) values
    pub fn top(mut self, n: usize, order: SortOrder) -> Self {
        self.order = order.into();
        self.limit = Some(n);
        self
    }

    /// Apply this metric to a table
    pub fn evaluate(&self, table: &Table) -> Result<MetricResult, ComputeError> {
        match &self.group_by {
            Some(key) => self.evaluate_grouped(table, key),
            None => self.evaluate_ungrouped(table),
        }
    }

    fn evaluate_grouped(&self, table: &Table, key: &GroupKey) -> Result<MetricResult, ComputeError> {
        let grouped = match &self.aggregation {
            Aggregation::Sum { column } => match (self.limit, self.order) {
                (Some(n), GroupOrder::ValueDescending) => {
                    return Ok(MetricResult::Grouped(evaluator::top_n(
                        table,
                        key,
                        column,
                        n,
                        SortOrder::Descending,
                    )?));
                }
                (Some(n), GroupOrder::ValueAscending) => {
                    return Ok(MetricResult::Grouped(evaluator::top_n(
                        table,
                        key,
                        column,
                        n,
                        SortOrder::Ascending,
                    )?));
                }
                _ => evaluator::group_sum(table, key, column)?,
            },
            Aggregation::Count => evaluator::group_count(table, key)?,
            Aggregation::CountDistinct { column } => {
                evaluator::group_count_distinct(table, key, column)?
            }
            Aggregation::CountMatching { column, predicate } => {
                evaluator::group_count_matching(table, key, column, predicate)?
            }
            Aggregation::Mean { column } => evaluator::group_mean(table, key, column)?,
            Aggregation::Min { column } => evaluator::group_min(table, key, column)?,
            Aggregation::Max { column } => evaluator::group_max(table, key, column)?,
            other => {
                return Err(ComputeError::InvalidMetric {
                    metric: self.name.clone(),
                    reason: format!("{} cannot be grouped", other.label()),
                })
            }
        };

        Ok(MetricResult::Grouped(evaluator::rank_groups(
            grouped, self.order, self.limit,
        )))
    }

    fn evaluate_ungrouped(&self, table: &Table) -> Result<MetricResult, ComputeError> {
        let grouped = match &self.aggregation {
            Aggregation::Describe { column } => {
                return evaluator::describe(table, column).map(MetricResult::Summary)
            }
            Aggregation::DescribeAll => {
                return evaluator::describe_all(table).map(MetricResult::Summaries)
            }
            Aggregation::Correlation => {
                return Ok(MetricResult::Matrix(evaluator::correlation(table)))
            }
            Aggregation::NullCounts => evaluator::null_counts(table),
            Aggregation::ColumnSums { columns } => evaluator::column_sums(table, columns)?,
            Aggregation::Histogram { column, bins } => {
                evaluator::histogram(table, column, *bins)?
            }
            scalar => return scalar.scalar(table).map(MetricResult::Scalar),
        };

        Ok(MetricResult::Grouped(evaluator::rank_groups(
            grouped, self.order, self.limit,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn retail_table() -> Table {
        Table::from_rows(
            &["InvoiceNo", "Country", "Qty"],
            vec![
                vec!["536365".into(), "UK".into(), Value::Int(10)],
                vec!["C536379".into(), "UK".into(), Value::Int(-3)],
                vec!["536366".into(), "FR".into(), Value::Int(5)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_predicates_are_total() {
        assert!(!Predicate::LessThan(0.0).matches(&Value::Null));
        assert!(!Predicate::StartsWith("C".into()).matches(&Value::Null));
        assert!(!Predicate::Equals(Value::Null).matches(&Value::Null));
        assert!(Predicate::IsNull.matches(&Value::Null));
        assert!(Predicate::LessThan(0.0).matches(&Value::Int(-3)));
        assert!(!Predicate::LessThan(0.0).matches(&Value::from("-3")));
    }

    #[test]
    fn test_equals_compares_numbers_by_value() {
        assert!(Predicate::Equals(Value::Int(1)).matches(&Value::Float(1.0)));
        assert!(Predicate::Equals(Value::Float(2.0)).matches(&Value::Int(2)));
        assert!(!Predicate::Equals(Value::Int(1)).matches(&Value::Float(1.5)));
        assert!(!Predicate::Equals(Value::Int(1)).matches(&Value::from("1")));

        let table = Table::from_rows(
            &["Price"],
            vec![vec![Value::Float(1.0)], vec![Value::Float(2.5)], vec![Value::Null]],
        )
        .unwrap();
        let metric = MetricDefinition::new(
            "unit_priced",
            Aggregation::count_matching("Price", Predicate::Equals(Value::Int(1))),
        );
        assert_eq!(
            metric.evaluate(&table).unwrap(),
            MetricResult::Scalar(Number::Int(1))
        );
    }

    #[test]
    fn test_negative_zero_key_renders_as_zero() {
        let table = Table::from_rows(
            &["k"],
            vec![vec![Value::Float(-0.0)], vec![Value::Float(0.0)]],
        )
        .unwrap();
        let metric =
            MetricDefinition::new("per_key", Aggregation::Count).grouped_by(GroupKey::column("k"));

        let grouped = metric.evaluate(&table).unwrap();
        let keys: Vec<String> = grouped
            .as_grouped()
            .unwrap()
            .iter()
            .map(|(k, _)| k.to_string())
            .collect();
        assert_eq!(keys, vec!["0"]);
    }

    #[test]
    fn test_return_rate_metric() {
        let metric = MetricDefinition::new(
            "return_rate",
            Aggregation::ratio(
                Aggregation::count_matching("Qty", Predicate::LessThan(0.0)),
                Aggregation::Count,
            ),
        );

        let result = metric.evaluate(&retail_table()).unwrap();
        let rate = result.as_scalar().unwrap().as_f64();
        assert!((rate - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_grouped_sum_sorted_by_value() {
        let metric = MetricDefinition::new("sales_by_country", Aggregation::sum("Qty"))
            .grouped_by(GroupKey::column("Country"))
            .ordered(GroupOrder::ValueAscending);

        let result = metric.evaluate(&retail_table()).unwrap();
        assert_eq!(
            result,
            MetricResult::Grouped(vec![
                (Value::from("FR"), Number::Int(5)),
                (Value::from("UK"), Number::Int(7)),
            ])
        );
    }

    #[test]
    fn test_top_count_by_group() {
        let metric = MetricDefinition::new("top_countries", Aggregation::Count)
            .grouped_by(GroupKey::column("Country"))
            .top(1, SortOrder::Descending);

        let result = metric.evaluate(&retail_table()).unwrap();
        assert_eq!(
            result.as_grouped().unwrap(),
            &vec![(Value::from("UK"), Number::Int(2))]
        );
    }

    #[test]
    fn test_describe_cannot_be_grouped() {
        let metric = MetricDefinition::new("bad", Aggregation::describe("Qty"))
            .grouped_by(GroupKey::column("Country"));

        let err = metric.evaluate(&retail_table()).unwrap_err();
        assert!(matches!(err, ComputeError::InvalidMetric { .. }));
    }

    #[test]
    fn test_ratio_of_non_scalar_rejected() {
        let metric = MetricDefinition::new(
            "bad_ratio",
            Aggregation::ratio(Aggregation::NullCounts, Aggregation::Count),
        );
        assert!(matches!(
            metric.evaluate(&retail_table()),
            Err(ComputeError::InvalidArgument(_))
        ));
    }
}
