//! Metric evaluation
//!
//! Pure aggregate functions over a [`Table`]:
//! - distinct and predicate counts
//! - scalar and grouped sums, means and extrema
//! - top-N rankings with first-seen tie breaking
//! - descriptive statistics, correlation and histograms
//! - row-wise derived columns
//!
//! None of these functions mutate their input or depend on global state.

use crate::error::ComputeError;
use crate::metric::{GroupKey, GroupOrder, Predicate, SortOrder};
use crate::types::{
    CategoricalSummary, Column, ColumnSummary, ColumnType, CorrelationMatrix, Grouped, Number,
    Row, Summary, Table, Value,
};
use std::collections::{HashMap, HashSet};

/// Count distinct non-null values in a column
pub fn count_distinct(table: &Table, column: &str) -> Result<usize, ComputeError> {
    let distinct: HashSet<&Value> = table.values(column)?.filter(|v| !v.is_null()).collect();
    Ok(distinct.len())
}

/// Count rows whose `column` value satisfies `predicate`
pub fn count_matching(
    table: &Table,
    column: &str,
    predicate: &Predicate,
) -> Result<usize, ComputeError> {
    Ok(table.values(column)?.filter(|v| predicate.matches(v)).count())
}

/// Sum of a numeric column; nulls are skipped
pub fn sum(table: &Table, column: &str) -> Result<Number, ComputeError> {
    let mut acc = SumAccumulator::for_column(table, column)?;
    for value in table.values(column)? {
        acc.add(value);
    }
    acc.finish(column)
}

pub fn mean(table: &Table, column: &str) -> Result<f64, ComputeError> {
    let values = numeric_values(table, column)?;
    if values.is_empty() {
        return Err(ComputeError::EmptyColumn(column.to_string()));
    }
    Ok(mean_of(&values))
}

/// Sample standard deviation of a numeric column
pub fn std(table: &Table, column: &str) -> Result<f64, ComputeError> {
    let values = numeric_values(table, column)?;
    sample_std(&values).ok_or_else(|| ComputeError::InsufficientValues {
        column: column.to_string(),
        needed: 2,
        found: values.len(),
    })
}

pub fn min(table: &Table, column: &str) -> Result<Number, ComputeError> {
    extremum(table, column, |candidate, best| candidate < best)
}

pub fn max(table: &Table, column: &str) -> Result<Number, ComputeError> {
    extremum(table, column, |candidate, best| candidate > best)
}

/// Descriptive statistics of a numeric column
pub fn describe(table: &Table, column: &str) -> Result<Summary, ComputeError> {
    let values = numeric_values(table, column)?;
    summarize(&values).ok_or_else(|| ComputeError::EmptyColumn(column.to_string()))
}

/// Frequency profile of any column: non-null count, distinct values and the
/// most frequent value
pub fn describe_categorical(table: &Table, column: &str) -> Result<CategoricalSummary, ComputeError> {
    let mut counts: HashMap<&Value, usize> = HashMap::new();
    let mut order: Vec<&Value> = Vec::new();
    for value in table.values(column)?.filter(|v| !v.is_null()) {
        let count = counts.entry(value).or_insert(0);
        if *count == 0 {
            order.push(value);
        }
        *count += 1;
    }

    let mut top: Option<(&Value, usize)> = None;
    for value in &order {
        let freq = counts[value];
        if top.map_or(true, |(_, best)| freq > best) {
            top = Some((*value, freq));
        }
    }

    let (top, freq) = top.ok_or_else(|| ComputeError::EmptyColumn(column.to_string()))?;
    Ok(CategoricalSummary {
        count: counts.values().sum(),
        unique: order.len(),
        top: top.clone(),
        freq,
    })
}

/// Describe every column holding at least one value, in column order.
///
/// Numeric columns get [`describe`]; text and date columns get
/// [`describe_categorical`].
pub fn describe_all(table: &Table) -> Result<Vec<(String, ColumnSummary)>, ComputeError> {
    let mut summaries = Vec::new();
    for column in table.columns() {
        let summary = match column.dtype {
            ColumnType::Empty => continue,
            ColumnType::Int | ColumnType::Float => {
                let values = numeric_values(table, &column.name)?;
                match summarize(&values) {
                    Some(summary) => ColumnSummary::Numeric(summary),
                    None => continue,
                }
            }
            ColumnType::Text | ColumnType::Date | ColumnType::DateTime => {
                ColumnSummary::Categorical(describe_categorical(table, &column.name)?)
            }
        };
        summaries.push((column.name.clone(), summary));
    }
    Ok(summaries)
}

/// `numerator / denominator`, failing when the denominator is exactly zero
pub fn ratio(numerator: f64, denominator: f64) -> Result<f64, ComputeError> {
    if denominator == 0.0 {
        return Err(ComputeError::DivisionByZero);
    }
    Ok(numerator / denominator)
}

/// Sum of `value_column` per group, in first-seen group order.
///
/// Rows with a null group key are skipped; null values contribute nothing.
pub fn group_sum(table: &Table, key: &GroupKey, value_column: &str) -> Result<Grouped, ComputeError> {
    grouped_sums(table, key, value_column)?
        .into_iter()
        .map(|(group, acc)| Ok((group, acc.finish(value_column)?)))
        .collect()
}

/// The `n` groups with the largest (or smallest) sums.
///
/// Ties keep first-seen order. Groups whose values are all null are not
/// ranked.
pub fn top_n(
    table: &Table,
    key: &GroupKey,
    value_column: &str,
    n: usize,
    order: SortOrder,
) -> Result<Grouped, ComputeError> {
    let ranked: Grouped = grouped_sums(table, key, value_column)?
        .into_iter()
        .filter(|(_, acc)| acc.seen)
        .map(|(group, acc)| Ok((group, acc.finish(value_column)?)))
        .collect::<Result<_, ComputeError>>()?;

    Ok(rank_groups(ranked, order.into(), Some(n)))
}

/// Number of rows per group
pub fn group_count(table: &Table, key: &GroupKey) -> Result<Grouped, ComputeError> {
    let groups = fold_groups(table, key, || 0usize, |count, _| {
        *count += 1;
        Ok(())
    })?;
    Ok(groups
        .into_iter()
        .map(|(group, count)| (group, Number::from(count)))
        .collect())
}

/// Distinct non-null values of `column` per group
pub fn group_count_distinct(
    table: &Table,
    key: &GroupKey,
    column: &str,
) -> Result<Grouped, ComputeError> {
    let idx = table.column_index(column)?;
    let groups = fold_groups(table, key, HashSet::new, |seen: &mut HashSet<Value>, row| {
        let value = &row.values()[idx];
        if !value.is_null() {
            seen.insert(value.clone());
        }
        Ok(())
    })?;
    Ok(groups
        .into_iter()
        .map(|(group, seen)| (group, Number::from(seen.len())))
        .collect())
}

/// Rows per group whose `column` value satisfies `predicate`
pub fn group_count_matching(
    table: &Table,
    key: &GroupKey,
    column: &str,
    predicate: &Predicate,
) -> Result<Grouped, ComputeError> {
    let idx = table.column_index(column)?;
    let groups = fold_groups(table, key, || 0usize, |count, row| {
        if predicate.matches(&row.values()[idx]) {
            *count += 1;
        }
        Ok(())
    })?;
    Ok(groups
        .into_iter()
        .map(|(group, count)| (group, Number::from(count)))
        .collect())
}

/// Mean of `column` per group; groups without values are omitted
pub fn group_mean(table: &Table, key: &GroupKey, column: &str) -> Result<Grouped, ComputeError> {
    let idx = numeric_column_index(table, column)?;
    let groups = fold_groups(table, key, || (0.0f64, 0usize), |acc, row| {
        if let Some(v) = row.values()[idx].as_f64() {
            acc.0 += v;
            acc.1 += 1;
        }
        Ok(())
    })?;
    Ok(groups
        .into_iter()
        .filter(|(_, (_, n))| *n > 0)
        .map(|(group, (total, n))| (group, Number::Float(total / n as f64)))
        .collect())
}

pub fn group_min(table: &Table, key: &GroupKey, column: &str) -> Result<Grouped, ComputeError> {
    group_extremum(table, key, column, |candidate, best| candidate < best)
}

pub fn group_max(table: &Table, key: &GroupKey, column: &str) -> Result<Grouped, ComputeError> {
    group_extremum(table, key, column, |candidate, best| candidate > best)
}

/// Reorder a grouped result and keep at most `limit` entries.
///
/// Sorting is stable, so equal values keep their incoming order.
pub fn rank_groups(mut grouped: Grouped, order: GroupOrder, limit: Option<usize>) -> Grouped {
    match order {
        GroupOrder::FirstSeen => {}
        GroupOrder::KeyAscending => grouped.sort_by(|a, b| a.0.cmp(&b.0)),
        GroupOrder::ValueAscending => grouped.sort_by(|a, b| a.1.total_cmp(&b.1)),
        GroupOrder::ValueDescending => grouped.sort_by(|a, b| b.1.total_cmp(&a.1)),
    }
    if let Some(n) = limit {
        grouped.truncate(n);
    }
    grouped
}

/// Return a copy of `table` with a column computed row by row.
///
/// The first row for which `formula` fails aborts the derivation; the error
/// carries the row index.
pub fn derived_column<F>(table: &Table, name: &str, formula: F) -> Result<Table, ComputeError>
where
    F: Fn(Row<'_>) -> Result<Value, ComputeError>,
{
    if table.has_column(name) {
        return Err(ComputeError::DuplicateColumn(name.to_string()));
    }

    let values = table
        .rows()
        .map(|row| {
            formula(row).map_err(|e| ComputeError::Row {
                row: row.index(),
                source: Box::new(e),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let dtype = ColumnType::infer(&values);
    table.with_column(Column::new(name, dtype), values)
}

/// Null cells per column, in column order
pub fn null_counts(table: &Table) -> Grouped {
    table
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            let nulls = table
                .rows()
                .filter(|row| row.values()[idx].is_null())
                .count();
            (Value::Text(column.name.clone()), Number::from(nulls))
        })
        .collect()
}

/// Sum of each listed column, keyed by column name
pub fn column_sums(table: &Table, columns: &[String]) -> Result<Grouped, ComputeError> {
    columns
        .iter()
        .map(|column| Ok((Value::Text(column.clone()), sum(table, column)?)))
        .collect()
}

/// Pearson correlation between every pair of numeric columns.
///
/// Each pair uses the rows where both cells are present. A coefficient is
/// `None` when fewer than two such rows exist or either side is constant.
pub fn correlation(table: &Table) -> CorrelationMatrix {
    let numeric: Vec<(String, Vec<Option<f64>>)> = table
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, c)| c.dtype.is_numeric())
        .map(|(idx, c)| {
            let cells = table.rows().map(|row| row.values()[idx].as_f64()).collect();
            (c.name.clone(), cells)
        })
        .collect();

    let values: Vec<Vec<Option<f64>>> = numeric
        .iter()
        .map(|(_, xs)| {
            numeric
                .iter()
                .map(|(_, ys)| pearson(xs, ys))
                .collect()
        })
        .collect();

    CorrelationMatrix {
        columns: numeric.into_iter().map(|(name, _)| name).collect(),
        values,
    }
}

/// Equal-width histogram over `[min, max]`, keyed by each bin's lower edge.
///
/// The last bin is closed so the maximum is counted. A constant column
/// yields a single bin.
pub fn histogram(table: &Table, column: &str, bins: usize) -> Result<Grouped, ComputeError> {
    if bins == 0 {
        return Err(ComputeError::InvalidArgument(
            "histogram needs at least one bin".to_string(),
        ));
    }

    let values: Vec<f64> = numeric_values(table, column)?
        .into_iter()
        .filter(|v| v.is_finite())
        .collect();
    let Some(summary) = summarize(&values) else {
        return Err(ComputeError::EmptyColumn(column.to_string()));
    };

    if summary.min == summary.max {
        return Ok(vec![(Value::Float(summary.min), Number::from(values.len()))]);
    }

    let width = (summary.max - summary.min) / bins as f64;
    let mut counts = vec![0usize; bins];
    for v in &values {
        let slot = ((v - summary.min) / width).floor() as usize;
        counts[slot.min(bins - 1)] += 1;
    }

    Ok(counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| {
            (
                Value::Float(summary.min + width * i as f64),
                Number::from(count),
            )
        })
        .collect())
}

/// Running sum that keeps integer columns integral
#[derive(Debug, Clone)]
struct SumAccumulator {
    integral: bool,
    int_total: i128,
    float_total: f64,
    /// At least one non-null value was added
    seen: bool,
}

impl SumAccumulator {
    fn for_column(table: &Table, column: &str) -> Result<Self, ComputeError> {
        let dtype = table.column(column)?.dtype;
        if !dtype.is_numeric() && dtype != ColumnType::Empty {
            return Err(ComputeError::NonNumeric(column.to_string()));
        }
        Ok(Self {
            integral: dtype != ColumnType::Float,
            int_total: 0,
            float_total: 0.0,
            seen: false,
        })
    }

    fn add(&mut self, value: &Value) {
        match value {
            Value::Int(v) if self.integral => {
                self.int_total += i128::from(*v);
                self.seen = true;
            }
            other => {
                if let Some(v) = other.as_f64() {
                    self.float_total += v;
                    self.seen = true;
                }
            }
        }
    }

    fn finish(&self, column: &str) -> Result<Number, ComputeError> {
        if self.integral {
            i64::try_from(self.int_total)
                .map(Number::Int)
                .map_err(|_| ComputeError::Overflow(column.to_string()))
        } else {
            Ok(Number::Float(self.float_total))
        }
    }
}

fn grouped_sums(
    table: &Table,
    key: &GroupKey,
    value_column: &str,
) -> Result<Vec<(Value, SumAccumulator)>, ComputeError> {
    let template = SumAccumulator::for_column(table, value_column)?;
    let idx = table.column_index(value_column)?;
    fold_groups(
        table,
        key,
        || template.clone(),
        |acc, row| {
            acc.add(&row.values()[idx]);
            Ok(())
        },
    )
}

/// Partition rows by `key` and fold each partition, preserving first-seen order
fn fold_groups<T, I, F>(
    table: &Table,
    key: &GroupKey,
    init: I,
    mut fold: F,
) -> Result<Vec<(Value, T)>, ComputeError>
where
    I: Fn() -> T,
    F: FnMut(&mut T, Row<'_>) -> Result<(), ComputeError>,
{
    let key_idx = table.column_index(key.source_column())?;
    if let GroupKey::DateOf(column) = key {
        let dtype = table.columns()[key_idx].dtype;
        if !matches!(
            dtype,
            ColumnType::Date | ColumnType::DateTime | ColumnType::Empty
        ) {
            return Err(ComputeError::NotADate(column.clone()));
        }
    }

    let mut slots: HashMap<Value, usize> = HashMap::new();
    let mut groups: Vec<(Value, T)> = Vec::new();

    for row in table.rows() {
        let group = key.key_of(&row.values()[key_idx]);
        if group.is_null() {
            continue;
        }
        let next = groups.len();
        let slot = *slots.entry(group.clone()).or_insert(next);
        if slot == next {
            groups.push((group, init()));
        }
        fold(&mut groups[slot].1, row)?;
    }

    Ok(groups)
}

fn group_extremum(
    table: &Table,
    key: &GroupKey,
    column: &str,
    better: fn(f64, f64) -> bool,
) -> Result<Grouped, ComputeError> {
    let idx = numeric_column_index(table, column)?;
    let groups = fold_groups(table, key, || None::<Number>, |best, row| {
        pick_extremum(best, &row.values()[idx], better);
        Ok(())
    })?;
    Ok(groups
        .into_iter()
        .filter_map(|(group, best)| best.map(|b| (group, b)))
        .collect())
}

fn extremum(
    table: &Table,
    column: &str,
    better: fn(f64, f64) -> bool,
) -> Result<Number, ComputeError> {
    numeric_column_index(table, column)?;
    let mut best = None;
    for value in table.values(column)? {
        pick_extremum(&mut best, value, better);
    }
    best.ok_or_else(|| ComputeError::EmptyColumn(column.to_string()))
}

fn pick_extremum(best: &mut Option<Number>, value: &Value, better: fn(f64, f64) -> bool) {
    let candidate = match value {
        Value::Int(v) => Number::Int(*v),
        Value::Float(v) if !v.is_nan() => Number::Float(*v),
        _ => return,
    };
    let replace = match best {
        Some(current) => better(candidate.as_f64(), current.as_f64()),
        None => true,
    };
    if replace {
        *best = Some(candidate);
    }
}

fn numeric_column_index(table: &Table, column: &str) -> Result<usize, ComputeError> {
    let idx = table.column_index(column)?;
    let dtype = table.columns()[idx].dtype;
    if dtype.is_numeric() || dtype == ColumnType::Empty {
        Ok(idx)
    } else {
        Err(ComputeError::NonNumeric(column.to_string()))
    }
}

/// Non-null numeric values of a column, in row order
fn numeric_values(table: &Table, column: &str) -> Result<Vec<f64>, ComputeError> {
    numeric_column_index(table, column)?;
    Ok(table.values(column)?.filter_map(Value::as_f64).collect())
}

fn mean_of(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mean = mean_of(values);
    let sq: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    Some((sq / (values.len() - 1) as f64).sqrt())
}

fn summarize(values: &[f64]) -> Option<Summary> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Some(Summary {
        count: values.len(),
        mean: mean_of(values),
        std: sample_std(values),
        min,
        q25: quantile(&sorted, 0.25),
        median: quantile(&sorted, 0.5),
        q75: quantile(&sorted, 0.75),
        max,
    })
}

/// Quantile `q` of non-empty sorted values, interpolating between ranks
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

fn pearson(xs: &[Option<f64>], ys: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    let r = cov / (var_x.sqrt() * var_y.sqrt());
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn sales_table() -> Table {
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

    fn empty_table() -> Table {
        Table::from_rows(&["Country", "Qty"], vec![]).unwrap()
    }

    fn country() -> GroupKey {
        GroupKey::column("Country")
    }

    #[test]
    fn test_group_sum_scenario() {
        let table = sales_table();
        assert_eq!(
            group_sum(&table, &country(), "Qty").unwrap(),
            vec![
                (Value::from("UK"), Number::Int(7)),
                (Value::from("FR"), Number::Int(5)),
            ]
        );
        assert_eq!(
            count_matching(&table, "Qty", &Predicate::LessThan(0.0)).unwrap(),
            1
        );
        assert!((ratio(1.0, 3.0).unwrap() - 0.3333).abs() < 1e-4);
    }

    #[test]
    fn test_group_sum_conserves_total() {
        let table = Table::from_rows(
            &["g", "v"],
            vec![
                vec!["a".into(), Value::Float(1.5)],
                vec![Value::Null, Value::Float(100.0)],
                vec!["b".into(), Value::Null],
                vec!["a".into(), Value::Float(2.0)],
                vec!["c".into(), Value::Float(-4.25)],
            ],
        )
        .unwrap();

        let grouped = group_sum(&table, &GroupKey::column("g"), "v").unwrap();
        let grouped_total: f64 = grouped.iter().map(|(_, n)| n.as_f64()).sum();
        let keyed_total: f64 = table
            .rows()
            .filter(|r| !r.get("g").unwrap().is_null())
            .filter_map(|r| r.get("v").unwrap().as_f64())
            .sum();

        assert_eq!(grouped_total, keyed_total);
        // null-only group is kept with a zero sum
        assert_eq!(grouped[1], (Value::from("b"), Number::Float(0.0)));
    }

    #[test]
    fn test_count_distinct_bounds() {
        let table = Table::from_rows(
            &["c"],
            vec![
                vec!["x".into()],
                vec!["y".into()],
                vec![Value::Null],
                vec!["x".into()],
            ],
        )
        .unwrap();
        assert_eq!(count_distinct(&table, "c").unwrap(), 2);

        let unique = Table::from_rows(&["c"], vec![vec![Value::Int(1)], vec![Value::Int(2)]]).unwrap();
        assert_eq!(count_distinct(&unique, "c").unwrap(), unique.row_count());
    }

    #[test]
    fn test_top_n_orders_and_truncates() {
        let table = Table::from_rows(
            &["g", "v"],
            vec![
                vec!["a".into(), Value::Int(3)],
                vec!["b".into(), Value::Int(9)],
                vec!["c".into(), Value::Int(1)],
                vec!["d".into(), Value::Int(5)],
            ],
        )
        .unwrap();
        let key = GroupKey::column("g");

        let desc = top_n(&table, &key, "v", 4, SortOrder::Descending).unwrap();
        let mut asc = top_n(&table, &key, "v", 4, SortOrder::Ascending).unwrap();
        asc.reverse();
        assert_eq!(desc, asc);

        let top2 = top_n(&table, &key, "v", 2, SortOrder::Descending).unwrap();
        assert_eq!(
            top2,
            vec![
                (Value::from("b"), Number::Int(9)),
                (Value::from("d"), Number::Int(5)),
            ]
        );

        // fewer than all groups: each direction keeps its own end of the full ranking
        let full = top_n(&table, &key, "v", 4, SortOrder::Ascending).unwrap();
        let mut largest = top_n(&table, &key, "v", 3, SortOrder::Descending).unwrap();
        largest.reverse();
        assert_eq!(largest, full[1..].to_vec());
        let smallest = top_n(&table, &key, "v", 3, SortOrder::Ascending).unwrap();
        assert_eq!(smallest, full[..3].to_vec());

        // asking for more groups than exist returns all of them
        assert_eq!(top_n(&table, &key, "v", 10, SortOrder::Ascending).unwrap().len(), 4);
        assert!(top_n(&table, &key, "v", 0, SortOrder::Ascending).unwrap().is_empty());
    }

    #[test]
    fn test_top_n_ties_keep_first_seen_order() {
        let table = Table::from_rows(
            &["g", "v"],
            vec![
                vec!["late".into(), Value::Int(1)],
                vec!["x".into(), Value::Int(4)],
                vec!["y".into(), Value::Int(4)],
            ],
        )
        .unwrap();

        let ranked = top_n(&table, &GroupKey::column("g"), "v", 3, SortOrder::Descending).unwrap();
        let keys: Vec<String> = ranked.iter().map(|(k, _)| k.to_string()).collect();
        assert_eq!(keys, vec!["x", "y", "late"]);

        // a truncated ranking cuts through the tie in first-seen order
        let top2 = top_n(&table, &GroupKey::column("g"), "v", 2, SortOrder::Descending).unwrap();
        assert_eq!(
            top2,
            vec![(Value::from("x"), Number::Int(4)), (Value::from("y"), Number::Int(4))]
        );
        let bottom2 = top_n(&table, &GroupKey::column("g"), "v", 2, SortOrder::Ascending).unwrap();
        assert_eq!(
            bottom2,
            vec![(Value::from("late"), Number::Int(1)), (Value::from("x"), Number::Int(4))]
        );
    }

    #[test]
    fn test_top_n_skips_groups_without_values() {
        let table = Table::from_rows(
            &["g", "v"],
            vec![
                vec!["a".into(), Value::Float(2.0)],
                vec!["b".into(), Value::Null],
            ],
        )
        .unwrap();
        let ranked = top_n(&table, &GroupKey::column("g"), "v", 5, SortOrder::Ascending).unwrap();
        assert_eq!(ranked, vec![(Value::from("a"), Number::Float(2.0))]);
    }

    #[test]
    fn test_empty_table_edge_cases() {
        let table = empty_table();
        assert!(matches!(
            describe(&table, "Qty"),
            Err(ComputeError::EmptyColumn(_))
        ));
        assert_eq!(count_distinct(&table, "Country").unwrap(), 0);
        assert!(top_n(&table, &country(), "Qty", 5, SortOrder::Descending)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_describe_is_repeatable() {
        let table = sales_table();
        let first = describe(&table, "Qty").unwrap();
        let second = describe(&table, "Qty").unwrap();

        assert_eq!(first.mean.to_bits(), second.mean.to_bits());
        assert_eq!(
            first.std.map(f64::to_bits),
            second.std.map(f64::to_bits)
        );
        assert_eq!(first.count, 3);
        assert_eq!(first.min, -3.0);
        assert_eq!(first.max, 10.0);
        assert!((first.mean - 4.0).abs() < 1e-12);
        // sample std of 10, -3, 5
        assert!((first.std.unwrap() - 43.0f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_describe_quartiles_interpolate() {
        let table = Table::from_rows(
            &["v"],
            [7, 1, 4, 10].into_iter().map(|v| vec![Value::Int(v)]).collect(),
        )
        .unwrap();
        let summary = describe(&table, "v").unwrap();

        // sorted 1, 4, 7, 10
        assert_eq!(summary.q25, 3.25);
        assert_eq!(summary.median, 5.5);
        assert_eq!(summary.q75, 7.75);
        assert_eq!((summary.min, summary.max), (1.0, 10.0));
    }

    #[test]
    fn test_describe_all_covers_text_columns() {
        let table = Table::from_rows(
            &["Continent", "Pop", "Blank"],
            vec![
                vec!["Europe".into(), Value::Int(300), Value::Null],
                vec!["Asia".into(), Value::Int(1000), Value::Null],
                vec!["Asia".into(), Value::Int(50), Value::Null],
                vec![Value::Null, Value::Int(20), Value::Null],
            ],
        )
        .unwrap();

        let all = describe_all(&table).unwrap();
        let names: Vec<&str> = all.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["Continent", "Pop"]);

        assert_eq!(
            all[0].1,
            ColumnSummary::Categorical(CategoricalSummary {
                count: 3,
                unique: 2,
                top: Value::from("Asia"),
                freq: 2,
            })
        );
        let ColumnSummary::Numeric(pop) = &all[1].1 else {
            panic!("Pop should be numeric");
        };
        assert_eq!(pop.count, 4);
        assert_eq!(pop.median, 175.0);
    }

    #[test]
    fn test_categorical_tie_keeps_first_seen() {
        let table = Table::from_rows(
            &["c"],
            vec![vec!["b".into()], vec!["a".into()], vec!["a".into()], vec!["b".into()]],
        )
        .unwrap();
        let summary = describe_categorical(&table, "c").unwrap();
        assert_eq!(summary.top, Value::from("b"));
        assert_eq!(summary.freq, 2);

        assert!(matches!(
            describe_categorical(&empty_table(), "Country"),
            Err(ComputeError::EmptyColumn(_))
        ));
    }

    #[test]
    fn test_signed_zero_keys_share_a_group() {
        let table = Table::from_rows(
            &["k", "v"],
            vec![
                vec![Value::Float(0.0), Value::Int(1)],
                vec![Value::Float(-0.0), Value::Int(1)],
            ],
        )
        .unwrap();
        assert_eq!(
            group_sum(&table, &GroupKey::column("k"), "v").unwrap(),
            vec![(Value::Float(0.0), Number::Int(2))]
        );
        assert_eq!(count_distinct(&table, "k").unwrap(), 1);
    }

    #[test]
    fn test_describe_rejects_text() {
        assert_eq!(
            describe(&sales_table(), "Country"),
            Err(ComputeError::NonNumeric("Country".to_string()))
        );
    }

    #[test]
    fn test_ratio_by_zero_fails() {
        assert_eq!(ratio(5.0, 0.0), Err(ComputeError::DivisionByZero));
        assert_eq!(ratio(0.0, -0.0), Err(ComputeError::DivisionByZero));
        assert_eq!(ratio(6.0, 4.0), Ok(1.5));
    }

    #[test]
    fn test_derived_column_zero_area() {
        let table = Table::from_rows(
            &["Population", "Area"],
            vec![vec![Value::Int(100), Value::Int(0)]],
        )
        .unwrap();

        let result = derived_column(&table, "Density", |row| {
            let pop = row.get("Population")?.as_f64().unwrap_or(0.0);
            let area = row.get("Area")?.as_f64().unwrap_or(0.0);
            ratio(pop, area).map(Value::Float)
        });

        assert_eq!(
            result,
            Err(ComputeError::Row {
                row: 0,
                source: Box::new(ComputeError::DivisionByZero),
            })
        );
        assert_eq!(table.column_count(), 2);
    }

    #[test]
    fn test_derived_column_appends() {
        let table = sales_table();
        let doubled = derived_column(&table, "Double", |row| {
            Ok(row
                .get("Qty")?
                .as_f64()
                .map(|v| Value::Float(v * 2.0))
                .unwrap_or(Value::Null))
        })
        .unwrap();

        assert_eq!(doubled.column("Double").unwrap().dtype, ColumnType::Float);
        assert_eq!(doubled.row(1).unwrap().get("Double").unwrap(), &Value::Float(-6.0));
        assert!(matches!(
            derived_column(&table, "Qty", |_| Ok(Value::Null)),
            Err(ComputeError::DuplicateColumn(_))
        ));
    }

    #[test]
    fn test_group_by_date_of_datetime() {
        let day = NaiveDate::from_ymd_opt(2010, 12, 1).unwrap();
        let next = day.succ_opt().unwrap();
        let table = Table::from_rows(
            &["InvoiceNo", "InvoiceDate"],
            vec![
                vec!["2".into(), next.and_hms_opt(9, 0, 0).unwrap().into()],
                vec!["1".into(), day.and_hms_opt(8, 26, 0).unwrap().into()],
                vec!["1".into(), day.and_hms_opt(8, 28, 0).unwrap().into()],
                vec!["3".into(), day.and_hms_opt(9, 1, 0).unwrap().into()],
            ],
        )
        .unwrap();

        let per_day = group_count_distinct(&table, &GroupKey::date_of("InvoiceDate"), "InvoiceNo")
            .unwrap();
        let per_day = rank_groups(per_day, GroupOrder::KeyAscending, None);
        assert_eq!(
            per_day,
            vec![
                (Value::Date(day), Number::Int(2)),
                (Value::Date(next), Number::Int(1)),
            ]
        );

        assert_eq!(
            group_count(&table, &GroupKey::date_of("InvoiceNo")),
            Err(ComputeError::NotADate("InvoiceNo".to_string()))
        );
    }

    #[test]
    fn test_sum_keeps_integers() {
        assert_eq!(sum(&sales_table(), "Qty").unwrap(), Number::Int(12));
        assert_eq!(sum(&empty_table(), "Qty").unwrap(), Number::Int(0));
        assert_eq!(
            sum(&sales_table(), "Country"),
            Err(ComputeError::NonNumeric("Country".to_string()))
        );
    }

    #[test]
    fn test_sum_overflow_reported() {
        let table = Table::from_rows(
            &["v"],
            vec![vec![Value::Int(i64::MAX)], vec![Value::Int(1)]],
        )
        .unwrap();
        assert_eq!(sum(&table, "v"), Err(ComputeError::Overflow("v".to_string())));
    }

    #[test]
    fn test_min_max_mean_std() {
        let table = sales_table();
        assert_eq!(min(&table, "Qty").unwrap(), Number::Int(-3));
        assert_eq!(max(&table, "Qty").unwrap(), Number::Int(10));
        assert!((mean(&table, "Qty").unwrap() - 4.0).abs() < 1e-12);

        let single = Table::from_rows(&["v"], vec![vec![Value::Float(1.0)]]).unwrap();
        assert!(matches!(
            std(&single, "v"),
            Err(ComputeError::InsufficientValues { found: 1, .. })
        ));
        assert_eq!(describe(&single, "v").unwrap().std, None);
    }

    #[test]
    fn test_grouped_mean_min_max() {
        let table = sales_table();
        assert_eq!(
            group_mean(&table, &country(), "Qty").unwrap(),
            vec![
                (Value::from("UK"), Number::Float(3.5)),
                (Value::from("FR"), Number::Float(5.0)),
            ]
        );
        assert_eq!(
            group_min(&table, &country(), "Qty").unwrap()[0],
            (Value::from("UK"), Number::Int(-3))
        );
        assert_eq!(
            group_max(&table, &country(), "Qty").unwrap()[0],
            (Value::from("UK"), Number::Int(10))
        );
    }

    #[test]
    fn test_null_counts_and_column_sums() {
        let table = Table::from_rows(
            &["a", "b"],
            vec![
                vec![Value::Int(1), Value::Null],
                vec![Value::Null, Value::Null],
                vec![Value::Int(2), Value::Float(0.5)],
            ],
        )
        .unwrap();

        assert_eq!(
            null_counts(&table),
            vec![
                (Value::from("a"), Number::Int(1)),
                (Value::from("b"), Number::Int(2)),
            ]
        );
        assert_eq!(
            column_sums(&table, &["b".to_string(), "a".to_string()]).unwrap(),
            vec![
                (Value::from("b"), Number::Float(0.5)),
                (Value::from("a"), Number::Int(3)),
            ]
        );
    }

    #[test]
    fn test_correlation_matrix() {
        let table = Table::from_rows(
            &["x", "up", "down", "flat", "label"],
            vec![
                vec![Value::Int(1), Value::Int(2), Value::Int(3), Value::Int(7), "a".into()],
                vec![Value::Int(2), Value::Int(4), Value::Int(2), Value::Int(7), "b".into()],
                vec![Value::Int(3), Value::Int(6), Value::Int(1), Value::Int(7), "c".into()],
            ],
        )
        .unwrap();

        let matrix = correlation(&table);
        assert_eq!(matrix.columns, vec!["x", "up", "down", "flat"]);
        assert!((matrix.values[0][1].unwrap() - 1.0).abs() < 1e-12);
        assert!((matrix.values[0][2].unwrap() + 1.0).abs() < 1e-12);
        assert_eq!(matrix.values[0][3], None);
        assert_eq!(matrix.values[3][3], None);
    }

    #[test]
    fn test_histogram_bins() {
        let table = Table::from_rows(
            &["v"],
            (0..=10).map(|i| vec![Value::Int(i)]).collect(),
        )
        .unwrap();

        let hist = histogram(&table, "v", 5).unwrap();
        assert_eq!(hist.len(), 5);
        assert_eq!(hist[0], (Value::Float(0.0), Number::Int(2)));
        // the maximum lands in the closed last bin
        assert_eq!(hist[4], (Value::Float(8.0), Number::Int(3)));
        let total: f64 = hist.iter().map(|(_, n)| n.as_f64()).sum();
        assert_eq!(total, 11.0);

        assert!(matches!(
            histogram(&table, "v", 0),
            Err(ComputeError::InvalidArgument(_))
        ));
    }
}
