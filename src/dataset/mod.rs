// src/dataset/mod.rs — In-memory table: typed cells, named columns

pub mod aggregate;
pub mod filter;
pub mod loader;

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::infra::errors::DataScribeError;

/// A single cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Total order used for sorting and group keys. Nulls sort last,
    /// numbers compare numerically across Int/Float, mixed kinds fall back
    /// to their display text.
    pub fn total_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Greater,
            (_, Value::Null) => Ordering::Less,
            (Value::Date(a), Value::Date(b)) => a.cmp(b),
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                _ => a.to_string().cmp(&b.to_string()),
            },
        }
    }
}

/// A borrowed cell ordered by [`Value::total_cmp`], for map and set keys.
#[derive(Debug, Clone, Copy)]
pub struct Key<'a>(pub &'a Value);

impl PartialEq for Key<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Key<'_> {}

impl PartialOrd for Key<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Key<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(other.0)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => f.write_str(&format_number(*x)),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Text(s) => f.write_str(s),
        }
    }
}

/// Render a float the way a person would write it: integral values
/// without a fraction, others with up to four decimals.
pub fn format_number(x: f64) -> String {
    if x.is_nan() {
        return "NaN".into();
    }
    if x.fract() == 0.0 && x.abs() < 1e15 {
        return format!("{x:.0}");
    }
    let s = format!("{x:.4}");
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Temporal,
    Boolean,
    Categorical,
    /// Every cell is null.
    Empty,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ColumnKind::Numeric => "numeric",
            ColumnKind::Temporal => "date",
            ColumnKind::Boolean => "boolean",
            ColumnKind::Categorical => "category",
            ColumnKind::Empty => "empty",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
}

/// Row-major table. Every row has exactly `columns.len()` cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    columns: Vec<Column>,
    rows: Vec<Vec<Value>>,
}

impl Dataset {
    /// Build a table, inferring each column's kind from its cells.
    pub fn new(names: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self, DataScribeError> {
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != names.len()) {
            return Err(DataScribeError::MalformedCsv(format!(
                "row {} has {} fields, expected {}",
                i + 1,
                row.len(),
                names.len()
            )));
        }
        let columns = names
            .into_iter()
            .enumerate()
            .map(|(i, name)| Column {
                kind: infer_kind(rows.iter().map(|r| &r[i])),
                name,
            })
            .collect();
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Result<usize, DataScribeError> {
        self.columns
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| DataScribeError::UnknownColumn(name.to_string()))
    }

    pub fn column(&self, name: &str) -> Result<&Column, DataScribeError> {
        self.column_index(name).map(|i| &self.columns[i])
    }

    /// Cells of one column, top to bottom.
    pub fn values(&self, name: &str) -> Result<impl Iterator<Item = &Value> + '_, DataScribeError> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(move |r| &r[idx]))
    }

    /// Non-null numeric cells of a numeric column.
    pub fn numeric_values(&self, name: &str) -> Result<Vec<f64>, DataScribeError> {
        let column = self.column(name)?;
        if !matches!(column.kind, ColumnKind::Numeric | ColumnKind::Empty) {
            return Err(DataScribeError::ColumnType {
                column: name.to_string(),
                expected: "numeric".into(),
            });
        }
        Ok(self.values(name)?.filter_map(Value::as_f64).collect())
    }

    pub fn columns_of_kind(&self, kind: ColumnKind) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.kind == kind)
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Same columns, subset of rows. Kinds are kept as inferred on the
    /// full table so a filter never changes a column's type.
    pub fn filter_rows(&self, mut keep: impl FnMut(&[Value]) -> bool) -> Dataset {
        Dataset {
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }

    pub fn head(&self, n: usize) -> Dataset {
        Dataset {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    pub fn tail(&self, n: usize) -> Dataset {
        let skip = self.rows.len().saturating_sub(n);
        Dataset {
            columns: self.columns.clone(),
            rows: self.rows[skip..].to_vec(),
        }
    }

    /// Stable sort on one column.
    pub fn sort_by(&self, name: &str, ascending: bool) -> Result<Dataset, DataScribeError> {
        let idx = self.column_index(name)?;
        let mut rows = self.rows.clone();
        rows.sort_by(|a, b| match (a[idx].is_null(), b[idx].is_null()) {
            (false, false) if ascending => a[idx].total_cmp(&b[idx]),
            (false, false) => b[idx].total_cmp(&a[idx]),
            (x, y) => x.cmp(&y),
        });
        Ok(Dataset {
            columns: self.columns.clone(),
            rows,
        })
    }

    /// Distinct values of a column in first-seen order.
    pub fn unique(&self, name: &str) -> Result<Vec<Value>, DataScribeError> {
        let mut seen = BTreeSet::new();
        Ok(self
            .values(name)?
            .filter(|v| seen.insert(Key(v)))
            .cloned()
            .collect())
    }

    /// Fixed-width text rendering with a leading row index, like a
    /// dataframe printout. Used for prompts and terminal output.
    pub fn to_text_table(&self, max_rows: usize) -> String {
        let shown = self.rows.len().min(max_rows);
        let index_width = shown.saturating_sub(1).to_string().len();

        let cells: Vec<Vec<String>> = self.rows[..shown]
            .iter()
            .map(|r| r.iter().map(|v| v.to_string()).collect())
            .collect();

        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| {
                cells
                    .iter()
                    .map(|r| r[i].chars().count())
                    .chain(std::iter::once(c.name.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let mut out = String::new();
        out.push_str(&" ".repeat(index_width));
        for (c, w) in self.columns.iter().zip(&widths) {
            out.push_str(&format!("  {:>w$}", c.name, w = *w));
        }
        out.push('\n');
        for (i, row) in cells.iter().enumerate() {
            out.push_str(&format!("{:<w$}", i, w = index_width));
            for (cell, w) in row.iter().zip(&widths) {
                out.push_str(&format!("  {:>w$}", cell, w = *w));
            }
            out.push('\n');
        }
        if self.rows.len() > shown {
            out.push_str(&format!(
                "... {} more row(s)\n",
                self.rows.len() - shown
            ));
        }
        out
    }
}

/// Kind of a column from its cells, ignoring nulls.
fn infer_kind<'a>(cells: impl Iterator<Item = &'a Value>) -> ColumnKind {
    let mut kind: Option<ColumnKind> = None;
    for cell in cells {
        let this = match cell {
            Value::Null => continue,
            Value::Int(_) | Value::Float(_) => ColumnKind::Numeric,
            Value::Date(_) => ColumnKind::Temporal,
            Value::Bool(_) => ColumnKind::Boolean,
            Value::Text(_) => ColumnKind::Categorical,
        };
        match kind {
            None => kind = Some(this),
            Some(k) if k == this => {}
            Some(_) => return ColumnKind::Categorical,
        }
    }
    kind.unwrap_or(ColumnKind::Empty)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sales() -> Dataset {
        Dataset::new(
            vec!["region".into(), "sales".into()],
            vec![
                vec![Value::Text("east".into()), Value::Int(100)],
                vec![Value::Text("west".into()), Value::Int(250)],
                vec![Value::Text("east".into()), Value::Null],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_kinds_inferred() {
        let ds = sales();
        assert_eq!(ds.column("region").unwrap().kind, ColumnKind::Categorical);
        assert_eq!(ds.column("sales").unwrap().kind, ColumnKind::Numeric);
    }

    #[test]
    fn test_mixed_kinds_fall_back_to_categorical() {
        let kind = infer_kind([Value::Int(1), Value::Text("x".into())].iter());
        assert_eq!(kind, ColumnKind::Categorical);
        assert_eq!(infer_kind([Value::Null].iter()), ColumnKind::Empty);
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let err = Dataset::new(vec!["a".into()], vec![vec![Value::Int(1), Value::Int(2)]]);
        assert!(matches!(err, Err(DataScribeError::MalformedCsv(_))));
    }

    #[test]
    fn test_numeric_values_skip_nulls() {
        assert_eq!(sales().numeric_values("sales").unwrap(), vec![100.0, 250.0]);
    }

    #[test]
    fn test_numeric_values_type_error() {
        let err = sales().numeric_values("region").unwrap_err();
        assert!(matches!(err, DataScribeError::ColumnType { .. }));
    }

    #[test]
    fn test_unknown_column() {
        let err = sales().column_index("revenue").unwrap_err();
        assert_eq!(err.to_string(), "Unknown column 'revenue'");
    }

    #[test]
    fn test_sort_nulls_last() {
        let sorted = sales().sort_by("sales", false).unwrap();
        let order: Vec<String> = sorted.values("sales").unwrap().map(|v| v.to_string()).collect();
        assert_eq!(order, vec!["250", "100", ""]);
    }

    #[test]
    fn test_unique_first_seen_order() {
        let u = sales().unique("region").unwrap();
        assert_eq!(u, vec![Value::Text("east".into()), Value::Text("west".into())]);
    }

    #[test]
    fn test_unique_many_keys_keeps_order() {
        let rows: Vec<Vec<Value>> = (0..20_000)
            .rev()
            .chain(0..20_000)
            .map(|i| vec![Value::Text(format!("k{i}")), Value::Int(i)])
            .collect();
        let ds = Dataset::new(vec!["key".into(), "n".into()], rows).unwrap();
        let u = ds.unique("key").unwrap();
        assert_eq!(u.len(), 20_000);
        assert_eq!(u[0], Value::Text("k19999".into()));
        assert_eq!(u[19_999], Value::Text("k0".into()));
    }

    #[test]
    fn test_head_and_tail() {
        let ds = sales();
        assert_eq!(ds.head(2).len(), 2);
        assert_eq!(ds.tail(1).rows()[0][0], Value::Text("east".into()));
        assert_eq!(ds.head(10).len(), 3);
    }

    #[test]
    fn test_text_table_layout() {
        let table = sales().to_text_table(2);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "   region  sales");
        assert_eq!(lines[1], "0    east    100");
        assert_eq!(lines[2], "1    west    250");
        assert_eq!(lines[3], "... 1 more row(s)");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(450.0), "450");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(1.0 / 3.0), "0.3333");
        assert_eq!(format_number(-0.1), "-0.1");
    }
}
