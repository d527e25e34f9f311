// src/dataset/filter.rs — Row filters: numeric range, category set, date range

use std::fmt;

use chrono::NaiveDate;

use super::{ColumnKind, Dataset};
use crate::infra::errors::DataScribeError;

/// A row predicate on one column. Bounds are inclusive; rows whose cell is
/// null never match.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    NumericRange {
        column: String,
        min: f64,
        max: f64,
    },
    Categories {
        column: String,
        values: Vec<String>,
    },
    DateRange {
        column: String,
        start: NaiveDate,
        end: NaiveDate,
    },
}

impl Filter {
    pub fn column(&self) -> &str {
        match self {
            Filter::NumericRange { column, .. }
            | Filter::Categories { column, .. }
            | Filter::DateRange { column, .. } => column,
        }
    }

    /// Parse the CLI form: `col=min..max`, `col=a,b,c` or
    /// `col=2023-01-01..2023-03-31`. The column kind decides which one.
    pub fn parse(spec: &str, dataset: &Dataset) -> Result<Self, DataScribeError> {
        let (column, rest) = spec.split_once('=').ok_or_else(|| {
            DataScribeError::Config(format!("filter '{spec}' must look like column=..."))
        })?;
        let column = column.trim().to_string();
        let kind = dataset.column(&column)?.kind;
        let bad = |what: &str| {
            DataScribeError::Config(format!("filter '{spec}': expected {what}"))
        };

        match kind {
            ColumnKind::Numeric => {
                let (lo, hi) = rest.split_once("..").ok_or_else(|| bad("min..max"))?;
                let min = parse_bound(lo, f64::NEG_INFINITY).ok_or_else(|| bad("a number"))?;
                let max = parse_bound(hi, f64::INFINITY).ok_or_else(|| bad("a number"))?;
                Ok(Filter::NumericRange { column, min, max })
            }
            ColumnKind::Temporal => {
                let (lo, hi) = rest.split_once("..").ok_or_else(|| bad("start..end"))?;
                let start = super::loader::parse_date(lo.trim())
                    .ok_or_else(|| bad("a YYYY-MM-DD start date"))?;
                let end = super::loader::parse_date(hi.trim())
                    .ok_or_else(|| bad("a YYYY-MM-DD end date"))?;
                Ok(Filter::DateRange { column, start, end })
            }
            _ => Ok(Filter::Categories {
                column,
                values: rest.split(',').map(|s| s.trim().to_string()).collect(),
            }),
        }
    }

    pub fn apply(&self, dataset: &Dataset) -> Result<Dataset, DataScribeError> {
        let idx = dataset.column_index(self.column())?;
        let kind = dataset.columns()[idx].kind;
        match self {
            Filter::NumericRange { min, max, .. } => {
                if kind != ColumnKind::Numeric {
                    return Err(type_error(self.column(), "numeric"));
                }
                Ok(dataset.filter_rows(|row| {
                    row[idx].as_f64().is_some_and(|x| x >= *min && x <= *max)
                }))
            }
            Filter::DateRange { start, end, .. } => {
                if kind != ColumnKind::Temporal {
                    return Err(type_error(self.column(), "a date column"));
                }
                Ok(dataset.filter_rows(|row| {
                    row[idx].as_date().is_some_and(|d| d >= *start && d <= *end)
                }))
            }
            Filter::Categories { values, .. } => Ok(dataset.filter_rows(|row| {
                !row[idx].is_null() && values.iter().any(|v| *v == row[idx].to_string())
            })),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::NumericRange { column, min, max } => write!(
                f,
                "{column} in [{}, {}]",
                super::format_number(*min),
                super::format_number(*max)
            ),
            Filter::Categories { column, values } => {
                write!(f, "{column} in {{{}}}", values.join(", "))
            }
            Filter::DateRange { column, start, end } => {
                write!(f, "{column} from {start} to {end}")
            }
        }
    }
}

/// Apply filters in order.
pub fn apply_all(dataset: &Dataset, filters: &[Filter]) -> Result<Dataset, DataScribeError> {
    let mut current = dataset.clone();
    for filter in filters {
        current = filter.apply(&current)?;
    }
    Ok(current)
}

fn parse_bound(s: &str, open: f64) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        Some(open)
    } else {
        s.parse().ok()
    }
}

fn type_error(column: &str, expected: &str) -> DataScribeError {
    DataScribeError::ColumnType {
        column: column.to_string(),
        expected: expected.to_string(),
    }
}
