// src/dataset/aggregate.rs — Group-by aggregation and column statistics

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{Dataset, Key, Value};
use crate::infra::errors::DataScribeError;

/// How y values that share an x key are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    /// Keep every row as-is.
    #[default]
    None,
    Sum,
    Mean,
    Max,
    Min,
    Count,
}

impl FromStr for Aggregation {
    type Err = DataScribeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Ok(Self::None),
            "sum" => Ok(Self::Sum),
            "mean" | "avg" | "average" => Ok(Self::Mean),
            "max" => Ok(Self::Max),
            "min" => Ok(Self::Min),
            "count" => Ok(Self::Count),
            other => Err(DataScribeError::Config(format!(
                "unknown aggregation '{other}' (none, sum, mean, max, min, count)"
            ))),
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Sum => "sum",
            Self::Mean => "mean",
            Self::Max => "max",
            Self::Min => "min",
            Self::Count => "count",
        };
        f.write_str(s)
    }
}

impl Aggregation {
    /// Combine values. `None` for an empty input except `Count`/`Sum`.
    pub fn apply(&self, values: &[f64]) -> Option<f64> {
        match self {
            Self::Count => Some(values.len() as f64),
            Self::Sum => Some(values.iter().sum()),
            _ if values.is_empty() => None,
            Self::Mean => Some(values.iter().sum::<f64>() / values.len() as f64),
            Self::Max => values.iter().copied().reduce(f64::max),
            Self::Min => values.iter().copied().reduce(f64::min),
            // first value wins when rows are not aggregated
            Self::None => values.first().copied(),
        }
    }
}

/// Group rows by `key` and aggregate `value` per group. Keys come out
/// sorted ascending; rows with a null key are dropped. `Count` accepts any
/// value column (or none); the other aggregations need a numeric one.
/// With `Aggregation::None` the result is just the two columns.
pub fn group_by(
    dataset: &Dataset,
    key: &str,
    value: Option<&str>,
    agg: Aggregation,
) -> Result<Dataset, DataScribeError> {
    let key_idx = dataset.column_index(key)?;

    if agg == Aggregation::None {
        let value = value.ok_or_else(|| {
            DataScribeError::Config("a value column is needed without aggregation".into())
        })?;
        let value_idx = dataset.column_index(value)?;
        let rows = dataset
            .rows()
            .iter()
            .map(|r| vec![r[key_idx].clone(), r[value_idx].clone()])
            .collect();
        return Dataset::new(vec![key.to_string(), value.to_string()], rows);
    }

    let value_idx = match value {
        Some(v) => {
            let idx = dataset.column_index(v)?;
            if agg != Aggregation::Count {
                dataset.numeric_values(v)?;
            }
            Some(idx)
        }
        None if agg == Aggregation::Count => None,
        None => {
            return Err(DataScribeError::Config(format!(
                "aggregation '{agg}' needs a value column"
            )))
        }
    };

    // keyed by total order, so keys come out sorted
    let mut groups: BTreeMap<Key<'_>, Vec<f64>> = BTreeMap::new();
    for row in dataset.rows() {
        let k = &row[key_idx];
        if k.is_null() {
            continue;
        }
        let slot = groups.entry(Key(k)).or_default();
        match value_idx {
            Some(i) if agg == Aggregation::Count => {
                if !row[i].is_null() {
                    slot.push(1.0);
                }
            }
            Some(i) => {
                if let Some(x) = row[i].as_f64() {
                    slot.push(x);
                }
            }
            None => slot.push(1.0),
        }
    }

    let value_name = match value {
        Some(v) if agg == Aggregation::Count => format!("{v}_count"),
        Some(v) => v.to_string(),
        None => "count".to_string(),
    };
    let rows = groups
        .into_iter()
        .map(|(Key(k), vals)| {
            let cell = agg.apply(&vals).map(to_value).unwrap_or(Value::Null);
            vec![k.clone(), cell]
        })
        .collect();
    Dataset::new(vec![key.to_string(), value_name], rows)
}

/// Count of each distinct value, most frequent first.
pub fn value_counts(dataset: &Dataset, column: &str) -> Result<Dataset, DataScribeError> {
    let counted = group_by(dataset, column, None, Aggregation::Count)?;
    counted.sort_by("count", false)
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    })
}

/// Sample standard deviation.
pub fn std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(var.sqrt())
}

/// Pearson correlation over rows where both cells are numeric.
pub fn pearson(xs: &[Option<f64>], ys: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mx = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let my = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        sxy += (x - mx) * (y - my);
        sxx += (x - mx).powi(2);
        syy += (y - my).powi(2);
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    Some(sxy / (sxx.sqrt() * syy.sqrt()))
}

/// Correlation matrix of the numeric columns: first column holds the
/// column names, one further column per numeric column.
pub fn correlation_matrix(dataset: &Dataset) -> Result<Dataset, DataScribeError> {
    let numeric = dataset.columns_of_kind(super::ColumnKind::Numeric);
    if numeric.len() < 2 {
        return Err(DataScribeError::ColumnType {
            column: numeric.first().copied().unwrap_or("").to_string(),
            expected: "one of at least two numeric columns".into(),
        });
    }
    let series: Vec<Vec<Option<f64>>> = numeric
        .iter()
        .map(|name| {
            dataset
                .values(name)
                .map(|vals| vals.map(Value::as_f64).collect())
        })
        .collect::<Result<_, _>>()?;

    let mut names = vec!["column".to_string()];
    names.extend(numeric.iter().map(|s| s.to_string()));
    let rows = numeric
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let mut row = vec![Value::Text(name.to_string())];
            row.extend(series.iter().map(|other| {
                pearson(&series[i], other)
                    .map(Value::Float)
                    .unwrap_or(Value::Null)
            }));
            row
        })
        .collect();
    Dataset::new(names, rows)
}

/// Summary statistics per numeric column: count, mean, std, min,
/// median, max.
pub fn describe(dataset: &Dataset) -> Result<Dataset, DataScribeError> {
    let numeric = dataset.columns_of_kind(super::ColumnKind::Numeric);
    let mut rows = Vec::with_capacity(numeric.len());
    for name in &numeric {
        let v = dataset.numeric_values(name)?;
        let opt = |x: Option<f64>| x.map(Value::Float).unwrap_or(Value::Null);
        rows.push(vec![
            Value::Text(name.to_string()),
            Value::Int(v.len() as i64),
            opt(Aggregation::Mean.apply(&v)),
            opt(std_dev(&v)),
            opt(Aggregation::Min.apply(&v)),
            opt(median(&v)),
            opt(Aggregation::Max.apply(&v)),
        ]);
    }
    let names = ["column", "count", "mean", "std", "min", "median", "max"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    Dataset::new(names, rows)
}

fn to_value(x: f64) -> Value {
    if x.fract() == 0.0 && x.abs() < 9.0e15 {
        Value::Int(x as i64)
    } else {
        Value::Float(x)
    }
}
