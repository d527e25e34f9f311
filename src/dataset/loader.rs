// src/dataset/loader.rs — CSV loading, header sanitizing, cell typing

use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;

use super::{Dataset, Value};
use crate::infra::errors::DataScribeError;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Load a CSV file whose first row is the header.
pub fn load_csv(path: &Path) -> Result<Dataset, DataScribeError> {
    let file = std::fs::File::open(path)?;
    let dataset = load_csv_reader(file)?;
    tracing::info!(
        "Loaded {} ({} rows x {} columns)",
        path.display(),
        dataset.len(),
        dataset.width()
    );
    Ok(dataset)
}

/// Load CSV from any reader. Rejects inputs with no header or no rows.
pub fn load_csv_reader<R: Read>(reader: R) -> Result<Dataset, DataScribeError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let raw_headers: Vec<String> = rdr
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            if i == 0 {
                h.trim_start_matches('\u{feff}').to_string()
            } else {
                h.to_string()
            }
        })
        .collect();

    if raw_headers.is_empty() || raw_headers.iter().all(|h| h.is_empty()) {
        return Err(DataScribeError::EmptyDataset);
    }

    let mut raw_rows: Vec<Vec<String>> = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(|e| match e.kind() {
            csv::ErrorKind::UnequalLengths { .. } => DataScribeError::MalformedCsv(e.to_string()),
            _ => DataScribeError::Csv(e),
        })?;
        raw_rows.push(record.iter().map(str::to_string).collect());
    }

    if raw_rows.is_empty() {
        return Err(DataScribeError::EmptyDataset);
    }

    let names = sanitize_column_names(&raw_headers);
    let rows = type_columns(&raw_rows, names.len());
    Dataset::new(names, rows)
}

/// Replace every character outside `[A-Za-z0-9_]` with `_`.
/// An empty name becomes `_`.
pub fn sanitize_column_name(name: &str) -> String {
    if name.is_empty() {
        return "_".into();
    }
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Sanitize a whole header row. Names that collide after sanitizing get
/// `_1`, `_2`, ... suffixes so every column stays addressable.
pub fn sanitize_column_names(names: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        let base = sanitize_column_name(name);
        let mut candidate = base.clone();
        let mut n = 1;
        while out.contains(&candidate) {
            candidate = format!("{base}_{n}");
            n += 1;
        }
        out.push(candidate);
    }
    out
}

/// Parse cells column by column: a column is typed only if every
/// non-empty cell parses as that type, otherwise it stays text.
fn type_columns(raw: &[Vec<String>], width: usize) -> Vec<Vec<Value>> {
    let mut rows: Vec<Vec<Value>> = vec![Vec::with_capacity(width); raw.len()];
    for col in 0..width {
        let cells: Vec<&str> = raw.iter().map(|r| r[col].trim()).collect();
        let parse = column_parser(&cells);
        for (row, cell) in rows.iter_mut().zip(&cells) {
            row.push(if cell.is_empty() {
                Value::Null
            } else {
                parse(cell)
            });
        }
    }
    rows
}

type CellParser = fn(&str) -> Value;

fn column_parser(cells: &[&str]) -> CellParser {
    let present: Vec<&str> = cells.iter().copied().filter(|c| !c.is_empty()).collect();
    if present.is_empty() {
        return |_| Value::Null;
    }
    if present.iter().all(|c| c.parse::<i64>().is_ok()) {
        return |c| c.parse().map(Value::Int).unwrap_or(Value::Null);
    }
    if present.iter().all(|c| parse_float(c).is_some()) {
        return |c| parse_float(c).map(Value::Float).unwrap_or(Value::Null);
    }
    if present.iter().all(|c| parse_date(c).is_some()) {
        return |c| parse_date(c).map(Value::Date).unwrap_or(Value::Null);
    }
    if present.iter().all(|c| parse_bool(c).is_some()) {
        return |c| parse_bool(c).map(Value::Bool).unwrap_or(Value::Null);
    }
    |c| Value::Text(c.to_string())
}

fn parse_float(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|f| f.is_finite())
}

pub(crate) fn parse_date(s: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}
