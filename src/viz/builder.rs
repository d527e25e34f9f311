// src/viz/builder.rs — Build figures from a dataset without any generated code

use super::{ChartKind, Figure, Layer};
use crate::dataset::aggregate::{self, Aggregation};
use crate::dataset::{ColumnKind, Dataset, Value};
use crate::infra::errors::DataScribeError;

/// What the user picked in the explorer.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub x: Option<String>,
    pub y: Option<String>,
    pub aggregation: Aggregation,
    /// Time series only: split into one line per value of this column,
    /// optionally restricted to the listed values.
    pub series_by: Option<(String, Vec<String>)>,
}

impl ChartSpec {
    pub fn new(kind: ChartKind) -> Self {
        Self {
            kind,
            x: None,
            y: None,
            aggregation: Aggregation::None,
            series_by: None,
        }
    }

    pub fn x(mut self, column: impl Into<String>) -> Self {
        self.x = Some(column.into());
        self
    }

    pub fn y(mut self, column: impl Into<String>) -> Self {
        self.y = Some(column.into());
        self
    }

    pub fn aggregate(mut self, agg: Aggregation) -> Self {
        self.aggregation = agg;
        self
    }
}

pub fn build_figure(dataset: &Dataset, spec: &ChartSpec) -> Result<Figure, DataScribeError> {
    tracing::debug!(
        "Building {} chart (x={:?}, y={:?}, agg={})",
        spec.kind,
        spec.x,
        spec.y,
        spec.aggregation
    );
    match spec.kind {
        ChartKind::Bar => bar(dataset, required(&spec.x, "x")?, spec.y.as_deref(), spec.aggregation),
        ChartKind::Line => line(
            dataset,
            required(&spec.x, "x")?,
            required(&spec.y, "y")?,
            spec.aggregation,
        ),
        ChartKind::Scatter => scatter(dataset, required(&spec.x, "x")?, required(&spec.y, "y")?),
        ChartKind::Heatmap => heatmap(dataset, required(&spec.x, "x")?, required(&spec.y, "y")?),
        ChartKind::Correlation => correlation(dataset),
        ChartKind::TimeSeries => time_series(dataset, spec),
    }
}

/// Bar chart of `y` per `x`. Without `y` the bars count rows per `x`.
pub fn bar(
    dataset: &Dataset,
    x: &str,
    y: Option<&str>,
    agg: Aggregation,
) -> Result<Figure, DataScribeError> {
    let agg = match (y, agg) {
        (None, _) => Aggregation::Count,
        (Some(_), a) => a,
    };
    let table = aggregate::group_by(dataset, x, y, agg)?;
    let (labels, values) = label_value_pairs(&table);
    let y_label = table.column_names()[1].to_string();
    Ok(Figure {
        layers: vec![Layer::Bar { labels, values }],
        ..Figure::default()
    }
    .with_axes(x, y_label))
}

pub fn line(
    dataset: &Dataset,
    x: &str,
    y: &str,
    agg: Aggregation,
) -> Result<Figure, DataScribeError> {
    let table = if agg == Aggregation::None {
        aggregate::group_by(dataset, x, Some(y), agg)?.sort_by(x, true)?
    } else {
        aggregate::group_by(dataset, x, Some(y), agg)?
    };
    let (labels, values) = label_value_pairs(&table);
    Ok(Figure {
        layers: vec![Layer::Line {
            name: None,
            labels,
            values,
        }],
        ..Figure::default()
    }
    .with_axes(x, y))
}

pub fn scatter(dataset: &Dataset, x: &str, y: &str) -> Result<Figure, DataScribeError> {
    dataset.numeric_values(x)?;
    dataset.numeric_values(y)?;
    let xi = dataset.column_index(x)?;
    let yi = dataset.column_index(y)?;
    let (xs, ys) = dataset
        .rows()
        .iter()
        .filter_map(|r| Some((r[xi].as_f64()?, r[yi].as_f64()?)))
        .unzip();
    Ok(Figure {
        layers: vec![Layer::Scatter { xs, ys }],
        ..Figure::default()
    }
    .with_axes(x, y))
}

/// Co-occurrence counts of two columns.
pub fn heatmap(dataset: &Dataset, x: &str, y: &str) -> Result<Figure, DataScribeError> {
    let xi = dataset.column_index(x)?;
    let yi = dataset.column_index(y)?;
    let x_keys = sorted_keys(dataset, x)?;
    let y_keys = sorted_keys(dataset, y)?;

    let mut cells = vec![vec![None; x_keys.len()]; y_keys.len()];
    for row in dataset.rows() {
        let (Some(cx), Some(cy)) = (
            x_keys.binary_search_by(|k| k.total_cmp(&row[xi])).ok(),
            y_keys.binary_search_by(|k| k.total_cmp(&row[yi])).ok(),
        ) else {
            continue;
        };
        let cell: &mut Option<f64> = &mut cells[cy][cx];
        *cell = Some(cell.unwrap_or(0.0) + 1.0);
    }

    Ok(Figure {
        layers: vec![Layer::Heatmap {
            x_labels: x_keys.iter().map(Value::to_string).collect(),
            y_labels: y_keys.iter().map(Value::to_string).collect(),
            cells,
        }],
        ..Figure::default()
    }
    .with_axes(x, y))
}

/// Correlation matrix of all numeric columns as a heatmap.
pub fn correlation(dataset: &Dataset) -> Result<Figure, DataScribeError> {
    let matrix = aggregate::correlation_matrix(dataset)?;
    let labels: Vec<String> = matrix.column_names()[1..]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let cells = matrix
        .rows()
        .iter()
        .map(|r| r[1..].iter().map(Value::as_f64).collect())
        .collect();
    Ok(Figure {
        layers: vec![Layer::Heatmap {
            x_labels: labels.clone(),
            y_labels: labels,
            cells,
        }],
        ..Figure::default()
    }
    .with_title("Correlation matrix"))
}

/// Line over a date column, aggregated per date (sum by default), with an
/// optional line per category.
pub fn time_series(dataset: &Dataset, spec: &ChartSpec) -> Result<Figure, DataScribeError> {
    let x = match &spec.x {
        Some(x) => x.clone(),
        None => dataset
            .columns_of_kind(ColumnKind::Temporal)
            .first()
            .map(|s| s.to_string())
            .ok_or_else(|| DataScribeError::ColumnType {
                column: String::new(),
                expected: "a date column for a time series".into(),
            })?,
    };
    if dataset.column(&x)?.kind != ColumnKind::Temporal {
        return Err(DataScribeError::ColumnType {
            column: x,
            expected: "a date column".into(),
        });
    }
    let y = required(&spec.y, "y")?;
    let agg = match spec.aggregation {
        Aggregation::None => Aggregation::Sum,
        a => a,
    };

    let mut figure = Figure::default().with_axes(x.as_str(), y);
    match &spec.series_by {
        None => {
            let table = aggregate::group_by(dataset, &x, Some(y), agg)?;
            let (labels, values) = label_value_pairs(&table);
            figure.layers.push(Layer::Line {
                name: None,
                labels,
                values,
            });
        }
        Some((column, wanted)) => {
            let ci = dataset.column_index(column)?;
            for category in dataset.unique(column)? {
                let name = category.to_string();
                if category.is_null() || (!wanted.is_empty() && !wanted.contains(&name)) {
                    continue;
                }
                let subset = dataset.filter_rows(|r| r[ci] == category);
                let table = aggregate::group_by(&subset, &x, Some(y), agg)?;
                let (labels, values) = label_value_pairs(&table);
                figure.layers.push(Layer::Line {
                    name: Some(name),
                    labels,
                    values,
                });
            }
        }
    }
    Ok(figure)
}

fn required<'a>(column: &'a Option<String>, axis: &str) -> Result<&'a str, DataScribeError> {
    column
        .as_deref()
        .ok_or_else(|| DataScribeError::Config(format!("this chart needs a {axis} column")))
}

/// First column as labels, second as values; rows with a non-numeric value
/// are skipped.
fn label_value_pairs(table: &Dataset) -> (Vec<String>, Vec<f64>) {
    table
        .rows()
        .iter()
        .filter_map(|r| Some((r[0].to_string(), r[1].as_f64()?)))
        .unzip()
}

fn sorted_keys(dataset: &Dataset, column: &str) -> Result<Vec<Value>, DataScribeError> {
    let mut keys: Vec<Value> = dataset
        .unique(column)?
        .into_iter()
        .filter(|v| !v.is_null())
        .collect();
    keys.sort_by(Value::total_cmp);
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::loader::load_csv_reader;
    use pretty_assertions::assert_eq;

    fn visits() -> Dataset {
        let csv = "date,region,sales,visitors\n\
                   2023-01-01,Tokyo,5000,200\n\
                   2023-01-01,Osaka,4500,180\n\
                   2023-01-02,Tokyo,4700,190\n\
                   2023-01-02,Osaka,4100,170\n";
        load_csv_reader(csv.as_bytes()).unwrap()
    }

    #[test]
    fn test_bar_sum() {
        let spec = ChartSpec::new(ChartKind::Bar)
            .x("region")
            .y("sales")
            .aggregate(Aggregation::Sum);
        let fig = build_figure(&visits(), &spec).unwrap();
        assert_eq!(
            fig.layers[0],
            Layer::Bar {
                labels: vec!["Osaka".into(), "Tokyo".into()],
                values: vec![8600.0, 9700.0],
            }
        );
        assert_eq!(fig.x_label.as_deref(), Some("region"));
    }

    #[test]
    fn test_bar_without_y_counts() {
        let fig = build_figure(&visits(), &ChartSpec::new(ChartKind::Bar).x("region")).unwrap();
        match &fig.layers[0] {
            Layer::Bar { values, .. } => assert_eq!(values, &vec![2.0, 2.0]),
            other => panic!("unexpected layer {other:?}"),
        }
    }

    #[test]
    fn test_scatter_requires_numeric() {
        let spec = ChartSpec::new(ChartKind::Scatter).x("region").y("sales");
        assert!(build_figure(&visits(), &spec).is_err());
        let spec = ChartSpec::new(ChartKind::Scatter).x("visitors").y("sales");
        match &build_figure(&visits(), &spec).unwrap().layers[0] {
            Layer::Scatter { xs, ys } => {
                assert_eq!(xs.len(), 4);
                assert_eq!(ys[0], 5000.0);
            }
            other => panic!("unexpected layer {other:?}"),
        }
    }

    #[test]
    fn test_heatmap_counts() {
        let spec = ChartSpec::new(ChartKind::Heatmap).x("date").y("region");
        match &build_figure(&visits(), &spec).unwrap().layers[0] {
            Layer::Heatmap {
                x_labels,
                y_labels,
                cells,
            } => {
                assert_eq!(x_labels, &vec!["2023-01-01".to_string(), "2023-01-02".to_string()]);
                assert_eq!(y_labels, &vec!["Osaka".to_string(), "Tokyo".to_string()]);
                assert_eq!(cells[0][0], Some(1.0));
            }
            other => panic!("unexpected layer {other:?}"),
        }
    }

    #[test]
    fn test_correlation_heatmap() {
        let fig = build_figure(&visits(), &ChartSpec::new(ChartKind::Correlation)).unwrap();
        match &fig.layers[0] {
            Layer::Heatmap { x_labels, cells, .. } => {
                assert_eq!(x_labels, &vec!["sales".to_string(), "visitors".to_string()]);
                assert!((cells[1][1].unwrap() - 1.0).abs() < 1e-9);
            }
            other => panic!("unexpected layer {other:?}"),
        }
    }

    #[test]
    fn test_time_series_defaults_to_date_and_sum() {
        let spec = ChartSpec::new(ChartKind::TimeSeries).y("sales");
        let fig = build_figure(&visits(), &spec).unwrap();
        assert_eq!(
            fig.layers,
            vec![Layer::Line {
                name: None,
                labels: vec!["2023-01-01".into(), "2023-01-02".into()],
                values: vec![9500.0, 8800.0],
            }]
        );
    }

    #[test]
    fn test_time_series_per_category() {
        let mut spec = ChartSpec::new(ChartKind::TimeSeries).x("date").y("sales");
        spec.series_by = Some(("region".into(), vec!["Tokyo".into()]));
        let fig = build_figure(&visits(), &spec).unwrap();
        assert_eq!(fig.layers.len(), 1);
        match &fig.layers[0] {
            Layer::Line { name, values, .. } => {
                assert_eq!(name.as_deref(), Some("Tokyo"));
                assert_eq!(values, &vec![5000.0, 4700.0]);
            }
            other => panic!("unexpected layer {other:?}"),
        }
    }

    #[test]
    fn test_time_series_rejects_non_date_x() {
        let spec = ChartSpec::new(ChartKind::TimeSeries).x("region").y("sales");
        assert!(matches!(
            build_figure(&visits(), &spec),
            Err(DataScribeError::ColumnType { .. })
        ));
    }

    #[test]
    fn test_missing_axis() {
        let err = build_figure(&visits(), &ChartSpec::new(ChartKind::Line)).unwrap_err();
        assert!(err.to_string().contains("x column"));
    }
}
