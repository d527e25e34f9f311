// src/sandbox/api.rs — Host API visible to generated scripts
//
// Three handle types are bound into every script:
//   - DataFrame (`data`): read-only view of the dataset; every operation
//     returns a new frame or a value
//   - Display (`st`): writes text, tables, metrics and charts to the renderer
//   - Plot (`plt`): builds the current figure; `st.figure()` renders it
//
// Nothing here touches the filesystem, network, environment or processes.

use std::sync::{Arc, Mutex, MutexGuard};

use rhai::{Array, Dynamic, Engine, EvalAltResult, ImmutableString, Position, FLOAT, INT};

use super::output::{NoticeLevel, Output, Renderer};
use crate::dataset::aggregate::{self, Aggregation};
use crate::dataset::{format_number, Dataset, Value};
use crate::infra::errors::DataScribeError;
use crate::viz::{builder, Figure, Layer};

type RhaiResult<T> = Result<T, Box<EvalAltResult>>;

/// Rows shown when a frame is printed or written as text.
const TEXT_TABLE_ROWS: usize = 20;

// ---------------------------------------------------------------------------
// Handle types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Frame(Arc<Dataset>);

impl Frame {
    pub fn new(dataset: Arc<Dataset>) -> Self {
        Self(dataset)
    }

    pub fn dataset(&self) -> &Dataset {
        &self.0
    }

    fn derive(dataset: Dataset) -> Self {
        Self(Arc::new(dataset))
    }
}

#[derive(Clone)]
pub struct DisplayHandle {
    renderer: Arc<dyn Renderer>,
    figure: Arc<Mutex<Figure>>,
}

impl DisplayHandle {
    pub fn new(renderer: Arc<dyn Renderer>, figure: Arc<Mutex<Figure>>) -> Self {
        Self { renderer, figure }
    }

    fn emit(&self, output: Output) {
        self.renderer.render(output);
    }

    fn notice(&self, level: NoticeLevel, message: &str) {
        self.emit(Output::Notice {
            level,
            message: message.to_string(),
        });
    }

    /// Render and reset the current figure.
    fn show_figure(&self) {
        let figure = std::mem::take(&mut *lock(&self.figure));
        if figure.is_empty() {
            self.notice(NoticeLevel::Warning, "Nothing to show: the figure is empty");
        } else {
            self.emit(Output::Chart(figure));
        }
    }
}

#[derive(Clone)]
pub struct PlotHandle {
    figure: Arc<Mutex<Figure>>,
}

impl PlotHandle {
    pub fn new(figure: Arc<Mutex<Figure>>) -> Self {
        Self { figure }
    }

    fn push(&self, layer: Layer) {
        lock(&self.figure).layers.push(layer);
    }
}

fn lock(figure: &Mutex<Figure>) -> MutexGuard<'_, Figure> {
    figure.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

/// Register the three handle types and their methods on `engine`.
pub fn register_api(engine: &mut Engine) {
    register_frame(engine);
    register_display(engine);
    register_plot(engine);
}

fn register_frame(engine: &mut Engine) {
    engine
        .register_type_with_name::<Frame>("DataFrame")
        .register_fn("to_string", |f: &mut Frame| f.0.to_text_table(TEXT_TABLE_ROWS))
        .register_fn("to_debug", |f: &mut Frame| f.0.to_text_table(TEXT_TABLE_ROWS))
        .register_fn("columns", |f: &mut Frame| -> Array {
            f.0.column_names()
                .into_iter()
                .map(|name| Dynamic::from(name.to_string()))
                .collect()
        })
        .register_fn("len", |f: &mut Frame| f.0.len() as INT)
        .register_fn("count", |f: &mut Frame| f.0.len() as INT)
        .register_fn("is_empty", |f: &mut Frame| f.0.is_empty())
        .register_fn("head", |f: &mut Frame, n: INT| Frame::derive(f.0.head(to_count(n))))
        .register_fn("tail", |f: &mut Frame, n: INT| Frame::derive(f.0.tail(to_count(n))))
        .register_fn("column", |f: &mut Frame, name: &str| column_array(&f.0, name))
        .register_indexer_get(|f: &mut Frame, name: ImmutableString| {
            column_array(&f.0, name.as_str())
        })
        .register_fn("unique", |f: &mut Frame, name: &str| -> RhaiResult<Array> {
            let values = f.0.unique(name).map_err(host_error)?;
            Ok(values.iter().map(value_to_dynamic).collect())
        })
        .register_fn("sum", |f: &mut Frame, name: &str| {
            column_stat(&f.0, name, |v| Aggregation::Sum.apply(v))
        })
        .register_fn("mean", |f: &mut Frame, name: &str| {
            column_stat(&f.0, name, |v| Aggregation::Mean.apply(v))
        })
        .register_fn("min", |f: &mut Frame, name: &str| {
            column_stat(&f.0, name, |v| Aggregation::Min.apply(v))
        })
        .register_fn("max", |f: &mut Frame, name: &str| {
            column_stat(&f.0, name, |v| Aggregation::Max.apply(v))
        })
        .register_fn("median", |f: &mut Frame, name: &str| {
            column_stat(&f.0, name, aggregate::median)
        })
        .register_fn(
            "group_by",
            |f: &mut Frame, key: &str, value: &str, agg: &str| -> RhaiResult<Frame> {
                let agg: Aggregation = agg.parse().map_err(host_error)?;
                aggregate::group_by(&f.0, key, Some(value), agg)
                    .map(Frame::derive)
                    .map_err(host_error)
            },
        )
        .register_fn("value_counts", |f: &mut Frame, name: &str| -> RhaiResult<Frame> {
            aggregate::value_counts(&f.0, name)
                .map(Frame::derive)
                .map_err(host_error)
        })
        .register_fn(
            "filter_eq",
            |f: &mut Frame, name: &str, wanted: Dynamic| -> RhaiResult<Frame> {
                let idx = f.0.column_index(name).map_err(host_error)?;
                Ok(Frame::derive(
                    f.0.filter_rows(|row| cell_equals(&row[idx], &wanted)),
                ))
            },
        )
        .register_fn(
            "filter_range",
            |f: &mut Frame, name: &str, lo: Dynamic, hi: Dynamic| -> RhaiResult<Frame> {
                let idx = f.0.column_index(name).map_err(host_error)?;
                f.0.numeric_values(name).map_err(host_error)?;
                let lo = dynamic_to_f64(&lo).ok_or_else(|| runtime_error("filter_range bounds must be numbers"))?;
                let hi = dynamic_to_f64(&hi).ok_or_else(|| runtime_error("filter_range bounds must be numbers"))?;
                Ok(Frame::derive(f.0.filter_rows(|row| {
                    row[idx].as_f64().is_some_and(|x| x >= lo && x <= hi)
                })))
            },
        )
        .register_fn(
            "sort_by",
            |f: &mut Frame, name: &str, ascending: bool| -> RhaiResult<Frame> {
                f.0.sort_by(name, ascending)
                    .map(Frame::derive)
                    .map_err(host_error)
            },
        )
        .register_fn("describe", |f: &mut Frame| -> RhaiResult<Frame> {
            aggregate::describe(&f.0).map(Frame::derive).map_err(host_error)
        })
        .register_fn("corr", |f: &mut Frame| -> RhaiResult<Frame> {
            aggregate::correlation_matrix(&f.0)
                .map(Frame::derive)
                .map_err(host_error)
        });
}

fn register_display(engine: &mut Engine) {
    engine
        .register_type_with_name::<DisplayHandle>("Display")
        .register_fn("write", |d: &mut DisplayHandle, value: Dynamic| {
            let output = match value.clone().try_cast::<Frame>() {
                Some(frame) => Output::Table(frame.dataset().clone()),
                None => Output::Text(format_dynamic(&value)),
            };
            d.emit(output);
        })
        .register_fn("text", |d: &mut DisplayHandle, text: &str| {
            d.emit(Output::Text(text.to_string()));
        })
        .register_fn("table", |d: &mut DisplayHandle, frame: Frame| {
            d.emit(Output::Table(frame.dataset().clone()));
        })
        .register_fn("dataframe", |d: &mut DisplayHandle, frame: Frame| {
            d.emit(Output::Table(frame.dataset().clone()));
        })
        .register_fn("metric", |d: &mut DisplayHandle, label: &str, value: Dynamic| {
            d.emit(Output::Metric {
                label: label.to_string(),
                value: format_dynamic(&value),
            });
        })
        .register_fn("info", |d: &mut DisplayHandle, msg: &str| {
            d.notice(NoticeLevel::Info, msg)
        })
        .register_fn("success", |d: &mut DisplayHandle, msg: &str| {
            d.notice(NoticeLevel::Success, msg)
        })
        .register_fn("warning", |d: &mut DisplayHandle, msg: &str| {
            d.notice(NoticeLevel::Warning, msg)
        })
        .register_fn("error", |d: &mut DisplayHandle, msg: &str| {
            d.notice(NoticeLevel::Error, msg)
        })
        .register_fn(
            "bar_chart",
            |d: &mut DisplayHandle, frame: Frame, x: &str, y: &str| -> RhaiResult<()> {
                let figure =
                    builder::bar(frame.dataset(), x, Some(y), Aggregation::None).map_err(host_error)?;
                d.emit(Output::Chart(figure));
                Ok(())
            },
        )
        .register_fn(
            "line_chart",
            |d: &mut DisplayHandle, frame: Frame, x: &str, y: &str| -> RhaiResult<()> {
                let figure =
                    builder::line(frame.dataset(), x, y, Aggregation::None).map_err(host_error)?;
                d.emit(Output::Chart(figure));
                Ok(())
            },
        )
        .register_fn("figure", |d: &mut DisplayHandle| d.show_figure());
}

fn register_plot(engine: &mut Engine) {
    engine
        .register_type_with_name::<PlotHandle>("Plot")
        .register_fn(
            "bar",
            |p: &mut PlotHandle, labels: Array, values: Array| -> RhaiResult<()> {
                let values = numbers(&values)?;
                same_length(labels.len(), values.len())?;
                p.push(Layer::Bar {
                    labels: labels.iter().map(format_dynamic).collect(),
                    values,
                });
                Ok(())
            },
        )
        .register_fn(
            "plot",
            |p: &mut PlotHandle, xs: Array, ys: Array| -> RhaiResult<()> {
                let values = numbers(&ys)?;
                same_length(xs.len(), values.len())?;
                p.push(Layer::Line {
                    name: None,
                    labels: xs.iter().map(format_dynamic).collect(),
                    values,
                });
                Ok(())
            },
        )
        .register_fn("plot", |p: &mut PlotHandle, ys: Array| -> RhaiResult<()> {
            let values = numbers(&ys)?;
            p.push(Layer::Line {
                name: None,
                labels: (0..values.len()).map(|i| i.to_string()).collect(),
                values,
            });
            Ok(())
        })
        .register_fn(
            "scatter",
            |p: &mut PlotHandle, xs: Array, ys: Array| -> RhaiResult<()> {
                let xs = numbers(&xs)?;
                let ys = numbers(&ys)?;
                same_length(xs.len(), ys.len())?;
                p.push(Layer::Scatter { xs, ys });
                Ok(())
            },
        )
        .register_fn("title", |p: &mut PlotHandle, title: &str| {
            lock(&p.figure).title = Some(title.to_string());
        })
        .register_fn("xlabel", |p: &mut PlotHandle, label: &str| {
            lock(&p.figure).x_label = Some(label.to_string());
        })
        .register_fn("ylabel", |p: &mut PlotHandle, label: &str| {
            lock(&p.figure).y_label = Some(label.to_string());
        })
        .register_fn("clear", |p: &mut PlotHandle| {
            *lock(&p.figure) = Figure::default();
        });
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

pub fn value_to_dynamic(value: &Value) -> Dynamic {
    match value {
        Value::Null => Dynamic::UNIT,
        Value::Int(i) => Dynamic::from_int(*i),
        Value::Float(f) => Dynamic::from_float(*f),
        Value::Bool(b) => Dynamic::from_bool(*b),
        Value::Date(d) => Dynamic::from(d.format("%Y-%m-%d").to_string()),
        Value::Text(s) => Dynamic::from(s.clone()),
    }
}

pub fn dynamic_to_f64(value: &Dynamic) -> Option<f64> {
    value
        .as_int()
        .map(|i| i as f64)
        .ok()
        .or_else(|| value.as_float().ok())
}

/// Human-readable text for any script value.
pub fn format_dynamic(value: &Dynamic) -> String {
    if value.is_unit() {
        return String::new();
    }
    if let Ok(f) = value.as_float() {
        return format_number(f as FLOAT);
    }
    if let Some(frame) = value.clone().try_cast::<Frame>() {
        return frame.dataset().to_text_table(TEXT_TABLE_ROWS);
    }
    if let Some(items) = value.clone().try_cast::<Array>() {
        let inner: Vec<String> = items.iter().map(format_dynamic).collect();
        return format!("[{}]", inner.join(", "));
    }
    value.to_string()
}

fn column_array(dataset: &Dataset, name: &str) -> RhaiResult<Array> {
    let values = dataset.values(name).map_err(host_error)?;
    Ok(values.map(value_to_dynamic).collect())
}

/// A statistic over a numeric column; `()` when there is nothing to
/// aggregate.
fn column_stat(
    dataset: &Dataset,
    name: &str,
    stat: impl Fn(&[f64]) -> Option<f64>,
) -> RhaiResult<Dynamic> {
    let values = dataset.numeric_values(name).map_err(host_error)?;
    Ok(stat(&values).map(Dynamic::from_float).unwrap_or(Dynamic::UNIT))
}

fn cell_equals(cell: &Value, wanted: &Dynamic) -> bool {
    match (cell.as_f64(), dynamic_to_f64(wanted)) {
        (Some(a), Some(b)) => a == b,
        _ => !cell.is_null() && cell.to_string() == format_dynamic(wanted),
    }
}

fn numbers(items: &Array) -> RhaiResult<Vec<f64>> {
    items
        .iter()
        .map(|d| dynamic_to_f64(d).ok_or_else(|| runtime_error(format!("expected a number, got {d}"))))
        .collect()
}

fn same_length(a: usize, b: usize) -> RhaiResult<()> {
    if a == b {
        Ok(())
    } else {
        Err(runtime_error(format!(
            "x and y must have the same length ({a} vs {b})"
        )))
    }
}

fn to_count(n: INT) -> usize {
    usize::try_from(n).unwrap_or(0)
}

fn runtime_error(message: impl Into<String>) -> Box<EvalAltResult> {
    Box::new(EvalAltResult::ErrorRuntime(
        Dynamic::from(message.into()),
        Position::NONE,
    ))
}

fn host_error(e: DataScribeError) -> Box<EvalAltResult> {
    runtime_error(e.to_string())
}
