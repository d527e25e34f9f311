// src/cli/render.rs — Text rendering of tables, metrics, notices and charts
//
// Everything executed code or the explorer shows ends up here. Output goes
// to stdout; the string builders are kept separate so they can be tested.

use std::fmt::Write as _;

use crate::dataset::format_number;
use crate::infra::config::DisplayConfig;
use crate::sandbox::output::{NoticeLevel, Output, Renderer};
use crate::viz::{Figure, Layer};

const SPARKS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
const SHADES: [char; 5] = [' ', '░', '▒', '▓', '█'];

/// Prints every output to stdout as soon as it is rendered.
pub struct TerminalRenderer {
    display: DisplayConfig,
}

impl TerminalRenderer {
    pub fn new(display: DisplayConfig) -> Self {
        Self { display }
    }
}

impl Renderer for TerminalRenderer {
    fn render(&self, output: Output) {
        println!("{}", format_output(&output, &self.display));
    }
}

pub fn format_output(output: &Output, cfg: &DisplayConfig) -> String {
    match output {
        Output::Text(text) => text.clone(),
        Output::Table(table) => table.to_text_table(cfg.max_table_rows),
        Output::Metric { label, value } => format!("{label}\n  {value}"),
        Output::Notice { level, message } => {
            let tag = match level {
                NoticeLevel::Info => "[info]",
                NoticeLevel::Success => "[ok]",
                NoticeLevel::Warning => "[warn]",
                NoticeLevel::Error => "[error]",
            };
            format!("{tag} {message}")
        }
        Output::Chart(figure) => format_figure(figure, cfg),
    }
}

pub fn format_figure(figure: &Figure, cfg: &DisplayConfig) -> String {
    let mut out = String::new();
    if let Some(ref title) = figure.title {
        let _ = writeln!(out, "{title}");
        let _ = writeln!(out, "{}", "─".repeat(title.chars().count()));
    }
    for layer in &figure.layers {
        match layer {
            Layer::Bar { labels, values } => format_bars(&mut out, labels, values, cfg),
            Layer::Line {
                name,
                labels,
                values,
            } => format_line(&mut out, name.as_deref(), labels, values, cfg),
            Layer::Scatter { xs, ys } => format_scatter(&mut out, xs, ys, cfg),
            Layer::Heatmap {
                x_labels,
                y_labels,
                cells,
            } => format_heatmap(&mut out, x_labels, y_labels, cells, cfg),
        }
    }
    match (&figure.x_label, &figure.y_label) {
        (Some(x), Some(y)) => {
            let _ = writeln!(out, "x: {x}  y: {y}");
        }
        (Some(x), None) => {
            let _ = writeln!(out, "x: {x}");
        }
        (None, Some(y)) => {
            let _ = writeln!(out, "y: {y}");
        }
        (None, None) => {}
    }
    out.trim_end().to_string()
}

// ─── Bars ───────────────────────────────────────────────────

fn format_bars(out: &mut String, labels: &[String], values: &[f64], cfg: &DisplayConfig) {
    let labels = cfg.label_mode.apply(labels, cfg.chart_height.max(1) * 2);
    let label_width = labels.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let max_abs = values.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    let width = cfg.chart_width.max(1);

    for (label, value) in labels.iter().zip(values) {
        let len = if max_abs > 0.0 {
            (value.abs() / max_abs * width as f64).round() as usize
        } else {
            0
        };
        let pad = label_width - label.chars().count();
        let _ = writeln!(
            out,
            "{}{label} │{} {}",
            " ".repeat(pad),
            "█".repeat(len),
            format_number(*value)
        );
    }
}

// ─── Lines ──────────────────────────────────────────────────

/// Average consecutive points down to at most `width` buckets.
fn resample(values: &[f64], width: usize) -> Vec<f64> {
    if values.len() <= width || width == 0 {
        return values.to_vec();
    }
    (0..width)
        .map(|i| {
            let start = i * values.len() / width;
            let end = ((i + 1) * values.len() / width).max(start + 1);
            let chunk = &values[start..end];
            chunk.iter().sum::<f64>() / chunk.len() as f64
        })
        .collect()
}

pub fn sparkline(values: &[f64]) -> String {
    let (min, max) = min_max(values);
    values
        .iter()
        .map(|v| {
            if max > min {
                let idx = ((v - min) / (max - min) * 7.0).round() as usize;
                SPARKS[idx.min(7)]
            } else {
                SPARKS[3]
            }
        })
        .collect()
}

fn format_line(
    out: &mut String,
    name: Option<&str>,
    labels: &[String],
    values: &[f64],
    cfg: &DisplayConfig,
) {
    if values.is_empty() {
        let _ = writeln!(out, "{}(no points)", name.map(|n| format!("{n}: ")).unwrap_or_default());
        return;
    }
    let points = resample(values, cfg.chart_width.max(1));
    let (min, max) = min_max(values);
    let prefix = name.map(|n| format!("{n}: ")).unwrap_or_default();
    let _ = writeln!(
        out,
        "{prefix}{}  [{} .. {}]",
        sparkline(&points),
        format_number(min),
        format_number(max)
    );

    // first and last x label under the line
    if let (Some(first), Some(last)) = (labels.first(), labels.last()) {
        let indent = " ".repeat(prefix.chars().count());
        let ends = cfg.label_mode.apply(&[first.clone(), last.clone()], 2);
        if labels.len() == 1 {
            let _ = writeln!(out, "{indent}{}", ends[0]);
        } else {
            let gap = points
                .len()
                .saturating_sub(ends[0].chars().count() + ends[1].chars().count())
                .max(1);
            let _ = writeln!(out, "{indent}{}{}{}", ends[0], " ".repeat(gap), ends[1]);
        }
    }
}

// ─── Scatter ────────────────────────────────────────────────

fn format_scatter(out: &mut String, xs: &[f64], ys: &[f64], cfg: &DisplayConfig) {
    let width = cfg.chart_width.max(2);
    let height = cfg.chart_height.max(2);
    if xs.is_empty() {
        let _ = writeln!(out, "(no points)");
        return;
    }
    let (x_min, x_max) = min_max(xs);
    let (y_min, y_max) = min_max(ys);

    let mut grid = vec![vec!['·'; width]; height];
    for (x, y) in xs.iter().zip(ys) {
        if !x.is_finite() || !y.is_finite() {
            continue;
        }
        let col = scale(*x, x_min, x_max, width);
        let row = height - 1 - scale(*y, y_min, y_max, height);
        grid[row][col] = '●';
    }

    let top = format_number(y_max);
    let bottom = format_number(y_min);
    let axis_width = top.chars().count().max(bottom.chars().count());
    for (i, row) in grid.iter().enumerate() {
        let tick = match i {
            0 => top.as_str(),
            i if i == height - 1 => bottom.as_str(),
            _ => "",
        };
        let line: String = row.iter().collect();
        let _ = writeln!(out, "{tick:>axis_width$} │{line}");
    }
    let _ = writeln!(
        out,
        "{} └{}",
        " ".repeat(axis_width),
        "─".repeat(width)
    );
    let left = format_number(x_min);
    let right = format_number(x_max);
    let gap = width.saturating_sub(left.chars().count() + right.chars().count()).max(1);
    let _ = writeln!(out, "{}  {left}{}{right}", " ".repeat(axis_width), " ".repeat(gap));
}

fn scale(v: f64, min: f64, max: f64, cells: usize) -> usize {
    if max > min {
        (((v - min) / (max - min)) * (cells - 1) as f64).round() as usize
    } else {
        cells / 2
    }
}

// ─── Heatmap ────────────────────────────────────────────────

fn format_heatmap(
    out: &mut String,
    x_labels: &[String],
    y_labels: &[String],
    cells: &[Vec<Option<f64>>],
    cfg: &DisplayConfig,
) {
    let all: Vec<f64> = cells.iter().flatten().flatten().copied().collect();
    let (min, max) = min_max(&all);

    let x_shown = cfg.label_mode.apply(x_labels, cfg.chart_width.max(1) / 4);
    let cell_width = x_shown
        .iter()
        .map(|l| l.chars().count())
        .max()
        .unwrap_or(0)
        .clamp(6, 10);
    let x_shown: Vec<String> = x_shown
        .iter()
        .map(|l| l.chars().take(cell_width).collect())
        .collect();
    let row_width = y_labels.iter().map(|l| l.chars().count()).max().unwrap_or(0);

    let _ = write!(out, "{}", " ".repeat(row_width));
    for label in &x_shown {
        let _ = write!(out, " {label:>cell_width$}");
    }
    out.push('\n');

    for (y_label, row) in y_labels.iter().zip(cells) {
        let _ = write!(out, "{y_label:>row_width$}");
        for cell in row {
            let text = match cell {
                Some(v) => format!("{}{}", shade(*v, min, max), format_cell(*v)),
                None => String::new(),
            };
            let _ = write!(out, " {text:>cell_width$}");
        }
        out.push('\n');
    }
    let _ = writeln!(
        out,
        "{} {} .. {} {}",
        SHADES[1],
        format_number(min),
        format_number(max),
        SHADES[4]
    );
}

fn shade(v: f64, min: f64, max: f64) -> char {
    if max > min {
        let idx = ((v - min) / (max - min) * 3.0).round() as usize + 1;
        SHADES[idx.min(4)]
    } else {
        SHADES[2]
    }
}

fn format_cell(v: f64) -> String {
    if v.fract() == 0.0 {
        format_number(v)
    } else {
        format!("{v:.2}")
    }
}

fn min_max(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc: Option<(f64, f64)>, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
        .unwrap_or((0.0, 0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viz::LabelMode;

    fn cfg() -> DisplayConfig {
        DisplayConfig {
            chart_width: 10,
            chart_height: 4,
            ..DisplayConfig::default()
        }
    }

    #[test]
    fn test_metric_and_notice() {
        let m = Output::Metric {
            label: "Total Sales".into(),
            value: "450".into(),
        };
        assert_eq!(format_output(&m, &cfg()), "Total Sales\n  450");
        let n = Output::Notice {
            level: NoticeLevel::Warning,
            message: "careful".into(),
        };
        assert_eq!(format_output(&n, &cfg()), "[warn] careful");
    }

    #[test]
    fn test_bars_scale_to_width() {
        let fig = Figure {
            layers: vec![Layer::Bar {
                labels: vec!["a".into(), "bb".into()],
                values: vec![1.0, 2.0],
            }],
            ..Figure::default()
        };
        let text = format_figure(&fig, &cfg());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], " a │█████ 1");
        assert_eq!(lines[1], "bb │██████████ 2");
    }

    #[test]
    fn test_sparkline() {
        assert_eq!(sparkline(&[0.0, 1.0]), "▁█");
        assert_eq!(sparkline(&[5.0, 5.0]), "▄▄");
    }

    #[test]
    fn test_resample_caps_points() {
        let values: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let r = resample(&values, 10);
        assert_eq!(r.len(), 10);
        assert_eq!(r[0], 4.5);
    }

    #[test]
    fn test_line_shows_range() {
        let fig = Figure {
            layers: vec![Layer::Line {
                name: Some("east".into()),
                labels: vec!["2023-01-01".into(), "2023-01-02".into()],
                values: vec![100.0, 150.0],
            }],
            ..Figure::default()
        };
        let text = format_figure(&fig, &cfg());
        assert!(text.starts_with("east: ▁█  [100 .. 150]"));
        assert!(text.contains("2023-01-01"));
        assert!(text.contains("2023-01-02"));
    }

    #[test]
    fn test_scatter_grid() {
        let fig = Figure {
            layers: vec![Layer::Scatter {
                xs: vec![0.0, 1.0],
                ys: vec![0.0, 1.0],
            }],
            ..Figure::default()
        };
        let text = format_figure(&fig, &cfg());
        let lines: Vec<&str> = text.lines().collect();
        // highest point in the top-right corner, lowest bottom-left
        assert!(lines[0].ends_with("·········●"));
        assert!(lines[3].ends_with("●·········"));
    }

    #[test]
    fn test_heatmap_cells() {
        let fig = Figure {
            layers: vec![Layer::Heatmap {
                x_labels: vec!["a".into(), "b".into()],
                y_labels: vec!["a".into(), "b".into()],
                cells: vec![vec![Some(1.0), Some(-0.5)], vec![Some(-0.5), Some(1.0)]],
            }],
            ..Figure::default()
        };
        let text = format_figure(&fig, &cfg());
        assert!(text.contains("█1"));
        assert!(text.contains("░-0.50"));
        assert!(text.contains("-0.5 .. 1"));
    }

    #[test]
    fn test_title_and_axes() {
        let fig = Figure::default().with_title("Sales").with_axes("date", "sales");
        assert_eq!(format_figure(&fig, &cfg()), "Sales\n─────\nx: date  y: sales");
    }

    #[test]
    fn test_shrunk_bar_labels() {
        let config = DisplayConfig {
            label_mode: LabelMode::Shrink,
            ..cfg()
        };
        let fig = Figure {
            layers: vec![Layer::Bar {
                labels: vec!["a-very-long-label".into()],
                values: vec![1.0],
            }],
            ..Figure::default()
        };
        assert!(format_figure(&fig, &config).starts_with("a-very-…"));
    }
}
