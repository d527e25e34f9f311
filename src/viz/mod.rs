// src/viz/mod.rs — Chart model shared by scripts and the manual explorer

pub mod builder;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::infra::errors::DataScribeError;

/// Chart types offered by the manual explorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Scatter,
    Line,
    Heatmap,
    Correlation,
    TimeSeries,
}

impl FromStr for ChartKind {
    type Err = DataScribeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "bar" => Ok(Self::Bar),
            "scatter" => Ok(Self::Scatter),
            "line" => Ok(Self::Line),
            "heatmap" => Ok(Self::Heatmap),
            "correlation" | "corr" => Ok(Self::Correlation),
            "timeseries" | "time" => Ok(Self::TimeSeries),
            other => Err(DataScribeError::Config(format!(
                "unknown chart type '{other}' (bar, scatter, line, heatmap, correlation, timeseries)"
            ))),
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Bar => "bar",
            Self::Scatter => "scatter",
            Self::Line => "line",
            Self::Heatmap => "heatmap",
            Self::Correlation => "correlation",
            Self::TimeSeries => "timeseries",
        };
        f.write_str(s)
    }
}

/// One drawable layer of a figure.
#[derive(Debug, Clone, PartialEq)]
pub enum Layer {
    Bar {
        labels: Vec<String>,
        values: Vec<f64>,
    },
    Line {
        name: Option<String>,
        labels: Vec<String>,
        values: Vec<f64>,
    },
    Scatter {
        xs: Vec<f64>,
        ys: Vec<f64>,
    },
    Heatmap {
        x_labels: Vec<String>,
        y_labels: Vec<String>,
        /// `cells[y][x]`
        cells: Vec<Vec<Option<f64>>>,
    },
}

/// A chart ready to render.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Figure {
    pub title: Option<String>,
    pub x_label: Option<String>,
    pub y_label: Option<String>,
    pub layers: Vec<Layer>,
}

impl Figure {
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_axes(mut self, x: impl Into<String>, y: impl Into<String>) -> Self {
        self.x_label = Some(x.into());
        self.y_label = Some(y.into());
        self
    }
}

/// How crowded x labels are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelMode {
    /// Show every k-th label.
    Thin,
    /// Truncate labels.
    Shrink,
    /// Thin only when there are more than 20 labels.
    #[default]
    Auto,
}

impl FromStr for LabelMode {
    type Err = DataScribeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "thin" => Ok(Self::Thin),
            "shrink" => Ok(Self::Shrink),
            "auto" => Ok(Self::Auto),
            other => Err(DataScribeError::Config(format!(
                "unknown label mode '{other}' (thin, shrink, auto)"
            ))),
        }
    }
}

impl LabelMode {
    /// Labels as displayed; thinned-out ones become empty strings so
    /// positions are kept.
    pub fn apply(&self, labels: &[String], budget: usize) -> Vec<String> {
        let budget = budget.max(1);
        let thin = |labels: &[String]| -> Vec<String> {
            let step = labels.len().div_ceil(budget).max(1);
            labels
                .iter()
                .enumerate()
                .map(|(i, l)| if i % step == 0 { l.clone() } else { String::new() })
                .collect()
        };
        match self {
            Self::Thin => thin(labels),
            Self::Auto if labels.len() > 20 => thin(labels),
            Self::Auto => labels.to_vec(),
            Self::Shrink => labels
                .iter()
                .map(|l| {
                    if l.chars().count() > 8 {
                        let short: String = l.chars().take(7).collect();
                        format!("{short}…")
                    } else {
                        l.clone()
                    }
                })
                .collect(),
        }
    }
}
