// src/sandbox/output.rs — What executed code can show, and where it goes

use std::sync::Mutex;

use crate::dataset::Dataset;
use crate::viz::Figure;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// One rendered item.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Text(String),
    Table(Dataset),
    Metric { label: String, value: String },
    Chart(Figure),
    Notice { level: NoticeLevel, message: String },
}

/// The host UI. Executed code reaches it only through the display handle.
pub trait Renderer: Send + Sync {
    fn render(&self, output: Output);
}

/// Keeps everything rendered, in order. Used by tests and by callers that
/// want to inspect results instead of printing them.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    outputs: Mutex<Vec<Output>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn outputs(&self) -> Vec<Output> {
        self.outputs
            .lock()
            .map(|o| o.clone())
            .unwrap_or_default()
    }

    pub fn take(&self) -> Vec<Output> {
        self.outputs
            .lock()
            .map(|mut o| std::mem::take(&mut *o))
            .unwrap_or_default()
    }
}

impl Renderer for RecordingRenderer {
    fn render(&self, output: Output) {
        if let Ok(mut outputs) = self.outputs.lock() {
            outputs.push(output);
        }
    }
}
