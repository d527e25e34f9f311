// src/sandbox/mod.rs — Scoped execution of generated code
//
// The executor sees exactly the identifiers in `Bindings` and nothing else.
// It is a capability seam: a process-isolated executor can replace the Rhai
// one without touching the pipeline.

pub mod api;
pub mod output;
pub mod rhai_executor;

use std::sync::Arc;

use crate::dataset::Dataset;
use crate::infra::config::BindingsConfig;
use crate::infra::errors::DataScribeError;
use crate::pipeline::sanitize::SanitizedCode;
use output::Renderer;

/// The entire variable environment of one execution.
#[derive(Clone)]
pub struct Bindings {
    pub names: BindingsConfig,
    pub dataset: Arc<Dataset>,
    pub renderer: Arc<dyn Renderer>,
}

impl Bindings {
    pub fn new(names: BindingsConfig, dataset: Arc<Dataset>, renderer: Arc<dyn Renderer>) -> Self {
        Self {
            names,
            dataset,
            renderer,
        }
    }
}

/// Runs screened code. Results are side effects on the bound renderer;
/// failures come back as `Execution` / `ExecutionTimeout` errors and never
/// take the host down.
pub trait Executor: Send + Sync {
    fn execute(&self, code: &SanitizedCode, bindings: Bindings) -> Result<(), DataScribeError>;
}
