// src/pipeline/session.rs — Per-session state and one handler per user action
//
// A session owns the loaded dataset, the active filters and at most one
// pending `SanitizedCode`. Handlers move it through:
//
//   Idle → DatasetLoaded → QuerySubmitted → CodeGenerated → CodeSanitized
//        → Executed | Rejected | ExecutionFailed
//
// Model-call and extraction failures fall back to DatasetLoaded. Any
// finished state accepts a new query.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::sanitize::SanitizedCode;
use super::Pipeline;
use crate::dataset::filter::{self, Filter};
use crate::dataset::{loader, Dataset};
use crate::infra::config::BindingsConfig;
use crate::infra::errors::DataScribeError;
use crate::sandbox::output::Renderer;
use crate::sandbox::{Bindings, Executor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    DatasetLoaded,
    QuerySubmitted,
    CodeGenerated,
    CodeSanitized,
    Executed,
    Rejected,
    ExecutionFailed,
}

impl SessionState {
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        match (self, next) {
            // (re)loading a dataset is allowed from anywhere
            (_, DatasetLoaded) => true,
            (DatasetLoaded | CodeSanitized | Executed | Rejected | ExecutionFailed, QuerySubmitted) => {
                true
            }
            (CodeGenerated, QuerySubmitted) => true,
            (QuerySubmitted, CodeGenerated) => true,
            (CodeGenerated, CodeSanitized | Rejected) => true,
            (CodeSanitized, Executed | ExecutionFailed) => true,
            _ => false,
        }
    }

    /// A dataset is available in every state but `Idle`.
    pub fn has_dataset(self) -> bool {
        self != SessionState::Idle
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::DatasetLoaded => "dataset loaded",
            Self::QuerySubmitted => "query submitted",
            Self::CodeGenerated => "code generated",
            Self::CodeSanitized => "code ready to run",
            Self::Executed => "executed",
            Self::Rejected => "rejected",
            Self::ExecutionFailed => "execution failed",
        };
        f.write_str(s)
    }
}

pub struct Session {
    id: String,
    started_at: DateTime<Utc>,
    state: SessionState,
    pipeline: Pipeline,
    executor: Arc<dyn Executor>,
    bindings: BindingsConfig,

    source: Option<PathBuf>,
    original: Option<Arc<Dataset>>,
    dataset: Option<Arc<Dataset>>,
    filters: Vec<Filter>,

    query: Option<String>,
    raw_response: Option<String>,
    extracted: Option<String>,
    pending: Option<SanitizedCode>,
}

impl Session {
    pub fn new(pipeline: Pipeline, executor: Arc<dyn Executor>, bindings: BindingsConfig) -> Self {
        let id = uuid::Uuid::new_v4().to_string();
        tracing::debug!(session = %id, "Session started");
        Self {
            id,
            started_at: Utc::now(),
            state: SessionState::Idle,
            pipeline,
            executor,
            bindings,
            source: None,
            original: None,
            dataset: None,
            filters: Vec::new(),
            query: None,
            raw_response: None,
            extracted: None,
            pending: None,
        }
    }

    // ─── Accessors ──────────────────────────────────────────────

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// The dataset with the active filters applied.
    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_deref()
    }

    pub fn original(&self) -> Option<&Dataset> {
        self.original.as_deref()
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn raw_response(&self) -> Option<&str> {
        self.raw_response.as_deref()
    }

    pub fn extracted_code(&self) -> Option<&str> {
        self.extracted.as_deref()
    }

    pub fn pending_code(&self) -> Option<&SanitizedCode> {
        self.pending.as_ref()
    }

    /// True only while screened code is waiting to run.
    pub fn can_execute(&self) -> bool {
        self.pending.is_some()
    }

    // ─── Dataset handlers ───────────────────────────────────────

    pub fn load_csv(&mut self, path: &Path) -> Result<&Dataset, DataScribeError> {
        let dataset = loader::load_csv(path)?;
        self.source = Some(path.to_path_buf());
        self.load_dataset(dataset);
        self.current()
    }

    /// Replace the dataset. Filters, generated code and the last query are
    /// dropped.
    pub fn load_dataset(&mut self, dataset: Dataset) {
        let dataset = Arc::new(dataset);
        tracing::info!(
            session = %self.id,
            rows = dataset.len(),
            columns = dataset.width(),
            "Dataset loaded"
        );
        self.original = Some(dataset.clone());
        self.dataset = Some(dataset);
        self.filters.clear();
        self.reset_generation();
        self.query = None;
        self.transition(SessionState::DatasetLoaded);
    }

    /// Parse and stack a filter (`col=lo..hi`, `col=a,b`, `col=date..date`).
    pub fn apply_filter(&mut self, spec: &str) -> Result<&Dataset, DataScribeError> {
        let original = self.original.clone().ok_or(DataScribeError::NoDataset)?;
        let parsed = Filter::parse(spec, &original)?;
        let mut filters = self.filters.clone();
        filters.push(parsed);
        let filtered = filter::apply_all(&original, &filters)?;
        tracing::info!(
            session = %self.id,
            rows = filtered.len(),
            of = original.len(),
            "Filter applied: {}",
            filters.last().map(|f| f.to_string()).unwrap_or_default()
        );
        self.filters = filters;
        self.dataset = Some(Arc::new(filtered));
        self.current()
    }

    pub fn clear_filters(&mut self) -> Result<&Dataset, DataScribeError> {
        let original = self.original.clone().ok_or(DataScribeError::NoDataset)?;
        self.filters.clear();
        self.dataset = Some(original);
        self.current()
    }

    fn current(&self) -> Result<&Dataset, DataScribeError> {
        self.dataset.as_deref().ok_or(DataScribeError::NoDataset)
    }

    // ─── Query / execution handlers ─────────────────────────────

    /// Build the prompt, call the model, extract and sanitize. On success
    /// the session holds runnable code and `can_execute()` is true.
    pub async fn submit_query(&mut self, query: &str) -> Result<&SanitizedCode, DataScribeError> {
        let dataset = self.dataset.clone().ok_or(DataScribeError::NoDataset)?;
        if query.trim().is_empty() {
            return Err(DataScribeError::EmptyQuery);
        }

        self.reset_generation();
        self.query = Some(query.trim().to_string());
        self.transition(SessionState::QuerySubmitted);

        let prompt = self.pipeline.build_prompt(query, &dataset);
        let raw = match self.pipeline.request_code(&prompt).await {
            Ok(raw) => raw,
            Err(e) => return Err(self.fall_back(e)),
        };
        let extracted = match self.pipeline.extract(&raw) {
            Ok(code) => code.to_string(),
            Err(e) => {
                self.raw_response = Some(raw);
                return Err(self.fall_back(e));
            }
        };
        self.raw_response = Some(raw);
        self.transition(SessionState::CodeGenerated);

        let sanitized = self.pipeline.sanitize(&extracted);
        self.extracted = Some(extracted);
        match sanitized {
            Ok(code) => {
                self.transition(SessionState::CodeSanitized);
                Ok(self.pending.insert(code))
            }
            Err(e) => {
                self.transition(SessionState::Rejected);
                Err(e)
            }
        }
    }

    /// Run the pending code once against the current dataset.
    pub fn execute(&mut self, renderer: Arc<dyn Renderer>) -> Result<(), DataScribeError> {
        let code = self
            .pending
            .take()
            .ok_or(DataScribeError::NothingToExecute)?;
        let dataset = self.dataset.clone().ok_or(DataScribeError::NoDataset)?;

        let bindings = Bindings::new(self.bindings.clone(), dataset, renderer);
        match self.executor.execute(&code, bindings) {
            Ok(()) => {
                self.transition(SessionState::Executed);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(session = %self.id, "Execution failed: {}", e);
                self.transition(SessionState::ExecutionFailed);
                Err(e)
            }
        }
    }

    fn fall_back(&mut self, e: DataScribeError) -> DataScribeError {
        tracing::warn!(session = %self.id, "Query failed: {}", e);
        self.transition(SessionState::DatasetLoaded);
        e
    }

    fn reset_generation(&mut self) {
        self.raw_response = None;
        self.extracted = None;
        self.pending = None;
    }

    fn transition(&mut self, next: SessionState) {
        if !self.state.can_transition_to(next) {
            tracing::warn!(
                session = %self.id,
                "Unexpected transition {} -> {}",
                self.state,
                next
            );
        }
        tracing::debug!(session = %self.id, "{} -> {}", self.state, next);
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SessionState::*;

    #[test]
    fn test_happy_path_transitions() {
        let path = [
            Idle,
            DatasetLoaded,
            QuerySubmitted,
            CodeGenerated,
            CodeSanitized,
            Executed,
            QuerySubmitted,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_failure_transitions() {
        assert!(QuerySubmitted.can_transition_to(DatasetLoaded));
        assert!(CodeGenerated.can_transition_to(Rejected));
        assert!(CodeSanitized.can_transition_to(ExecutionFailed));
        assert!(Rejected.can_transition_to(QuerySubmitted));
        assert!(ExecutionFailed.can_transition_to(QuerySubmitted));
    }

    #[test]
    fn test_forbidden_transitions() {
        assert!(!Idle.can_transition_to(QuerySubmitted));
        assert!(!DatasetLoaded.can_transition_to(Executed));
        assert!(!Rejected.can_transition_to(Executed));
        assert!(!QuerySubmitted.can_transition_to(CodeSanitized));
        assert!(!Executed.can_transition_to(Executed));
    }

    #[test]
    fn test_has_dataset() {
        assert!(!Idle.has_dataset());
        assert!(Rejected.has_dataset());
    }
}
