// src/pipeline/prompt.rs — Builds the code-generation prompt from a query and dataset metadata

use std::fmt::Write as _;

use crate::dataset::{ColumnKind, Dataset};
use crate::infra::config::{BindingsConfig, Config};

/// What the model gets to know about one analysis: the user's words, the
/// column names and a few rows. Built once, never modified.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    pub query: String,
    pub columns: Vec<(String, ColumnKind)>,
    pub preview: String,
}

impl AnalysisRequest {
    pub fn from_dataset(query: &str, dataset: &Dataset, preview_rows: usize) -> Self {
        Self {
            query: query.trim().to_string(),
            columns: dataset
                .columns()
                .iter()
                .map(|c| (c.name.clone(), c.kind))
                .collect(),
            preview: dataset.head(preview_rows).to_text_table(preview_rows),
        }
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(n, _)| n.as_str()).collect()
    }
}

/// Turns an [`AnalysisRequest`] into the prompt text. Uses the same binding
/// names the executor injects.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    names: BindingsConfig,
    language_tag: String,
}

impl PromptBuilder {
    pub fn new(names: BindingsConfig, language_tag: impl Into<String>) -> Self {
        Self {
            names,
            language_tag: language_tag.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.bindings.clone(), config.prompt.language_tag.clone())
    }

    /// Sections (in order):
    ///   1. Task: the query
    ///   2. Data: columns with kinds, then the preview rows
    ///   3. Environment: bound names and the API on each
    ///   4. Rules: no reloading, output through the display handle, one fenced block
    pub fn build(&self, request: &AnalysisRequest) -> String {
        let mut prompt = String::with_capacity(4096);

        append_task_section(&mut prompt, request);
        append_data_section(&mut prompt, request);
        self.append_environment_section(&mut prompt);
        self.append_rules_section(&mut prompt);

        prompt
    }

    fn append_environment_section(&self, prompt: &mut String) {
        let BindingsConfig {
            dataset: data,
            display: st,
            plot: plt,
            ..
        } = &self.names;

        prompt.push_str("# Environment\n\n");
        let _ = writeln!(
            prompt,
            "Write a {} script. The dataset is already loaded in the variable `{data}`. \
             Only these variables exist: `{data}`, `{st}` and `{plt}`.\n",
            self.language_tag
        );

        let _ = writeln!(prompt, "`{data}` (dataset, every method returns a new value):");
        for methods in [
            &["columns()", "len()", "is_empty()", "count()", "head(n)", "tail(n)"][..],
            &["column(name)", "[name]", "unique(name)"],
            &["sum(name)", "mean(name)", "min(name)", "max(name)", "median(name)"],
            &["group_by(key, value, agg)"],
            &["value_counts(name)", "filter_eq(name, value)", "filter_range(name, lo, hi)"],
            &["sort_by(name, ascending)", "describe()", "corr()"],
        ] {
            let _ = writeln!(prompt, "- {}", qualified(data, methods));
        }
        let _ = writeln!(
            prompt,
            "- `{data}[name]` and `{data}.column(name)` return an array; agg is one of none|sum|mean|max|min|count"
        );

        let _ = writeln!(prompt, "\n`{st}` (display):");
        for methods in [
            &["write(x)", "text(s)", "table(frame)", "dataframe(frame)", "metric(label, value)"][..],
            &["info(s)", "success(s)", "warning(s)", "error(s)"],
            &["bar_chart(frame, x, y)", "line_chart(frame, x, y)", "figure()"],
        ] {
            let _ = writeln!(prompt, "- {}", qualified(st, methods));
        }

        let _ = writeln!(prompt, "\n`{plt}` (plotting, shown with `{st}.figure()`):");
        for methods in [
            &["bar(labels, values)", "plot(xs, ys)", "scatter(xs, ys)"][..],
            &["title(s)", "xlabel(s)", "ylabel(s)", "clear()"],
        ] {
            let _ = writeln!(prompt, "- {}", qualified(plt, methods));
        }
        prompt.push('\n');
    }

    fn append_rules_section(&self, prompt: &mut String) {
        let data = &self.names.dataset;
        let st = &self.names.display;
        let tag = &self.language_tag;

        prompt.push_str("# Rules\n\n");
        let _ = writeln!(
            prompt,
            "- Do not load, read or re-read the data file. Use the existing `{data}` variable for every operation."
        );
        let _ = writeln!(
            prompt,
            "- Show every result through `{st}` so it appears in the user's interface."
        );
        let _ = writeln!(
            prompt,
            "- Reply with exactly one code block fenced as ```{tag} ... ```."
        );
    }
}

/// `handle.method` for each method; `[name]` becomes `handle[name]`.
fn qualified(handle: &str, methods: &[&str]) -> String {
    methods
        .iter()
        .map(|m| {
            if m.starts_with('[') {
                format!("{handle}{m}")
            } else {
                format!("{handle}.{m}")
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn append_task_section(prompt: &mut String, request: &AnalysisRequest) {
    prompt.push_str("# Task\n\n");
    let _ = writeln!(
        prompt,
        "Write code that performs this analysis: '{}'\n",
        request.query
    );
}

fn append_data_section(prompt: &mut String, request: &AnalysisRequest) {
    prompt.push_str("# Data\n\n");
    let headers = request
        .columns
        .iter()
        .map(|(name, kind)| format!("{name} ({kind})"))
        .collect::<Vec<_>>()
        .join(", ");
    let _ = writeln!(prompt, "Columns: {headers}\n");
    prompt.push_str("Sample rows:\n");
    prompt.push_str(&request.preview);
    prompt.push_str("\n\n");
}
