// src/cli/progress.rs — Pipeline progress lines on stderr
//
// All progress output goes to stderr so stdout carries only rendered results.

use crate::infra::errors::DataScribeError;

/// A step worth telling the user about.
#[derive(Debug, Clone)]
pub enum Stage<'a> {
    Loaded { rows: usize, columns: usize },
    Filtered { rows: usize, of: usize },
    Requesting { provider: &'a str, model: &'a str },
    Generated { lines: usize },
    Ready,
    Running,
    Finished { elapsed_ms: u128 },
    Failed(&'a DataScribeError),
}

pub fn format_stage(stage: &Stage<'_>) -> String {
    match stage {
        Stage::Loaded { rows, columns } => {
            format!("[data] {rows} row(s), {columns} column(s)")
        }
        Stage::Filtered { rows, of } => format!("[data] {rows} of {of} row(s) after filters"),
        Stage::Requesting { provider, model } => {
            format!("[model] asking {provider}/{model}...")
        }
        Stage::Generated { lines } => format!("[model] received {lines} line(s) of code"),
        Stage::Ready => "[safety] screen passed".to_string(),
        Stage::Running => "[run] executing...".to_string(),
        Stage::Finished { elapsed_ms } => format!("[done] {elapsed_ms} ms"),
        Stage::Failed(e) => format!("[error] {}", e.user_message()),
    }
}

pub fn report(stage: Stage<'_>) {
    eprintln!("{}", format_stage(&stage));
}

/// Print a block of code between rules, with a heading.
pub fn show_code(heading: &str, code: &str) {
    eprintln!("{}", format_code(heading, code));
}

pub fn format_code(heading: &str, code: &str) -> String {
    let rule = "─".repeat(60);
    format!("── {heading} ──\n{}\n{rule}", code.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_loaded_format() {
        assert_eq!(
            format_stage(&Stage::Loaded {
                rows: 3,
                columns: 2
            }),
            "[data] 3 row(s), 2 column(s)"
        );
    }

    #[test]
    fn test_requesting_format() {
        assert_eq!(
            format_stage(&Stage::Requesting {
                provider: "google",
                model: "gemini-1.5-flash"
            }),
            "[model] asking google/gemini-1.5-flash..."
        );
    }

    #[test]
    fn test_failed_includes_hint() {
        let e = DataScribeError::NoCodeBlock { tag: "rhai".into() };
        let line = format_stage(&Stage::Failed(&e));
        assert!(line.starts_with("[error] No valid code generated"));
        assert!(line.ends_with("Try rephrasing the request."));
    }

    #[test]
    fn test_format_code_block() {
        let text = format_code("sanitized", "st.write(1);\n\n");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "── sanitized ──");
        assert_eq!(lines[1], "st.write(1);");
        assert_eq!(lines.len(), 3);
    }
}
