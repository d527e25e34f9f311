// src/pipeline/sanitize.rs — Rewrite rules and the denylist screen
//
// Generated code goes through three ordered text rewrites and then a
// substring screen. Only code that passes the screen becomes a
// `SanitizedCode`, the sole input the executor accepts.

use std::fmt;

use regex::{NoExpand, Regex};

use crate::infra::config::{BindingsConfig, Config, SafetyConfig};
use crate::infra::errors::DataScribeError;

/// File-reading calls whose result must never replace the bound dataset.
const FILE_READERS: &[&str] = &[
    "read_csv",
    "read_excel",
    "read_table",
    "read_file",
    "load_csv",
    "open",
];

/// Code that has been rewritten and has passed the safety screen.
///
/// There is no public constructor: the only way to obtain one is
/// [`Sanitizer::sanitize`].
#[derive(Debug, PartialEq, Eq)]
pub struct SanitizedCode {
    code: String,
}

impl SanitizedCode {
    pub fn as_str(&self) -> &str {
        &self.code
    }
}

impl fmt::Display for SanitizedCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code)
    }
}

// ---------------------------------------------------------------------------
// Rewrite rules
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct RewriteRule {
    name: &'static str,
    pattern: Regex,
    replacement: String,
}

impl RewriteRule {
    fn new(name: &'static str, pattern: &str, replacement: String) -> Result<Self, DataScribeError> {
        let pattern = Regex::new(pattern)
            .map_err(|e| DataScribeError::Config(format!("rewrite rule '{name}': {e}")))?;
        Ok(Self {
            name,
            pattern,
            replacement,
        })
    }

    fn apply(&self, code: &str) -> String {
        self.pattern
            .replace_all(code, NoExpand(&self.replacement))
            .into_owned()
    }
}

/// The three rewrites, in order:
///   1. `plt.show(...)` becomes `st.figure()`
///   2. lines assigning the dataset from a file read are dropped
///   3. lines assigning the upload widget are dropped
fn rewrite_rules(names: &BindingsConfig) -> Result<Vec<RewriteRule>, DataScribeError> {
    let plot = regex::escape(&names.plot);
    let dataset = regex::escape(&names.dataset);
    let upload = regex::escape(&names.upload_widget);
    let readers = FILE_READERS.join("|");

    Ok(vec![
        RewriteRule::new(
            "embed-figure",
            &format!(r"\b{plot}\s*\.\s*show\s*\([^)]*\)"),
            format!("{}.figure()", names.display),
        )?,
        RewriteRule::new(
            "drop-dataset-reload",
            &format!(
                r"(?m)^[ \t]*(?:let[ \t]+)?{dataset}[ \t]*=[ \t]*[\w.:]*\b(?:{readers})\b[^\n]*(?:\n|$)"
            ),
            String::new(),
        )?,
        RewriteRule::new(
            "drop-upload-widget",
            &format!(r"(?m)^[ \t]*(?:let[ \t]+)?{upload}[ \t]*=(?:[^=\n][^\n]*)?(?:\n|$)"),
            String::new(),
        )?,
    ])
}

// ---------------------------------------------------------------------------
// Safety screen
// ---------------------------------------------------------------------------

/// Refuses code containing any denylisted substring.
///
/// A plain textual match: it catches the obvious cases and is trivially
/// bypassed by obfuscation. It also matches inside longer words, so the
/// default `eval` entry refuses `evaluate` too.
#[derive(Debug, Clone)]
pub struct SafetyScreen {
    denylist: Vec<(String, String)>,
}

impl SafetyScreen {
    pub fn from_config(safety: &SafetyConfig) -> Self {
        Self {
            denylist: safety
                .denylist
                .iter()
                .map(|(p, r)| (p.clone(), r.clone()))
                .collect(),
        }
    }

    pub fn check(&self, code: &str) -> Result<(), DataScribeError> {
        match self
            .denylist
            .iter()
            .find(|(pattern, _)| code.contains(pattern.as_str()))
        {
            Some((pattern, reason)) => Err(DataScribeError::Rejected {
                pattern: pattern.clone(),
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Sanitizer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Sanitizer {
    rules: Vec<RewriteRule>,
    screen: SafetyScreen,
}

impl Sanitizer {
    pub fn new(names: &BindingsConfig, safety: &SafetyConfig) -> Result<Self, DataScribeError> {
        Ok(Self {
            rules: rewrite_rules(names)?,
            screen: SafetyScreen::from_config(safety),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, DataScribeError> {
        Self::new(&config.bindings, &config.safety)
    }

    /// Apply the rewrite rules in order. Pure text transformation.
    pub fn rewrite(&self, code: &str) -> String {
        self.rules.iter().fold(code.to_string(), |acc, rule| {
            let next = rule.apply(&acc);
            if next != acc {
                tracing::debug!(rule = rule.name, "Rewrite rule applied");
            }
            next
        })
    }

    /// Rewrite, then screen. The screen sees the rewritten text.
    pub fn sanitize(&self, code: &str) -> Result<SanitizedCode, DataScribeError> {
        let code = self.rewrite(code);
        if let Err(e) = self.screen.check(&code) {
            tracing::warn!("Generated code refused: {}", e);
            return Err(e);
        }
        Ok(SanitizedCode { code })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sanitizer() -> Sanitizer {
        Sanitizer::from_config(&Config::default()).unwrap()
    }

    #[test]
    fn test_show_becomes_figure_everywhere() {
        let code = "plt.plot(xs, ys);\nplt.show();\nplt.bar(a, b);\nplt.show(block);\n";
        let out = sanitizer().rewrite(code);
        assert_eq!(
            out,
            "plt.plot(xs, ys);\nst.figure();\nplt.bar(a, b);\nst.figure();\n"
        );
        assert!(!out.contains("show"));
    }

    #[test]
    fn test_show_on_other_identifier_untouched() {
        let out = sanitizer().rewrite("myplt.show();\n");
        assert_eq!(out, "myplt.show();\n");
    }

    #[test]
    fn test_dataset_reload_lines_removed() {
        let code = "\
let data = read_csv(\"sales.csv\");
data = pd.read_csv(uploaded_file)
    data = open('x.csv')
let data = load_csv(path, \"utf-8\");
let total = data.sum(\"sales\");
";
        let out = sanitizer().rewrite(code);
        assert_eq!(out, "let total = data.sum(\"sales\");\n");
    }

    #[test]
    fn test_dataset_reload_removed_on_last_line_without_newline() {
        let out = sanitizer().rewrite("st.write(1);\nlet data = read_csv(\"a.csv\")");
        assert_eq!(out, "st.write(1);\n");
    }

    #[test]
    fn test_dataset_derivations_kept() {
        let code = "let top = data.head(3);\nlet data2 = read_csv(\"x\");\n";
        assert_eq!(sanitizer().rewrite(code), code);
    }

    #[test]
    fn test_upload_widget_lines_removed() {
        let code = "uploaded_file = st.file_uploader(\"csv\")\nlet uploaded_file = 3;\nif uploaded_file == 1 { }\n";
        let out = sanitizer().rewrite(code);
        assert_eq!(out, "if uploaded_file == 1 { }\n");
    }

    #[test]
    fn test_rules_follow_binding_names() {
        let mut config = Config::default();
        config.bindings.dataset = "df".into();
        config.bindings.display = "ui".into();
        config.bindings.plot = "chart".into();
        let s = Sanitizer::from_config(&config).unwrap();
        let out = s.rewrite("let df = read_csv(\"a\");\nchart.show();\nplt.show();\n");
        assert_eq!(out, "ui.figure();\nplt.show();\n");
    }

    #[test]
    fn test_screen_rejects_denylisted() {
        let err = sanitizer()
            .sanitize("let r = subprocess.run([\"ls\"]);")
            .unwrap_err();
        match err {
            DataScribeError::Rejected { pattern, reason } => {
                assert_eq!(pattern, "subprocess");
                assert_eq!(reason, "subprocess spawning");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_screen_sees_rewritten_code() {
        // the offending line is a dataset reload, so it is gone before screening
        let code = "let data = read_csv(eval(\"x\"));\nst.write(data.len());\n";
        let out = sanitizer().sanitize(code).unwrap();
        assert_eq!(out.as_str(), "st.write(data.len());\n");
    }

    #[test]
    fn test_screen_matches_inside_words() {
        let err = sanitizer().sanitize("let evaluated = 1;").unwrap_err();
        assert!(matches!(err, DataScribeError::Rejected { .. }));
    }

    #[test]
    fn test_custom_denylist() {
        let mut config = Config::default();
        config
            .safety
            .denylist
            .insert("http_get".into(), "network access".into());
        let s = Sanitizer::from_config(&config).unwrap();
        assert!(s.sanitize("http_get(\"x\")").is_err());
        assert!(s.sanitize("st.write(1);").is_ok());
    }

    #[test]
    fn test_clean_code_passes_unchanged() {
        let code = "let total = data.sum(\"sales\");\nst.metric(\"Total\", total);";
        assert_eq!(sanitizer().sanitize(code).unwrap().as_str(), code);
    }
}
