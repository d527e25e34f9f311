// src/pipeline/extract.rs — Pull the code block out of a model response

use regex::Regex;

use crate::infra::errors::DataScribeError;

/// Finds the first fenced block tagged with an accepted language.
#[derive(Debug, Clone)]
pub struct CodeExtractor {
    fence: Regex,
    accepted_tags: Vec<String>,
}

impl CodeExtractor {
    pub fn new(accepted_tags: &[String]) -> Result<Self, DataScribeError> {
        // Both fences start a line: ```tag<rest of line>\n<body>\n```
        let fence = Regex::new(r"(?ms)^[ \t]*```([\w+#.-]*)[^\n]*\n(.*?)\n?^[ \t]*```[ \t\r]*$")
            .map_err(|e| DataScribeError::Config(format!("code fence pattern: {e}")))?;
        Ok(Self {
            fence,
            accepted_tags: accepted_tags
                .iter()
                .map(|t| t.trim().to_ascii_lowercase())
                .collect(),
        })
    }

    fn accepts(&self, tag: &str) -> bool {
        let tag = tag.to_ascii_lowercase();
        self.accepted_tags.iter().any(|t| *t == tag)
    }

    /// The body of the first accepted block, verbatim.
    pub fn extract<'a>(&self, response: &'a str) -> Result<&'a str, DataScribeError> {
        let body = self
            .fence
            .captures_iter(response)
            .filter(|c| self.accepts(c.get(1).map_or("", |m| m.as_str())))
            .find_map(|c| c.get(2))
            .map(|m| m.as_str())
            .ok_or_else(|| DataScribeError::NoCodeBlock {
                tag: self.accepted_tags.first().cloned().unwrap_or_default(),
            })?;

        if body.trim().is_empty() {
            return Err(DataScribeError::EmptyCodeBlock);
        }
        Ok(body)
    }
}
