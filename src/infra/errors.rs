// src/infra/errors.rs — Error types for datascribe

use thiserror::Error;

/// Where an error came from, from the user's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Empty, unreadable or malformed dataset; bad column reference.
    Input,
    /// Transport, auth, quota or timeout while calling the model.
    ModelCall,
    /// The model answered but without a usable code block.
    Extraction,
    /// The generated code hit the denylist.
    SafetyRejection,
    /// The generated code failed while running.
    Execution,
    Configuration,
    Internal,
}

#[derive(Error, Debug)]
pub enum DataScribeError {
    // Input errors
    #[error("The uploaded file contains no data")]
    EmptyDataset,

    #[error("Malformed CSV: {0}")]
    MalformedCsv(String),

    #[error("Failed to read CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Unknown column '{0}'")]
    UnknownColumn(String),

    #[error("Column '{column}' is not {expected}")]
    ColumnType { column: String, expected: String },

    #[error("No dataset loaded. Load a CSV file first.")]
    NoDataset,

    #[error("The analysis request is empty")]
    EmptyQuery,

    // Model-call errors (never retried, the user resubmits)
    #[error("Provider '{provider}' error: {message}")]
    Provider {
        provider: String,
        message: String,
        retriable: bool,
    },

    #[error("Rate limited by '{provider}'")]
    RateLimited { provider: String },

    #[error("Model call to '{provider}' timed out after {seconds}s")]
    ModelTimeout { provider: String, seconds: u64 },

    #[error("No API key found. Set {env_var} (or put it in .env).")]
    NoApiKey { env_var: String },

    // Extraction errors
    #[error("No valid code generated: the model did not return a ```{tag} code block")]
    NoCodeBlock { tag: String },

    #[error("No valid code generated: the model returned an empty code block")]
    EmptyCodeBlock,

    // Safety-screen rejection
    #[error("Refused to run generated code: it contains `{pattern}` ({reason})")]
    Rejected { pattern: String, reason: String },

    // Execution errors
    #[error("Error while running generated code: {0}")]
    Execution(String),

    #[error("Generated code exceeded the {seconds}s execution limit")]
    ExecutionTimeout { seconds: u64 },

    #[error("There is no generated code waiting to run")]
    NothingToExecute,

    // Infra
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DataScribeError {
    pub fn kind(&self) -> ErrorKind {
        use DataScribeError::*;
        match self {
            EmptyDataset
            | MalformedCsv(_)
            | Csv(_)
            | UnknownColumn(_)
            | ColumnType { .. }
            | EmptyQuery
            | NoDataset => ErrorKind::Input,
            Provider { .. } | RateLimited { .. } | ModelTimeout { .. } | NoApiKey { .. } => {
                ErrorKind::ModelCall
            }
            NoCodeBlock { .. } | EmptyCodeBlock => ErrorKind::Extraction,
            Rejected { .. } => ErrorKind::SafetyRejection,
            Execution(_) | ExecutionTimeout { .. } | NothingToExecute => ErrorKind::Execution,
            Config(_) => ErrorKind::Configuration,
            Io(_) | Other(_) => ErrorKind::Internal,
        }
    }

    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            DataScribeError::Provider {
                retriable: true,
                ..
            } | DataScribeError::RateLimited { .. }
                | DataScribeError::ModelTimeout { .. }
        )
    }

    /// What the user can do about it.
    pub fn hint(&self) -> &'static str {
        match self {
            DataScribeError::EmptyQuery => return "Describe the analysis you want.",
            DataScribeError::NoDataset => return "",
            _ => {}
        }
        match self.kind() {
            ErrorKind::Input => "Check the file and load it again.",
            ErrorKind::ModelCall => "Submit the request again.",
            ErrorKind::Extraction => "Try rephrasing the request.",
            ErrorKind::SafetyRejection => "Ask again to get a new script.",
            ErrorKind::Execution => "Adjust the request and generate new code.",
            ErrorKind::Configuration => "Fix the configuration and restart.",
            ErrorKind::Internal => "",
        }
    }

    /// Message shown to the user: the error plus its hint.
    pub fn user_message(&self) -> String {
        let hint = self.hint();
        if hint.is_empty() {
            self.to_string()
        } else {
            format!("{self}. {hint}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_taxonomy() {
        assert_eq!(DataScribeError::EmptyDataset.kind(), ErrorKind::Input);
        assert_eq!(
            DataScribeError::RateLimited {
                provider: "google".into()
            }
            .kind(),
            ErrorKind::ModelCall
        );
        assert_eq!(
            DataScribeError::NoCodeBlock { tag: "rhai".into() }.kind(),
            ErrorKind::Extraction
        );
        assert_eq!(
            DataScribeError::Rejected {
                pattern: "eval".into(),
                reason: "nested dynamic evaluation".into()
            }
            .kind(),
            ErrorKind::SafetyRejection
        );
        assert_eq!(
            DataScribeError::Execution("boom".into()).kind(),
            ErrorKind::Execution
        );
    }

    #[test]
    fn test_retriable() {
        let e = DataScribeError::Provider {
            provider: "google".into(),
            message: "connect".into(),
            retriable: true,
        };
        assert!(e.is_retriable());
        assert!(!DataScribeError::EmptyCodeBlock.is_retriable());
    }

    #[test]
    fn test_no_code_block_message() {
        let e = DataScribeError::NoCodeBlock { tag: "rhai".into() };
        let msg = e.user_message().to_lowercase();
        assert!(msg.contains("no valid code generated"));
        assert!(msg.contains("rephras"));
    }

    #[test]
    fn test_execution_message_is_verbatim() {
        let e = DataScribeError::Execution("Unknown column 'revenue'".into());
        assert!(e.to_string().ends_with("Unknown column 'revenue'"));
    }
}
