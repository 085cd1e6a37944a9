use std::fmt;

use thiserror::Error;

/// Which half of a question/solution pair a structural error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentKind {
    Question,
    Solution,
}

impl fmt::Display for FragmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FragmentKind::Question => write!(f, "question"),
            FragmentKind::Solution => write!(f, "solution"),
        }
    }
}

/// Structural parse failures. Any of these aborts the contest-year being built.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("no answer marker found in solution {index}")]
    MissingAnswer { index: usize },

    #[error("{kind} {index} is empty after stripping")]
    EmptyBody { kind: FragmentKind, index: usize },

    #[error("expected {what} is absent from the document")]
    MissingList { what: &'static str },

    #[error("no solution item for question {index}")]
    MissingSolution { index: usize },
}

impl ExtractError {
    /// Zero-based item index the error points at, if any.
    pub fn index(&self) -> Option<usize> {
        match self {
            ExtractError::MissingAnswer { index }
            | ExtractError::EmptyBody { index, .. }
            | ExtractError::MissingSolution { index } => Some(*index),
            ExtractError::MissingList { .. } => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("no page titled {0:?} found in report")]
    NoResultsPage(String),

    #[error("could not determine contest year for report {0}")]
    UnknownYear(String),

    #[error("failed to write statistics csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to decode markup blob: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("markup blob is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("invalid dataset json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
