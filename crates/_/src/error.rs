use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of one load operation, classified by the pipeline stage that
/// produced it.
///
/// Every surfaced error flows through the loader's error bindings; with none
/// bound, the error escalates as an `Err` return from the `load`/`maintain`
/// call that uncovered it.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum LoadError {
    /// No candidate path for the name was reachable through any include path.
    #[error("could not resolve `{filename}` against include paths {include_paths:?}")]
    Resolution {
        filename: String,
        include_paths: Vec<String>,
    },
    /// The protocol failed to fetch the resolved path.
    #[error("protocol failed fetching `{filename}`: {message}")]
    Protocol { filename: String, message: String },
    /// The parser rejected the fetched bytes.
    #[error("parser failed processing `{filename}`: {message}")]
    Parser { filename: String, message: String },
}

impl LoadError {
    pub fn resolution(filename: impl ToString, include_paths: &[String]) -> Self {
        Self::Resolution {
            filename: filename.to_string(),
            include_paths: include_paths.to_vec(),
        }
    }

    pub fn protocol(filename: impl ToString, message: impl ToString) -> Self {
        Self::Protocol {
            filename: filename.to_string(),
            message: message.to_string(),
        }
    }

    pub fn parser(filename: impl ToString, message: impl ToString) -> Self {
        Self::Parser {
            filename: filename.to_string(),
            message: message.to_string(),
        }
    }

    /// Name of the resource the error concerns.
    pub fn filename(&self) -> &str {
        match self {
            Self::Resolution { filename, .. }
            | Self::Protocol { filename, .. }
            | Self::Parser { filename, .. } => filename,
        }
    }
}
