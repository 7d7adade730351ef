//! Error types for Dossier

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Input file missing, unreadable, or empty. The only fatal category:
    /// it aborts before any case record exists.
    #[error("input error: {path} - {message}")]
    Input { path: String, message: String },

    #[error("oracle error: {provider} - {message}")]
    Oracle { provider: String, message: String },

    #[error("tool error: {name} - {message}")]
    Tool { name: String, message: String },

    #[error("extraction error: {0}")]
    Extraction(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn input(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Input {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn oracle(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Oracle {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn tool(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Tool {
            name: name.into(),
            message: message.into(),
        }
    }

    /// True when the run must stop before the workflow loop starts.
    /// Everything else is absorbed into the case record.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Input { .. })
    }
}
