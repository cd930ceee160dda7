//! Bridge Error Types
//!
//! Every engine failure reaches the caller as a single [`EngineError`].
//! The bridge never interprets the engine's diagnostic text; it only
//! composes the message, line and file into one string.
//!
//! Configuration problems are reported separately as [`ConfigError`].

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, EngineError>;

/// Failure of an engine call or of a bridge-level precondition
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The engine reported a non-zero execution status
    #[error("'{message}' exception thrown at line {line} of {file}")]
    Status {
        /// Diagnostic text supplied by the engine
        message: String,
        /// Source line where the engine raised the error
        line: u32,
        /// Source file where the engine raised the error
        file: String,
    },

    /// A call was made on a facade that cannot serve it
    #[error("{0}")]
    Precondition(String),
}

impl EngineError {
    /// Create an error from engine status details
    pub fn status(message: impl Into<String>, line: u32, file: impl Into<String>) -> Self {
        EngineError::Status {
            message: message.into(),
            line,
            file: file.into(),
        }
    }

    /// Create a precondition violation
    pub fn precondition(message: impl Into<String>) -> Self {
        EngineError::Precondition(message.into())
    }

    /// The diagnostic text without location
    pub fn message(&self) -> &str {
        match self {
            EngineError::Status { message, .. } => message,
            EngineError::Precondition(message) => message,
        }
    }
}

/// Failure to load a [`BridgeConfig`](crate::BridgeConfig)
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid bridge configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

impl ConfigError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ConfigError::Io {
            path: path.into(),
            source,
        }
    }
}
