//! Engine Fault Values
//!
//! A [`Fault`] is what the engine stores on a data handle when a call
//! fails. It records the message together with the source file and line
//! where the failure was raised; the bridge reads these back through the
//! status-inspection API.

use thiserror::Error;

/// Result type for engine-internal operations
pub type FaultResult<T> = Result<T, Fault>;

/// Engine-side failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} ({file}:{line})")]
pub struct Fault {
    /// Diagnostic text
    pub message: String,
    /// Source file that raised the fault
    pub file: &'static str,
    /// Source line that raised the fault
    pub line: u32,
}

impl Fault {
    /// Create a fault raised at the given location
    pub fn new(message: impl Into<String>, file: &'static str, line: u32) -> Self {
        Fault {
            message: message.into(),
            file,
            line,
        }
    }
}

/// Build a [`Fault`] stamped with the current file and line.
macro_rules! fault {
    ($($arg:tt)*) => {
        $crate::fault::Fault::new(format!($($arg)*), file!(), line!())
    };
}
