//! Opaque engine handles.

use std::fmt;

/// Opaque reference to an engine-side data handle.
///
/// A handle carries no type information. Its meaning is established by
/// the class name passed alongside it at every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(u64);

impl Handle {
    /// Wrap a raw handle id
    pub const fn from_raw(id: u64) -> Self {
        Handle(id)
    }

    /// The raw handle id
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
