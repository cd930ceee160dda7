//! Status Channel
//!
//! Every engine call hands back a data handle that must be inspected and
//! then released. [`Token`] owns such a handle for the duration of one
//! call and releases it when dropped, so the release happens on every
//! exit path, including the error path after the diagnostic has been
//! read out.
//!
//! ```ignore
//! let token = status::call(engine, engine.parameter(obj, "Shape", "x"))?;
//! let x = token.float();
//! // token released here
//! ```

use std::fmt;
use std::mem;

use stir_engine::{Engine, Handle};

use crate::error::{BridgeResult, EngineError};

// ============================================================================
// Token - scoped data handle
// ============================================================================

/// A data handle released when dropped
pub struct Token<'e> {
    engine: &'e dyn Engine,
    handle: Handle,
}

impl<'e> Token<'e> {
    /// Take charge of a data handle returned by `engine`
    pub fn new(engine: &'e dyn Engine, handle: Handle) -> Self {
        Token { engine, handle }
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// Execution status of the call that produced this token
    pub fn status(&self) -> i32 {
        self.engine.execution_status(self.handle)
    }

    pub fn string(&self) -> String {
        self.engine.char_data_from_handle(self.handle)
    }

    pub fn int(&self) -> i32 {
        self.engine.int_data_from_handle(self.handle)
    }

    pub fn float(&self) -> f32 {
        self.engine.float_data_from_handle(self.handle)
    }

    pub fn double(&self) -> f64 {
        self.engine.double_data_from_handle(self.handle)
    }

    /// Keep the data handle alive past this token.
    ///
    /// The caller becomes responsible for releasing it.
    pub fn into_raw(self) -> Handle {
        let handle = self.handle;
        mem::forget(self);
        handle
    }

    fn error(&self) -> EngineError {
        EngineError::status(
            self.engine.execution_error(self.handle),
            self.engine.execution_error_line(self.handle),
            self.engine.execution_error_file(self.handle),
        )
    }
}

impl Drop for Token<'_> {
    fn drop(&mut self) {
        self.engine.delete_data_handle(self.handle);
    }
}

impl fmt::Debug for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({})", self.handle)
    }
}

// ============================================================================
// Checks
// ============================================================================

/// Pass a successful token through, or turn a failed one into an error.
///
/// A failed token is released after its diagnostic has been extracted.
pub fn check_status(token: Token<'_>) -> BridgeResult<Token<'_>> {
    if token.status() == 0 {
        Ok(token)
    } else {
        Err(token.error())
    }
}

/// Wrap and check the data handle returned by an engine call
pub fn call(engine: &dyn Engine, handle: Handle) -> BridgeResult<Token<'_>> {
    check_status(Token::new(engine, handle))
}

/// Check an engine call that carries no value
pub fn check(engine: &dyn Engine, handle: Handle) -> BridgeResult<()> {
    call(engine, handle).map(drop)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stir_engine::MemoryEngine;

    #[test]
    fn test_token_released_on_drop() {
        let engine = MemoryEngine::new();
        {
            let token = Token::new(&engine, engine.int_data_handle(3));
            assert_eq!(token.int(), 3);
            assert_eq!(engine.live_handles(), 1);
        }
        assert_eq!(engine.live_handles(), 0);
    }

    #[test]
    fn test_failed_status_released_after_extraction() {
        let engine = MemoryEngine::new();
        let err = call(&engine, engine.new_object("Teapot")).unwrap_err();
        match err {
            EngineError::Status { message, line, file } => {
                assert_eq!(message, "unknown object class 'Teapot'");
                assert!(line > 0);
                assert!(file.ends_with(".rs"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(engine.live_handles(), 0);
    }

    #[test]
    fn test_into_raw_keeps_handle() {
        let engine = MemoryEngine::new();
        let handle = call(&engine, engine.new_object("QuadraticPrior"))
            .unwrap()
            .into_raw();
        assert_eq!(engine.live_handles(), 1);
        check(&engine, engine.delete_object(handle, "Prior")).unwrap();
        assert_eq!(engine.live_handles(), 0);
    }
}
