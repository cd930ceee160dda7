//! The bridge entry point and its diagnostic sinks.
//!
//! A [`Bridge`] owns the engine reference every entity is built from and
//! the diagnostic sinks named in its [`BridgeConfig`]. Sinks stay open for
//! the bridge's lifetime and are closed on [`Bridge::shutdown`] or drop.

use std::fmt;
use std::rc::Rc;

use stir_engine::{Engine, Handle};
use tracing::{info, warn};

use crate::config::{BridgeConfig, Channel};
use crate::error::BridgeResult;
use crate::status;

const CONSOLE_DESTINATIONS: [&str; 4] = ["stdout", "stderr", "cout", "cerr"];

// ============================================================================
// DiagnosticSink
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PrinterKind {
    Console,
    File,
}

/// A printer opened on one engine diagnostic channel
pub struct DiagnosticSink {
    engine: Rc<dyn Engine>,
    printer: Handle,
    kind: PrinterKind,
    channel: Channel,
    destination: String,
    open: bool,
}

impl DiagnosticSink {
    /// Create a printer for `destination` and open `channel` on it.
    ///
    /// Console names select a console printer; anything else is a file path.
    pub fn open(engine: &Rc<dyn Engine>, destination: &str, channel: Channel) -> BridgeResult<Self> {
        let (kind, handle) = if CONSOLE_DESTINATIONS.contains(&destination) {
            (PrinterKind::Console, engine.new_text_printer(destination))
        } else {
            (PrinterKind::File, engine.new_text_writer(destination))
        };
        let printer = status::call(&**engine, handle)?.into_raw();
        let mut sink = DiagnosticSink {
            engine: Rc::clone(engine),
            printer,
            kind,
            channel,
            destination: destination.to_string(),
            open: false,
        };
        status::check(&**engine, engine.open_channel(channel.index(), printer))?;
        sink.open = true;
        Ok(sink)
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }
}

impl Drop for DiagnosticSink {
    fn drop(&mut self) {
        if self.open {
            let handle = self.engine.close_channel(self.channel.index(), self.printer);
            if let Err(e) = status::check(&*self.engine, handle) {
                warn!(destination = %self.destination, error = %e, "failed to close diagnostic channel");
            }
        }
        match self.kind {
            PrinterKind::Console => self.engine.delete_text_printer(self.printer),
            PrinterKind::File => self.engine.delete_text_writer(self.printer),
        }
    }
}

impl fmt::Debug for DiagnosticSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticSink")
            .field("destination", &self.destination)
            .field("channel", &self.channel)
            .finish()
    }
}

// ============================================================================
// Bridge
// ============================================================================

/// Entry point: an engine plus the diagnostic sinks opened on it
pub struct Bridge {
    engine: Rc<dyn Engine>,
    sinks: Vec<DiagnosticSink>,
}

impl Bridge {
    /// Open every sink in `config`. Sinks opened before a failure are closed again.
    pub fn new(engine: Rc<dyn Engine>, config: &BridgeConfig) -> BridgeResult<Self> {
        let mut bridge = Self::without_sinks(engine);
        for sink in &config.sinks {
            bridge.open_sink(&sink.destination, sink.channel)?;
        }
        info!(sinks = bridge.sinks.len(), "bridge ready");
        Ok(bridge)
    }

    pub fn without_sinks(engine: Rc<dyn Engine>) -> Self {
        Bridge {
            engine,
            sinks: Vec::new(),
        }
    }

    pub fn engine(&self) -> &Rc<dyn Engine> {
        &self.engine
    }

    pub fn sinks(&self) -> &[DiagnosticSink] {
        &self.sinks
    }

    pub fn open_sink(&mut self, destination: &str, channel: Channel) -> BridgeResult<()> {
        let sink = DiagnosticSink::open(&self.engine, destination, channel)?;
        self.sinks.push(sink);
        Ok(())
    }

    /// Close every sink, most recently opened first
    pub fn shutdown(mut self) {
        self.close_sinks();
    }

    fn close_sinks(&mut self) {
        while let Some(sink) = self.sinks.pop() {
            drop(sink);
        }
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        self.close_sinks();
    }
}

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge").field("sinks", &self.sinks).finish()
    }
}
