//! Diagnostic printers and the channels they are opened on.

use std::cell::RefCell;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use indexmap::IndexMap;

use crate::engine::{ALL_CHANNELS, ERROR_CHANNEL, INFO_CHANNEL, WARNING_CHANNEL};
use crate::fault::FaultResult;

#[derive(Debug)]
enum Target {
    Stdout,
    Stderr,
    File { path: PathBuf, file: RefCell<File> },
}

/// A destination for diagnostic text
#[derive(Debug)]
pub(crate) struct Printer {
    target: Target,
}

impl Printer {
    pub(crate) fn console(destination: &str) -> FaultResult<Self> {
        let target = match destination {
            "stdout" | "cout" => Target::Stdout,
            "stderr" | "cerr" => Target::Stderr,
            other => {
                return Err(fault!(
                    "unknown printer destination '{}'; use a text writer for files",
                    other
                ))
            }
        };
        Ok(Printer { target })
    }

    pub(crate) fn file(path: &Path) -> FaultResult<Self> {
        let file = File::create(path)
            .map_err(|e| fault!("cannot open {} for writing: {}", path.display(), e))?;
        Ok(Printer {
            target: Target::File {
                path: path.to_path_buf(),
                file: RefCell::new(file),
            },
        })
    }

    pub(crate) fn write_line(&self, line: &str) -> io::Result<()> {
        match &self.target {
            Target::Stdout => writeln!(io::stdout().lock(), "{}", line),
            Target::Stderr => writeln!(io::stderr().lock(), "{}", line),
            Target::File { file, .. } => {
                let mut file = file.borrow_mut();
                writeln!(file, "{}", line)?;
                file.flush()
            }
        }
    }

    fn describe(&self) -> String {
        match &self.target {
            Target::Stdout => "stdout".to_string(),
            Target::Stderr => "stderr".to_string(),
            Target::File { path, .. } => path.display().to_string(),
        }
    }
}

/// Open `(channel, printer)` pairs, in opening order
#[derive(Debug, Default)]
pub(crate) struct Channels {
    open: RefCell<IndexMap<(i32, u64), Rc<Printer>>>,
}

impl Channels {
    pub(crate) fn open(&self, channel: i32, printer_id: u64, printer: Rc<Printer>) -> FaultResult<()> {
        check_channel(channel)?;
        self.open.borrow_mut().insert((channel, printer_id), printer);
        Ok(())
    }

    pub(crate) fn close(&self, channel: i32, printer_id: u64) -> FaultResult<()> {
        check_channel(channel)?;
        match self.open.borrow_mut().shift_remove(&(channel, printer_id)) {
            Some(_) => Ok(()),
            None => Err(fault!("channel {} is not open on printer #{}", channel, printer_id)),
        }
    }

    /// Drop every channel still open on a printer that is going away
    pub(crate) fn forget(&self, printer_id: u64) {
        self.open.borrow_mut().retain(|&(_, id), _| id != printer_id);
    }

    pub(crate) fn emit(&self, channel: i32, message: &str) {
        let line = format!("{}{}", prefix(channel), message);
        for (&(open_channel, _), printer) in self.open.borrow().iter() {
            if open_channel != ALL_CHANNELS && open_channel != channel {
                continue;
            }
            if let Err(e) = printer.write_line(&line) {
                tracing::warn!(printer = %printer.describe(), error = %e, "diagnostic write failed");
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.open.borrow().len()
    }
}

fn check_channel(channel: i32) -> FaultResult<()> {
    if (ALL_CHANNELS..=ERROR_CHANNEL).contains(&channel) {
        Ok(())
    } else {
        Err(fault!("unknown diagnostic channel {}", channel))
    }
}

fn prefix(channel: i32) -> &'static str {
    match channel {
        INFO_CHANNEL => "INFO: ",
        WARNING_CHANNEL => "WARNING: ",
        ERROR_CHANNEL => "ERROR: ",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_console_destinations() {
        assert!(Printer::console("cout").is_ok());
        assert!(Printer::console("cerr").is_ok());
        assert!(Printer::console("printer.log").is_err());
    }

    #[test]
    fn test_emit_routes_by_channel() {
        let dir = tempfile::tempdir().unwrap();
        let info_path = dir.path().join("info.log");
        let all_path = dir.path().join("all.log");
        let channels = Channels::default();
        channels
            .open(INFO_CHANNEL, 1, Rc::new(Printer::file(&info_path).unwrap()))
            .unwrap();
        channels
            .open(ALL_CHANNELS, 2, Rc::new(Printer::file(&all_path).unwrap()))
            .unwrap();

        channels.emit(INFO_CHANNEL, "starting");
        channels.emit(ERROR_CHANNEL, "failed");

        assert_eq!(std::fs::read_to_string(&info_path).unwrap(), "INFO: starting\n");
        assert_eq!(
            std::fs::read_to_string(&all_path).unwrap(),
            "INFO: starting\nERROR: failed\n"
        );
    }

    #[test]
    fn test_close_requires_open_channel() {
        let channels = Channels::default();
        assert!(channels.close(INFO_CHANNEL, 1).is_err());
        assert!(channels.open(7, 1, Rc::new(Printer::console("stdout").unwrap())).is_err());
        channels
            .open(WARNING_CHANNEL, 1, Rc::new(Printer::console("stdout").unwrap()))
            .unwrap();
        channels.forget(1);
        assert_eq!(channels.len(), 0);
    }
}
