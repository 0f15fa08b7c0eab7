//! Output destinations for rendered packet blocks

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use log::{debug, error};

use crate::error::SnifferError;

/// Destination of rendered blocks
pub trait Sink {
    /// Write one complete block
    fn emit(&mut self, text: &str) -> Result<(), SnifferError>;

    fn flush(&mut self) -> Result<(), SnifferError>;
}

/// A secondary destination: failures are reported, never propagated
struct Secondary {
    name: String,
    writer: Box<dyn Write + Send>,
    failures: u64,
}

impl Secondary {
    fn report(&mut self, op: &str, e: io::Error) {
        self.failures += 1;
        if self.failures == 1 {
            error!("{} to {} failed: {} (capture continues)", op, self.name, e);
        } else {
            debug!("{} to {} failed again ({}): {}", op, self.name, self.failures, e);
        }
    }
}

/// Primary writer (console) plus an optional append-only secondary (log file)
///
/// A failure of the primary writer is an error; a failure of the secondary
/// writer is logged and ignored.
pub struct Output {
    primary: Box<dyn Write + Send>,
    secondary: Option<Secondary>,
}

impl Output {
    /// Write to standard output only
    pub fn console() -> Output {
        Output::new(Box::new(io::stdout()))
    }

    pub fn new(primary: Box<dyn Write + Send>) -> Output {
        Output {
            primary,
            secondary: None,
        }
    }

    /// Also write to `writer`, named `name` in diagnostics
    pub fn with_secondary(mut self, name: &str, writer: Box<dyn Write + Send>) -> Output {
        self.secondary = Some(Secondary {
            name: name.to_string(),
            writer,
            failures: 0,
        });
        self
    }

    /// Also append to the file at `path`, creating it if needed
    pub fn with_log_file(self, path: &Path) -> Result<Output, SnifferError> {
        let file = open_append(path)?;
        let name = path.display().to_string();
        Ok(self.with_secondary(&name, Box::new(BufWriter::new(file))))
    }

    /// Number of failed writes to the secondary destination
    pub fn secondary_failures(&self) -> u64 {
        self.secondary.as_ref().map_or(0, |s| s.failures)
    }

    /// Wrap into a sink that can be shared between capture threads
    pub fn shared(self) -> SharedOutput {
        SharedOutput(Arc::new(Mutex::new(self)))
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

impl Sink for Output {
    fn emit(&mut self, text: &str) -> Result<(), SnifferError> {
        self.primary.write_all(text.as_bytes())?;
        if let Some(sec) = self.secondary.as_mut() {
            if let Err(e) = sec.writer.write_all(text.as_bytes()) {
                sec.report("write", e);
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SnifferError> {
        if let Some(sec) = self.secondary.as_mut() {
            if let Err(e) = sec.writer.flush() {
                sec.report("flush", e);
            }
        }
        self.primary.flush()?;
        Ok(())
    }
}

/// An [`Output`] shared between several capture loops
///
/// Each block is written while holding the lock, so blocks from different
/// interfaces never interleave.
#[derive(Clone)]
pub struct SharedOutput(Arc<Mutex<Output>>);

impl SharedOutput {
    fn with<F, T>(&self, f: F) -> Result<T, SnifferError>
    where
        F: FnOnce(&mut Output) -> Result<T, SnifferError>,
    {
        // poisoned only if another capture thread panicked
        let mut guard = self.0.lock().unwrap_or_else(|p| p.into_inner());
        f(&mut guard)
    }
}

impl Sink for SharedOutput {
    fn emit(&mut self, text: &str) -> Result<(), SnifferError> {
        self.with(|o| o.emit(text))
    }

    fn flush(&mut self) -> Result<(), SnifferError> {
        self.with(|o| o.flush())
    }
}
