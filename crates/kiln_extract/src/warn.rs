//! Warning accumulator for extraction.
//!
//! Extraction never fails the build over a specifier it cannot follow; it
//! records a [`Warning`] and moves on. The sink is shared by reference with
//! the scanner and resolver so warnings surface once, after the build, no
//! matter how deep in the pipeline they were noticed.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// A non-fatal problem noticed while extracting dependencies from a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    /// The file being scanned when the problem was noticed.
    pub file: PathBuf,
    /// Human-readable description.
    pub message: String,
}

impl Warning {
    /// Creates a warning attributed to `file`.
    pub fn new(file: &Path, message: impl Into<String>) -> Self {
        Self {
            file: file.to_path_buf(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.file.display(), self.message)
    }
}

/// A thread-safe accumulator for extraction warnings.
///
/// Shared by `&` reference throughout one build run; callers drain it with
/// [`take_all`](Self::take_all) once processing is done.
#[derive(Debug, Default)]
pub struct WarningSink {
    warnings: Mutex<Vec<Warning>>,
}

impl WarningSink {
    /// Creates a new empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a warning.
    pub fn emit(&self, warning: Warning) {
        let mut warnings = self.warnings.lock().unwrap();
        warnings.push(warning);
    }

    /// Number of warnings recorded so far.
    pub fn len(&self) -> usize {
        self.warnings.lock().unwrap().len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.warnings.lock().unwrap().is_empty()
    }

    /// Takes all accumulated warnings, leaving the sink empty.
    pub fn take_all(&self) -> Vec<Warning> {
        let mut warnings = self.warnings.lock().unwrap();
        std::mem::take(&mut *warnings)
    }

    /// Returns a copy of the accumulated warnings without draining.
    pub fn snapshot(&self) -> Vec<Warning> {
        self.warnings.lock().unwrap().clone()
    }
}
