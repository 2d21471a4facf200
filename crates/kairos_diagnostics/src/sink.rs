//! Thread-safe diagnostic accumulator with verbosity gating.

use crate::diagnostic::Diagnostic;
use crate::severity::Severity;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// A thread-safe accumulator for diagnostics emitted during retiming.
///
/// Notes and help messages are informational and only retained when the sink
/// is verbose. Warnings and errors are always retained. The error count is
/// tracked atomically for fast `has_errors` checks without locking the
/// diagnostic vector.
pub struct DiagnosticSink {
    diagnostics: Mutex<Vec<Diagnostic>>,
    error_count: AtomicUsize,
    verbose: bool,
}

impl DiagnosticSink {
    /// Creates a new empty, non-verbose diagnostic sink.
    pub fn new() -> Self {
        Self::with_verbosity(false)
    }

    /// Creates a new empty sink with the given verbosity.
    pub fn with_verbosity(verbose: bool) -> Self {
        Self {
            diagnostics: Mutex::new(Vec::new()),
            error_count: AtomicUsize::new(0),
            verbose,
        }
    }

    /// Returns `true` if informational diagnostics are retained.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Emits a diagnostic into the sink.
    ///
    /// Diagnostics below [`Severity::Warning`] are dropped unless the sink is
    /// verbose. Error diagnostics increment the error count.
    pub fn emit(&self, diag: Diagnostic) {
        if diag.severity.is_informational() && !self.verbose {
            return;
        }
        if diag.severity == Severity::Error {
            self.error_count.fetch_add(1, Ordering::Relaxed);
        }
        let mut diagnostics = self.diagnostics.lock().unwrap_or_else(|e| e.into_inner());
        diagnostics.push(diag);
    }

    /// Returns `true` if any error-severity diagnostics have been emitted.
    pub fn has_errors(&self) -> bool {
        self.error_count.load(Ordering::Relaxed) > 0
    }

    /// Returns the number of error-severity diagnostics emitted so far.
    pub fn error_count(&self) -> usize {
        self.error_count.load(Ordering::Relaxed)
    }

    /// Takes all accumulated diagnostics, leaving the sink empty.
    pub fn take_all(&self) -> Vec<Diagnostic> {
        let mut diagnostics = self.diagnostics.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *diagnostics)
    }

    /// Returns a snapshot of all accumulated diagnostics without draining.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        let diagnostics = self.diagnostics.lock().unwrap_or_else(|e| e.into_inner());
        diagnostics.clone()
    }
}

impl Default for DiagnosticSink {
    fn default() -> Self {
        Self::new()
    }
}
