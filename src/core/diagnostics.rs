//! Diagnostic sinks for internal self-correction.
//!
//! The tick never fails; when it rescues a corrupted value or clamps an illegal
//! state it reports a [`Diagnostic`] to whichever sink the driver was given.

use crate::core::body::BodyId;
use std::fmt;
use std::sync::{Arc, Mutex};

/// What kind of correction was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A non-finite position, velocity, force or charge was reset.
    NumericalRescue,
    /// An illegal physical value (mass, isolated fractional charge) was clamped.
    StateClamp,
    /// Reference data was missing and a fallback path was taken.
    MissingData,
    /// Routine bookkeeping (ghost bonds pruned, valence enforced, ...).
    Housekeeping,
}

/// One correction record.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub body: Option<BodyId>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, body: Option<BodyId>, message: impl Into<String>) -> Self {
        Self {
            kind,
            body,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.body {
            Some(id) => write!(f, "[{:?}] {}: {}", self.kind, id, self.message),
            None => write!(f, "[{:?}] {}", self.kind, self.message),
        }
    }
}

/// Receiver of diagnostics, injected into the tick driver.
pub trait DiagnosticSink: Send {
    fn report(&mut self, diagnostic: Diagnostic);
}

/// Discards everything. The default sink.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl DiagnosticSink for NoopSink {
    fn report(&mut self, _diagnostic: Diagnostic) {}
}

/// Forwards to the `log` facade: rescues and clamps at `warn`, the rest at `debug`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn report(&mut self, diagnostic: Diagnostic) {
        match diagnostic.kind {
            DiagnosticKind::NumericalRescue | DiagnosticKind::StateClamp => {
                log::warn!("{diagnostic}")
            }
            DiagnosticKind::MissingData | DiagnosticKind::Housekeeping => {
                log::debug!("{diagnostic}")
            }
        }
    }
}

/// Keeps every diagnostic in a shared buffer; clones observe the same buffer.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    records: Arc<Mutex<Vec<Diagnostic>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn records(&self) -> Vec<Diagnostic> {
        match self.records.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Number of records of the given kind.
    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.records().iter().filter(|d| d.kind == kind).count()
    }
}

impl DiagnosticSink for RecordingSink {
    fn report(&mut self, diagnostic: Diagnostic) {
        match self.records.lock() {
            Ok(mut guard) => guard.push(diagnostic),
            Err(poisoned) => poisoned.into_inner().push(diagnostic),
        }
    }
}
