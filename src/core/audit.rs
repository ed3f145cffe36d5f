use crate::core::body::BodyId;
use std::collections::VecDeque;
use std::fmt;

/// Default number of retained audit entries.
pub const AUDIT_CAPACITY: usize = 200;

/// Kinds of audited body lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditKind {
    /// A body entered the world (or was transmuted into a new species).
    Create,
    /// A body left the world (or its previous species was transmuted away).
    Destroy,
}

impl fmt::Display for AuditKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditKind::Create => f.write_str("create"),
            AuditKind::Destroy => f.write_str("destroy"),
        }
    }
}

/// One audit record.
///
/// - `seq`: monotonically increasing sequence number, never reused
/// - `body`: id of the body concerned
/// - `label`: display label at the time of the event (e.g. `"Og-294"`, `"e⁻"`)
/// - `reason`: free-text cause (e.g. `"Annihilation"`, `"Alpha decay"`)
/// - `time`: simulation time in seconds
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEvent {
    pub seq: u64,
    pub kind: AuditKind,
    pub body: BodyId,
    pub label: String,
    pub reason: String,
    pub time: f64,
}

/// Bounded, append-only log of creations and destructions.
///
/// Oldest entries are dropped once `capacity` is reached. Callers poll it with a
/// cursor: take [`AuditLog::cursor`], advance the simulation, then read
/// [`AuditLog::since`].
#[derive(Debug, Clone)]
pub struct AuditLog {
    entries: VecDeque<AuditEvent>,
    capacity: usize,
    next_seq: u64,
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::with_capacity(AUDIT_CAPACITY)
    }
}

impl AuditLog {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            next_seq: 0,
        }
    }

    /// Append an event, evicting the oldest entry when full. Returns its sequence number.
    pub fn record(
        &mut self,
        kind: AuditKind,
        body: BodyId,
        label: impl Into<String>,
        reason: impl Into<String>,
        time: f64,
    ) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(AuditEvent {
            seq,
            kind,
            body,
            label: label.into(),
            reason: reason.into(),
            time,
        });
        seq
    }

    /// Sequence number the next recorded event will receive.
    #[inline]
    pub fn cursor(&self) -> u64 {
        self.next_seq
    }

    /// Retained events with `seq >= cursor`, oldest first.
    pub fn since(&self, cursor: u64) -> impl Iterator<Item = &AuditEvent> {
        self.entries.iter().filter(move |e| e.seq >= cursor)
    }

    /// All retained events, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &AuditEvent> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Count retained events of `kind` whose reason equals `reason`.
    pub fn count(&self, kind: AuditKind, reason: &str) -> usize {
        self.entries
            .iter()
            .filter(|e| e.kind == kind && e.reason == reason)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oldest_entries_are_dropped() {
        let mut log = AuditLog::with_capacity(3);
        for i in 0..5 {
            log.record(AuditKind::Create, BodyId(i), "H", "Injected", 0.0);
        }
        assert_eq!(log.len(), 3);
        let seqs: Vec<u64> = log.iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![2, 3, 4]);
        assert_eq!(log.cursor(), 5);
    }

    #[test]
    fn cursor_filters_later_events() {
        let mut log = AuditLog::default();
        log.record(AuditKind::Create, BodyId(1), "e⁻", "Injected", 0.0);
        let cursor = log.cursor();
        log.record(AuditKind::Destroy, BodyId(1), "e⁻", "Annihilation", 0.1);
        let later: Vec<_> = log.since(cursor).collect();
        assert_eq!(later.len(), 1);
        assert_eq!(later[0].kind, AuditKind::Destroy);
        assert_eq!(log.count(AuditKind::Destroy, "Annihilation"), 1);
    }

    #[test]
    fn default_capacity_is_bounded() {
        let mut log = AuditLog::default();
        for i in 0..(AUDIT_CAPACITY as u64 + 50) {
            log.record(AuditKind::Destroy, BodyId(i), "n", "Escaped", 0.0);
        }
        assert_eq!(log.len(), AUDIT_CAPACITY);
    }
}
