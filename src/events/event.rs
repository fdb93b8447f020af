//! # Events emitted by backends and progress contexts.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Backend events**: cluster lifecycle and task submission/output
//! - **Progress events**: tracking of a submitted task
//! - **Warnings**: auto-corrected configuration or usage issues
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use batchvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::ProgressAdvanced)
//!     .with_backend("async")
//!     .with_total(100)
//!     .with_current(42);
//!
//! assert_eq!(ev.kind, EventKind::ProgressAdvanced);
//! assert_eq!(ev.backend.as_deref(), Some("async"));
//! assert_eq!(ev.current, Some(42));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::warning::Warning;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of backend events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Backend events ===
    /// A cluster was created and installed.
    ///
    /// Sets:
    /// - `backend`: backend kind
    /// - `total`: number of nodes
    BackendStarted,

    /// The cluster was torn down.
    ///
    /// Sets:
    /// - `backend`: backend kind
    /// - `reason`: set when teardown was forced or timed out
    BackendStopped,

    /// A parallel apply was submitted.
    ///
    /// Sets:
    /// - `backend`: backend kind
    /// - `total`: number of items
    TaskSubmitted,

    /// Output was read successfully.
    ///
    /// Sets:
    /// - `backend`: backend kind
    OutputRead,

    /// Output was read and carried an error.
    ///
    /// Sets:
    /// - `backend`: backend kind
    /// - `reason`: error message
    OutputFailed,

    // === Progress events ===
    /// Progress tracking began.
    ///
    /// Sets:
    /// - `backend`, `total`
    ProgressStarted,

    /// The tick count increased.
    ///
    /// Sets:
    /// - `backend`, `total`, `current`
    ProgressAdvanced,

    /// The tick count reached the total.
    ///
    /// Sets:
    /// - `backend`, `total`, `current`
    ProgressFinished,

    /// Tracking ended early: the task completed without ticking every item.
    ///
    /// Sets:
    /// - `backend`, `total`, `current`
    ProgressAbandoned,

    // === Warnings ===
    /// A value was auto-corrected or a feature is unavailable.
    ///
    /// Sets:
    /// - `warning`: the warning
    /// - `reason`: rendered warning text
    Warning,
}

/// Backend event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Backend kind label (`"sync"`, `"async"`).
    pub backend: Option<Arc<str>>,
    /// Human-readable reason (errors, warnings).
    pub reason: Option<Arc<str>>,
    /// Item or node total.
    pub total: Option<u64>,
    /// Items ticked so far.
    pub current: Option<u64>,
    /// Warning payload.
    pub warning: Option<Warning>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            backend: None,
            reason: None,
            total: None,
            current: None,
            warning: None,
        }
    }

    /// Creates a warning event.
    pub fn warning(warning: Warning) -> Self {
        Event::new(EventKind::Warning)
            .with_reason(warning.to_string())
            .with_warning(warning)
    }

    /// Attaches a backend kind label.
    #[inline]
    pub fn with_backend(mut self, backend: impl Into<Arc<str>>) -> Self {
        self.backend = Some(backend.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a total.
    #[inline]
    pub fn with_total(mut self, total: usize) -> Self {
        self.total = Some(total as u64);
        self
    }

    /// Attaches the current tick count.
    #[inline]
    pub fn with_current(mut self, current: usize) -> Self {
        self.current = Some(current as u64);
        self
    }

    #[inline]
    fn with_warning(mut self, warning: Warning) -> Self {
        self.warning = Some(warning);
        self
    }

    #[inline]
    pub fn is_warning(&self) -> bool {
        matches!(self.kind, EventKind::Warning)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_is_monotonic() {
        let a = Event::new(EventKind::BackendStarted);
        let b = Event::new(EventKind::BackendStopped);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_warning_event_carries_payload() {
        let w = Warning::CoresTooLow {
            requested: 1,
            used: 2,
        };
        let ev = Event::warning(w.clone());
        assert!(ev.is_warning());
        assert_eq!(ev.warning, Some(w.clone()));
        assert_eq!(ev.reason.as_deref(), Some(w.to_string().as_str()));
    }
}
