//! # LogWriter: renders backend events through `tracing`
//!
//! ## Example output (with a fmt subscriber)
//! ```text
//! INFO  [started] backend="async" nodes=2
//! INFO  [submitted] backend="async" items=100
//! INFO  [progress] current=42 total=100
//! WARN  [progress-abandoned] current=49 total=100
//! WARN  [warning] requested 1 cores is too low; using 2
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let backend = e.backend.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("-");
        match e.kind {
            EventKind::BackendStarted => {
                tracing::info!("[started] backend={backend:?} nodes={:?}", e.total);
            }
            EventKind::BackendStopped => {
                tracing::info!("[stopped] backend={backend:?} reason={reason:?}");
            }
            EventKind::TaskSubmitted => {
                tracing::info!("[submitted] backend={backend:?} items={:?}", e.total);
            }
            EventKind::OutputRead => {
                tracing::info!("[output] backend={backend:?}");
            }
            EventKind::OutputFailed => {
                tracing::warn!("[output-failed] backend={backend:?} err={reason:?}");
            }
            EventKind::ProgressStarted => {
                tracing::debug!("[progress-started] total={:?}", e.total);
            }
            EventKind::ProgressAdvanced => {
                tracing::debug!("[progress] current={:?} total={:?}", e.current, e.total);
            }
            EventKind::ProgressFinished => {
                tracing::info!("[progress-finished] total={:?}", e.total);
            }
            EventKind::ProgressAbandoned => {
                tracing::warn!("[progress-abandoned] current={:?} total={:?}", e.current, e.total);
            }
            EventKind::Warning => {
                tracing::warn!("[warning] {reason}");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
