use crate::error::BackendError;
use crate::session::{PollStatus, SessionStatus};

/// Snapshot of a backend's task, derived on demand and never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// No task submitted since the last output was read.
    NotStarted,
    /// A task is running.
    Running,
    /// A task finished; its output has not been read.
    Completed,
}

impl TaskState {
    /// Classifies a session status and the poll of its pending call.
    ///
    /// | status | poll    | state        |
    /// |--------|---------|--------------|
    /// | Idle   | Timeout | `NotStarted` |
    /// | Busy   | Timeout | `Running`    |
    /// | Busy   | Ready   | `Completed`  |
    ///
    /// Every other combination fails with [`BackendError::InconsistentState`].
    pub fn classify(status: SessionStatus, poll: PollStatus) -> Result<Self, BackendError> {
        match (status, poll) {
            (SessionStatus::Idle, PollStatus::Timeout) => Ok(TaskState::NotStarted),
            (SessionStatus::Busy, PollStatus::Timeout) => Ok(TaskState::Running),
            (SessionStatus::Busy, PollStatus::Ready) => Ok(TaskState::Completed),
            (status, poll) => Err(BackendError::InconsistentState { status, poll }),
        }
    }

    #[inline]
    pub fn not_started(&self) -> bool {
        matches!(self, TaskState::NotStarted)
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        matches!(self, TaskState::Running)
    }

    #[inline]
    pub fn is_completed(&self) -> bool {
        matches!(self, TaskState::Completed)
    }
}
