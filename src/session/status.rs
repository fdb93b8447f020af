/// Lifecycle status of a worker session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// The actor has not started serving requests yet.
    Starting,
    /// Ready; no background call pending.
    Idle,
    /// A background call is pending (running, or finished but unread).
    Busy,
    /// The actor has exited.
    Finished,
}

/// Result of polling a background call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStatus {
    /// The call has produced an outcome.
    Ready,
    /// No outcome within the poll timeout.
    Timeout,
}
