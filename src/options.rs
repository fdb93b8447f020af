//! # Backend and progress options.
//!
//! Provides [`Options`], the configuration value passed to backends, contexts
//! and the [`api`](crate::api) functions. There is no global state: callers
//! keep their own `Options` and hand it to each call.
//!
//! ## Sentinel values
//! - `progress_timeout = 0s` → treated as 1ms (a zero poll interval would spin)
//! - `progress_log_dir = None` → the system temporary directory
//! - `bus_capacity = 0` → clamped to 1

use std::path::PathBuf;
use std::time::Duration;

use crate::bar::{BarConfig, BarConfigs, BarKind};

/// Options recognized by backends and progress contexts.
///
/// ## Field semantics
/// - `progress_track`: wrap API calls in a progress context when the backend supports it
/// - `progress_timeout`: interval between two reads of the progress log
/// - `progress_wait`: how long the tick count may stay flat before tracking
///   gives up on a completed task
/// - `progress_log_dir`: directory for progress logs
/// - `progress_bar_type`: bar rendered by progress contexts
/// - `progress_bar_config`: default configuration per bar kind
/// - `stop_forceful`: allow `stop` to abandon a pending task
/// - `stop_timeout`: upper bound on backend teardown
/// - `bus_capacity`: event bus ring buffer size
#[derive(Clone, Debug)]
pub struct Options {
    /// Enables progress tracking in the API functions.
    pub progress_track: bool,

    /// Poll interval of the progress loop.
    pub progress_timeout: Duration,

    /// Flat-progress window after which a completed task ends tracking.
    ///
    /// The loop stops early once `ceil(progress_wait / progress_timeout)`
    /// consecutive polls saw no new tick **and** the backend reports the task
    /// as completed.
    pub progress_wait: Duration,

    /// Directory for progress logs (`None` = system temp dir).
    pub progress_log_dir: Option<PathBuf>,

    /// Bar kind rendered by progress contexts.
    pub progress_bar_type: BarKind,

    /// Default configuration per bar kind.
    pub progress_bar_config: BarConfigs,

    /// Whether `stop` may tear down a backend with a pending task.
    pub stop_forceful: bool,

    /// Maximum time `stop` waits for teardown to be acknowledged.
    pub stop_timeout: Duration,

    /// Capacity of the backend event bus.
    pub bus_capacity: usize,
}

impl Options {
    /// Returns the poll interval, never zero.
    #[inline]
    pub fn poll_interval(&self) -> Duration {
        if self.progress_timeout.is_zero() {
            Duration::from_millis(1)
        } else {
            self.progress_timeout
        }
    }

    /// Returns the number of flat polls tolerated before tracking may stop
    /// (at least 1).
    #[inline]
    pub fn unproductive_threshold(&self) -> u32 {
        let interval = self.poll_interval().as_nanos();
        let cycles = self.progress_wait.as_nanos().div_ceil(interval);
        u32::try_from(cycles).unwrap_or(u32::MAX).max(1)
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns the configuration of the selected bar kind.
    #[inline]
    pub fn bar_config(&self) -> BarConfig {
        self.progress_bar_config.get(self.progress_bar_type)
    }
}

impl Default for Options {
    /// Default options:
    ///
    /// - `progress_track = true`
    /// - `progress_timeout = 1ms`, `progress_wait = 100ms`
    /// - `progress_log_dir = None` (system temp dir)
    /// - `progress_bar_type = BarKind::Modern`
    /// - `stop_forceful = false`, `stop_timeout = 5s`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            progress_track: true,
            progress_timeout: Duration::from_millis(1),
            progress_wait: Duration::from_millis(100),
            progress_log_dir: None,
            progress_bar_type: BarKind::default(),
            progress_bar_config: BarConfigs::default(),
            stop_forceful: false,
            stop_timeout: Duration::from_secs(5),
            bus_capacity: 1024,
        }
    }
}
