//! # Progress log: one line per finished work invocation.
//!
//! ```text
//! node thread                          controller
//!   TrackedWork::call                    ProgressLog::poll (every progress_timeout)
//!     ├─► inner.call(item)                 └─► read new bytes, count '\n'
//!     └─► Tick dropped (ok, err, panic)
//!           lock_exclusive → "\n" → unlock
//! ```
//!
//! ## Rules
//! - A tick is appended on **every** exit of the work, including errors and panics.
//! - Writers hold an exclusive advisory lock only for the append.
//! - The reader never locks: an undercount only delays a redraw by one poll.
//! - The log file is removed when the [`ProgressLog`] is dropped.

use std::fs::OpenOptions;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fs2::FileExt;
use tempfile::NamedTempFile;

use crate::error::TaskError;
use crate::value::Value;
use crate::work::{NodeContext, Work, WorkRef};

/// Uniquely named, self-deleting progress log.
pub(crate) struct ProgressLog {
    file: NamedTempFile,
    ticks: usize,
}

impl ProgressLog {
    /// Creates an empty log in `dir` (system temp dir when `None`).
    pub(crate) fn create(dir: Option<&Path>) -> io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("batchvisor-progress-").suffix(".log");
        let file = match dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        Ok(Self { file, ticks: 0 })
    }

    pub(crate) fn path(&self) -> &Path {
        self.file.path()
    }

    /// Returns the number of ticks logged so far.
    pub(crate) fn poll(&mut self) -> io::Result<usize> {
        let mut fresh = Vec::new();
        self.file.as_file_mut().read_to_end(&mut fresh)?;
        self.ticks += fresh.iter().filter(|b| **b == b'\n').count();
        Ok(self.ticks)
    }
}

/// Appends one tick to the log at `path`.
pub(crate) fn append_tick(path: &Path) -> io::Result<()> {
    let mut file = OpenOptions::new().append(true).open(path)?;
    FileExt::lock_exclusive(&file)?;
    let written = file.write_all(b"\n");
    let unlocked = FileExt::unlock(&file);
    written.and(unlocked)
}

/// Appends a tick when dropped.
struct Tick<'a> {
    path: &'a Path,
}

impl Drop for Tick<'_> {
    fn drop(&mut self) {
        if let Err(e) = append_tick(self.path) {
            tracing::warn!(error = %e, path = %self.path.display(), "failed to log progress tick");
        }
    }
}

/// Work decorated with a progress tick on every invocation.
pub(crate) struct TrackedWork {
    inner: WorkRef,
    log: PathBuf,
}

impl TrackedWork {
    pub(crate) fn arc(inner: WorkRef, log: &Path) -> WorkRef {
        Arc::new(Self {
            inner,
            log: log.to_path_buf(),
        })
    }
}

impl Work for TrackedWork {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn call(&self, item: &Value, ctx: &NodeContext<'_>) -> Result<Value, TaskError> {
        let _tick = Tick { path: &self.log };
        self.inner.call(item, ctx)
    }

    fn is_primitive(&self) -> bool {
        self.inner.is_primitive()
    }
}
