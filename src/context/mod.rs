//! # Contexts: decorators over a backend.
//!
//! A context wraps a [`Backend`] and is itself a backend, so callers drive
//! both the same way.
//!
//! - [`Context`]: passthrough.
//! - [`ProgressTrackingContext`]: renders a progress bar while a submission runs.
//!
//! [`ContextFactory`] picks one from a string tag.

mod log;
mod progress;
mod regular;

use std::str::FromStr;

use crate::backend::Backend;
use crate::error::ConfigError;
use crate::options::Options;

pub use progress::ProgressTrackingContext;
pub use regular::Context;

/// Context variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKind {
    /// [`Context`].
    Regular,
    /// [`ProgressTrackingContext`].
    Progress,
}

impl FromStr for ContextKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "regular" => Ok(ContextKind::Regular),
            "progress" => Ok(ContextKind::Progress),
            _ => Err(ConfigError::UnknownContext { tag: s.to_string() }),
        }
    }
}

/// Creates contexts from a string tag.
pub struct ContextFactory;

impl ContextFactory {
    /// Wraps `backend` in the context named by `tag` (`"regular"` or `"progress"`).
    ///
    /// Fails with [`ConfigError::UnknownContext`] on any other tag.
    pub fn get<'a, B>(tag: &str, backend: B, options: &Options) -> Result<Box<dyn Backend + 'a>, ConfigError>
    where
        B: Backend + 'a,
    {
        Ok(Self::wrap(tag.parse()?, backend, options))
    }

    /// Wraps `backend` in a context of `kind`.
    pub fn wrap<'a, B>(kind: ContextKind, backend: B, options: &Options) -> Box<dyn Backend + 'a>
    where
        B: Backend + 'a,
    {
        match kind {
            ContextKind::Regular => Box::new(Context::new(backend)),
            ContextKind::Progress => Box::new(ProgressTrackingContext::new(backend, options.clone())),
        }
    }
}
