//! # Non-fatal validation warnings.
//!
//! A [`Warning`] reports a value that was auto-corrected. Warnings are never
//! swallowed: they are logged through `tracing`, returned to the caller where
//! the correction happens, and published on the backend's event bus as
//! [`EventKind::Warning`](crate::EventKind::Warning).

use std::fmt;

use crate::spec::ClusterKind;

/// Auto-corrected configuration or usage issue.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// Fewer than two cores were requested.
    CoresTooLow {
        /// The requested core count.
        requested: usize,
        /// The core count actually used.
        used: usize,
    },

    /// More cores than usable were requested.
    CoresTooHigh {
        /// The requested core count.
        requested: usize,
        /// The core count actually used.
        used: usize,
    },

    /// The requested cluster type is unknown.
    TypeNotSupported {
        /// The requested type tag.
        requested: String,
        /// The kind used instead.
        used: ClusterKind,
    },

    /// The requested cluster type is unavailable on this platform.
    TypeNotCompatible {
        /// The requested kind.
        requested: ClusterKind,
        /// The kind used instead.
        used: ClusterKind,
    },

    /// Progress tracking was requested on a backend that cannot support it.
    ProgressNotSupportedForBackend {
        /// Label of the backend kind.
        backend: &'static str,
    },
}

impl Warning {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            Warning::CoresTooLow { .. } => "cores_too_low",
            Warning::CoresTooHigh { .. } => "cores_too_high",
            Warning::TypeNotSupported { .. } => "type_not_supported",
            Warning::TypeNotCompatible { .. } => "type_not_compatible",
            Warning::ProgressNotSupportedForBackend { .. } => "progress_not_supported_for_backend",
        }
    }

    /// Logs the warning through `tracing`.
    pub(crate) fn log(&self) {
        tracing::warn!(warning = self.as_label(), "{self}");
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::CoresTooLow { requested, used } => {
                write!(f, "requested {requested} cores is too low; using {used}")
            }
            Warning::CoresTooHigh { requested, used } => {
                write!(f, "requested {requested} cores exceeds the usable count; using {used}")
            }
            Warning::TypeNotSupported { requested, used } => {
                write!(f, "cluster type '{requested}' is not supported; using {used}")
            }
            Warning::TypeNotCompatible { requested, used } => {
                write!(f, "cluster type {requested} is not available on this platform; using {used}")
            }
            Warning::ProgressNotSupportedForBackend { backend } => {
                write!(f, "progress tracking is not supported for the {backend} backend")
            }
        }
    }
}
