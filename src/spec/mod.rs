//! # Cluster specification.
//!
//! [`Specification`] is the immutable-after-construction description of the
//! cluster a backend starts: how many worker nodes and which [`ClusterKind`].
//!
//! Both setters validate and auto-correct their input. A correction never
//! fails the call; it produces a [`Warning`] that is returned, logged, and
//! kept on the specification so the backend can republish it on its bus.
//!
//! ## Core clamping
//! ```text
//! available < 2            → ConfigError::NotEnoughCores
//! usable = available > 2 ? available - 1 : available
//! requested < 2            → 2       (CoresTooLow)
//! requested > usable       → usable  (CoresTooHigh)
//! otherwise                → requested
//! ```

use std::fmt;
use std::num::NonZero;

use crate::error::ConfigError;
use crate::warning::Warning;

/// Kind of cluster to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClusterKind {
    /// Nodes forked from the controller; POSIX only.
    Fork,
    /// Nodes started as fresh workers connected over a socket.
    Psock,
}

impl ClusterKind {
    /// All kinds known to the crate.
    pub const ALL: [ClusterKind; 2] = [ClusterKind::Fork, ClusterKind::Psock];

    /// Upper-case tag of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ClusterKind::Fork => "FORK",
            ClusterKind::Psock => "PSOCK",
        }
    }

    /// Platform default: `Fork` on POSIX, `Psock` elsewhere.
    pub fn platform_default() -> Self {
        Self::default_for(cfg!(unix))
    }

    fn default_for(posix: bool) -> Self {
        if posix {
            ClusterKind::Fork
        } else {
            ClusterKind::Psock
        }
    }

    fn parse(tag: &str) -> Option<Self> {
        let tag = tag.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(tag))
    }
}

impl fmt::Display for ClusterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns the number of cores reported by the platform (at least 1).
pub fn available_cores() -> usize {
    std::thread::available_parallelism()
        .map(NonZero::get)
        .unwrap_or(1)
}

/// Validated cluster configuration.
///
/// ## Example
/// ```
/// use batchvisor::{ClusterKind, Specification, Warning};
///
/// let mut spec = Specification::new();
/// let warning = spec.set_cores_with(1, 8).unwrap();
/// assert_eq!(spec.cores(), 2);
/// assert_eq!(warning, Some(Warning::CoresTooLow { requested: 1, used: 2 }));
///
/// spec.set_type_for(Some("psock"), true);
/// assert_eq!(spec.kind(), ClusterKind::Psock);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Specification {
    cores: usize,
    kind: ClusterKind,
    warnings: Vec<Warning>,
}

impl Default for Specification {
    fn default() -> Self {
        Self::new()
    }
}

impl Specification {
    /// Creates a two-core specification of the platform default kind.
    pub fn new() -> Self {
        Self {
            cores: 2,
            kind: ClusterKind::platform_default(),
            warnings: Vec::new(),
        }
    }

    /// Number of worker nodes.
    pub fn cores(&self) -> usize {
        self.cores
    }

    /// Kind of cluster.
    pub fn kind(&self) -> ClusterKind {
        self.kind
    }

    /// Warnings produced by the setters so far.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Sets the core count against the platform core count.
    ///
    /// See [`set_cores_with`](Self::set_cores_with).
    pub fn set_cores(&mut self, requested: usize) -> Result<Option<Warning>, ConfigError> {
        self.set_cores_with(requested, available_cores())
    }

    /// Sets the core count against an explicit `available` count.
    ///
    /// Reserves one core for the controller when more than two exist.
    /// Fails only when `available < 2`.
    pub fn set_cores_with(
        &mut self,
        requested: usize,
        available: usize,
    ) -> Result<Option<Warning>, ConfigError> {
        if available < 2 {
            return Err(ConfigError::NotEnoughCores { available });
        }

        let usable = if available > 2 { available - 1 } else { available };

        let warning = if requested < 2 {
            self.cores = 2;
            Some(Warning::CoresTooLow { requested, used: 2 })
        } else if requested > usable {
            self.cores = usable;
            Some(Warning::CoresTooHigh {
                requested,
                used: usable,
            })
        } else {
            self.cores = requested;
            None
        };

        Ok(self.record(warning))
    }

    /// Sets the cluster kind for the current platform.
    ///
    /// See [`set_type_for`](Self::set_type_for).
    pub fn set_type(&mut self, requested: Option<&str>) -> Option<Warning> {
        self.set_type_for(requested, cfg!(unix))
    }

    /// Sets the cluster kind as if running on a POSIX (`posix = true`) or
    /// non-POSIX platform.
    ///
    /// - `None` or blank → platform default
    /// - unknown tag → `Psock` (`TypeNotSupported`)
    /// - `Fork` off POSIX → `Psock` (`TypeNotCompatible`)
    /// - otherwise honored, case-insensitively
    pub fn set_type_for(&mut self, requested: Option<&str>, posix: bool) -> Option<Warning> {
        let requested = requested.map(str::trim).filter(|tag| !tag.is_empty());

        let Some(tag) = requested else {
            self.kind = ClusterKind::default_for(posix);
            return None;
        };

        let warning = match ClusterKind::parse(tag) {
            None => {
                self.kind = ClusterKind::Psock;
                Some(Warning::TypeNotSupported {
                    requested: tag.to_string(),
                    used: ClusterKind::Psock,
                })
            }
            Some(ClusterKind::Fork) if !posix => {
                self.kind = ClusterKind::Psock;
                Some(Warning::TypeNotCompatible {
                    requested: ClusterKind::Fork,
                    used: ClusterKind::Psock,
                })
            }
            Some(kind) => {
                self.kind = kind;
                None
            }
        };

        self.record(warning)
    }

    fn record(&mut self, warning: Option<Warning>) -> Option<Warning> {
        if let Some(w) = &warning {
            w.log();
            self.warnings.push(w.clone());
        }
        warning
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_core_machine_is_rejected() {
        let mut spec = Specification::new();
        assert_eq!(
            spec.set_cores_with(1, 1),
            Err(ConfigError::NotEnoughCores { available: 1 })
        );
        assert_eq!(spec.cores(), 2, "spec left untouched on failure");
        assert!(spec.warnings().is_empty());
    }

    #[test]
    fn test_low_request_clamps_to_two() {
        for requested in 0..2 {
            let mut spec = Specification::new();
            let w = spec.set_cores_with(requested, 8).unwrap();
            assert_eq!(spec.cores(), 2);
            assert_eq!(w, Some(Warning::CoresTooLow { requested, used: 2 }));
        }
    }

    #[test]
    fn test_high_request_clamps_to_usable() {
        for requested in 8..20 {
            let mut spec = Specification::new();
            let w = spec.set_cores_with(requested, 8).unwrap();
            assert_eq!(spec.cores(), 7, "one core is reserved for the controller");
            assert_eq!(w, Some(Warning::CoresTooHigh { requested, used: 7 }));
        }
    }

    #[test]
    fn test_two_core_machine_reserves_nothing() {
        let mut spec = Specification::new();
        assert_eq!(spec.set_cores_with(2, 2).unwrap(), None);
        assert_eq!(spec.cores(), 2);

        let w = spec.set_cores_with(3, 2).unwrap();
        assert_eq!(spec.cores(), 2);
        assert_eq!(w, Some(Warning::CoresTooHigh { requested: 3, used: 2 }));
    }

    #[test]
    fn test_in_range_request_is_honored() {
        let mut spec = Specification::new();
        assert_eq!(spec.set_cores_with(4, 8).unwrap(), None);
        assert_eq!(spec.cores(), 4);
        assert!(spec.warnings().is_empty());
    }

    #[test]
    fn test_type_defaults_per_platform() {
        let mut spec = Specification::new();
        assert_eq!(spec.set_type_for(None, true), None);
        assert_eq!(spec.kind(), ClusterKind::Fork);

        assert_eq!(spec.set_type_for(Some("  "), false), None);
        assert_eq!(spec.kind(), ClusterKind::Psock);
    }

    #[test]
    fn test_type_is_case_normalized() {
        let mut spec = Specification::new();
        assert_eq!(spec.set_type_for(Some("fork"), true), None);
        assert_eq!(spec.kind(), ClusterKind::Fork);
        assert_eq!(spec.set_type_for(Some("Psock"), true), None);
        assert_eq!(spec.kind(), ClusterKind::Psock);
    }

    #[test]
    fn test_unknown_type_falls_back_to_psock() {
        let mut spec = Specification::new();
        let w = spec.set_type_for(Some("MPI"), true);
        assert_eq!(spec.kind(), ClusterKind::Psock);
        assert_eq!(
            w,
            Some(Warning::TypeNotSupported {
                requested: "MPI".into(),
                used: ClusterKind::Psock
            })
        );
    }

    #[test]
    fn test_fork_off_posix_falls_back_to_psock() {
        let mut spec = Specification::new();
        let w = spec.set_type_for(Some("FORK"), false);
        assert_eq!(spec.kind(), ClusterKind::Psock);
        assert!(matches!(w, Some(Warning::TypeNotCompatible { .. })));
    }

    #[test]
    fn test_warnings_accumulate() {
        let mut spec = Specification::new();
        spec.set_cores_with(0, 4).unwrap();
        spec.set_type_for(Some("bogus"), true);
        let labels: Vec<_> = spec.warnings().iter().map(Warning::as_label).collect();
        assert_eq!(labels, vec!["cores_too_low", "type_not_supported"]);
    }
}
