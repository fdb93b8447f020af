//! # Progress bars.
//!
//! A [`Bar`] renders the tick count of a tracked task. Bars are created by
//! [`BarFactory`] from a [`BarKind`] and configured with a [`BarConfig`]
//! taken from [`Options::progress_bar_config`](crate::Options::progress_bar_config).
//!
//! - [`BasicBar`]: plain text bar (`|=====     |  50%`) on a `Write` sink.
//! - [`ModernBar`]: `indicatif` bar with a template.

mod basic;
mod config;
mod modern;

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

pub use basic::BasicBar;
pub use config::{BarConfig, BarConfigs, BasicBarConfig, ModernBarConfig};
pub use modern::ModernBar;

/// Renderer for the progress of one tracked task.
///
/// ### Contract
/// - `create` is called once, before any `update`.
/// - `update` receives non-decreasing values bounded by `total`.
/// - `terminate` is idempotent.
pub trait Bar: Send {
    /// Prepares the bar for `total` ticks, starting at `initial`.
    fn create(&mut self, total: usize, initial: usize, config: &BarConfig);

    /// Redraws the bar at `current`.
    fn update(&mut self, current: usize);

    /// Finishes the bar and releases the terminal line.
    fn terminate(&mut self);
}

/// Kind of bar to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BarKind {
    /// [`BasicBar`].
    Basic,
    /// [`ModernBar`].
    #[default]
    Modern,
}

impl BarKind {
    /// Returns the tag of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            BarKind::Basic => "basic",
            BarKind::Modern => "modern",
        }
    }
}

impl fmt::Display for BarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BarKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(BarKind::Basic),
            "modern" => Ok(BarKind::Modern),
            _ => Err(ConfigError::UnknownBar { tag: s.to_string() }),
        }
    }
}

/// Creates bars by kind.
pub struct BarFactory;

impl BarFactory {
    /// Returns a fresh bar of `kind`.
    pub fn get(kind: BarKind) -> Box<dyn Bar> {
        match kind {
            BarKind::Basic => Box::new(BasicBar::new()),
            BarKind::Modern => Box::new(ModernBar::new()),
        }
    }

    /// Returns a fresh bar for a string tag.
    ///
    /// Fails with [`ConfigError::UnknownBar`] on an unknown tag.
    pub fn from_tag(tag: &str) -> Result<Box<dyn Bar>, ConfigError> {
        Ok(Self::get(tag.parse()?))
    }
}
