use super::BarKind;

/// Settings of a [`BasicBar`](super::BasicBar).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicBarConfig {
    /// Number of cells between the pipes.
    pub width: usize,
    /// Character drawn for completed cells.
    pub fill: char,
}

impl Default for BasicBarConfig {
    fn default() -> Self {
        Self {
            width: 50,
            fill: '=',
        }
    }
}

/// Settings of a [`ModernBar`](super::ModernBar).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModernBarConfig {
    /// `indicatif` template.
    pub template: String,
    /// Filled, current and empty characters.
    pub progress_chars: String,
    /// Draw to a hidden target (non-TTY output, tests).
    pub hidden: bool,
}

impl Default for ModernBarConfig {
    fn default() -> Self {
        Self {
            template: "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})".to_string(),
            progress_chars: "=>-".to_string(),
            hidden: false,
        }
    }
}

/// Configuration handed to [`Bar::create`](super::Bar::create).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BarConfig {
    Basic(BasicBarConfig),
    Modern(ModernBarConfig),
}

/// Default configuration per bar kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BarConfigs {
    pub basic: BasicBarConfig,
    pub modern: ModernBarConfig,
}

impl BarConfigs {
    /// Returns the configuration for `kind`.
    pub fn get(&self, kind: BarKind) -> BarConfig {
        match kind {
            BarKind::Basic => BarConfig::Basic(self.basic.clone()),
            BarKind::Modern => BarConfig::Modern(self.modern.clone()),
        }
    }

    /// Replaces the configuration of the kind carried by `config`.
    pub fn set(&mut self, config: BarConfig) {
        match config {
            BarConfig::Basic(c) => self.basic = c,
            BarConfig::Modern(c) => self.modern = c,
        }
    }
}
