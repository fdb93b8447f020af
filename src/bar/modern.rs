use indicatif::{ProgressBar, ProgressStyle};

use super::{Bar, BarConfig, ModernBarConfig};

/// `indicatif`-backed bar.
#[derive(Default)]
pub struct ModernBar {
    pb: Option<ProgressBar>,
}

/// Fallback when the configured progress chars are unusable.
const DEFAULT_PROGRESS_CHARS: &str = "=>-";

impl ModernBar {
    /// Creates a bar that draws nothing until [`Bar::create`] is called.
    pub fn new() -> Self {
        Self::default()
    }

    fn style(config: &ModernBarConfig) -> ProgressStyle {
        // indicatif needs at least a fill and an empty char.
        let chars = if config.progress_chars.chars().count() >= 2 {
            config.progress_chars.as_str()
        } else {
            tracing::warn!(
                progress_chars = %config.progress_chars,
                "bar needs at least 2 progress chars; using default"
            );
            DEFAULT_PROGRESS_CHARS
        };

        match ProgressStyle::default_bar().template(&config.template) {
            Ok(style) => style.progress_chars(chars),
            Err(e) => {
                tracing::warn!(error = %e, template = %config.template, "invalid bar template; using default");
                ProgressStyle::default_bar().progress_chars(chars)
            }
        }
    }
}

impl Bar for ModernBar {
    fn create(&mut self, total: usize, initial: usize, config: &BarConfig) {
        let config = match config {
            BarConfig::Modern(c) => c.clone(),
            BarConfig::Basic(_) => ModernBarConfig::default(),
        };
        let pb = if config.hidden {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(total as u64)
        };
        pb.set_length(total as u64);
        pb.set_style(Self::style(&config));
        pb.set_position(initial.min(total) as u64);
        self.pb = Some(pb);
    }

    fn update(&mut self, current: usize) {
        if let Some(pb) = &self.pb {
            pb.set_position(current as u64);
        }
    }

    fn terminate(&mut self) {
        if let Some(pb) = self.pb.take() {
            pb.finish();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_bar_tracks_position() {
        let mut bar = ModernBar::new();
        let config = BarConfig::Modern(ModernBarConfig {
            hidden: true,
            ..ModernBarConfig::default()
        });
        bar.create(10, 2, &config);
        bar.update(7);
        assert_eq!(bar.pb.as_ref().map(ProgressBar::position), Some(7));
        bar.terminate();
        bar.terminate();
        assert!(bar.pb.is_none());
    }

    #[test]
    fn test_bad_template_falls_back() {
        let mut bar = ModernBar::new();
        let config = BarConfig::Modern(ModernBarConfig {
            template: "{bar:".into(),
            hidden: true,
            ..ModernBarConfig::default()
        });
        bar.create(3, 0, &config);
        assert_eq!(bar.pb.as_ref().and_then(ProgressBar::length), Some(3));
    }

    #[test]
    fn test_short_progress_chars_fall_back() {
        for chars in ["#", ""] {
            let mut bar = ModernBar::new();
            let config = BarConfig::Modern(ModernBarConfig {
                progress_chars: chars.into(),
                hidden: true,
                ..ModernBarConfig::default()
            });
            bar.create(4, 0, &config);
            bar.update(4);
            assert_eq!(bar.pb.as_ref().map(ProgressBar::position), Some(4));
            bar.terminate();
        }
    }
}
