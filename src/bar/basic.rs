//! # BasicBar: plain text progress bar.
//!
//! ```text
//! |=========================                         |  50%
//! ```
//!
//! Each update rewrites the line after a carriage return; `terminate`
//! ends it with a newline. Write errors are ignored: a broken sink must
//! never fail the tracked task.

use std::io::{self, Write};

use super::{Bar, BarConfig, BasicBarConfig};

/// Text bar written to a `Write` sink (stderr by default).
pub struct BasicBar {
    out: Box<dyn Write + Send>,
    config: BasicBarConfig,
    total: usize,
    current: usize,
    done: bool,
}

impl BasicBar {
    /// Creates a bar drawing to stderr.
    pub fn new() -> Self {
        Self::with_writer(Box::new(io::stderr()))
    }

    /// Creates a bar drawing to `out`.
    pub fn with_writer(out: Box<dyn Write + Send>) -> Self {
        Self {
            out,
            config: BasicBarConfig::default(),
            total: 0,
            current: 0,
            done: false,
        }
    }

    fn render(&self) -> String {
        let width = self.config.width;
        let ratio = if self.total == 0 {
            1.0
        } else {
            (self.current as f64 / self.total as f64).clamp(0.0, 1.0)
        };
        let filled = (ratio * width as f64).round() as usize;
        let fill: String = std::iter::repeat_n(self.config.fill, filled).collect();
        format!(
            "|{fill}{}| {:>3}%",
            " ".repeat(width.saturating_sub(filled)),
            (ratio * 100.0).round() as u32
        )
    }

    fn draw(&mut self) {
        let line = self.render();
        let _ = write!(self.out, "\r{line}");
        let _ = self.out.flush();
    }
}

impl Default for BasicBar {
    fn default() -> Self {
        Self::new()
    }
}

impl Bar for BasicBar {
    fn create(&mut self, total: usize, initial: usize, config: &BarConfig) {
        if let BarConfig::Basic(c) = config {
            self.config = c.clone();
        }
        self.total = total;
        self.current = initial.min(total);
        self.done = false;
        self.draw();
    }

    fn update(&mut self, current: usize) {
        if self.done {
            return;
        }
        self.current = current.min(self.total);
        self.draw();
    }

    fn terminate(&mut self) {
        if self.done {
            return;
        }
        self.done = true;
        let _ = writeln!(self.out);
        let _ = self.out.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Sink(Arc<Mutex<Vec<u8>>>);

    impl Write for Sink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Sink {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn test_renders_half_bar() {
        let sink = Sink::default();
        let mut bar = BasicBar::with_writer(Box::new(sink.clone()));
        let config = BarConfig::Basic(BasicBarConfig {
            width: 10,
            fill: '=',
        });

        bar.create(4, 0, &config);
        bar.update(2);
        bar.terminate();
        bar.terminate();

        assert_eq!(
            sink.text(),
            "\r|          |   0%\r|=====     |  50%\n"
        );
    }

    #[test]
    fn test_update_is_clamped_to_total() {
        let sink = Sink::default();
        let mut bar = BasicBar::with_writer(Box::new(sink.clone()));
        bar.create(2, 0, &BarConfig::Basic(BasicBarConfig { width: 4, fill: '#' }));
        bar.update(7);
        assert!(sink.text().ends_with("|####| 100%"));
    }
}
