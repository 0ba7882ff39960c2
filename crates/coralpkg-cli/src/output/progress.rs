//! Progress bars, spinners, and the [`coralpkg_core::ProgressSink`]
//! implementation that renders [`ProgressEvent`]s to the terminal.

use coralpkg_core::progress::{ProgressEvent, ProgressSink};
use indicatif::{
    MultiProgress as IndicatifMultiProgress, ProgressBar as IndicatifProgressBar,
    ProgressStyle as IndicatifProgressStyle,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

/// Progress bar style presets.
#[derive(Debug, Clone, Copy)]
pub enum ProgressStyle {
    Bar,
    Download,
    Spinner,
}

impl ProgressStyle {
    const fn template(self, unicode: bool) -> &'static str {
        match self {
            Self::Bar if unicode => "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({percent}%)",
            Self::Bar => "{spinner} [{bar:40}] {pos}/{len} ({percent}%)",
            Self::Download if unicode => {
                "{spinner:.green} {msg:.cyan} [{bar:30.green/dim}] {bytes}/{total_bytes} ({bytes_per_sec})"
            }
            Self::Download => "{spinner} {msg} [{bar:30}] {bytes}/{total_bytes} ({bytes_per_sec})",
            Self::Spinner if unicode => "{spinner:.green} {msg}",
            Self::Spinner => "{spinner} {msg}",
        }
    }

    const fn spinner_chars(self, unicode: bool) -> &'static str {
        if unicode {
            "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"
        } else {
            "-\\|/"
        }
    }

    fn to_indicatif(self, unicode: bool) -> IndicatifProgressStyle {
        IndicatifProgressStyle::default_bar()
            .template(self.template(unicode))
            .expect("valid template")
            .tick_chars(self.spinner_chars(unicode))
            .progress_chars(if unicode { "█▓▒░" } else { "=>-" })
    }
}

/// Renders [`ProgressEvent`]s as one `indicatif` bar per in-flight package,
/// grouped under a single [`IndicatifMultiProgress`]. Hidden entirely in
/// quiet mode or when stderr is not a terminal.
#[derive(Debug)]
pub struct CliProgressSink {
    multi: IndicatifMultiProgress,
    bars: Mutex<HashMap<String, IndicatifProgressBar>>,
    hidden: bool,
}

impl CliProgressSink {
    #[must_use]
    pub fn new(hidden: bool) -> Self {
        let multi = if hidden {
            IndicatifMultiProgress::with_draw_target(indicatif::ProgressDrawTarget::hidden())
        } else {
            IndicatifMultiProgress::new()
        };
        Self {
            multi,
            bars: Mutex::new(HashMap::new()),
            hidden,
        }
    }

    fn bar_for(&self, package: &str) -> IndicatifProgressBar {
        let mut bars = self.bars.lock();
        if let Some(bar) = bars.get(package) {
            return bar.clone();
        }
        let unicode = crate::output::unicode_enabled();
        let bar = self.multi.add(IndicatifProgressBar::new_spinner());
        bar.set_style(ProgressStyle::Download.to_indicatif(unicode));
        bar.set_message(package.to_string());
        if !self.hidden {
            bar.enable_steady_tick(Duration::from_millis(80));
        }
        bars.insert(package.to_string(), bar.clone());
        bar
    }
}

impl ProgressSink for CliProgressSink {
    fn emit(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Started { package, op } => {
                let bar = self.bar_for(&package);
                bar.set_message(format!("{op} {package}"));
            }
            ProgressEvent::Bytes { package, done, total } => {
                let bar = self.bar_for(&package);
                if let Some(total) = total {
                    bar.set_length(total);
                }
                bar.set_position(done);
            }
            ProgressEvent::Finished { package, op } => {
                if let Some(bar) = self.bars.lock().remove(&package) {
                    bar.finish_with_message(format!("{op} {package} done"));
                }
            }
            ProgressEvent::Warning(message) => {
                self.multi.suspend(|| crate::output::warning(&message));
            }
        }
    }
}

/// A spinner that auto-clears on drop, used around a single blocking
/// step with no quantifiable progress (index refresh, history append).
pub struct Spinner {
    inner: IndicatifProgressBar,
}

impl Spinner {
    pub fn new(msg: impl Into<std::borrow::Cow<'static, str>>) -> Self {
        let unicode = crate::output::unicode_enabled();
        let pb = IndicatifProgressBar::new_spinner();
        pb.set_style(ProgressStyle::Spinner.to_indicatif(unicode));
        pb.set_message(msg);
        pb.enable_steady_tick(Duration::from_millis(80));
        Self { inner: pb }
    }

    pub fn hidden() -> Self {
        Self {
            inner: IndicatifProgressBar::hidden(),
        }
    }

    pub fn set_message(&self, msg: impl Into<std::borrow::Cow<'static, str>>) {
        self.inner.set_message(msg);
    }

    pub fn finish_with_message(&self, msg: impl Into<std::borrow::Cow<'static, str>>) {
        self.inner.finish_with_message(msg);
    }

    pub fn finish_and_clear(&self) {
        self.inner.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_style_templates_are_valid() {
        for style in [ProgressStyle::Bar, ProgressStyle::Download, ProgressStyle::Spinner] {
            let _ = style.to_indicatif(true);
            let _ = style.to_indicatif(false);
        }
    }

    #[test]
    fn sink_tracks_and_clears_bars() {
        let sink = CliProgressSink::new(true);
        sink.emit(ProgressEvent::Started {
            package: "demo".into(),
            op: "fetching".into(),
        });
        assert_eq!(sink.bars.lock().len(), 1);
        sink.emit(ProgressEvent::Finished {
            package: "demo".into(),
            op: "fetching".into(),
        });
        assert!(sink.bars.lock().is_empty());
    }
}
