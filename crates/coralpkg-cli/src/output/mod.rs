//! Terminal output utilities: colorized status lines, tables, progress bars,
//! JSON error reporting, and confirmation prompts, with `NO_COLOR` and
//! non-Unicode terminal support.

#![allow(dead_code)]

pub mod json;
pub mod progress;
pub mod prompt;
pub mod table;

use console::style;
use std::io::{stderr, stdout, IsTerminal};
use std::sync::atomic::{AtomicBool, Ordering};

static COLOR_ENABLED: AtomicBool = AtomicBool::new(true);
static UNICODE_ENABLED: AtomicBool = AtomicBool::new(true);

static IS_TTY: std::sync::LazyLock<bool> =
    std::sync::LazyLock::new(|| stdout().is_terminal() && stderr().is_terminal());

static NO_COLOR: std::sync::LazyLock<bool> =
    std::sync::LazyLock::new(|| std::env::var("NO_COLOR").is_ok());

/// A status-line icon, with a Unicode glyph and an ASCII fallback.
#[derive(Debug, Clone, Copy)]
pub enum Icon {
    Success,
    Warning,
    Error,
    Info,
}

impl Icon {
    const fn glyph(self) -> &'static str {
        match self {
            Self::Success => "\u{2713}",
            Self::Warning => "\u{26a0}",
            Self::Error => "\u{2717}",
            Self::Info => "\u{2139}",
        }
    }

    const fn ascii(self) -> &'static str {
        match self {
            Self::Success => "OK",
            Self::Warning => "!!",
            Self::Error => "XX",
            Self::Info => "--",
        }
    }

    fn render(self) -> &'static str {
        if unicode_enabled() {
            self.glyph()
        } else {
            self.ascii()
        }
    }
}

/// Initialize output settings from a `--color` override and the `--quiet`
/// flag, called once at CLI startup.
pub fn init(force_color: Option<bool>, quiet: bool) {
    let colors = match force_color {
        Some(forced) => forced,
        None => *IS_TTY && !*NO_COLOR,
    };
    COLOR_ENABLED.store(colors, Ordering::Relaxed);

    let unicode = std::env::var("LANG")
        .or_else(|_| std::env::var("LC_ALL"))
        .map(|l| l.contains("UTF") || l.contains("utf"))
        .unwrap_or(cfg!(not(windows)));
    UNICODE_ENABLED.store(unicode && !quiet, Ordering::Relaxed);
}

pub fn colors_enabled() -> bool {
    COLOR_ENABLED.load(Ordering::Relaxed)
}

pub fn unicode_enabled() -> bool {
    UNICODE_ENABLED.load(Ordering::Relaxed)
}

pub fn is_tty() -> bool {
    *IS_TTY
}

pub fn header(text: &str) {
    if colors_enabled() {
        println!("{} {}", style("coralpkg").cyan().bold(), style(text).dim());
    } else {
        println!("coralpkg {text}");
    }
}

pub fn success(text: &str) {
    let icon = Icon::Success.render();
    if colors_enabled() {
        println!("{} {text}", style(icon).green());
    } else {
        println!("{icon} {text}");
    }
}

pub fn warning(text: &str) {
    let icon = Icon::Warning.render();
    if colors_enabled() {
        eprintln!("{} {}", style(icon).yellow(), style(text).yellow());
    } else {
        eprintln!("{icon} {text}");
    }
}

pub fn error(text: &str) {
    let icon = Icon::Error.render();
    if colors_enabled() {
        eprintln!("{} {}", style(icon).red(), style(text).red());
    } else {
        eprintln!("{icon} {text}");
    }
}

pub fn info(text: &str) {
    let icon = Icon::Info.render();
    if colors_enabled() {
        println!("{} {text}", style(icon).blue());
    } else {
        println!("{icon} {text}");
    }
}

pub fn debug(text: &str) {
    if colors_enabled() {
        eprintln!("{}", style(text).dim());
    } else {
        eprintln!("{text}");
    }
}

/// Print a package name with its optional version, indented for list output.
pub fn package(name: &str, version: Option<&str>) {
    if colors_enabled() {
        if let Some(v) = version {
            println!("  {} {}", style(name).green(), style(v).yellow());
        } else {
            println!("  {}", style(name).green());
        }
    } else if let Some(v) = version {
        println!("  {name} {v}");
    } else {
        println!("  {name}");
    }
}

pub fn format_duration(duration: std::time::Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs < 0.001 {
        format!("{:.0}us", secs * 1_000_000.0)
    } else if secs < 1.0 {
        format!("{:.0}ms", secs * 1000.0)
    } else if secs < 60.0 {
        format!("{secs:.2}s")
    } else {
        format!("{:.1}m", secs / 60.0)
    }
}

pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes < KB {
        format!("{bytes} B")
    } else if bytes < MB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else if bytes < GB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert!(format_duration(std::time::Duration::from_micros(500)).contains("us"));
        assert!(format_duration(std::time::Duration::from_millis(500)).contains("ms"));
        assert!(format_duration(std::time::Duration::from_secs(5)).contains('s'));
        assert!(format_duration(std::time::Duration::from_secs(120)).contains('m'));
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(500), "500 B");
        assert!(format_bytes(2048).contains("KB"));
        assert!(format_bytes(2 * 1024 * 1024).contains("MB"));
    }
}
