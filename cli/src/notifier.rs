use std::io::{self, Write};

use delfin::{CaptureState, Notifier, Severity};
use tracing::debug;

const RESET: &str = "\x1b[0m";

/// Prints notifications to stderr, one line each, with an icon per severity.
pub struct TerminalNotifier {
    color: bool,
}

impl TerminalNotifier {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    /// Colors unless `NO_COLOR` is set.
    pub fn from_env() -> Self {
        Self::new(std::env::var_os("NO_COLOR").is_none())
    }

    fn render(&self, severity: Severity, message: &str) -> String {
        let (icon, color) = match severity {
            Severity::Success => ("✅", "\x1b[32m"),
            Severity::Error => ("❌", "\x1b[31m"),
            Severity::Warning => ("⚠️", "\x1b[33m"),
            Severity::Info => ("ℹ️", "\x1b[36m"),
        };
        if self.color {
            format!("{color}{icon} {message}{RESET}")
        } else {
            format!("{icon} {message}")
        }
    }
}

impl Notifier for TerminalNotifier {
    fn notify(&self, severity: Severity, message: &str) {
        let line = self.render(severity, message);
        let _ = writeln!(io::stderr().lock(), "{line}");
    }

    fn state_changed(&self, state: CaptureState) {
        debug!(%state, "capture state");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_rendering() {
        let notifier = TerminalNotifier::new(false);
        assert_eq!(
            notifier.render(Severity::Success, "Pedido guardado correctamente"),
            "✅ Pedido guardado correctamente"
        );
        assert_eq!(notifier.render(Severity::Error, "x"), "❌ x");
    }

    #[test]
    fn test_colored_rendering_is_reset() {
        let line = TerminalNotifier::new(true).render(Severity::Warning, "cuidado");
        assert!(line.starts_with("\x1b[33m"));
        assert!(line.ends_with(RESET));
        assert!(line.contains("cuidado"));
    }
}
