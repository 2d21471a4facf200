//! Diagnostic rendering backends for human-readable output.

use crate::diagnostic::Diagnostic;
use crate::severity::Severity;

/// Trait for rendering diagnostics into formatted output strings.
pub trait DiagnosticRenderer {
    /// Renders a single diagnostic into a formatted string.
    fn render(&self, diag: &Diagnostic) -> String;
}

/// Renders diagnostics in a rustc-style terminal format.
///
/// Produces output like:
/// ```text
/// warning[W101]: no legal initial state after backward retiming
///   --> node n12
///    = note: 3 pending latches were set to don't-care
/// ```
pub struct TerminalRenderer {
    /// Whether to use ANSI color codes in output.
    pub color: bool,
    /// The terminal width for line wrapping.
    pub width: u16,
}

impl TerminalRenderer {
    /// Creates a new terminal renderer.
    pub fn new(color: bool, width: u16) -> Self {
        Self { color, width }
    }

    fn paint(&self, severity: Severity, text: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        let ansi = match severity {
            Severity::Error => "31",
            Severity::Warning => "33",
            Severity::Note => "36",
            Severity::Help => "32",
        };
        format!("\x1b[1;{ansi}m{text}\x1b[0m")
    }
}

impl DiagnosticRenderer for TerminalRenderer {
    fn render(&self, diag: &Diagnostic) -> String {
        let mut out = String::new();

        // Header line: severity[CODE]: message
        let header = format!("{}[{}]", diag.severity, diag.code);
        out.push_str(&format!(
            "{}: {}\n",
            self.paint(diag.severity, &header),
            wrap(&diag.message, self.width as usize)
        ));

        if let Some(subject) = &diag.subject {
            out.push_str(&format!("  --> node {subject}\n"));
        }

        for note in &diag.notes {
            out.push_str(&format!("   = note: {note}\n"));
        }

        for help in &diag.help {
            out.push_str(&format!("   = help: {help}\n"));
        }

        out
    }
}

/// Breaks a long message at word boundaries to fit the terminal width.
fn wrap(message: &str, width: usize) -> String {
    if width < 20 || message.len() <= width {
        return message.to_string();
    }
    let mut out = String::new();
    let mut line_len = 0;
    for word in message.split_whitespace() {
        if line_len > 0 && line_len + word.len() + 1 > width {
            out.push_str("\n    ");
            line_len = 4;
        } else if line_len > 0 {
            out.push(' ');
            line_len += 1;
        }
        out.push_str(word);
        line_len += word.len();
    }
    out
}
