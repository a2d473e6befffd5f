//! Styled terminal printers injected into the migration executor.
//!
//! Three styles cover everything the tool prints: success (green), error
//! (red), and highlight (yellow). The struct carries no state; the executor
//! receives it as an injected capability.

use std::io::Write;

use colored::Colorize;

/// Stateless pass-through to the styled stdout/stderr printers
#[derive(Debug, Clone, Copy, Default)]
pub struct Style;

impl Style {
    /// Green bold line on stdout
    pub fn success(&self, msg: &str) {
        println!("{}", msg.green().bold());
    }

    /// Red bold line on stderr
    pub fn error(&self, msg: &str) {
        eprintln!("{}", msg.red().bold());
    }

    /// Yellow bold line on stdout
    pub fn highlight(&self, msg: &str) {
        println!("{}", msg.yellow().bold());
    }

    /// Yellow bold fragment without a trailing newline, flushed so progress
    /// lines render before their ` - success` / ` - failed` suffix
    pub fn highlight_partial(&self, msg: &str) {
        print!("{}", msg.yellow().bold());
        let _ = std::io::stdout().flush();
    }

    /// Red bold suffix completing a partial progress line on stdout
    pub fn error_suffix(&self, msg: &str) {
        println!("{}", msg.red().bold());
    }
}
