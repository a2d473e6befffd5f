//! Confirmation prompt seam.
//!
//! Down migrations are destructive; the executor asks through an injected
//! `Prompt` before running them. Tests script answers instead of blocking
//! on stdin.

use std::io::{BufRead, Write};

use colored::Colorize;

use crate::error::DriftResult;

/// Asks the user a question and returns their answer token
pub trait Prompt {
    /// Shows `message` and reads one whitespace-delimited token from the user
    fn ask(&mut self, message: &str) -> DriftResult<String>;
}

/// Blocking prompt over process stdin/stdout
#[derive(Debug, Default)]
pub struct StdinPrompt;

impl Prompt for StdinPrompt {
    fn ask(&mut self, message: &str) -> DriftResult<String> {
        print!("{}: ", message.yellow().bold());
        std::io::stdout().flush()?;

        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line)?;
        Ok(line
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_string())
    }
}
