//! # Operator Console
//!
//! Sequential line-based prompts for the operator: numeric entries are
//! re-prompted until they parse, yes/no questions accept a leading Y, and
//! an interrupt (Ctrl-C / Ctrl-D) at any prompt is reported to the caller
//! so it can wind the program down.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use thiserror::Error;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct Console {
    rl: DefaultEditor,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("Failed to read from the terminal: {0}")]
    Readline(#[from] ReadlineError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Console {
    pub fn new() -> Result<Self, ConsoleError> {
        Ok(Self {
            rl: DefaultEditor::new()?,
        })
    }

    /// Prompt for a numeric value, re-prompting until one parses.
    ///
    /// Returns `None` if the operator interrupts the prompt.
    pub fn prompt_f64(&mut self, prompt: &str) -> Result<Option<f64>, ConsoleError> {
        loop {
            match self.rl.readline(prompt) {
                Ok(line) => match parse_numeric(&line) {
                    Some(value) => {
                        let _ = self.rl.add_history_entry(line.as_str());
                        return Ok(Some(value));
                    }
                    None => println!("Invalid input. Please enter a numeric value."),
                },
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => return Ok(None),
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Ask a yes/no question. Anything not starting with `y`/`Y`, and an
    /// interrupt, count as no.
    pub fn confirm(&mut self, prompt: &str) -> Result<bool, ConsoleError> {
        match self.rl.readline(prompt) {
            Ok(line) => Ok(line.trim().to_uppercase().starts_with('Y')),
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Ask whether to quit. `q`/`Q` and an interrupt quit, anything else
    /// proceeds.
    pub fn prompt_quit(&mut self, prompt: &str) -> Result<bool, ConsoleError> {
        match self.rl.readline(prompt) {
            Ok(line) => Ok(line.trim().eq_ignore_ascii_case("q")),
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(true),
            Err(e) => Err(e.into()),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Parse an operator-entered numeric value.
pub fn parse_numeric(input: &str) -> Option<f64> {
    input.trim().parse::<f64>().ok()
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_numeric_valid() {
        assert_eq!(parse_numeric("42"), Some(42.0));
        assert_eq!(parse_numeric("  3.5 "), Some(3.5));
        assert_eq!(parse_numeric("-0.25"), Some(-0.25));
        assert_eq!(parse_numeric("1e2"), Some(100.0));
    }

    #[test]
    fn test_parse_numeric_invalid() {
        assert_eq!(parse_numeric(""), None);
        assert_eq!(parse_numeric("fast"), None);
        assert_eq!(parse_numeric("12,5"), None);
        assert_eq!(parse_numeric("4.2.1"), None);
    }
}
