//! Output layer for pgfixtures.
//!
//! Centralizes stdout/stderr separation and human vs JSON output modes.
//! - stdout: data (the "answer" - status, JSON)
//! - stderr: diagnostics (progress, executed SQL, human-mode errors)

use colored::Colorize;
use serde::Serialize;

const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Output mode for the CLI
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputMode {
    Human,
    Json,
}

/// Output helper shared by the CLI and the library operations
#[derive(Debug, Clone)]
pub struct Output {
    pub mode: OutputMode,
    pub quiet: bool,
    pub verbose: bool,
}

impl Output {
    pub fn new(json: bool, quiet: bool, verbose: bool) -> Self {
        Self {
            mode: if json {
                OutputMode::Json
            } else {
                OutputMode::Human
            },
            quiet,
            verbose,
        }
    }

    /// Output for test harnesses: nothing but warnings.
    pub fn silent() -> Self {
        Self::new(false, true, false)
    }

    /// Write JSON data to stdout
    pub fn json<T: Serialize>(&self, data: &T) -> Result<(), serde_json::Error> {
        let json = serde_json::to_string_pretty(data)?;
        println!("{}", json);
        Ok(())
    }

    /// Write a progress message to stderr.
    /// Suppressed in JSON mode and when quiet is set.
    pub fn info(&self, message: &str) {
        if self.mode == OutputMode::Json || self.quiet {
            return;
        }
        eprintln!("{}", message);
    }

    /// Write a success message to stderr in green
    pub fn success(&self, message: &str) {
        self.info(&message.green().to_string());
    }

    /// Write a verbose diagnostic message to stderr.
    /// Only shown with verbose in human mode.
    pub fn verbose(&self, message: &str) {
        if self.mode == OutputMode::Json || self.quiet || !self.verbose {
            return;
        }
        eprintln!("{}", message);
    }

    /// Echo a statement about to be executed (verbose only)
    pub fn sql(&self, statement: &str) {
        self.verbose(&format!("{}", statement.trim().dimmed()));
    }

    /// Write a warning to stderr.
    /// Shown even when quiet, suppressed in JSON mode.
    pub fn warn(&self, message: &str) {
        if self.mode == OutputMode::Json {
            return;
        }
        eprintln!("{}", message.yellow());
    }

    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }
}

// =============================================================================
// JSON Response Types
// =============================================================================

/// JSON error response (written to stdout with non-zero exit).
#[derive(Debug, Serialize)]
pub struct JsonError {
    pub ok: bool,
    pub tool_version: &'static str,
    pub generated_at: String,
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl JsonError {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            tool_version: TOOL_VERSION,
            generated_at: chrono::Utc::now().to_rfc3339(),
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print this error as JSON to stdout
    pub fn print(&self) {
        match serde_json::to_string_pretty(self) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Error: failed to serialize error response: {}", e),
        }
    }
}

/// JSON success envelope
#[derive(Debug, Serialize)]
pub struct JsonResponse<T: Serialize> {
    pub ok: bool,
    pub tool_version: &'static str,
    pub generated_at: String,
    pub data: T,
}

impl<T: Serialize> JsonResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            ok: true,
            tool_version: TOOL_VERSION,
            generated_at: chrono::Utc::now().to_rfc3339(),
            data,
        }
    }
}
