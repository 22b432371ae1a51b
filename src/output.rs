// ABOUTME: Output formatting for CLI feedback.
// ABOUTME: Supports human-readable and JSON lines output modes.

use serde::Serialize;
use std::time::Instant;

use crate::diagnostics::{Warning, WarningKind};
use crate::upgrade::UpgradeOutcome;

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-friendly output with progress messages
    Normal,
    /// JSON lines for scripting
    Json,
}

/// Handles CLI output based on the configured mode.
pub struct Output {
    mode: OutputMode,
    start_time: Option<Instant>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            start_time: None,
        }
    }

    /// Start timing an operation.
    pub fn start_timer(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Get elapsed time since timer started.
    pub fn elapsed_secs(&self) -> f64 {
        self.start_time
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    fn duration(&self) -> Option<f64> {
        self.start_time.map(|_| self.elapsed_secs())
    }

    /// Print a progress message (suppressed in json mode).
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            println!("{message}");
        }
    }

    pub fn warning(&self, warning: &Warning) {
        match self.mode {
            OutputMode::Normal => eprintln!("Warning: {}", warning.message),
            OutputMode::Json => emit_stderr(&JsonEvent {
                event: "warning",
                message: &warning.message,
                kind: Some(warning.kind),
                duration_secs: None,
            }),
        }
    }

    /// Print the final result of an upgrade.
    pub fn outcome(&self, outcome: &UpgradeOutcome) {
        match self.mode {
            OutputMode::Normal => {
                let line = render_outcome(outcome, self.duration());
                if outcome.exit_code() == 0 {
                    println!("{line}");
                } else {
                    eprintln!("{line}");
                }
            }
            OutputMode::Json => {
                if let Ok(json) = outcome_json(outcome, self.duration()) {
                    println!("{json}");
                }
            }
        }
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => eprintln!("Error: {message}"),
            OutputMode::Json => emit_stderr(&JsonEvent {
                event: "error",
                message,
                kind: None,
                duration_secs: self.duration(),
            }),
        }
    }
}

fn render_outcome(outcome: &UpgradeOutcome, duration: Option<f64>) -> String {
    match duration {
        Some(secs) if secs > 0.0 => format!("{outcome} ({secs:.1}s)"),
        _ => outcome.to_string(),
    }
}

fn outcome_json(outcome: &UpgradeOutcome, duration: Option<f64>) -> serde_json::Result<String> {
    serde_json::to_string(&OutcomeEvent {
        event: "outcome",
        outcome,
        exit_code: outcome.exit_code(),
        duration_secs: duration,
    })
}

fn emit_stderr(event: &JsonEvent<'_>) {
    if let Ok(json) = serde_json::to_string(event) {
        eprintln!("{json}");
    }
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<WarningKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}

#[derive(Serialize)]
struct OutcomeEvent<'a> {
    event: &'a str,
    #[serde(flatten)]
    outcome: &'a UpgradeOutcome,
    exit_code: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}
