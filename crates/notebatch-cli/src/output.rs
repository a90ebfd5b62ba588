//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use serde::Serialize;

use notebatch_core::{Note, SyncReport, Window};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print a single note
    pub fn print_note(&self, note: &Note) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:      {}", note.id);
                println!("Title:   {}", note.title);
                println!("Created: {}", note.created_at.format("%Y-%m-%d %H:%M:%S"));
                println!();
                println!("{}", note.content);
            }
            OutputFormat::Json => print_json(note),
            OutputFormat::Quiet => println!("{}", note.id),
        }
    }

    /// Print a list window
    pub fn print_window(&self, window: &Window) {
        match self.format {
            OutputFormat::Human => {
                if window.notes.is_empty() {
                    println!("No notes found.");
                    return;
                }
                for note in &window.notes {
                    println!(
                        "{} | {} | {} | {}",
                        truncate(&note.id, 12),
                        note.created_at.format("%Y-%m-%d %H:%M:%S"),
                        truncate(&note.title, 30),
                        truncate_line(&note.content, 40)
                    );
                }
                let more = if window.exhausted { "" } else { ", more available" };
                println!("\n{} note(s){}", window.notes.len(), more);
            }
            OutputFormat::Json => print_json(window),
            OutputFormat::Quiet => {
                for note in &window.notes {
                    println!("{}", note.id);
                }
            }
        }
    }

    /// Print the outcome of a sync
    pub fn print_sync_report(&self, report: &SyncReport) {
        match self.format {
            OutputFormat::Human => {
                println!(
                    "✓ Synced {} note(s) in {} ms: {} new, {} updated, {} unchanged",
                    report.fetched,
                    report.duration_ms,
                    report.inserted,
                    report.updated,
                    report.unchanged
                );
            }
            OutputFormat::Json => print_json(report),
            OutputFormat::Quiet => println!("{}", report.changed()),
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize output: {}", e),
    }
}

/// Truncate a string to `max_len` characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Truncate to first line and max length
fn truncate_line(s: &str, max_len: usize) -> String {
    let first_line = s.lines().next().unwrap_or("");
    truncate(first_line, max_len)
}
