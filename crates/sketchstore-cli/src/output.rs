//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use anyhow::Result;
use chrono::DateTime;
use serde::Serialize;
use serde_json::Value;

use sketchstore_core::{QueueEntry, StorageError, StoredFile};

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

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Print any serializable value as pretty JSON
    pub fn json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    /// Print a single file
    pub fn print_file(&self, file: &StoredFile) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                println!("Name:     {}", file.name);
                println!("ID:       {}", file.data.id);
                println!("Elements: {}", file.data.elements.len());
                println!("Size:     {}", human_size(file.size));
                println!("Saved:    {}", format_millis(file.timestamp));
                println!("Created:  {}", file.data.created_at.format("%Y-%m-%d %H:%M"));
                println!("Updated:  {}", file.data.updated_at.format("%Y-%m-%d %H:%M"));
            }
            OutputFormat::Json => self.json(file)?,
            OutputFormat::Quiet => println!("{}", file.name),
        }
        Ok(())
    }

    /// Print a list of files
    pub fn print_files(&self, files: &[StoredFile]) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                if files.is_empty() {
                    println!("No files found.");
                    return Ok(());
                }
                for file in files {
                    println!(
                        "{} | {:>5} elements | {:>9} | {}",
                        truncate(&file.name, 35),
                        file.data.elements.len(),
                        human_size(file.size),
                        format_millis(file.timestamp)
                    );
                }
                println!("\n{} file(s)", files.len());
            }
            OutputFormat::Json => self.json(files)?,
            OutputFormat::Quiet => {
                for file in files {
                    println!("{}", file.name);
                }
            }
        }
        Ok(())
    }

    /// Print queue or dead-letter entries
    pub fn print_queue(&self, entries: &[QueueEntry], empty_message: &str) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                if entries.is_empty() {
                    println!("{}", empty_message);
                    return Ok(());
                }
                for entry in entries {
                    println!(
                        "{} | {:<8} | {} | retries: {}",
                        entry.id,
                        entry.operation.kind(),
                        format_millis(entry.timestamp),
                        entry.retries
                    );
                    if let Some(ref error) = entry.last_error {
                        println!("    last error: {}", truncate_line(error, 70));
                    }
                }
                println!("\n{} operation(s)", entries.len());
            }
            OutputFormat::Json => self.json(entries)?,
            OutputFormat::Quiet => {
                for entry in entries {
                    println!("{}", entry.id);
                }
            }
        }
        Ok(())
    }

    /// Print a stored JSON value
    pub fn print_value(&self, value: &Value) -> Result<()> {
        match self.format {
            OutputFormat::Human | OutputFormat::Json => self.json(value)?,
            OutputFormat::Quiet => match value {
                Value::String(s) => println!("{}", s),
                other => println!("{}", other),
            },
        }
        Ok(())
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

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
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

/// Recovery suggestion for the first storage error in `error`'s chain
pub fn recovery_hint(error: &anyhow::Error) -> Option<&'static str> {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<StorageError>())
        .and_then(StorageError::recovery_suggestion)
}

/// Format epoch milliseconds as a UTC timestamp
pub fn format_millis(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| millis.to_string())
}

/// Format a byte count with a unit
pub fn human_size(bytes: usize) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;

    let bytes_f = bytes as f64;
    if bytes_f >= MB {
        format!("{:.2} MB", bytes_f / MB)
    } else if bytes_f >= KB {
        format!("{:.2} KB", bytes_f / KB)
    } else {
        format!("{} B", bytes)
    }
}

/// Truncate a string to max length, adding "..." if truncated
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
