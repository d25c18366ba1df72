//! Output formatting for CLI
//!
//! Status messages always go to stderr, so JSON and YAML on stdout stay
//! parseable.

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table};
use serde::Serialize;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
    /// Compact format (single line per item)
    Compact,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Table => write!(f, "table"),
            Self::Json => write!(f, "json"),
            Self::Yaml => write!(f, "yaml"),
            Self::Compact => write!(f, "compact"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            "yaml" => Ok(Self::Yaml),
            "compact" => Ok(Self::Compact),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Output writer that handles different formats
pub struct OutputWriter {
    format: OutputFormat,
}

impl OutputWriter {
    /// Create a new output writer
    pub fn new(format: OutputFormat, no_color: bool) -> Self {
        if no_color {
            colored::control::set_override(false);
        }
        Self { format }
    }

    /// The active output format
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Write any serializable value in a machine-readable format.
    ///
    /// Table and compact output fall back to pretty JSON.
    pub fn write_value<T: Serialize>(&self, value: &T) -> Result<()> {
        match self.format {
            OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
            _ => println!("{}", serde_json::to_string_pretty(value)?),
        }
        Ok(())
    }

    /// Write a single item
    pub fn write<T: Serialize + TableDisplay>(&self, item: &T) -> Result<()> {
        match self.format {
            OutputFormat::Table => item.display_single(),
            OutputFormat::Compact => item.display_compact(),
            OutputFormat::Json | OutputFormat::Yaml => self.write_value(item)?,
        }
        Ok(())
    }

    /// Write a list of items
    pub fn write_list<T: Serialize + TableDisplay>(&self, items: &[T], headers: &[&str]) -> Result<()> {
        match self.format {
            OutputFormat::Table if items.is_empty() => {
                println!("{}", "Nothing to show.".dimmed());
            }
            OutputFormat::Table => {
                let mut table = Table::new();
                table
                    .load_preset(UTF8_FULL)
                    .apply_modifier(UTF8_ROUND_CORNERS)
                    .set_header(headers.iter().map(|h| Cell::new(h).fg(Color::Cyan)));
                for item in items {
                    table.add_row(item.to_row());
                }
                println!("{table}");
                println!("\n{} {}", items.len().to_string().green(), "row(s)".bold());
            }
            OutputFormat::Compact => items.iter().for_each(TableDisplay::display_compact),
            OutputFormat::Json | OutputFormat::Yaml => self.write_value(&items)?,
        }
        Ok(())
    }

    pub fn success(&self, message: &str) {
        self.status(Status::Success, message);
    }

    pub fn error(&self, message: &str) {
        self.status(Status::Error, message);
    }

    pub fn warning(&self, message: &str) {
        self.status(Status::Warning, message);
    }

    pub fn info(&self, message: &str) {
        self.status(Status::Info, message);
    }

    /// Status lines always go to stderr
    fn status(&self, kind: Status, message: &str) {
        eprintln!("{}", status_line(self.format, kind, message));
    }

    /// Start a spinner for long operations
    pub fn spinner(&self, message: &str) -> Option<indicatif::ProgressBar> {
        if self.format == OutputFormat::Table {
            let pb = indicatif::ProgressBar::new_spinner();
            pb.set_style(
                indicatif::ProgressStyle::default_spinner()
                    .template("{spinner:.green} {msg}")
                    .unwrap_or_else(|_| indicatif::ProgressStyle::default_spinner()),
            );
            pb.set_message(message.to_string());
            pb.enable_steady_tick(std::time::Duration::from_millis(100));
            Some(pb)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Success,
    Error,
    Warning,
    Info,
}

/// A status line: a colored marker in table mode, a plain prefix otherwise
fn status_line(format: OutputFormat, kind: Status, message: &str) -> String {
    if format == OutputFormat::Table {
        let marker = match kind {
            Status::Success => "✓".green(),
            Status::Error => "✗".red(),
            Status::Warning => "⚠".yellow(),
            Status::Info => "ℹ".blue(),
        };
        return format!("{} {}", marker, message);
    }
    match kind {
        Status::Error => format!("Error: {}", message),
        Status::Warning => format!("Warning: {}", message),
        Status::Success | Status::Info => message.to_string(),
    }
}

/// Trait for displaying items in a table
pub trait TableDisplay {
    /// Convert item to a table row
    fn to_row(&self) -> Vec<Cell>;

    /// Display a single item in detail
    fn display_single(&self);

    /// Display in compact format
    fn display_compact(&self);
}

/// Print a key-value pair in detail format
pub fn print_field(key: &str, value: &str) {
    println!("  {}: {}", key.cyan(), value);
}

/// Print an optional key-value pair
pub fn print_optional_field(key: &str, value: Option<&str>) {
    if let Some(v) = value {
        print_field(key, v);
    }
}

/// Print a section header
pub fn print_section(title: &str) {
    println!("\n{}", title.bold().underline());
}

/// Format a backend timestamp for display, keeping unparseable input as is
pub fn format_timestamp(raw: &str) -> String {
    match chrono::DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => dt
            .with_timezone(&chrono::Utc)
            .format("%Y-%m-%d %H:%M:%S UTC")
            .to_string(),
        Err(_) => raw.to_string(),
    }
}

/// Format a relative time
pub fn format_relative_time(raw: &str) -> String {
    let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) else {
        return raw.to_string();
    };
    let diff = chrono::Utc::now().signed_duration_since(dt.with_timezone(&chrono::Utc));

    if diff.num_seconds() < 60 {
        "just now".to_string()
    } else if diff.num_minutes() < 60 {
        format!("{} minute(s) ago", diff.num_minutes())
    } else if diff.num_hours() < 24 {
        format!("{} hour(s) ago", diff.num_hours())
    } else if diff.num_days() < 30 {
        format!("{} day(s) ago", diff.num_days())
    } else {
        format_timestamp(raw)
    }
}

/// Format bytes to human readable
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// A unit-interval metric as a percentage
pub fn format_unit(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

/// A judge score out of 10, colored by band
pub fn format_judge_score(value: f64) -> String {
    let text = format!("{:.1}/10", value);
    if value >= 7.0 {
        text.green().to_string()
    } else if value >= 4.0 {
        text.yellow().to_string()
    } else {
        text.red().to_string()
    }
}

/// Truncate long text for a table cell
pub fn truncate(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

/// Fact-checking label with color
pub fn label_badge(label: &str) -> String {
    match label.to_uppercase().as_str() {
        "SUPPORTS" | "SUPPORTED" | "TRUE" => label.green().to_string(),
        "REFUTES" | "REFUTED" | "FALSE" => label.red().to_string(),
        "NOT ENOUGH INFO" | "NEI" => label.yellow().to_string(),
        _ => label.to_string(),
    }
}
