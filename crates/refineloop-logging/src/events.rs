use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

/// Model role a call was made for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelRole {
    Generator,
    Critic,
}

impl std::fmt::Display for ModelRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelRole::Generator => write!(f, "generator"),
            ModelRole::Critic => write!(f, "critic"),
        }
    }
}

/// Structured log events for the generate-critique-refine loop.
///
/// Iteration numbers are 1-based.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogEvent {
    LoopStarted {
        prompt: String,
        criteria: Vec<String>,
        threshold: f64,
        max_iterations: usize,
    },
    GeneratorStarted {
        iteration: usize,
        temperature: f64,
        prompt_preview: String,
    },
    GeneratorCompleted {
        iteration: usize,
        output_chars: usize,
        duration_secs: f64,
    },
    CriticStarted {
        iteration: usize,
    },
    CriticCompleted {
        iteration: usize,
        scores: Vec<(String, f64)>,
        average_score: f64,
        meets_threshold: bool,
        duration_secs: f64,
    },
    /// A transient call failure that will be retried after a delay
    RetryScheduled {
        iteration: usize,
        role: ModelRole,
        attempt: u32,
        delay_ms: u64,
        error: String,
    },
    TemperatureAdjusted {
        iteration: usize,
        from: f64,
        to: f64,
    },
    LoopCompleted {
        iterations: usize,
        average_score: f64,
        duration_secs: f64,
    },
    MaxIterationsReached {
        iterations: usize,
    },
    ErrorEncountered {
        iteration: usize,
        reason: String,
        error: String,
    },
}

impl LogEvent {
    /// Add a timestamp to serialize with the event
    fn with_timestamp(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "timestamp".to_string(),
                serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }
        value
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format with colors and visual structure
    #[default]
    Pretty,
    /// JSON lines format for machine consumption
    Json,
    /// Compact single-line format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// Logger for loop events - handles both console output and file logging
pub struct Logger {
    format: LogFormat,
    console: bool,
    file_writer: Option<Mutex<File>>,
}

impl Logger {
    pub fn new(format: LogFormat) -> Self {
        Self {
            format,
            console: true,
            file_writer: None,
        }
    }

    /// Logger that discards everything, for tests and library callers
    pub fn silent() -> Self {
        Self {
            format: LogFormat::default(),
            console: false,
            file_writer: None,
        }
    }

    /// Create a logger with file output in addition to console
    pub fn with_file(format: LogFormat, log_path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        Ok(Self {
            format,
            console: true,
            file_writer: Some(Mutex::new(file)),
        })
    }

    pub fn log(&self, event: &LogEvent) {
        // File output is always JSON lines
        if let Some(ref writer) = self.file_writer {
            if let Ok(mut file) = writer.lock() {
                let json = event.with_timestamp();
                let _ = writeln!(file, "{}", json);
            }
        }

        if !self.console {
            return;
        }

        match self.format {
            LogFormat::Json => self.log_json(event),
            LogFormat::Pretty => self.log_pretty(event),
            LogFormat::Compact => self.log_compact(event),
        }
    }

    fn log_json(&self, event: &LogEvent) {
        if let Ok(json) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{}", json);
        }
    }

    fn log_pretty(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        match event {
            LogEvent::LoopStarted {
                prompt,
                criteria,
                threshold,
                max_iterations,
            } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{}",
                    "╭─────────────────────────────────────────────────────────────────────╮"
                        .bright_blue()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {}{}",
                    "│".bright_blue(),
                    "refineloop".bold().bright_white(),
                    " ".repeat(57) + &"│".bright_blue().to_string()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {} {}",
                    "│".bright_blue(),
                    "Prompt:".dimmed(),
                    Self::truncate_with_padding(prompt, 60, 68).dimmed()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {} {}",
                    "│".bright_blue(),
                    "Criteria:".dimmed(),
                    Self::truncate_with_padding(&criteria.join(", "), 55, 66).dimmed()
                );
                let limits = format!("threshold {threshold:.2}, up to {max_iterations} iterations");
                let _ = writeln!(
                    stderr,
                    "{}  {} {}",
                    "│".bright_blue(),
                    "Limits:".dimmed(),
                    Self::truncate_with_padding(&limits, 60, 68).dimmed()
                );
                let _ = writeln!(
                    stderr,
                    "{}",
                    "╰─────────────────────────────────────────────────────────────────────╯"
                        .bright_blue()
                );
                let _ = writeln!(stderr);
            }
            LogEvent::GeneratorStarted {
                iteration,
                temperature,
                ..
            } => {
                let iter_text = format!("─ Iteration {} ", iteration);
                let padding = "─".repeat(67usize.saturating_sub(iter_text.chars().count()));
                let _ = writeln!(
                    stderr,
                    "{}{}{}",
                    "┌".bright_blue(),
                    iter_text.bright_blue().bold(),
                    padding.bright_blue()
                );
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "  {} {} {}",
                    "▶".bright_cyan(),
                    "GENERATOR".bright_cyan().bold(),
                    format!("(temperature {:.2})", temperature).dimmed()
                );
            }
            LogEvent::GeneratorCompleted {
                output_chars,
                duration_secs,
                ..
            } => {
                let _ = writeln!(
                    stderr,
                    "    {} Drafted {} chars ({:.1}s)",
                    "✓".bright_green(),
                    output_chars,
                    duration_secs
                );
                let _ = writeln!(stderr);
            }
            LogEvent::CriticStarted { .. } => {
                let _ = writeln!(
                    stderr,
                    "  {} {}",
                    "▶".bright_magenta(),
                    "CRITIC".bright_magenta().bold()
                );
            }
            LogEvent::CriticCompleted {
                scores,
                average_score,
                meets_threshold,
                duration_secs,
                ..
            } => {
                for (name, score) in scores {
                    let _ = writeln!(stderr, "    {} {:<20} {:.2}", "│".dimmed(), name, score);
                }
                let verdict = format!("Average {:.2} ({:.1}s)", average_score, duration_secs);
                let styled = if *meets_threshold {
                    format!("✓ {}", verdict).bright_green().to_string()
                } else {
                    format!("→ {}", verdict).bright_yellow().to_string()
                };
                let _ = writeln!(stderr, "    {}", styled);
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{}",
                    "└─────────────────────────────────────────────────────────────────────┘"
                        .bright_blue()
                );
                let _ = writeln!(stderr);
            }
            LogEvent::RetryScheduled {
                role,
                attempt,
                delay_ms,
                error,
                ..
            } => {
                let _ = writeln!(
                    stderr,
                    "    {} {} call failed ({}), retry {} in {}ms",
                    "↻".bright_yellow(),
                    role,
                    error.dimmed(),
                    attempt,
                    delay_ms
                );
            }
            LogEvent::TemperatureAdjusted { from, to, .. } => {
                let _ = writeln!(
                    stderr,
                    "  {} Temperature {:.2} → {:.2}",
                    "⚙".dimmed(),
                    from,
                    to
                );
                let _ = writeln!(stderr);
            }
            LogEvent::LoopCompleted { .. } => {
                // The final result is printed by the binary
            }
            LogEvent::MaxIterationsReached { iterations } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{} Maximum iterations reached ({})",
                    "⚠".bright_yellow(),
                    iterations
                );
            }
            LogEvent::ErrorEncountered {
                iteration,
                reason,
                error,
            } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{} {} in iteration {}: {}",
                    "✗".bright_red(),
                    reason,
                    iteration,
                    error.bright_red()
                );
            }
        }
    }

    fn log_compact(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        let timestamp = chrono::Utc::now().format("%H:%M:%S");
        let msg = match event {
            LogEvent::LoopStarted { max_iterations, .. } => {
                format!("[{}] loop:start max={}", timestamp, max_iterations)
            }
            LogEvent::GeneratorStarted {
                iteration,
                temperature,
                ..
            } => format!(
                "[{}] gen:start:{} t={:.2}",
                timestamp, iteration, temperature
            ),
            LogEvent::GeneratorCompleted {
                iteration,
                output_chars,
                duration_secs,
            } => format!(
                "[{}] gen:done:{} {}c {:.1}s",
                timestamp, iteration, output_chars, duration_secs
            ),
            LogEvent::CriticStarted { iteration } => {
                format!("[{}] critic:start:{}", timestamp, iteration)
            }
            LogEvent::CriticCompleted {
                iteration,
                average_score,
                meets_threshold,
                ..
            } => format!(
                "[{}] critic:done:{} avg={:.2}{}",
                timestamp,
                iteration,
                average_score,
                if *meets_threshold { " pass" } else { "" }
            ),
            LogEvent::RetryScheduled {
                iteration,
                role,
                attempt,
                delay_ms,
                ..
            } => format!(
                "[{}] retry:{}:{} #{} {}ms",
                timestamp, role, iteration, attempt, delay_ms
            ),
            LogEvent::TemperatureAdjusted { iteration, from, to } => format!(
                "[{}] temp:{} {:.2}->{:.2}",
                timestamp, iteration, from, to
            ),
            LogEvent::LoopCompleted {
                iterations,
                duration_secs,
                ..
            } => format!(
                "[{}] loop:done:{} {:.1}s",
                timestamp, iterations, duration_secs
            ),
            LogEvent::MaxIterationsReached { iterations } => {
                format!("[{}] loop:limit:{}", timestamp, iterations)
            }
            LogEvent::ErrorEncountered {
                iteration,
                reason,
                error,
            } => format!("[{}] {}:{}:{}", timestamp, reason, iteration, error),
        };
        let _ = writeln!(stderr, "{}", msg);
    }

    /// Truncate a string and pad to exact width
    fn truncate_with_padding(s: &str, max_len: usize, total_width: usize) -> String {
        let truncated = if s.chars().count() > max_len {
            let head: String = s.chars().take(max_len - 3).collect();
            format!("{}...", head)
        } else {
            s.to_string()
        };

        let padding_needed = total_width.saturating_sub(truncated.chars().count() + 1);
        format!("{}{}│", truncated, " ".repeat(padding_needed))
    }
}
