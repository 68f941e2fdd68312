use colored::Colorize;

use refineloop_core::{LoopResult, TerminationReason};

/// Print the run summary and per-iteration details to stderr, and the final
/// text to stdout so it can be piped.
pub fn print_outcome(result: &LoopResult) {
    let header = if result.is_success() {
        "=== THRESHOLD MET ===".bright_green()
    } else if result.termination_reason.is_abort() {
        "=== FAILED ===".bright_red()
    } else {
        "=== INCOMPLETE ===".bright_yellow()
    };

    eprintln!();
    eprintln!("{}", header.bold());
    eprintln!("Reason: {}", result.termination_reason);
    eprintln!("{}", result.summary());
    eprintln!("Iterations: {}", result.iterations());
    eprintln!("Duration: {:.1}s", result.total_duration_secs);

    if !result.history.is_empty() {
        eprintln!();
        eprintln!(
            "{}",
            format!("{:>4}  {:>6}  {:>7}  {:>9}  feedback", "#", "temp", "avg", "next temp")
                .dimmed()
        );
        for record in &result.history {
            let marker = if record.meets_threshold {
                "✓".bright_green()
            } else {
                "·".dimmed()
            };
            eprintln!(
                "{:>4}  {:>6.2}  {:>7.2}  {:>9.2}  {} {}",
                record.index,
                record.temperature_used,
                record.average_score,
                record.suggested_next_temperature,
                marker,
                truncate(&record.feedback, 60)
            );
        }
    }

    if let Some(best) = result.history.best() {
        if result.termination_reason != TerminationReason::ThresholdMet
            && best.index != result.history.len()
        {
            eprintln!();
            eprintln!(
                "Note: iteration {} scored highest ({:.2}); the final text is from iteration {}.",
                best.index,
                best.average_score,
                result.history.len()
            );
        }
    }

    eprintln!();
    eprintln!("{}", "Final Generated Text:".bold());
    println!("{}", result.final_text);
}

fn truncate(s: &str, max_chars: usize) -> String {
    let single_line = s.replace('\n', " ");
    if single_line.chars().count() > max_chars {
        let head: String = single_line.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", head)
    } else {
        single_line
    }
}
