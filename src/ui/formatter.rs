//! Pure formatting functions for UI output.
//!
//! This module contains all display/formatting logic separated from user interaction.
//! `format_*` functions build strings and are testable; `display_*` print them.

use console::style;

use crate::domain::VersionRecord;
use crate::preconditions::CheckStatus;
use crate::version_file::EditOutcome;

/// Format and print an error message in red.
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("ERROR:").red().bold(), message);
}

/// Format and print a warning in yellow.
pub fn display_warning(message: &str) {
    eprintln!("{} {}", style("WARNING:").yellow().bold(), message);
}

/// Format and print a success message with green checkmark.
pub fn display_success(message: &str) {
    println!("{} {}", style("✓").green(), message);
}

/// Format and print a status message with yellow arrow.
pub fn display_status(message: &str) {
    println!("{} {}", style("→").yellow(), message);
}

/// Describe a version transition, e.g. `1.2.3.pre -> 1.2.3`.
pub fn format_transition(previous: &VersionRecord, current: &VersionRecord) -> String {
    if previous.version_string() == current.version_string() {
        format!("version stays at {}", current)
    } else {
        format!("{} -> {}", previous, current)
    }
}

/// Display the result of rewriting the version file.
pub fn display_edit_outcome(file: &str, outcome: &EditOutcome) {
    match (&outcome.previous, &outcome.current) {
        (Some(previous), Some(current)) => {
            let mut line = format!("{}: {}", file, format_transition(previous, current));
            if outcome.matched > 1 {
                line.push_str(&format!(" ({} declarations rewritten)", outcome.matched));
            }
            display_success(&line);
        }
        _ => display_warning(&format!("{}: no version declaration found", file)),
    }
}

/// Describe the outcome of a precondition check.
pub fn format_check(name: &str, status: CheckStatus) -> String {
    match status {
        CheckStatus::Passed => format!("{}: ok", name),
        CheckStatus::Skipped(reason) => format!("{}: skipped ({})", name, reason),
    }
}

/// Display the outcome of a precondition check.
pub fn display_check(name: &str, status: CheckStatus) {
    match status {
        CheckStatus::Passed => display_success(&format_check(name, status)),
        CheckStatus::Skipped(_) => display_status(&format_check(name, status)),
    }
}

/// Tell the user how to finish a push that was not performed.
pub fn display_manual_push_instruction(remote: &str, branch: &str) {
    println!(
        "\n{} Commit created locally. Push it with:",
        style("ℹ").blue()
    );
    println!("  git push {} {}\n", remote, branch);
}
