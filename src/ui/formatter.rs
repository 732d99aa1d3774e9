//! Pure formatting functions for UI output.
//!
//! This module contains all single-line display logic. Styling goes through
//! `console`, which drops colors automatically when output is not a terminal.

use console::style;

use crate::warning::ReleaseWarning;

/// Format and print an error message in red.
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("ERROR:").red().bold(), message);
}

/// Format and print a success message with green checkmark.
pub fn display_success(message: &str) {
    println!("{} {}", style("✓").green(), message);
}

/// Format and print a status message with yellow arrow.
pub fn display_status(message: &str) {
    println!("{} {}", style("→").yellow(), message);
}

/// Format and print a detail line, only shown with `--verbose`.
pub fn display_verbose(message: &str) {
    println!("  {}", style(message).dim());
}

/// Format and print an action that dry-run mode suppressed.
pub fn display_dry_run(message: &str) {
    println!("{} would {}", style("[dry-run]").cyan(), message);
}

/// Display a release warning to the user.
///
/// Shows a yellow warning icon followed by the warning message.
pub fn display_warning(warning: &ReleaseWarning) {
    eprintln!("{} {}", style("⚠ WARNING:").yellow(), warning);
}

/// Display the version change about to be applied.
pub fn display_version_change(from: &str, to: &str) {
    println!(
        "Updating version from {} to {}",
        style(from).red(),
        style(to).green()
    );
}
