//! User interface module - status lines and multi-line reports.
//!
//! Separates concerns:
//! - `formatter` - Single-line formatting functions
//! - This module - Block reports (summary, next steps)

use console::style;

use crate::domain::ReleaseRecord;

pub mod formatter;

// Re-export formatter functions for convenience
pub use formatter::{
    display_dry_run, display_error, display_status, display_success, display_verbose,
    display_version_change, display_warning,
};

const RULE_WIDTH: usize = 80;

fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

/// Lines of the manual follow-up needed to open a package-index pull request.
pub fn next_steps_lines(checkout: &str, branch: &str, commit_message: &str) -> Vec<String> {
    vec![
        format!("1. cd {}", checkout),
        format!("2. git checkout -b {}", branch),
        "3. git add .".to_string(),
        format!("4. git commit -m \"{}\"", commit_message),
        format!("5. git push -u origin {}", branch),
        "6. Create a pull request on GitHub".to_string(),
    ]
}

/// Display the follow-up for a package index that was updated locally.
pub fn display_next_steps(title: &str, checkout: &str, branch: &str, commit_message: &str) {
    println!("\n{}", rule());
    println!("{} {}", style("✓").green(), title);
    println!("Next steps for creating a PR:");
    for line in next_steps_lines(checkout, branch, commit_message) {
        println!("{}", line);
    }
    println!("{}\n", rule());
}

/// Display the final summary of a release run.
pub fn display_summary(record: &ReleaseRecord, dry_run: bool) {
    println!("\n{}", rule());
    let headline = if dry_run {
        format!("Dry run for version {} complete", record.version)
    } else {
        format!("Version {} released successfully!", record.version)
    };
    println!("{}", style(headline).green().bold());
    println!("  Previous version: {}", record.previous);
    if let Some(digest) = &record.digest {
        println!("  Archive SHA512:   {}", digest);
    }
    if !record.skipped.is_empty() {
        let names: Vec<&str> = record.skipped.iter().map(|s| s.name()).collect();
        println!("  Skipped stages:   {}", names.join(", "));
    }
    if !record.warnings.is_empty() {
        println!("  Warnings:");
        for warning in &record.warnings {
            println!("    - {}", warning);
        }
    }
    println!("{}", rule());
}
