//! Hosted release creation through the GitHub CLI.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output};

use tempfile::NamedTempFile;

use crate::domain::Version;
use crate::error::{ReleaseError, Result};
use crate::ui;

/// How a publish attempt ended. None of these abort the release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Published,
    /// The publisher cannot be used here (tool missing, not authenticated)
    Unavailable(String),
    /// The publisher ran and reported a failure
    Failed(String),
}

/// Creates a hosted release for a pushed tag.
pub trait ReleasePublisher {
    fn publish(&self, version: &Version, notes: Option<&str>, dry_run: bool)
        -> Result<PublishOutcome>;
}

/// Publisher backed by the `gh` command-line tool
pub struct GhCliPublisher {
    repo_root: PathBuf,
    program: String,
}

impl GhCliPublisher {
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        GhCliPublisher {
            repo_root: repo_root.into(),
            program: "gh".to_string(),
        }
    }

    /// Use a different executable in place of `gh`
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn run(&self, args: &[&str]) -> std::io::Result<Output> {
        Command::new(&self.program)
            .args(args)
            .current_dir(&self.repo_root)
            .output()
    }

    fn succeeds(&self, args: &[&str]) -> bool {
        self.run(args).map(|o| o.status.success()).unwrap_or(false)
    }

    /// Arguments for `gh release create`
    pub fn create_args(version: &Version, notes_file: Option<&str>) -> Vec<String> {
        let mut args = vec![
            "release".to_string(),
            "create".to_string(),
            version.tag_name(),
            "--title".to_string(),
            format!("Version {}", version),
        ];
        if let Some(path) = notes_file {
            args.push("--notes-file".to_string());
            args.push(path.to_string());
        } else {
            args.push("--notes".to_string());
            args.push(String::new());
        }
        args
    }
}

impl ReleasePublisher for GhCliPublisher {
    fn publish(
        &self,
        version: &Version,
        notes: Option<&str>,
        dry_run: bool,
    ) -> Result<PublishOutcome> {
        if dry_run {
            ui::display_dry_run(&format!("create GitHub release {}", version.tag_name()));
            return Ok(PublishOutcome::Published);
        }

        if !self.succeeds(&["--version"]) {
            return Ok(PublishOutcome::Unavailable(
                "GitHub CLI not installed. Please install it to create GitHub releases"
                    .to_string(),
            ));
        }
        if !self.succeeds(&["auth", "status"]) {
            return Ok(PublishOutcome::Unavailable(
                "Not authenticated with GitHub CLI. Please run 'gh auth login'".to_string(),
            ));
        }

        // Kept alive until `gh` has read it; removed on drop
        let notes_file = match notes {
            Some(text) => Some(write_notes(text).map_err(|e| {
                ReleaseError::publish(format!("could not write release notes: {}", e))
            })?),
            None => None,
        };
        let notes_path = notes_file
            .as_ref()
            .map(|f| f.path().to_string_lossy().into_owned());

        let args = Self::create_args(version, notes_path.as_deref());
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();

        match self.run(&arg_refs) {
            Ok(output) if output.status.success() => Ok(PublishOutcome::Published),
            Ok(output) => Ok(PublishOutcome::Failed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            )),
            Err(e) => Ok(PublishOutcome::Failed(e.to_string())),
        }
    }
}

fn write_notes(text: &str) -> std::io::Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    file.write_all(text.as_bytes())?;
    file.flush()?;
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_args_with_notes() {
        let args = GhCliPublisher::create_args(&Version::new(1, 2, 0), Some("/tmp/notes.md"));
        assert_eq!(
            args,
            vec![
                "release",
                "create",
                "v1.2.0",
                "--title",
                "Version 1.2.0",
                "--notes-file",
                "/tmp/notes.md"
            ]
        );
    }

    #[test]
    fn test_create_args_without_notes() {
        let args = GhCliPublisher::create_args(&Version::new(1, 2, 0), None);
        assert_eq!(args[5], "--notes");
        assert_eq!(args[6], "");
    }

    #[test]
    fn test_write_notes() {
        let file = write_notes("## [1.2.0]\n").unwrap();
        assert_eq!(std::fs::read_to_string(file.path()).unwrap(), "## [1.2.0]\n");
    }

    #[test]
    fn test_missing_program_is_unavailable() {
        let publisher = GhCliPublisher::new(std::env::temp_dir())
            .with_program("release-flow-no-such-gh-binary");
        let outcome = publisher
            .publish(&Version::new(1, 0, 0), None, false)
            .unwrap();
        assert!(matches!(outcome, PublishOutcome::Unavailable(_)));
    }

    #[test]
    fn test_dry_run_does_not_invoke_program() {
        let publisher = GhCliPublisher::new(std::env::temp_dir())
            .with_program("release-flow-no-such-gh-binary");
        let outcome = publisher
            .publish(&Version::new(1, 0, 0), Some("notes"), true)
            .unwrap();
        assert_eq!(outcome, PublishOutcome::Published);
    }
}
