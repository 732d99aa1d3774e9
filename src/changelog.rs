//! Changelog editor
//!
//! Maintains a Keep a Changelog style `CHANGELOG.md`: one `## [X.Y.Z] - date`
//! section per version, newest first.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::domain::Version;
use crate::error::Result;
use crate::ui;

pub const CHANGELOG_FILE: &str = "CHANGELOG.md";

const PREAMBLE: &str = "# Changelog

All notable changes to this project will be documented in this file.

The format is based on [Keep a Changelog](https://keepachangelog.com/en/1.0.0/),
and this project adheres to [Semantic Versioning](https://semver.org/spec/v2.0.0.html).

";

const SECTION_PREFIX: &str = "## [";

/// Result of an upsert
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Upsert {
    /// A section for the version already exists; the document is unchanged
    AlreadyPresent,
    /// A section was inserted into an existing document
    Inserted(String),
    /// No document existed; this is a new one
    Created(String),
}

fn header(version: &Version) -> String {
    format!("{}{}]", SECTION_PREFIX, version)
}

/// The templated section for a new version
pub fn section_template(version: &Version, date: NaiveDate) -> String {
    format!(
        "{} - {}

### Added
- [Add your new features here]

### Changed
- [Add your changes here]

### Fixed
- [Add your bug fixes here]

",
        header(version),
        date.format("%Y-%m-%d")
    )
}

/// Byte offsets of every line starting with `## [`
fn section_starts(document: &str) -> Vec<usize> {
    let mut starts = Vec::new();
    let mut offset = 0;
    for line in document.split_inclusive('\n') {
        if line.starts_with(SECTION_PREFIX) {
            starts.push(offset);
        }
        offset += line.len();
    }
    starts
}

fn find_section(document: &str, version: &Version) -> Option<usize> {
    let wanted = header(version);
    section_starts(document)
        .into_iter()
        .find(|&start| document[start..].starts_with(&wanted))
}

/// Insert a section for `version` unless one exists.
///
/// New sections go right before the first existing version section, so the
/// preamble and all prior sections are kept verbatim and in order.
pub fn upsert(document: Option<&str>, version: &Version, date: NaiveDate) -> Upsert {
    let section = section_template(version, date);

    let Some(document) = document else {
        return Upsert::Created(format!("{}{}", PREAMBLE, section));
    };

    if find_section(document, version).is_some() {
        return Upsert::AlreadyPresent;
    }

    let updated = match section_starts(document).first() {
        Some(&first) => format!("{}{}{}", &document[..first], section, &document[first..]),
        None => {
            let separator = if document.is_empty() || document.ends_with("\n\n") {
                ""
            } else if document.ends_with('\n') {
                "\n"
            } else {
                "\n\n"
            };
            format!("{}{}{}", document, separator, section)
        }
    };
    Upsert::Inserted(updated)
}

/// Text of the section for `version`, up to the next version section
pub fn section<'a>(document: &'a str, version: &Version) -> Option<&'a str> {
    let start = find_section(document, version)?;
    let end = section_starts(document)
        .into_iter()
        .find(|&s| s > start)
        .unwrap_or(document.len());
    Some(&document[start..end])
}

/// What [`ChangelogEditor::update`] did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangelogOutcome {
    AlreadyPresent,
    Updated(PathBuf),
}

/// Reads and writes the changelog of a repository.
pub struct ChangelogEditor<'a> {
    repo_root: &'a Path,
}

impl<'a> ChangelogEditor<'a> {
    pub fn new(repo_root: &'a Path) -> Self {
        ChangelogEditor { repo_root }
    }

    pub fn path(&self) -> PathBuf {
        self.repo_root.join(CHANGELOG_FILE)
    }

    /// Upsert the section for `version` into `CHANGELOG.md`, creating the file if needed.
    pub fn update(
        &self,
        version: &Version,
        date: NaiveDate,
        dry_run: bool,
        verbose: bool,
    ) -> Result<ChangelogOutcome> {
        let path = self.path();
        let existing = if path.exists() {
            Some(fs::read_to_string(&path)?)
        } else {
            if verbose {
                ui::display_verbose("Creating new CHANGELOG.md file");
            }
            None
        };

        let content = match upsert(existing.as_deref(), version, date) {
            Upsert::AlreadyPresent => return Ok(ChangelogOutcome::AlreadyPresent),
            Upsert::Inserted(content) | Upsert::Created(content) => content,
        };

        if dry_run {
            ui::display_dry_run(&format!("add version {} to {}", version, path.display()));
        } else {
            fs::write(&path, content)?;
        }
        Ok(ChangelogOutcome::Updated(path))
    }

    /// Release notes for `version`, if the changelog has a section for it
    pub fn notes(&self, version: &Version) -> Result<Option<String>> {
        let path = self.path();
        if !path.exists() {
            return Ok(None);
        }
        let document = fs::read_to_string(path)?;
        Ok(section(&document, version).map(str::to_string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
    }

    const EXISTING: &str = "# Changelog

Custom preamble kept as is.

## [1.0.0] - 2024-01-01

### Added
- First release

## [0.9.0] - 2023-12-01

### Fixed
- Old bug
";

    #[test]
    fn test_create_new_document() {
        match upsert(None, &Version::new(1, 0, 0), date()) {
            Upsert::Created(doc) => {
                assert!(doc.starts_with("# Changelog\n"));
                assert!(doc.contains("## [1.0.0] - 2024-03-09\n"));
                assert!(doc.contains("### Added\n- [Add your new features here]"));
                assert!(doc.contains("### Changed"));
                assert!(doc.contains("### Fixed"));
            }
            other => panic!("expected Created, got {:?}", other),
        }
    }

    #[test]
    fn test_insert_before_latest_section() {
        let result = upsert(Some(EXISTING), &Version::new(1, 1, 0), date());
        let Upsert::Inserted(doc) = result else {
            panic!("expected Inserted");
        };

        let new_pos = doc.find("## [1.1.0] - 2024-03-09").unwrap();
        let old_pos = doc.find("## [1.0.0]").unwrap();
        assert!(new_pos < old_pos);
        assert!(doc.starts_with("# Changelog\n\nCustom preamble kept as is.\n\n## [1.1.0]"));
        assert!(doc.ends_with(&EXISTING[EXISTING.find("## [1.0.0]").unwrap()..]));
    }

    #[test]
    fn test_existing_version_is_noop() {
        assert_eq!(
            upsert(Some(EXISTING), &Version::new(0, 9, 0), date()),
            Upsert::AlreadyPresent
        );
    }

    #[test]
    fn test_prefix_version_is_not_a_match() {
        let doc = "# Changelog\n\n## [1.0.10] - 2024-01-01\n";
        assert!(matches!(
            upsert(Some(doc), &Version::new(1, 0, 1), date()),
            Upsert::Inserted(_)
        ));
    }

    #[test]
    fn test_document_without_sections_gets_appended() {
        let Upsert::Inserted(doc) = upsert(Some("# Changelog"), &Version::new(0, 1, 0), date())
        else {
            panic!("expected Inserted");
        };
        assert!(doc.starts_with("# Changelog\n\n## [0.1.0] - 2024-03-09\n"));
    }

    #[test]
    fn test_section_extraction() {
        let text = section(EXISTING, &Version::new(1, 0, 0)).unwrap();
        assert!(text.starts_with("## [1.0.0] - 2024-01-01"));
        assert!(text.contains("- First release"));
        assert!(!text.contains("0.9.0"));

        let last = section(EXISTING, &Version::new(0, 9, 0)).unwrap();
        assert!(last.ends_with("- Old bug\n"));
        assert!(section(EXISTING, &Version::new(2, 0, 0)).is_none());
    }

    #[test]
    fn test_editor_update_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let editor = ChangelogEditor::new(dir.path());
        let version = Version::new(1, 2, 4);

        let first = editor.update(&version, date(), false, false).unwrap();
        assert_eq!(first, ChangelogOutcome::Updated(dir.path().join(CHANGELOG_FILE)));
        let before = fs::read_to_string(editor.path()).unwrap();

        let second = editor.update(&version, date(), false, false).unwrap();
        assert_eq!(second, ChangelogOutcome::AlreadyPresent);
        assert_eq!(fs::read_to_string(editor.path()).unwrap(), before);
    }

    #[test]
    fn test_editor_dry_run_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let editor = ChangelogEditor::new(dir.path());
        editor
            .update(&Version::new(1, 0, 0), date(), true, true)
            .unwrap();
        assert!(!editor.path().exists());
    }

    #[test]
    fn test_editor_notes() {
        let dir = TempDir::new().unwrap();
        let editor = ChangelogEditor::new(dir.path());
        assert_eq!(editor.notes(&Version::new(1, 0, 0)).unwrap(), None);

        fs::write(editor.path(), EXISTING).unwrap();
        let notes = editor.notes(&Version::new(1, 0, 0)).unwrap().unwrap();
        assert!(notes.contains("First release"));
    }
}
