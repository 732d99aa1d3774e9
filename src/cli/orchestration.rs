//! Release workflow orchestration
//!
//! Sequences the components into the `get`, `bump`, `set` and `release`
//! workflows. This decoupling from `clap` lets the workflows run
//! programmatically and against test doubles.

use std::path::Path;

use chrono::NaiveDate;

use crate::archive::{self, ArchiveSource, ArchiveVerifier};
use crate::changelog::{ChangelogEditor, ChangelogOutcome};
use crate::config::Config;
use crate::domain::{BumpKind, ReleaseRecord, SkipFlags, Stage, Version};
use crate::error::{ReleaseError, Result};
use crate::git::{Gateway, PushRef, Repository};
use crate::packages::{self, PackageUpdater};
use crate::patch;
use crate::publish::{GhCliPublisher, PublishOutcome, ReleasePublisher};
use crate::ui;
use crate::warning::ReleaseWarning;

/// How the new version is derived
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionTarget {
    Bump(BumpKind),
    Set(Version),
}

impl VersionTarget {
    pub fn resolve(&self, current: &Version) -> Result<Version> {
        match self {
            VersionTarget::Bump(kind) => current.bump(*kind),
            VersionTarget::Set(version) => Ok(*version),
        }
    }
}

/// Parse a literal version from user input.
///
/// A pre-release or build suffix is dropped; the returned warning says so.
pub fn parse_literal(text: &str) -> Result<(Version, Option<ReleaseWarning>)> {
    let version = Version::parse(text)?;
    let warning = Version::prerelease_suffix(text).map(|suffix| {
        ReleaseWarning::PrereleaseSuffixDropped {
            input: text.to_string(),
            suffix,
        }
    });
    Ok((version, warning))
}

/// Arguments for the release workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReleaseArgs {
    pub target: VersionTarget,
    pub skip: SkipFlags,
}

/// Global switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub dry_run: bool,
    pub verbose: bool,
}

/// Drives one run of the release pipeline against a repository.
pub struct Orchestrator<'a, S: ArchiveSource> {
    root: &'a Path,
    config: &'a Config,
    gateway: Gateway<'a>,
    verifier: ArchiveVerifier<S>,
    packages: Vec<Box<dyn PackageUpdater + 'a>>,
    publisher: Box<dyn ReleasePublisher + 'a>,
    options: RunOptions,
    today: NaiveDate,
}

impl<'a, S: ArchiveSource> Orchestrator<'a, S> {
    pub fn new(
        repo: &'a dyn Repository,
        config: &'a Config,
        verifier: ArchiveVerifier<S>,
        options: RunOptions,
    ) -> Self {
        let root = repo.root();
        Orchestrator {
            root,
            config,
            gateway: Gateway::new(repo, options.dry_run),
            verifier,
            packages: Vec::new(),
            publisher: Box::new(GhCliPublisher::new(root)),
            options,
            today: chrono::Local::now().date_naive(),
        }
    }

    pub fn with_package_updater(mut self, updater: Box<dyn PackageUpdater + 'a>) -> Self {
        self.packages.push(updater);
        self
    }

    pub fn with_publisher(mut self, publisher: Box<dyn ReleasePublisher + 'a>) -> Self {
        self.publisher = publisher;
        self
    }

    /// Date written into new changelog sections
    pub fn with_date(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    fn verbose(&self, message: &str) {
        if self.options.verbose {
            ui::display_verbose(message);
        }
    }

    /// Version declared by the build descriptor
    pub fn current_version(&self) -> Result<Version> {
        patch::discover_current_version(self.root)
    }

    /// `get`: print the current version
    pub fn get(&self) -> Result<Version> {
        let version = self.current_version()?;
        println!("Current version: {}", version);
        Ok(version)
    }

    /// `bump KIND`: bump, rewrite tracked files and commit
    pub fn bump(&mut self, kind: BumpKind) -> Result<Version> {
        self.set_target(VersionTarget::Bump(kind))
    }

    /// `set X.Y.Z`: rewrite tracked files to a literal version and commit
    pub fn set(&mut self, version: Version) -> Result<Version> {
        self.set_target(VersionTarget::Set(version))
    }

    fn set_target(&mut self, target: VersionTarget) -> Result<Version> {
        let previous = self.current_version()?;
        let version = target.resolve(&previous)?;
        if !self.update_version(&previous, &version)? {
            ui::display_warning(&ReleaseWarning::AlreadyAtVersion {
                version: version.to_string(),
            });
        }
        Ok(version)
    }

    /// Patch every tracked file and commit the result.
    ///
    /// Returns `false`, without committing, when no file needed a change.
    fn update_version(&mut self, previous: &Version, version: &Version) -> Result<bool> {
        ui::display_version_change(&previous.to_string(), &version.to_string());

        let targets = patch::collect_targets(self.root, &self.config.project)?;
        let reports = patch::apply(&targets, version, self.options.dry_run)?;
        for report in &reports {
            self.verbose(&format!(
                "Updating {} ({} replacement(s))",
                report.path.display(),
                report.replacements
            ));
        }

        if !reports.iter().any(|r| r.changed) {
            return Ok(false);
        }

        let message = format!("Bump version to {}", version);
        self.gateway.commit(&message)?;
        if !self.options.dry_run {
            ui::display_success(&format!("Changes committed with message: '{}'", message));
        }
        Ok(true)
    }

    /// `release`: the full pipeline.
    ///
    /// Stages run in [`Stage`] order; a failing stage aborts the rest and
    /// leaves earlier mutations in place.
    pub fn release(&mut self, args: ReleaseArgs) -> Result<ReleaseRecord> {
        let previous = self.current_version()?;
        let version = args.target.resolve(&previous)?;
        let mut record = ReleaseRecord::new(previous, version, args.skip.skipped_stages());
        for stage in &record.skipped {
            self.verbose(&format!("Skipping stage {}", stage));
        }

        if !self.update_version(&previous, &version)? {
            let warning = ReleaseWarning::AlreadyAtVersion {
                version: version.to_string(),
            };
            ui::display_warning(&warning);
            record.warnings.push(warning);
            record.skip_from(Stage::Changelog);
            ui::display_summary(&record, self.options.dry_run);
            return Ok(record);
        }

        if record.runs(Stage::Changelog) {
            self.update_changelog(&mut record)?;
        }

        if record.runs(Stage::Tag) {
            self.create_tag(&version)?;

            let digest = self.verifier.fetch_and_digest(&version, self.options.dry_run)?;
            record.digest = Some(digest.clone());

            self.update_hashes(&version, &digest)?;

            if record.runs(Stage::UpdatePackages) {
                self.update_packages(&mut record, &digest)?;
            }
        }

        if record.runs(Stage::GithubRelease) {
            self.create_github_release(&mut record)?;
        }

        ui::display_summary(&record, self.options.dry_run);
        Ok(record)
    }

    fn update_changelog(&mut self, record: &mut ReleaseRecord) -> Result<()> {
        let editor = ChangelogEditor::new(self.root);
        let outcome = editor.update(
            &record.version,
            self.today,
            self.options.dry_run,
            self.options.verbose,
        )?;

        match outcome {
            ChangelogOutcome::AlreadyPresent => {
                let warning = ReleaseWarning::ChangelogEntryExists {
                    version: record.version.to_string(),
                };
                ui::display_warning(&warning);
                record.warnings.push(warning);
            }
            ChangelogOutcome::Updated(path) => {
                ui::display_success(&format!(
                    "Updated CHANGELOG.md with version {}",
                    record.version
                ));
                self.gateway.amend_last_commit(&path)?;
                if !self.options.dry_run {
                    ui::display_success("Added CHANGELOG.md to version commit");
                }
            }
        }
        Ok(())
    }

    fn create_tag(&mut self, version: &Version) -> Result<()> {
        let tag = version.tag_name();
        self.gateway.tag(&tag, &format!("Version {}", version))?;
        self.gateway.push(PushRef::Tag(tag.clone()))?;
        if !self.options.dry_run {
            ui::display_success(&format!("Created and pushed tag: {}", tag));
        }
        Ok(())
    }

    fn update_hashes(&mut self, version: &Version, digest: &str) -> Result<()> {
        let url = archive::archive_url(&self.config.project.repository, version);
        let changed = packages::update_in_repo_hashes(
            self.root,
            version,
            &url,
            digest,
            self.options.dry_run,
        )?;
        for path in &changed {
            self.verbose(&format!("Updated hash in {}", path.display()));
        }

        if !changed.is_empty() {
            self.gateway
                .commit(&format!("Update SHA512 hash for version {}", version))?;
        }
        self.gateway.push(PushRef::CurrentBranch)?;
        if !self.options.dry_run {
            ui::display_success("Hash updates committed and pushed");
        }
        Ok(())
    }

    fn update_packages(&mut self, record: &mut ReleaseRecord, digest: &str) -> Result<()> {
        for updater in &self.packages {
            if self.options.verbose {
                ui::display_verbose(&format!(
                    "Updating {} package at {}",
                    updater.name(),
                    updater.checkout().display()
                ));
            }

            match updater.update(&record.version, digest, self.options.dry_run) {
                Ok(report) => {
                    if !self.options.dry_run {
                        ui::display_next_steps(
                            &format!("{} package updated successfully", report.updater),
                            &report.checkout.display().to_string(),
                            &report.branch,
                            &report.commit_message,
                        );
                    }
                }
                Err(ReleaseError::MissingExternalCheckout { path }) => {
                    let warning = ReleaseWarning::MissingCheckout {
                        updater: updater.name().to_string(),
                        path,
                    };
                    ui::display_warning(&warning);
                    record.warnings.push(warning);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn create_github_release(&mut self, record: &mut ReleaseRecord) -> Result<()> {
        let notes = ChangelogEditor::new(self.root).notes(&record.version)?;
        let outcome = self
            .publisher
            .publish(&record.version, notes.as_deref(), self.options.dry_run)?;

        let warning = match outcome {
            PublishOutcome::Published => {
                if !self.options.dry_run {
                    ui::display_success(&format!(
                        "Created GitHub release for version {}",
                        record.version
                    ));
                }
                return Ok(());
            }
            PublishOutcome::Unavailable(reason) => ReleaseWarning::PublisherUnavailable { reason },
            PublishOutcome::Failed(reason) => ReleaseWarning::PublishFailed { reason },
        };
        ui::display_warning(&warning);
        record.warnings.push(warning);
        Ok(())
    }
}
