//! Version-control gateway
//!
//! This module provides a trait-based abstraction over the git operations a
//! release needs, and the [`Gateway`] that sequences them.
//!
//! # Overview
//!
//! - [Repository]: the seam over git itself, with two implementations
//!   - [repository::Git2Repository]: a real implementation using the `git2` crate
//!   - [mock::MockRepository]: records calls, for testing
//! - [Gateway]: the only path through which a release mutates history. It
//!   honours dry-run mode and refuses out-of-order operations (tagging before
//!   the bump commit exists, pushing a tag that was not created).
//!
//! Read-only queries (`root`, `current_branch`) go straight to the
//! [Repository] and run even in dry-run mode.

pub mod mock;
pub mod repository;

pub use mock::{MockRepository, VcsCall};
pub use repository::Git2Repository;

use std::path::Path;

use crate::error::{ReleaseError, Result};
use crate::ui;

/// Remote that tags and branches are pushed to
pub const DEFAULT_REMOTE: &str = "origin";

/// Common git operation trait for abstraction
///
/// All methods return [crate::error::Result<T>]. Implementations map
/// underlying failures to [ReleaseError::VcsCommandFailed].
pub trait Repository {
    /// Working tree root of the repository
    fn root(&self) -> &Path;

    /// Short name of the checked-out branch, `HEAD` when detached
    fn current_branch(&self) -> Result<String>;

    /// Stage every change in the working tree (`git add .`)
    fn stage_all(&self) -> Result<()>;

    /// Stage one file, given relative to the root or absolute inside it
    fn stage_path(&self, path: &Path) -> Result<()>;

    /// Commit the index on top of HEAD, returning the new commit id
    fn commit(&self, message: &str) -> Result<String>;

    /// Replace HEAD with a commit of the current index, keeping its message
    fn amend_head(&self) -> Result<String>;

    /// Create an annotated tag on HEAD
    fn create_annotated_tag(&self, name: &str, message: &str) -> Result<()>;

    /// Push a single ref (e.g. `refs/tags/v1.2.3`) to a remote
    fn push_ref(&self, remote: &str, refspec: &str) -> Result<()>;
}

/// What a [`Gateway::push`] sends to the remote
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushRef {
    /// A tag created earlier in the same run
    Tag(String),
    /// The checked-out branch
    CurrentBranch,
}

/// Sole mutator of commit and tag history during a release run.
pub struct Gateway<'r> {
    repo: &'r dyn Repository,
    dry_run: bool,
    remote: String,
    commits: usize,
    tags: Vec<String>,
}

impl<'r> Gateway<'r> {
    pub fn new(repo: &'r dyn Repository, dry_run: bool) -> Self {
        Gateway {
            repo,
            dry_run,
            remote: DEFAULT_REMOTE.to_string(),
            commits: 0,
            tags: Vec::new(),
        }
    }

    /// Number of commits made (or simulated) through this gateway
    pub fn commits(&self) -> usize {
        self.commits
    }

    /// Stage all changes and commit them.
    pub fn commit(&mut self, message: &str) -> Result<()> {
        if self.dry_run {
            ui::display_dry_run(&format!("commit all changes with message '{}'", message));
        } else {
            self.repo.stage_all()?;
            self.repo.commit(message)?;
        }
        self.commits += 1;
        Ok(())
    }

    /// Fold `path` into the last commit made in this run.
    pub fn amend_last_commit(&mut self, path: &Path) -> Result<()> {
        if self.commits == 0 {
            return Err(ReleaseError::out_of_order(
                "cannot amend before a commit was made",
            ));
        }
        if self.dry_run {
            ui::display_dry_run(&format!("amend last commit with {}", path.display()));
            return Ok(());
        }
        self.repo.stage_path(path)?;
        self.repo.amend_head()?;
        Ok(())
    }

    /// Create an annotated tag. Requires a commit made in this run.
    pub fn tag(&mut self, name: &str, message: &str) -> Result<()> {
        if self.commits == 0 {
            return Err(ReleaseError::out_of_order(format!(
                "tag '{}' requested before the version commit exists",
                name
            )));
        }
        if self.dry_run {
            ui::display_dry_run(&format!("create tag {} ('{}')", name, message));
        } else {
            self.repo.create_annotated_tag(name, message)?;
        }
        self.tags.push(name.to_string());
        Ok(())
    }

    /// Push a tag or the current branch to the remote.
    pub fn push(&mut self, target: PushRef) -> Result<()> {
        let refspec = match &target {
            PushRef::Tag(name) => {
                if !self.tags.contains(name) {
                    return Err(ReleaseError::out_of_order(format!(
                        "tag '{}' must be created before it is pushed",
                        name
                    )));
                }
                format!("refs/tags/{}", name)
            }
            PushRef::CurrentBranch => {
                if self.commits == 0 {
                    return Err(ReleaseError::out_of_order(
                        "nothing committed, refusing to push",
                    ));
                }
                format!("refs/heads/{}", self.repo.current_branch()?)
            }
        };

        if self.dry_run {
            ui::display_dry_run(&format!("push {} to {}", refspec, self.remote));
            return Ok(());
        }
        self.repo.push_ref(&self.remote, &refspec)
    }
}
