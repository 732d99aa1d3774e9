use crate::error::{ReleaseError, Result};
use crate::git::Repository;
use std::cell::RefCell;
use std::path::{Path, PathBuf};

/// A call recorded by [`MockRepository`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VcsCall {
    CurrentBranch,
    StageAll,
    StagePath(PathBuf),
    Commit(String),
    Amend,
    Tag { name: String, message: String },
    Push { remote: String, refspec: String },
}

impl VcsCall {
    fn op(&self) -> &'static str {
        match self {
            VcsCall::CurrentBranch => "current_branch",
            VcsCall::StageAll => "stage_all",
            VcsCall::StagePath(_) => "stage_path",
            VcsCall::Commit(_) => "commit",
            VcsCall::Amend => "amend",
            VcsCall::Tag { .. } => "tag",
            VcsCall::Push { .. } => "push",
        }
    }

    /// True for calls that change the repository or a remote
    pub fn is_mutation(&self) -> bool {
        !matches!(self, VcsCall::CurrentBranch)
    }
}

/// Mock repository for testing without actual git operations
pub struct MockRepository {
    root: PathBuf,
    branch: String,
    fail_on: Option<&'static str>,
    calls: RefCell<Vec<VcsCall>>,
}

impl MockRepository {
    /// Create a mock rooted at `root` on branch `main`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        MockRepository {
            root: root.into(),
            branch: "main".to_string(),
            fail_on: None,
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Make every call of the named operation fail (e.g. "commit", "push")
    pub fn failing_on(mut self, op: &'static str) -> Self {
        self.fail_on = Some(op);
        self
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    /// All calls in order
    pub fn calls(&self) -> Vec<VcsCall> {
        self.calls.borrow().clone()
    }

    /// Calls that would have changed the repository or a remote
    pub fn mutations(&self) -> Vec<VcsCall> {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.is_mutation())
            .cloned()
            .collect()
    }

    /// Messages of the commits made, in order
    pub fn commit_messages(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                VcsCall::Commit(message) => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: VcsCall) -> Result<()> {
        if self.fail_on == Some(call.op()) {
            return Err(ReleaseError::VcsCommandFailed {
                command: format!("git {}", call.op()),
                code: 1,
                stderr: "simulated failure".to_string(),
            });
        }
        self.calls.borrow_mut().push(call);
        Ok(())
    }
}

impl Repository for MockRepository {
    fn root(&self) -> &Path {
        &self.root
    }

    fn current_branch(&self) -> Result<String> {
        self.record(VcsCall::CurrentBranch)?;
        Ok(self.branch.clone())
    }

    fn stage_all(&self) -> Result<()> {
        self.record(VcsCall::StageAll)
    }

    fn stage_path(&self, path: &Path) -> Result<()> {
        self.record(VcsCall::StagePath(path.to_path_buf()))
    }

    fn commit(&self, message: &str) -> Result<String> {
        self.record(VcsCall::Commit(message.to_string()))?;
        Ok(format!("{:040x}", self.calls.borrow().len()))
    }

    fn amend_head(&self) -> Result<String> {
        self.record(VcsCall::Amend)?;
        Ok(format!("{:040x}", self.calls.borrow().len()))
    }

    fn create_annotated_tag(&self, name: &str, message: &str) -> Result<()> {
        self.record(VcsCall::Tag {
            name: name.to_string(),
            message: message.to_string(),
        })
    }

    fn push_ref(&self, remote: &str, refspec: &str) -> Result<()> {
        self.record(VcsCall::Push {
            remote: remote.to_string(),
            refspec: refspec.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_repository_records_calls() {
        let repo = MockRepository::new("/tmp/repo");
        repo.stage_all().unwrap();
        repo.commit("first").unwrap();
        repo.current_branch().unwrap();

        assert_eq!(repo.calls().len(), 3);
        assert_eq!(repo.mutations().len(), 2);
        assert_eq!(repo.commit_messages(), vec!["first".to_string()]);
    }

    #[test]
    fn test_mock_repository_branch() {
        let repo = MockRepository::new("/tmp/repo").with_branch("develop");
        assert_eq!(repo.current_branch().unwrap(), "develop");
        assert_eq!(repo.root(), Path::new("/tmp/repo"));
    }

    #[test]
    fn test_mock_repository_failure() {
        let repo = MockRepository::new("/tmp/repo").failing_on("push");
        assert!(repo.push_ref("origin", "refs/tags/v1.0.0").is_err());
        assert!(repo.calls().is_empty());
    }
}
