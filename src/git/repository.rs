use crate::error::{ReleaseError, Result};
use git2::{Commit, ErrorCode, Repository as Git2Repo};
use std::path::{Path, PathBuf};

fn vcs(command: &'static str) -> impl Fn(git2::Error) -> ReleaseError {
    move |e| ReleaseError::vcs(command, e)
}

/// Wrapper around git2::Repository with our trait interface
pub struct Git2Repository {
    repo: Git2Repo,
    root: PathBuf,
}

impl Git2Repository {
    /// Discover the repository containing `path` (like `git rev-parse --show-toplevel`)
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Git2Repo::discover(path).map_err(vcs("git rev-parse --show-toplevel"))?;
        Self::from_git2(repo)
    }

    /// Create from existing git2::Repository
    pub fn from_git2(repo: Git2Repo) -> Result<Self> {
        let root = repo
            .workdir()
            .map(Path::to_path_buf)
            .ok_or_else(|| ReleaseError::config("bare repositories are not supported"))?;
        Ok(Git2Repository { repo, root })
    }

    fn head_commit(&self) -> Result<Option<Commit<'_>>> {
        match self.repo.head() {
            Ok(head) => Ok(Some(head.peel_to_commit().map_err(vcs("git rev-parse HEAD"))?)),
            Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
                Ok(None)
            }
            Err(e) => Err(ReleaseError::vcs("git rev-parse HEAD", e)),
        }
    }

    fn index_tree(&self, command: &'static str) -> Result<git2::Tree<'_>> {
        let mut index = self.repo.index().map_err(vcs(command))?;
        let tree_id = index.write_tree().map_err(vcs(command))?;
        self.repo.find_tree(tree_id).map_err(vcs(command))
    }

    fn remote_callbacks<'a>() -> git2::RemoteCallbacks<'a> {
        let mut callbacks = git2::RemoteCallbacks::new();
        callbacks.credentials(|_url, username_from_url, allowed_types| {
            if allowed_types.contains(git2::CredentialType::SSH_KEY) {
                let username = username_from_url.unwrap_or("git");
                if let Ok(cred) = git2::Cred::ssh_key_from_agent(username) {
                    return Ok(cred);
                }
                if let Some(home) = dirs::home_dir() {
                    for key in ["id_ed25519", "id_rsa", "id_ecdsa"] {
                        let path = home.join(".ssh").join(key);
                        if path.exists() {
                            if let Ok(cred) = git2::Cred::ssh_key(username, None, &path, None) {
                                return Ok(cred);
                            }
                        }
                    }
                }
            }

            // Fall back to default credentials
            git2::Cred::default()
        });

        // Surface per-ref rejections that libgit2 would otherwise report as success
        callbacks.push_update_reference(|refname, status| match status {
            Some(status) => Err(git2::Error::from_str(&format!(
                "remote rejected {}: {}",
                refname, status
            ))),
            None => Ok(()),
        });

        callbacks
    }
}

impl super::Repository for Git2Repository {
    fn root(&self) -> &Path {
        &self.root
    }

    fn current_branch(&self) -> Result<String> {
        let head = self
            .repo
            .head()
            .map_err(vcs("git rev-parse --abbrev-ref HEAD"))?;
        Ok(head.shorthand().unwrap_or("HEAD").to_string())
    }

    fn stage_all(&self) -> Result<()> {
        let mut index = self.repo.index().map_err(vcs("git add ."))?;
        index
            .add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)
            .map_err(vcs("git add ."))?;
        index.update_all(["*"].iter(), None).map_err(vcs("git add ."))?;
        index.write().map_err(vcs("git add ."))
    }

    fn stage_path(&self, path: &Path) -> Result<()> {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        let mut index = self.repo.index().map_err(vcs("git add"))?;
        index.add_path(relative).map_err(vcs("git add"))?;
        index.write().map_err(vcs("git add"))
    }

    fn commit(&self, message: &str) -> Result<String> {
        let tree = self.index_tree("git commit")?;
        let signature = self.repo.signature().map_err(vcs("git commit"))?;
        let parent = self.head_commit()?;
        let parents: Vec<&Commit> = parent.iter().collect();

        let oid = self
            .repo
            .commit(
                Some("HEAD"),
                &signature,
                &signature,
                message,
                &tree,
                &parents,
            )
            .map_err(vcs("git commit"))?;

        Ok(oid.to_string())
    }

    fn amend_head(&self) -> Result<String> {
        let head = self
            .head_commit()?
            .ok_or_else(|| ReleaseError::out_of_order("no commit to amend"))?;
        let tree = self.index_tree("git commit --amend")?;

        let oid = head
            .amend(Some("HEAD"), None, None, None, None, Some(&tree))
            .map_err(vcs("git commit --amend --no-edit"))?;

        Ok(oid.to_string())
    }

    fn create_annotated_tag(&self, name: &str, message: &str) -> Result<()> {
        let head = self
            .head_commit()?
            .ok_or_else(|| ReleaseError::out_of_order("no commit to tag"))?;
        let tagger = self.repo.signature().map_err(vcs("git tag -a"))?;

        self.repo
            .tag(name, head.as_object(), &tagger, message, false)
            .map_err(vcs("git tag -a"))?;

        Ok(())
    }

    fn push_ref(&self, remote: &str, refspec: &str) -> Result<()> {
        let mut remote = self.repo.find_remote(remote).map_err(vcs("git push"))?;

        let mut push_options = git2::PushOptions::new();
        push_options.remote_callbacks(Self::remote_callbacks());

        remote
            .push(&[refspec], Some(&mut push_options))
            .map_err(vcs("git push"))
    }
}
