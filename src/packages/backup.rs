use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::ui;

/// A `.bak` copy of a file taken before it is rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileBackup {
    original: PathBuf,
    backup: PathBuf,
}

impl FileBackup {
    /// `<path>.bak`
    pub fn backup_path(path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_os_string();
        name.push(".bak");
        PathBuf::from(name)
    }

    /// Copy `path` to its backup location
    pub fn take(path: &Path) -> Result<Self> {
        let backup = Self::backup_path(path);
        fs::copy(path, &backup)?;
        Ok(FileBackup {
            original: path.to_path_buf(),
            backup,
        })
    }

    /// Copy the backup over the original
    pub fn restore(&self) -> Result<()> {
        fs::copy(&self.backup, &self.original)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.backup
    }
}

/// A group of file rewrites that either all land or are all restored.
///
/// In dry-run mode edits are computed and announced, nothing is written and
/// no backups are taken.
pub struct EditSession {
    dry_run: bool,
    keep_backups: bool,
    backups: Vec<FileBackup>,
    changed: Vec<PathBuf>,
}

impl EditSession {
    /// Session that leaves `.bak` copies next to each edited file
    pub fn with_backups(dry_run: bool) -> Self {
        EditSession {
            dry_run,
            keep_backups: true,
            backups: Vec::new(),
            changed: Vec::new(),
        }
    }

    /// Session for files tracked by the release repository itself.
    ///
    /// Backups are still taken for rollback but removed once the session succeeds,
    /// so they never end up in a commit.
    pub fn tracked(dry_run: bool) -> Self {
        EditSession {
            keep_backups: false,
            ..Self::with_backups(dry_run)
        }
    }

    /// Rewrite `path` through `edit`. Unchanged content is not written.
    pub fn edit<F>(&mut self, path: &Path, edit: F) -> Result<bool>
    where
        F: FnOnce(&str) -> Result<String>,
    {
        let original = fs::read_to_string(path)?;
        let updated = edit(&original)?;
        if updated == original {
            return Ok(false);
        }

        if self.dry_run {
            ui::display_dry_run(&format!("update {}", path.display()));
        } else {
            self.backups.push(FileBackup::take(path)?);
            fs::write(path, updated)?;
        }
        self.changed.push(path.to_path_buf());
        Ok(true)
    }

    /// Run `f` inside the session; on error restore every file it touched.
    pub fn run<F>(mut self, f: F) -> Result<Vec<PathBuf>>
    where
        F: FnOnce(&mut EditSession) -> Result<()>,
    {
        if let Err(err) = f(&mut self) {
            for backup in self.backups.iter().rev() {
                backup.restore()?;
            }
            self.discard_backups();
            return Err(err);
        }
        if !self.keep_backups {
            self.discard_backups();
        }
        Ok(self.changed)
    }

    fn discard_backups(&self) {
        if self.keep_backups {
            return;
        }
        for backup in &self.backups {
            let _ = fs::remove_file(backup.path());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReleaseError;
    use tempfile::TempDir;

    #[test]
    fn test_backup_path() {
        assert_eq!(
            FileBackup::backup_path(Path::new("/x/conandata.yml")),
            PathBuf::from("/x/conandata.yml.bak")
        );
    }

    #[test]
    fn test_take_and_restore() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("portfile.cmake");
        fs::write(&path, "before").unwrap();

        let backup = FileBackup::take(&path).unwrap();
        fs::write(&path, "after").unwrap();
        backup.restore().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "before");
        assert_eq!(fs::read_to_string(backup.path()).unwrap(), "before");
    }

    #[test]
    fn test_session_keeps_backups() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "one").unwrap();

        let changed = EditSession::with_backups(false)
            .run(|s| {
                s.edit(&path, |c| Ok(c.replace("one", "two")))?;
                Ok(())
            })
            .unwrap();

        assert_eq!(changed, vec![path.clone()]);
        assert_eq!(fs::read_to_string(&path).unwrap(), "two");
        assert_eq!(
            fs::read_to_string(FileBackup::backup_path(&path)).unwrap(),
            "one"
        );
    }

    #[test]
    fn test_session_rolls_back_on_error() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("first.txt");
        let second = dir.path().join("second.txt");
        fs::write(&first, "v1").unwrap();
        fs::write(&second, "v1").unwrap();

        let result = EditSession::with_backups(false).run(|s| {
            s.edit(&first, |c| Ok(c.replace("v1", "v2")))?;
            s.edit(&second, |_| Err(ReleaseError::config("malformed")))?;
            Ok(())
        });

        assert!(result.is_err());
        assert_eq!(fs::read_to_string(&first).unwrap(), "v1");
    }

    #[test]
    fn test_tracked_session_removes_backups() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conandata.yml");
        fs::write(&path, "old").unwrap();

        EditSession::tracked(false)
            .run(|s| {
                s.edit(&path, |_| Ok("new".to_string()))?;
                Ok(())
            })
            .unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
        assert!(!FileBackup::backup_path(&path).exists());
    }

    #[test]
    fn test_dry_run_session_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vcpkg.json");
        fs::write(&path, "old").unwrap();

        let changed = EditSession::with_backups(true)
            .run(|s| {
                s.edit(&path, |_| Ok("new".to_string()))?;
                Ok(())
            })
            .unwrap();

        assert_eq!(changed, vec![path.clone()]);
        assert_eq!(fs::read_to_string(&path).unwrap(), "old");
        assert!(!FileBackup::backup_path(&path).exists());
    }
}
