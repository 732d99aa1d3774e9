//! Package-metadata updaters
//!
//! Two updaters write into package-index checkouts that live outside the
//! release repository:
//! - [conan::ConanUpdater] - `recipes/{package}` in conan-center-index
//! - [vcpkg::VcpkgUpdater] - `ports/{package}` in vcpkg
//!
//! The same text rewrites keep the repository's own `packaging/` copies in sync
//! (see [`update_in_repo_hashes`]).

pub mod backup;
pub mod conan;
pub mod vcpkg;

pub use backup::{EditSession, FileBackup};
pub use conan::ConanUpdater;
pub use vcpkg::VcpkgUpdater;

use std::path::{Path, PathBuf};

use crate::domain::Version;
use crate::error::Result;

/// In-repo Conan data file
pub const IN_REPO_CONANDATA: &str = "packaging/conan/conandata.yml";

/// In-repo vcpkg portfile
pub const IN_REPO_PORTFILE: &str = "packaging/vcpkg/portfile.cmake";

/// What an updater changed and how to turn it into a pull request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageReport {
    pub updater: String,
    pub checkout: PathBuf,
    pub files: Vec<PathBuf>,
    /// Suggested branch name for the package-index PR
    pub branch: String,
    /// Suggested commit message for the package-index PR
    pub commit_message: String,
}

/// A downstream package index that pins the release archive.
///
/// Implementations return [`crate::error::ReleaseError::MissingExternalCheckout`]
/// when their checkout is absent; callers treat that as a warning.
pub trait PackageUpdater {
    /// Display name ("Conan", "vcpkg")
    fn name(&self) -> &str;

    /// Root of the checkout this updater writes into
    fn checkout(&self) -> &Path;

    /// Point the package at `version` with the archive `digest`
    fn update(&self, version: &Version, digest: &str, dry_run: bool) -> Result<PackageReport>;
}

/// Apply the archive digest to the repository's own packaging files, when present.
///
/// Returns the files that changed (or would change, in dry-run mode).
pub fn update_in_repo_hashes(
    repo_root: &Path,
    version: &Version,
    url: &str,
    digest: &str,
    dry_run: bool,
) -> Result<Vec<PathBuf>> {
    let conandata = repo_root.join(IN_REPO_CONANDATA);
    let portfile = repo_root.join(IN_REPO_PORTFILE);

    EditSession::tracked(dry_run).run(|session| {
        if conandata.exists() {
            session.edit(&conandata, |content| {
                conan::upsert_conandata(content, version, url, digest)
            })?;
        }
        if portfile.exists() {
            session.edit(&portfile, |content| {
                vcpkg::rewrite_portfile(content, version, digest)
            })?;
        }
        Ok(())
    })
}
