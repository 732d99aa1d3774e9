use std::path::{Path, PathBuf};

use regex::{NoExpand, Regex};

use super::backup::EditSession;
use super::{PackageReport, PackageUpdater};
use crate::domain::Version;
use crate::error::{ReleaseError, Result};

/// Portfiles that take the tag from the manifest version
const VERSION_VARIABLE_REF: &str = "REF v${VERSION}";

fn replace_all(content: &str, pattern: &str, replacement: &str) -> Result<String> {
    let re = Regex::new(pattern).map_err(|e| ReleaseError::config(e.to_string()))?;
    Ok(re.replace_all(content, NoExpand(replacement)).into_owned())
}

/// Rewrite the `SHA512 <hex>` argument of `vcpkg_from_github`
pub fn rewrite_portfile_digest(content: &str, digest: &str) -> Result<String> {
    replace_all(content, r"SHA512 [a-fA-F0-9]*", &format!("SHA512 {}", digest))
}

/// True when the portfile derives its tag from `${VERSION}`
pub fn uses_version_variable(content: &str) -> bool {
    content.contains(VERSION_VARIABLE_REF)
}

/// Rewrite a literal `REF vX.Y.Z`
pub fn rewrite_portfile_ref(content: &str, version: &Version) -> Result<String> {
    replace_all(content, r"REF v[0-9.]+", &format!("REF v{}", version))
}

/// Rewrite `"version": "X.Y.Z"` in a `vcpkg.json` manifest
pub fn rewrite_manifest_version(content: &str, version: &Version) -> Result<String> {
    replace_all(
        content,
        r#""version": "[0-9.]+""#,
        &format!("\"version\": \"{}\"", version),
    )
}

/// Portfile rewrite used for both the port and the in-repo copy: digest, then
/// the inline tag unless it comes from the manifest.
pub fn rewrite_portfile(content: &str, version: &Version, digest: &str) -> Result<String> {
    let content = rewrite_portfile_digest(content, digest)?;
    if uses_version_variable(&content) {
        Ok(content)
    } else {
        rewrite_portfile_ref(&content, version)
    }
}

/// Updates the port in a vcpkg checkout.
pub struct VcpkgUpdater {
    checkout: PathBuf,
    package: String,
}

impl VcpkgUpdater {
    pub fn new(checkout: impl Into<PathBuf>, package: impl Into<String>) -> Self {
        VcpkgUpdater {
            checkout: checkout.into(),
            package: package.into(),
        }
    }

    pub fn port_dir(&self) -> PathBuf {
        self.checkout.join("ports").join(&self.package)
    }
}

impl PackageUpdater for VcpkgUpdater {
    fn name(&self) -> &str {
        "vcpkg"
    }

    fn checkout(&self) -> &Path {
        &self.checkout
    }

    fn update(&self, version: &Version, digest: &str, dry_run: bool) -> Result<PackageReport> {
        let port_dir = self.port_dir();
        if !port_dir.exists() {
            return Err(ReleaseError::MissingExternalCheckout { path: port_dir });
        }

        let portfile = port_dir.join("portfile.cmake");
        let manifest = port_dir.join("vcpkg.json");

        let files = EditSession::with_backups(dry_run).run(|session| {
            let mut via_manifest = false;
            session.edit(&portfile, |content| {
                via_manifest = uses_version_variable(content);
                rewrite_portfile(content, version, digest)
            })?;
            if via_manifest && manifest.exists() {
                session.edit(&manifest, |content| rewrite_manifest_version(content, version))?;
            }
            Ok(())
        })?;

        Ok(PackageReport {
            updater: self.name().to_string(),
            checkout: self.checkout.clone(),
            files,
            branch: format!("{}-{}", self.package, version),
            commit_message: format!("[{}] Update to version {}", self.package, version),
        })
    }
}
