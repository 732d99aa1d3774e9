use std::path::{Path, PathBuf};

use regex::{NoExpand, Regex};

use super::backup::EditSession;
use super::{PackageReport, PackageUpdater};
use crate::domain::Version;
use crate::error::{ReleaseError, Result};

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| ReleaseError::config(e.to_string()))
}

/// Byte range of the `sources:` block: from the line after `sources:` up to the
/// next top-level key.
fn sources_block(content: &str) -> Result<Option<(usize, usize)>> {
    let Some(header) = compile(r"(?m)^sources:[^\n]*\n?")?.find(content) else {
        return Ok(None);
    };
    let end = compile(r"(?m)^\S")?
        .find_at(content, header.end())
        .map_or(content.len(), |m| m.start());
    Ok(Some((header.end(), end)))
}

/// Upsert the `sources` entry for `version` in a `conandata.yml` document.
///
/// An existing `"X.Y.Z":` block under `sources:` has its `url` and `sha256`
/// fields rewritten in place; otherwise a new block is inserted right under
/// `sources:`. Other top-level keys are left alone.
pub fn upsert_conandata(
    content: &str,
    version: &Version,
    url: &str,
    digest: &str,
) -> Result<String> {
    let key = format!("\"{}\":", version);
    let entry = format!("{}\n    url: \"{}\"\n    sha256: \"{}\"", key, url, digest);

    let (start, end) = sources_block(content)?
        .ok_or_else(|| ReleaseError::config("conandata.yml has no 'sources:' key"))?;
    let block = &content[start..end];

    let existing = compile(&format!(r#"(?s){}.*?sha256: ".*?""#, regex::escape(&key)))?;
    let block = if existing.is_match(block) {
        existing.replace(block, NoExpand(&entry)).into_owned()
    } else {
        let lead = if content[..start].ends_with('\n') {
            ""
        } else {
            "\n"
        };
        format!("{}  {}\n{}", lead, entry, block)
    };

    Ok(format!("{}{}{}", &content[..start], block, &content[end..]))
}

/// Rewrite the `version = "..."` attribute of a recipe that declares `name = "{package}"`.
pub fn rewrite_conanfile(content: &str, package: &str, version: &Version) -> Result<String> {
    if !content.contains(&format!("name = \"{}\"", package)) {
        return Ok(content.to_string());
    }
    let re = compile(r#"version = "[0-9.]+""#)?;
    let replacement = format!("version = \"{}\"", version);
    Ok(re.replace_all(content, NoExpand(&replacement)).into_owned())
}

/// Updates the recipe in a conan-center-index checkout.
pub struct ConanUpdater {
    checkout: PathBuf,
    package: String,
    repository: String,
}

impl ConanUpdater {
    pub fn new(
        checkout: impl Into<PathBuf>,
        package: impl Into<String>,
        repository: impl Into<String>,
    ) -> Self {
        ConanUpdater {
            checkout: checkout.into(),
            package: package.into(),
            repository: repository.into(),
        }
    }

    pub fn recipe_dir(&self) -> PathBuf {
        self.checkout.join("recipes").join(&self.package)
    }
}

impl PackageUpdater for ConanUpdater {
    fn name(&self) -> &str {
        "Conan"
    }

    fn checkout(&self) -> &Path {
        &self.checkout
    }

    fn update(&self, version: &Version, digest: &str, dry_run: bool) -> Result<PackageReport> {
        let recipe_dir = self.recipe_dir();
        if !recipe_dir.exists() {
            return Err(ReleaseError::MissingExternalCheckout { path: recipe_dir });
        }

        let conandata = recipe_dir.join("all").join("conandata.yml");
        let conanfile = recipe_dir.join("all").join("conanfile.py");
        let url = crate::archive::archive_url(&self.repository, version);

        let files = EditSession::with_backups(dry_run).run(|session| {
            session.edit(&conandata, |content| {
                upsert_conandata(content, version, &url, digest)
            })?;
            if conanfile.exists() {
                session.edit(&conanfile, |content| {
                    rewrite_conanfile(content, &self.package, version)
                })?;
            }
            Ok(())
        })?;

        Ok(PackageReport {
            updater: self.name().to_string(),
            checkout: self.checkout.clone(),
            files,
            branch: format!("{}-{}", self.package, version),
            commit_message: format!("{}: update to {}", self.package, version),
        })
    }
}
