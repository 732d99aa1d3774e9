//! File-patch registry
//!
//! The set of files that embed the project version, and how to find the version
//! inside each of them, is declared once in [`REGISTRY`]. Patterns may use the
//! tokens `{name}`, `{macro}`, `{package}` and `{repository}`, filled from
//! [`ProjectConfig`]; templates additionally use `{version}`.

use std::fs;
use std::path::{Path, PathBuf};

use regex::{NoExpand, Regex};

use crate::config::ProjectConfig;
use crate::domain::Version;
use crate::error::{ReleaseError, Result};
use crate::ui;

/// Build descriptor that holds the authoritative version
pub const VERSION_DESCRIPTOR: &str = "meson.build";

const VERSION_CAPTURE: &str = r"(\d+\.\d+\.\d+)";

/// One search pattern and the text that replaces each match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchRule {
    pub pattern: &'static str,
    pub template: &'static str,
}

/// A tracked file and its ordered rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilePatch {
    pub path: &'static str,
    pub rules: &'static [PatchRule],
}

pub static REGISTRY: &[FilePatch] = &[
    FilePatch {
        path: VERSION_DESCRIPTOR,
        rules: &[PatchRule {
            pattern: r"version: '(\d+\.\d+\.\d+)'",
            template: "version: '{version}'",
        }],
    },
    FilePatch {
        path: "includes/{name}.h",
        rules: &[PatchRule {
            pattern: r#"#define {macro} "(\d+\.\d+\.\d+)""#,
            template: "#define {macro} \"{version}\"",
        }],
    },
    FilePatch {
        path: "packaging/conan/conanfile.py",
        rules: &[PatchRule {
            pattern: r#"version = "(\d+\.\d+\.\d+)""#,
            template: "version = \"{version}\"",
        }],
    },
    FilePatch {
        path: "packaging/vcpkg/vcpkg.json",
        rules: &[PatchRule {
            pattern: r#""version": "(\d+\.\d+\.\d+)""#,
            template: "\"version\": \"{version}\"",
        }],
    },
    FilePatch {
        path: "packaging/installers/install.sh",
        rules: &[PatchRule {
            pattern: r#"VERSION="(\d+\.\d+\.\d+)""#,
            template: "VERSION=\"{version}\"",
        }],
    },
    FilePatch {
        path: "README.md",
        rules: &[
            PatchRule {
                pattern: r"conan install {package}/(\d+\.\d+\.\d+)@",
                template: "conan install {package}/{version}@",
            },
            PatchRule {
                pattern: r"curl -LO https://github\.com/{repository}/releases/download/v(\d+\.\d+\.\d+)/{name}-",
                template: "curl -LO https://github.com/{repository}/releases/download/v{version}/{name}-",
            },
        ],
    },
];

/// Project values substituted into registry tokens
struct Tokens<'a> {
    name: &'a str,
    version_macro: String,
    package: &'a str,
    repository: &'a str,
}

impl<'a> Tokens<'a> {
    fn new(project: &'a ProjectConfig) -> Self {
        Tokens {
            name: &project.name,
            version_macro: project.version_macro(),
            package: &project.package,
            repository: &project.repository,
        }
    }

    fn fill(&self, text: &str, escape: bool) -> String {
        let value = |v: &str| {
            if escape {
                regex::escape(v)
            } else {
                v.to_string()
            }
        };
        text.replace("{name}", &value(self.name))
            .replace("{macro}", &value(&self.version_macro))
            .replace("{package}", &value(self.package))
            .replace("{repository}", &value(self.repository))
    }
}

/// A rule ready to run: compiled pattern and template with project tokens filled
#[derive(Debug, Clone)]
pub struct CompiledRule {
    regex: Regex,
    template: String,
}

impl CompiledRule {
    /// Rewrite every match of the rule in `content`, returning the new text and the match count
    pub fn apply(&self, content: &str, version: &Version) -> (String, usize) {
        let count = self.regex.find_iter(content).count();
        let replacement = self.template.replace("{version}", &version.to_string());
        let rewritten = self.regex.replace_all(content, NoExpand(&replacement));
        (rewritten.into_owned(), count)
    }
}

/// An existing tracked file with its compiled rules
#[derive(Debug, Clone)]
pub struct PatchTarget {
    pub path: PathBuf,
    pub rules: Vec<CompiledRule>,
}

/// What applying the registry did to one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchReport {
    pub path: PathBuf,
    pub replacements: usize,
    pub changed: bool,
}

fn compile(pattern: &str, tokens: &Tokens) -> Result<Regex> {
    let filled = tokens.fill(pattern, true);
    Regex::new(&filled)
        .map_err(|e| ReleaseError::config(format!("Invalid patch pattern '{}': {}", pattern, e)))
}

/// Reads the current version from the build descriptor.
///
/// # Returns
/// * `Ok(Version)` - The version declared in `meson.build`
/// * `Err(VersionNotFound)` - If the file is missing or has no `version: 'X.Y.Z'`
pub fn discover_current_version(repo_root: &Path) -> Result<Version> {
    let descriptor = repo_root.join(VERSION_DESCRIPTOR);
    let content = fs::read_to_string(&descriptor)
        .map_err(|_| ReleaseError::VersionNotFound(descriptor.display().to_string()))?;

    let re = Regex::new(&format!("version: '{}'", VERSION_CAPTURE))
        .map_err(|e| ReleaseError::config(e.to_string()))?;
    let captures = re
        .captures(&content)
        .ok_or_else(|| ReleaseError::VersionNotFound(descriptor.display().to_string()))?;

    Version::parse(&captures[1])
}

/// Filters the registry down to files that exist under `repo_root`.
///
/// Listed files that are absent are skipped without error.
pub fn collect_targets(repo_root: &Path, project: &ProjectConfig) -> Result<Vec<PatchTarget>> {
    let tokens = Tokens::new(project);
    let mut targets = Vec::new();

    for entry in REGISTRY {
        let path = repo_root.join(tokens.fill(entry.path, false));
        if !path.is_file() {
            continue;
        }

        let rules = entry
            .rules
            .iter()
            .map(|rule| {
                Ok(CompiledRule {
                    regex: compile(rule.pattern, &tokens)?,
                    template: tokens.fill(rule.template, false),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        targets.push(PatchTarget { path, rules });
    }

    Ok(targets)
}

/// Rewrites the version in every target file.
///
/// In dry-run mode the new content is computed and reported but never written.
/// Does not stage or commit anything.
pub fn apply(
    targets: &[PatchTarget],
    version: &Version,
    dry_run: bool,
) -> Result<Vec<PatchReport>> {
    let mut reports = Vec::with_capacity(targets.len());

    for target in targets {
        let original = fs::read_to_string(&target.path)?;
        let mut content = original.clone();
        let mut replacements = 0;

        for rule in &target.rules {
            let (rewritten, count) = rule.apply(&content, version);
            content = rewritten;
            replacements += count;
        }

        let changed = content != original;
        if changed {
            if dry_run {
                ui::display_dry_run(&format!("update {}", target.path.display()));
            } else {
                fs::write(&target.path, &content)?;
            }
        }

        reports.push(PatchReport {
            path: target.path.clone(),
            replacements,
            changed,
        });
    }

    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_registry_has_six_files() {
        assert_eq!(REGISTRY.len(), 6);
        assert_eq!(REGISTRY[0].path, VERSION_DESCRIPTOR);
    }

    #[test]
    fn test_every_registry_pattern_captures_a_version() {
        let project = ProjectConfig::default();
        let tokens = Tokens::new(&project);
        for entry in REGISTRY {
            for rule in entry.rules {
                let re = compile(rule.pattern, &tokens).unwrap();
                assert_eq!(re.captures_len(), 2, "pattern {}", rule.pattern);
                assert!(rule.template.contains("{version}"));
            }
        }
    }

    #[test]
    fn test_discover_current_version() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "meson.build",
            "project('cargs', 'c',\n  version: '1.2.3',\n  license: 'MIT')\n",
        );
        let version = discover_current_version(dir.path()).unwrap();
        assert_eq!(version, Version::new(1, 2, 3));
    }

    #[test]
    fn test_discover_current_version_missing_pattern() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "meson.build", "project('cargs', 'c')\n");
        assert!(matches!(
            discover_current_version(dir.path()),
            Err(ReleaseError::VersionNotFound(_))
        ));
    }

    #[test]
    fn test_discover_current_version_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            discover_current_version(dir.path()),
            Err(ReleaseError::VersionNotFound(_))
        ));
    }

    #[test]
    fn test_collect_targets_skips_absent_files() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "meson.build", "version: '1.0.0'\n");
        write(dir.path(), "includes/cargs.h", "#define CARGS_VERSION \"1.0.0\"\n");

        let targets = collect_targets(dir.path(), &ProjectConfig::default()).unwrap();
        let paths: Vec<_> = targets.iter().map(|t| t.path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                dir.path().join("meson.build"),
                dir.path().join("includes/cargs.h")
            ]
        );
    }

    #[test]
    fn test_apply_replaces_only_the_version() {
        let dir = TempDir::new().unwrap();
        let header = "#ifndef CARGS_H\n#define CARGS_VERSION \"1.2.3\"\n#define OTHER \"1.2.3\"\n#endif\n";
        write(dir.path(), "includes/cargs.h", header);

        let targets = collect_targets(dir.path(), &ProjectConfig::default()).unwrap();
        let reports = apply(&targets, &Version::new(1, 2, 4), false).unwrap();

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].replacements, 1);
        assert!(reports[0].changed);
        let updated = fs::read_to_string(dir.path().join("includes/cargs.h")).unwrap();
        assert_eq!(
            updated,
            "#ifndef CARGS_H\n#define CARGS_VERSION \"1.2.4\"\n#define OTHER \"1.2.3\"\n#endif\n"
        );
    }

    #[test]
    fn test_apply_readme_rules_in_order() {
        let dir = TempDir::new().unwrap();
        let readme = "Install:\n\n    conan install libcargs/1.0.0@\n    curl -LO https://github.com/lucocozz/cargs/releases/download/v1.0.0/cargs-1.0.0.tar.gz\n";
        write(dir.path(), "README.md", readme);

        let targets = collect_targets(dir.path(), &ProjectConfig::default()).unwrap();
        let reports = apply(&targets, &Version::new(1, 1, 0), false).unwrap();
        assert_eq!(reports[0].replacements, 2);

        let updated = fs::read_to_string(dir.path().join("README.md")).unwrap();
        assert!(updated.contains("conan install libcargs/1.1.0@"));
        assert!(updated.contains("/download/v1.1.0/cargs-1.0.0.tar.gz"));
    }

    #[test]
    fn test_apply_dry_run_leaves_file() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "meson.build", "version: '1.0.0'\n");

        let targets = collect_targets(dir.path(), &ProjectConfig::default()).unwrap();
        let reports = apply(&targets, &Version::new(2, 0, 0), true).unwrap();

        assert!(reports[0].changed);
        let content = fs::read_to_string(dir.path().join("meson.build")).unwrap();
        assert_eq!(content, "version: '1.0.0'\n");
    }

    #[test]
    fn test_apply_twice_is_stable() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "packaging/installers/install.sh", "VERSION=\"0.9.0\"\n");

        let targets = collect_targets(dir.path(), &ProjectConfig::default()).unwrap();
        apply(&targets, &Version::new(1, 0, 0), false).unwrap();
        let second = apply(&targets, &Version::new(1, 0, 0), false).unwrap();

        assert!(!second[0].changed);
        let content =
            fs::read_to_string(dir.path().join("packaging/installers/install.sh")).unwrap();
        assert_eq!(content, "VERSION=\"1.0.0\"\n");
    }

    #[test]
    fn test_custom_project_tokens() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "includes/mylib.h", "#define MYLIB_VERSION \"0.1.0\"\n");
        let project = ProjectConfig {
            name: "mylib".to_string(),
            ..ProjectConfig::default()
        };

        let targets = collect_targets(dir.path(), &project).unwrap();
        apply(&targets, &Version::new(0, 2, 0), false).unwrap();

        let content = fs::read_to_string(dir.path().join("includes/mylib.h")).unwrap();
        assert_eq!(content, "#define MYLIB_VERSION \"0.2.0\"\n");
    }
}
