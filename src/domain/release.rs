use crate::domain::Version;
use crate::warning::ReleaseWarning;
use std::fmt;

/// Pipeline stages of a release run, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    ComputeVersion,
    PatchFiles,
    CommitBump,
    Changelog,
    Tag,
    FetchDigest,
    UpdateHashes,
    UpdatePackages,
    GithubRelease,
    Done,
}

impl Stage {
    pub const ALL: [Stage; 10] = [
        Stage::ComputeVersion,
        Stage::PatchFiles,
        Stage::CommitBump,
        Stage::Changelog,
        Stage::Tag,
        Stage::FetchDigest,
        Stage::UpdateHashes,
        Stage::UpdatePackages,
        Stage::GithubRelease,
        Stage::Done,
    ];

    /// Stages that only make sense once the release tag exists
    pub const AFTER_TAG: [Stage; 4] = [
        Stage::FetchDigest,
        Stage::UpdateHashes,
        Stage::UpdatePackages,
        Stage::GithubRelease,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::ComputeVersion => "compute-version",
            Stage::PatchFiles => "patch-files",
            Stage::CommitBump => "commit-bump",
            Stage::Changelog => "changelog",
            Stage::Tag => "tag",
            Stage::FetchDigest => "fetch-digest",
            Stage::UpdateHashes => "update-hashes",
            Stage::UpdatePackages => "update-packages",
            Stage::GithubRelease => "github-release",
            Stage::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Skip flags for the optional release stages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SkipFlags {
    pub tag: bool,
    pub packages: bool,
    pub changelog: bool,
    pub github_release: bool,
}

impl SkipFlags {
    /// Resolve the flags into the list of stages that will not run.
    ///
    /// Skipping the tag skips everything that depends on it.
    pub fn skipped_stages(&self) -> Vec<Stage> {
        let mut skipped = Vec::new();
        if self.changelog {
            skipped.push(Stage::Changelog);
        }
        if self.tag {
            skipped.push(Stage::Tag);
            skipped.extend(Stage::AFTER_TAG);
        } else {
            if self.packages {
                skipped.push(Stage::UpdatePackages);
            }
            if self.github_release {
                skipped.push(Stage::GithubRelease);
            }
        }
        skipped
    }
}

/// Outcome of one orchestrator run. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseRecord {
    pub previous: Version,
    pub version: Version,
    pub digest: Option<String>,
    pub skipped: Vec<Stage>,
    pub warnings: Vec<ReleaseWarning>,
}

impl ReleaseRecord {
    pub fn new(previous: Version, version: Version, skipped: Vec<Stage>) -> Self {
        ReleaseRecord {
            previous,
            version,
            digest: None,
            skipped,
            warnings: Vec::new(),
        }
    }

    pub fn runs(&self, stage: Stage) -> bool {
        !self.skipped.contains(&stage)
    }

    /// Mark `first` and every later stage before `Done` as skipped
    pub fn skip_from(&mut self, first: Stage) {
        for stage in Stage::ALL {
            if stage >= first && stage != Stage::Done && !self.skipped.contains(&stage) {
                self.skipped.push(stage);
            }
        }
        self.skipped.sort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_flags_skip_nothing() {
        assert!(SkipFlags::default().skipped_stages().is_empty());
    }

    #[test]
    fn test_skip_tag_implies_downstream() {
        let flags = SkipFlags {
            tag: true,
            ..SkipFlags::default()
        };
        let skipped = flags.skipped_stages();
        for stage in [
            Stage::Tag,
            Stage::FetchDigest,
            Stage::UpdateHashes,
            Stage::UpdatePackages,
            Stage::GithubRelease,
        ] {
            assert!(skipped.contains(&stage), "{} should be skipped", stage);
        }
        assert!(!skipped.contains(&Stage::Changelog));
    }

    #[test]
    fn test_skip_packages_keeps_hash_update() {
        let flags = SkipFlags {
            packages: true,
            ..SkipFlags::default()
        };
        assert_eq!(flags.skipped_stages(), vec![Stage::UpdatePackages]);
    }

    #[test]
    fn test_record_runs() {
        let record = ReleaseRecord::new(
            Version::new(1, 0, 0),
            Version::new(1, 1, 0),
            vec![Stage::Changelog],
        );
        assert!(!record.runs(Stage::Changelog));
        assert!(record.runs(Stage::Tag));
        assert_eq!(record.digest, None);
    }

    #[test]
    fn test_skip_from_keeps_order_without_duplicates() {
        let mut record = ReleaseRecord::new(
            Version::new(1, 0, 0),
            Version::new(1, 0, 0),
            vec![Stage::GithubRelease],
        );
        record.skip_from(Stage::Changelog);
        assert_eq!(
            record.skipped,
            vec![
                Stage::Changelog,
                Stage::Tag,
                Stage::FetchDigest,
                Stage::UpdateHashes,
                Stage::UpdatePackages,
                Stage::GithubRelease,
            ]
        );
        assert!(record.runs(Stage::CommitBump));
    }
}
