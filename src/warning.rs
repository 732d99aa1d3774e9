use std::fmt;
use std::path::PathBuf;

/// Non-fatal conditions met during a release run.
/// These are reported to the user and collected in the release record.
#[derive(Debug, Clone, PartialEq)]
pub enum ReleaseWarning {
    /// A package-manager checkout was not found, its update was skipped
    MissingCheckout { updater: String, path: PathBuf },
    /// Every tracked file already carries the target version; nothing was committed
    AlreadyAtVersion { version: String },
    /// The changelog already has a section for this version
    ChangelogEntryExists { version: String },
    /// The release publisher cannot be used (not installed, not authenticated)
    PublisherUnavailable { reason: String },
    /// The publisher was reachable but creating the release failed
    PublishFailed { reason: String },
    /// Version input carried a suffix that was discarded during parsing
    PrereleaseSuffixDropped { input: String, suffix: String },
}

impl fmt::Display for ReleaseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReleaseWarning::MissingCheckout { updater, path } => {
                write!(
                    f,
                    "Could not find {} checkout at {}, skipping",
                    updater,
                    path.display()
                )
            }
            ReleaseWarning::AlreadyAtVersion { version } => {
                write!(f, "Already at version {}, nothing to commit", version)
            }
            ReleaseWarning::ChangelogEntryExists { version } => {
                write!(f, "Version {} already exists in CHANGELOG.md", version)
            }
            ReleaseWarning::PublisherUnavailable { reason } => {
                write!(f, "Cannot create hosted release: {}", reason)
            }
            ReleaseWarning::PublishFailed { reason } => {
                write!(f, "Failed to create hosted release: {}", reason)
            }
            ReleaseWarning::PrereleaseSuffixDropped { input, suffix } => {
                write!(
                    f,
                    "Suffix '{}' of '{}' is not tracked and will be dropped",
                    suffix, input
                )
            }
        }
    }
}
