use crate::error::{ReleaseError, Result};
use regex::Regex;
use std::fmt;
use std::str::FromStr;

const VERSION_PREFIX: &str = r"^(\d+)\.(\d+)\.(\d+)";

/// Semantic version representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    /// Create a new version
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Version {
            major,
            minor,
            patch,
        }
    }

    /// Parse the leading `X.Y.Z` of a string (e.g., "1.2.3" or "1.2.3-rc1" -> Version(1,2,3))
    ///
    /// Anything after the three numeric components is ignored; use
    /// [`Version::prerelease_suffix`] to find out whether something was dropped.
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = || ReleaseError::InvalidFormat(text.to_string());
        let re = Regex::new(VERSION_PREFIX).map_err(|_| invalid())?;
        let captures = re.captures(text.trim()).ok_or_else(invalid)?;

        let component = |i: usize| captures[i].parse::<u32>().map_err(|_| invalid());

        Ok(Version {
            major: component(1)?,
            minor: component(2)?,
            patch: component(3)?,
        })
    }

    /// Pre-release or build metadata that [`Version::parse`] would discard.
    ///
    /// Returns `None` for plain `X.Y.Z` input and for text that is not valid semver.
    pub fn prerelease_suffix(text: &str) -> Option<String> {
        let parsed = semver::Version::parse(text.trim()).ok()?;
        let mut suffix = String::new();
        if !parsed.pre.is_empty() {
            suffix.push('-');
            suffix.push_str(parsed.pre.as_str());
        }
        if !parsed.build.is_empty() {
            suffix.push('+');
            suffix.push_str(parsed.build.as_str());
        }
        (!suffix.is_empty()).then_some(suffix)
    }

    /// Bump version according to bump kind
    ///
    /// Fails with [`ReleaseError::VersionOverflow`] when the bumped component
    /// is already `u32::MAX`.
    pub fn bump(&self, kind: BumpKind) -> Result<Self> {
        let overflow = || ReleaseError::VersionOverflow {
            version: self.to_string(),
            kind: kind.to_string(),
        };
        let bumped = match kind {
            BumpKind::Major => Version {
                major: self.major.checked_add(1).ok_or_else(overflow)?,
                minor: 0,
                patch: 0,
            },
            BumpKind::Minor => Version {
                major: self.major,
                minor: self.minor.checked_add(1).ok_or_else(overflow)?,
                patch: 0,
            },
            BumpKind::Patch => Version {
                major: self.major,
                minor: self.minor,
                patch: self.patch.checked_add(1).ok_or_else(overflow)?,
            },
        };
        Ok(bumped)
    }

    /// Git tag name for this version (`v1.2.3`)
    pub fn tag_name(&self) -> String {
        format!("v{}", self)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = ReleaseError;

    fn from_str(s: &str) -> Result<Self> {
        Version::parse(s)
    }
}

/// Version bump kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum BumpKind {
    Major,
    Minor,
    Patch,
}

impl fmt::Display for BumpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BumpKind::Major => "major",
            BumpKind::Minor => "minor",
            BumpKind::Patch => "patch",
        };
        f.write_str(name)
    }
}
