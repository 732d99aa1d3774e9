//! Domain logic - pure release rules independent of files and git

pub mod release;
pub mod version;

pub use release::{ReleaseRecord, SkipFlags, Stage};
pub use version::{BumpKind, Version};
