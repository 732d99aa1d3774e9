pub mod archive;
pub mod changelog;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod git;
pub mod packages;
pub mod patch;
pub mod publish;
pub mod ui;
pub mod warning;

pub use error::{ReleaseError, Result};
