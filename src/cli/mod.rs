pub mod orchestration;

pub use orchestration::{parse_literal, Orchestrator, ReleaseArgs, RunOptions, VersionTarget};
