//! Command implementations for drift-cli

pub mod groups;
pub mod projects;

pub use groups::{GroupsArgs, run_groups};
pub use projects::{ProjectsArgs, run_projects};
