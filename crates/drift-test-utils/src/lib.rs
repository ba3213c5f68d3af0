//! Shared test utilities for the gitlab-config workspace.
//!
//! This crate is a dev-dependency only and is never published.
//!
//! # Modules
//!
//! - [`fake`]: [`FakeGitLab`], an in-memory resource client with a call log
//! - [`config`]: [`TempConfig`] for writing configuration documents to disk

pub mod config;
pub mod fake;

pub use config::{MINIMAL_CONFIG, TempConfig};
pub use fake::{Call, FakeGitLab, member, project};
