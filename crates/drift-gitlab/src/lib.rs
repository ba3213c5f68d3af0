//! GitLab REST API adapter
//!
//! Provides [`GitLabClient`], the production [`drift_core::ResourceClient`].
//! Transport, authentication, timeouts, URL encoding and pagination of
//! "list all" calls live here so the engine never sees HTTP.

pub mod client;
pub mod error;
pub mod wire;

pub use client::{DEFAULT_TIMEOUT, GitLabClient};
pub use error::{Error, Result};
