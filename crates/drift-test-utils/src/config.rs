//! Temporary configuration documents for CLI and loader tests.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A minimal valid document managing two boolean project settings.
pub const MINIMAL_CONFIG: &str = "\
GITLAB_URL: https://gitlab.example.com
default:
  remove_source_branch_after_merge: true
  only_allow_merge_if_pipeline_succeeds: true
";

/// A `config.yaml` inside its own temporary directory.
///
/// The directory is removed when the value is dropped.
pub struct TempConfig {
    temp_dir: TempDir,
    path: PathBuf,
}

impl TempConfig {
    /// Write `content` to `config.yaml` in a fresh temporary directory.
    pub fn new(content: &str) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        fs::write(&path, content).unwrap();
        Self { temp_dir, path }
    }

    /// Write [`MINIMAL_CONFIG`].
    pub fn minimal() -> Self {
        Self::new(MINIMAL_CONFIG)
    }

    /// Path of the written document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory holding the document.
    pub fn dir(&self) -> &Path {
        self.temp_dir.path()
    }
}
