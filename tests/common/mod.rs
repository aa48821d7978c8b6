//! Shared test utilities for integration tests.
//!
//! Import from integration test files as:
//! ```ignore
//! mod common;
//! ```

use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const MARKED: &str = "---\ntype: moc\n---\n";

/// Initialize tracing for tests, respecting RUST_LOG env var.
///
/// Safe to call multiple times; subsequent calls are no-ops.
#[allow(dead_code)]
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

/// Create a test vault directory:
///
/// ```text
/// vault/
///   Projects/
///     Projects.md   (index file)
///     notes.md
///     A/A.md        (index file)
///     B/B.md        (index file)
///   .moc/           (hidden)
/// ```
#[allow(dead_code)]
pub fn create_test_vault(temp_dir: &TempDir) -> PathBuf {
    let vault = temp_dir.path().join("vault");
    std::fs::create_dir_all(vault.join("Projects/A")).unwrap();
    std::fs::create_dir_all(vault.join("Projects/B")).unwrap();
    std::fs::create_dir_all(vault.join(".moc")).unwrap();
    std::fs::write(vault.join("Projects/Projects.md"), format!("{MARKED}# Projects\n")).unwrap();
    std::fs::write(vault.join("Projects/notes.md"), "Some notes.\n").unwrap();
    std::fs::write(vault.join("Projects/A/A.md"), MARKED).unwrap();
    std::fs::write(vault.join("Projects/B/B.md"), MARKED).unwrap();
    vault
}

#[allow(dead_code)]
pub fn read(vault: &Path, path: &str) -> String {
    std::fs::read_to_string(vault.join(path)).unwrap()
}
