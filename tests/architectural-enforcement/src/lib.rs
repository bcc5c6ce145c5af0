//! Architectural Enforcement Integration Tests
//!
//! This package contains integration tests that enforce architectural principles:
//! - No blocking thread sleeps in production code (settle delays are async)
//! - A single re-parenting path for the shared content surface
//!
//! These tests are designed to catch violations early in the development cycle.
//! The helpers below resolve paths from the workspace root, so the tests work
//! no matter which directory cargo runs them from.

use std::fs;
use std::path::{Path, PathBuf};

/// Root of the workspace (two levels above this package)
#[must_use]
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
}

/// Every `.rs` file under `dir` (relative to the workspace root) with its contents
#[must_use]
pub fn rust_sources(dir: &str) -> Vec<(PathBuf, String)> {
    let path = workspace_root().join(dir);
    if !path.exists() {
        return Vec::new();
    }

    walkdir::WalkDir::new(path)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        .filter_map(|e| {
            let content = fs::read_to_string(e.path()).ok()?;
            Some((e.path().to_path_buf(), content))
        })
        .collect()
}

/// The part of a line before any `//` comment
#[must_use]
pub fn code_part(line: &str) -> &str {
    line.split("//").next().unwrap_or(line)
}

/// Line index where a `#[cfg(test)]` module starts, if any
///
/// Everything after it is treated as test code.
#[must_use]
pub fn test_module_start(lines: &[&str]) -> Option<usize> {
    lines
        .iter()
        .position(|line| line.trim_start().starts_with("#[cfg(test)]"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_root_has_core_crate() {
        assert!(workspace_root().join("shell/core/src/lib.rs").exists());
    }

    #[test]
    fn test_code_part_strips_comments() {
        assert_eq!(code_part("foo(); // bar()"), "foo(); ");
        assert_eq!(code_part("/// docs"), "");
    }

    #[test]
    fn test_test_module_start() {
        let lines = ["fn a() {}", "#[cfg(test)]", "mod tests {}"];
        assert_eq!(test_module_start(&lines), Some(1));
        assert_eq!(test_module_start(&lines[..1]), None);
    }
}
