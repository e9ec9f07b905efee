//! Architectural Enforcement Integration Tests
//!
//! This package scans the library sources for patterns that break its
//! runtime model:
//! - No blocking sleeps in async code
//! - No `unwrap()` / `expect()` outside test code
//!
//! The helpers here are shared by the tests in `tests/`.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// A forbidden pattern found in a source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// File the pattern was found in
    pub path: PathBuf,
    /// 1-based line number
    pub line: usize,
    /// The offending line, trimmed
    pub text: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}: {}", self.path.display(), self.line, self.text)
    }
}

/// Root of the `statushub-core` sources
pub fn core_src_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../hub/core/src")
}

/// All `.rs` files below `root`
pub fn rust_files(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "rs"))
        .map(|e| e.into_path())
        .collect()
}

/// Lines of `source` that precede its `#[cfg(test)]` module
///
/// Test modules sit at the end of each file, so everything after the
/// attribute is test code.
pub fn production_lines(source: &str) -> impl Iterator<Item = (usize, &str)> {
    source
        .lines()
        .enumerate()
        .take_while(|(_, line)| line.trim() != "#[cfg(test)]")
        .map(|(i, line)| (i + 1, line))
}

/// Find production lines in `root` containing any of `patterns`
///
/// Comment lines (including doc comments and their examples) are skipped.
pub fn find_in_production(root: &Path, patterns: &[&str]) -> Vec<Violation> {
    let mut violations = Vec::new();
    for path in rust_files(root) {
        let Ok(source) = fs::read_to_string(&path) else {
            continue;
        };
        for (line, text) in production_lines(&source) {
            let trimmed = text.trim();
            if trimmed.starts_with("//") {
                continue;
            }
            if patterns.iter().any(|p| trimmed.contains(p)) {
                violations.push(Violation {
                    path: path.clone(),
                    line,
                    text: trimmed.to_string(),
                });
            }
        }
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_lines_stop_at_test_module() {
        let source = "fn a() {}\nfn b() {}\n#[cfg(test)]\nmod tests {}\n";
        let lines: Vec<_> = production_lines(source).collect();
        assert_eq!(lines, vec![(1, "fn a() {}"), (2, "fn b() {}")]);
    }

    #[test]
    fn test_core_sources_are_found() {
        let files = rust_files(&core_src_dir());
        assert!(files.iter().any(|p| p.ends_with("lib.rs")));
    }
}
