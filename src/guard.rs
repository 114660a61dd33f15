// Ruxi Inspect Gate - Path Guard
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Single enforcement point for sandbox confinement.
// Purely lexical: no canonicalize(), no filesystem access.
//
// SECURITY NOTE: `..` is rejected as a substring, anywhere in the path.
// Symlinks inside the root are NOT resolved.

/// Sandbox confinement predicate for one fixed root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathGuard {
    root: String,
}

impl PathGuard {
    /// Build a guard for `root`. A trailing separator is dropped so
    /// `/ruxi/` and `/ruxi` behave the same. The filesystem root `/` is kept.
    pub fn new(root: impl Into<String>) -> Self {
        let mut root = root.into();
        while root.len() > 1 && root.ends_with(std::path::MAIN_SEPARATOR) {
            root.pop();
        }
        Self { root }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// True iff `path` is the root itself or a descendant of it.
    /// A guard built on an empty root allows nothing.
    pub fn is_allowed(&self, path: &str) -> bool {
        if self.root.is_empty() || path.contains("..") {
            return false;
        }
        if path == self.root {
            return true;
        }
        match path.strip_prefix(self.root.as_str()) {
            Some(rest) => {
                rest.starts_with(std::path::MAIN_SEPARATOR)
                    || self.root.ends_with(std::path::MAIN_SEPARATOR)
            }
            None => false,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
