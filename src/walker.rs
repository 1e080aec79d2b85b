//! Enumerating the files under a root, respecting ignore rules the same
//! way the teacher's directory traversal does.

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

/// Enumerates the regular files under one or more roots.
pub trait PathWalker: Send + Sync {
    fn walk(&self, root: &Path) -> Vec<PathBuf>;
}

/// `.gitignore`-aware recursive walker built on the `ignore` crate, the
/// same traversal primitive the teacher's indexer uses to skip build
/// output and vendored directories without a hand-rolled ignore-list.
#[derive(Default)]
pub struct IgnoreWalker {
    follow_links: bool,
}

impl IgnoreWalker {
    pub fn new() -> Self {
        Self { follow_links: false }
    }

    pub fn follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }
}

impl PathWalker for IgnoreWalker {
    fn walk(&self, root: &Path) -> Vec<PathBuf> {
        let mut files = Vec::new();
        let walker = WalkBuilder::new(root).follow_links(self.follow_links).build();
        for entry in walker {
            let Ok(entry) = entry else { continue };
            if entry.file_type().is_some_and(|t| t.is_file()) {
                files.push(entry.into_path());
            }
        }
        files
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn walks_nested_files_and_skips_directories() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();
        fs::write(sub.join("b.txt"), "b").unwrap();

        let walker = IgnoreWalker::new();
        let mut found = walker.walk(dir.path());
        found.sort();

        let mut expected = vec![dir.path().join("a.txt"), sub.join("b.txt")];
        expected.sort();
        assert_eq!(found, expected);
    }

    #[test]
    fn respects_gitignore() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(".gitignore"), "ignored.txt\n").unwrap();
        fs::write(dir.path().join("ignored.txt"), "x").unwrap();
        fs::write(dir.path().join("kept.txt"), "x").unwrap();

        let walker = IgnoreWalker::new();
        let found = walker.walk(dir.path());

        assert!(found.iter().any(|p| p.ends_with("kept.txt")));
        assert!(!found.iter().any(|p| p.ends_with("ignored.txt")));
    }

    #[test]
    fn nonexistent_root_yields_no_files() {
        let walker = IgnoreWalker::new();
        assert!(walker.walk(Path::new("/does/not/exist/anywhere")).is_empty());
    }
}
