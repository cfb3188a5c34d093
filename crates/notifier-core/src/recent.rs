//! Recently opened files, most recent first.

use std::path::{Path, PathBuf};

use crate::CoreResult;

/// A bounded most-recently-used list of file paths.
///
/// Re-adding a path moves it to the front; the oldest entry falls off once
/// the list is full. Persisted as one path per line.
#[derive(Debug, Clone)]
pub struct RecentFiles {
    entries: Vec<PathBuf>,
    max_entries: usize,
}

impl RecentFiles {
    /// Creates an empty ledger holding at most `max_entries` paths.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_entries,
        }
    }

    /// Loads the ledger from `path`, dropping paths that no longer exist.
    /// A missing ledger file yields an empty ledger.
    pub fn load(path: &Path, max_entries: usize) -> CoreResult<Self> {
        let mut ledger = Self::new(max_entries);
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(ledger),
            Err(err) => return Err(err.into()),
        };

        for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let entry = PathBuf::from(line);
            if !entry.exists() {
                tracing::debug!("Dropping stale recent file {}", entry.display());
                continue;
            }
            if !ledger.entries.contains(&entry) && ledger.entries.len() < max_entries {
                ledger.entries.push(entry);
            }
        }
        Ok(ledger)
    }

    /// Writes the ledger to `path`, one entry per line.
    pub fn save(&self, path: &Path) -> CoreResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut content = String::new();
        for entry in &self.entries {
            content.push_str(&entry.to_string_lossy());
            content.push('\n');
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Moves `path` to the front, evicting the oldest entry when full.
    pub fn push(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        self.entries.retain(|entry| *entry != path);
        self.entries.insert(0, path);
        self.entries.truncate(self.max_entries);
    }

    /// Forgets `path`. Returns whether it was present.
    pub fn remove(&mut self, path: &Path) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry != path);
        self.entries.len() != before
    }

    /// Forgets everything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Returns the entries, most recent first.
    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_push_moves_to_front() {
        let mut recent = RecentFiles::new(10);
        recent.push("/a");
        recent.push("/b");
        recent.push("/a");
        assert_eq!(recent.entries(), &[PathBuf::from("/a"), PathBuf::from("/b")]);
    }

    #[test]
    fn test_bound_evicts_oldest() {
        let mut recent = RecentFiles::new(10);
        for i in 0..11 {
            recent.push(format!("/file{}", i));
        }
        assert_eq!(recent.len(), 10);
        assert_eq!(recent.entries()[0], PathBuf::from("/file10"));
        assert!(!recent.entries().contains(&PathBuf::from("/file0")));
        assert_eq!(recent.entries()[9], PathBuf::from("/file1"));
    }

    #[test]
    fn test_remove_and_clear() {
        let mut recent = RecentFiles::new(3);
        recent.push("/x");
        assert!(recent.remove(Path::new("/x")));
        assert!(!recent.remove(Path::new("/x")));
        recent.push("/y");
        recent.clear();
        assert!(recent.is_empty());
    }

    #[test]
    fn test_save_and_load_drops_stale() {
        let dir = tempdir().unwrap();
        let live = dir.path().join("live.txt");
        std::fs::write(&live, "x").unwrap();
        let stale = dir.path().join("stale.txt");

        let mut recent = RecentFiles::new(10);
        recent.push(&stale);
        recent.push(&live);

        let ledger = dir.path().join("state").join("recent.txt");
        recent.save(&ledger).unwrap();
        assert_eq!(std::fs::read_to_string(&ledger).unwrap().lines().count(), 2);

        let loaded = RecentFiles::load(&ledger, 10).unwrap();
        assert_eq!(loaded.entries(), &[live]);
    }

    #[test]
    fn test_load_missing_ledger() {
        let dir = tempdir().unwrap();
        let loaded = RecentFiles::load(&dir.path().join("none"), 10).unwrap();
        assert!(loaded.is_empty());
    }
}
