//! Scratch directory for one run.
//!
//! Holds the numerically named segment files and the concat manifest. The
//! directory is created fresh (anything already at that path is removed) and
//! is removed again by [`WorkArea::cleanup`], or on drop if cleanup was never
//! called. Removal is best effort.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Reserved manifest filename inside the work area.
pub const DEFAULT_MANIFEST_NAME: &str = ".videolist.txt";

/// Default prefix for work area directory names.
pub const DEFAULT_WORK_PREFIX: &str = ".output";

/// Owned handle to a run's scratch directory.
#[derive(Debug)]
pub struct WorkArea {
    root: PathBuf,
    manifest_name: String,
    released: bool,
}

impl WorkArea {
    /// Create the work area at `root`, replacing any existing directory.
    pub fn create(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();

        if root.exists() {
            tracing::debug!("Removing stale work area {}", root.display());
            fs::remove_dir_all(&root)?;
        }
        fs::create_dir_all(&root)?;

        tracing::debug!("Created work area {}", root.display());

        Ok(Self {
            root,
            manifest_name: DEFAULT_MANIFEST_NAME.to_string(),
            released: false,
        })
    }

    /// Use a different reserved manifest filename.
    pub fn with_manifest_name(mut self, name: impl Into<String>) -> Self {
        self.manifest_name = name.into();
        self
    }

    /// Directory name for a source: `<prefix>-<stem>-<timestamp>`.
    pub fn dir_name(prefix: &str, source: &Path, timestamp: &str) -> String {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "input".to_string());
        format!("{}-{}-{}", prefix, stem, timestamp)
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Path of the segment file for `index`, sharing the source's extension.
    pub fn segment_path(&self, index: usize, extension: Option<&str>) -> PathBuf {
        match extension {
            Some(ext) if !ext.is_empty() => self.root.join(format!("{}.{}", index, ext)),
            _ => self.root.join(index.to_string()),
        }
    }

    pub fn manifest_name(&self) -> &str {
        &self.manifest_name
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(&self.manifest_name)
    }

    /// Remove the directory and everything in it.
    pub fn cleanup(mut self) -> io::Result<()> {
        self.released = true;
        remove(&self.root)
    }

    /// Release the handle without deleting anything.
    pub fn keep(mut self) -> PathBuf {
        self.released = true;
        self.root.clone()
    }
}

impl Drop for WorkArea {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = remove(&self.root) {
            tracing::warn!("Failed to remove work area {}: {}", self.root.display(), e);
        }
    }
}

fn remove(root: &Path) -> io::Result<()> {
    match fs::remove_dir_all(root) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn create_replaces_existing_directory() {
        let dir = tempdir().unwrap();
        let root = dir.path().join(".output-movie-20240101000000");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("stale.mp4"), b"old").unwrap();

        let area = WorkArea::create(&root).unwrap();

        assert!(area.path().exists());
        assert!(!root.join("stale.mp4").exists());
        area.cleanup().unwrap();
        assert!(!root.exists());
    }

    #[test]
    fn drop_removes_directory() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("work");
        {
            let area = WorkArea::create(&root).unwrap();
            fs::write(area.segment_path(1, Some("mp4")), b"x").unwrap();
        }
        assert!(!root.exists());
    }

    #[test]
    fn keep_leaves_directory_in_place() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("work");
        let area = WorkArea::create(&root).unwrap();
        let kept = area.keep();
        assert_eq!(kept, root);
        assert!(root.exists());
    }

    #[test]
    fn cleanup_tolerates_already_removed_directory() {
        let dir = tempdir().unwrap();
        let area = WorkArea::create(dir.path().join("work")).unwrap();
        fs::remove_dir_all(area.path()).unwrap();
        assert!(area.cleanup().is_ok());
    }

    #[test]
    fn names_follow_source_stem() {
        let name = WorkArea::dir_name(".output", Path::new("/videos/talk.mp4"), "20240102030405");
        assert_eq!(name, ".output-talk-20240102030405");
    }

    #[test]
    fn segment_and_manifest_paths() {
        let dir = tempdir().unwrap();
        let area = WorkArea::create(dir.path().join("w"))
            .unwrap()
            .with_manifest_name("list.txt");

        assert_eq!(area.segment_path(3, Some("mkv")), area.path().join("3.mkv"));
        assert_eq!(area.segment_path(3, None), area.path().join("3"));
        assert_eq!(area.manifest_path(), area.path().join("list.txt"));
    }
}
