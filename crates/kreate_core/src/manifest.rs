//! Concat manifest for reassembling segments.
//!
//! Segment order is recovered from the numeric filename stem (`3.mp4` is
//! segment 3) and the manifest is always written in ascending index order,
//! whatever order the directory listing returned the files in.
//!
//! The written format is the ffmpeg concat demuxer's:
//!
//! ```text
//! file '/abs/path/.output-talk-20240102030405/1.mp4'
//! file '/abs/path/.output-talk-20240102030405/2.mp4'
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::work_area::WorkArea;

/// Errors from building or writing a manifest.
#[derive(Error, Debug)]
pub enum ManifestError {
    /// Segment files don't describe a valid, ordered set.
    #[error("Manifest corrupt: {0}")]
    Corrupt(String),

    #[error("I/O error while {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },
}

impl ManifestError {
    fn corrupt(message: impl Into<String>) -> Self {
        Self::Corrupt(message.into())
    }

    fn io(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }
}

/// Result type for manifest operations.
pub type ManifestResult<T> = Result<T, ManifestError>;

/// One produced segment file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub index: usize,
    /// Absolute path to the segment file.
    pub path: PathBuf,
}

/// Segment files in concatenation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Build from an explicit index -> path mapping.
    pub fn from_entries<I>(entries: I) -> ManifestResult<Self>
    where
        I: IntoIterator<Item = (usize, PathBuf)>,
    {
        let mut by_index: BTreeMap<usize, PathBuf> = BTreeMap::new();

        for (index, path) in entries {
            if index == 0 {
                return Err(ManifestError::corrupt(format!(
                    "segment index 0 for {} (indices start at 1)",
                    path.display()
                )));
            }

            let absolute = std::path::absolute(&path)
                .map_err(|e| ManifestError::io(format!("resolving {}", path.display()), e))?;

            if let Some(existing) = by_index.insert(index, absolute) {
                return Err(ManifestError::corrupt(format!(
                    "segment {} appears twice ({} and {})",
                    index,
                    existing.display(),
                    path.display()
                )));
            }
        }

        let entries = by_index
            .into_iter()
            .map(|(index, path)| ManifestEntry { index, path })
            .collect();

        Ok(Self { entries })
    }

    /// Build from segment files in whatever order they were discovered.
    ///
    /// Each file's stem must be its decimal segment index.
    pub fn from_discovered<I>(paths: I) -> ManifestResult<Self>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let mut indexed = Vec::new();
        for path in paths {
            let index = segment_index(&path)?;
            indexed.push((index, path));
        }
        Self::from_entries(indexed)
    }

    /// Scan a work area for segment files with the given extension.
    ///
    /// The reserved manifest file and files with other extensions are ignored.
    pub fn scan(work_area: &WorkArea, extension: Option<&str>) -> ManifestResult<Self> {
        let dir = work_area.path();
        let listing = fs::read_dir(dir)
            .map_err(|e| ManifestError::io(format!("reading {}", dir.display()), e))?;

        let mut discovered = Vec::new();
        for entry in listing {
            let entry =
                entry.map_err(|e| ManifestError::io(format!("reading {}", dir.display()), e))?;
            let path = entry.path();

            if !path.is_file() {
                continue;
            }
            if path.file_name().and_then(|n| n.to_str()) == Some(work_area.manifest_name()) {
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != extension {
                continue;
            }

            discovered.push(path);
        }

        tracing::debug!(
            "Discovered {} segment files in {}",
            discovered.len(),
            dir.display()
        );

        Self::from_discovered(discovered)
    }

    /// Check that the manifest holds exactly the expected segment indices.
    pub fn verify_indices(&self, expected: &[usize]) -> ManifestResult<()> {
        let found = self.indices();
        let mut wanted = expected.to_vec();
        wanted.sort_unstable();

        if found != wanted {
            return Err(ManifestError::corrupt(format!(
                "expected segments {:?}, found {:?}",
                wanted, found
            )));
        }
        Ok(())
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn indices(&self) -> Vec<usize> {
        self.entries.iter().map(|e| e.index).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render the concat list, one `file '<path>'` line per segment.
    pub fn render(&self) -> ManifestResult<String> {
        let mut out = String::new();
        for entry in &self.entries {
            let path = entry.path.to_str().ok_or_else(|| {
                ManifestError::corrupt(format!(
                    "segment path {} is not valid UTF-8",
                    entry.path.display()
                ))
            })?;
            out.push_str("file '");
            out.push_str(&path.replace('\'', "'\\''"));
            out.push_str("'\n");
        }
        Ok(out)
    }

    /// Write the concat list to `path`.
    pub fn write_to(&self, path: &Path) -> ManifestResult<()> {
        if self.is_empty() {
            return Err(ManifestError::corrupt("no segment files to list"));
        }
        let content = self.render()?;
        fs::write(path, content)
            .map_err(|e| ManifestError::io(format!("writing {}", path.display()), e))
    }
}

/// Parse a segment file's stem as its index.
fn segment_index(path: &Path) -> ManifestResult<usize> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| ManifestError::corrupt(format!("unnamed segment file {}", path.display())))?;

    if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ManifestError::corrupt(format!(
            "segment file name '{}' is not a number",
            stem
        )));
    }

    stem.parse().map_err(|_| {
        ManifestError::corrupt(format!("segment file name '{}' is out of range", stem))
    })
}
