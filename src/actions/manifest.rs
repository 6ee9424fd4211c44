//! The list of files that go into one archive

use std::path::{Component, Path, PathBuf};

use serde::{Serialize, Serializer};

/// One file and the name it gets inside the archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub source: PathBuf,
    pub name: String,
}

/// Files selected for a backup, in the order they were added
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file under an explicit archive name
    pub fn add(&mut self, source: impl Into<PathBuf>, name: impl Into<String>) {
        self.entries.push(ManifestEntry {
            source: source.into(),
            name: name.into(),
        });
    }

    /// Add a file, naming it relative to `relative_to` when it lies inside it
    pub fn add_file(&mut self, source: &Path, relative_to: Option<&Path>) {
        let name = archive_name(source, relative_to);
        self.add(source, name);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }
}

// Snapshots only carry the count; the file list can be huge.
impl Serialize for Manifest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.entries.len() as u64)
    }
}

/// Name of a file inside the archive
///
/// Paths under `relative_to` lose that prefix; everything else keeps its
/// full path without the root or drive.
pub fn archive_name(source: &Path, relative_to: Option<&Path>) -> String {
    let path = relative_to
        .and_then(|base| source.strip_prefix(base).ok())
        .unwrap_or(source);

    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
