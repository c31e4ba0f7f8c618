//! Directory-backed store.

use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use tracing::trace;
use walkdir::WalkDir;

use crate::error::{FsError, FsResult};
use crate::traits::{Sink, Source};

/// Stores documents as plain files below a root directory.
///
/// Works as a read layer and as the writable destination. Paths are joined
/// onto the root; absolute paths and `..` components are rejected so a
/// document path can never escape the root.
#[derive(Clone, Debug)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    /// Create a store rooted at `root`. The directory need not exist yet;
    /// it is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> FsResult<PathBuf> {
        if path.is_empty() {
            return Err(FsError::InvalidPath {
                path: path.to_string(),
                reason: "path must not be empty".into(),
            });
        }
        let relative = Path::new(path);
        for component in relative.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                _ => {
                    return Err(FsError::InvalidPath {
                        path: path.to_string(),
                        reason: "path must be relative and stay below the root".into(),
                    })
                }
            }
        }
        Ok(self.root.join(relative))
    }
}

impl Source for DirStore {
    fn read(&self, path: &str) -> FsResult<Option<Vec<u8>>> {
        let full = self.resolve(path)?;
        match fs::read(&full) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                trace!(path, root = %self.root.display(), "not in directory layer");
                Ok(None)
            }
            Err(err) => Err(FsError::io(path, err)),
        }
    }

    fn list(&self) -> FsResult<Vec<String>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut paths = Vec::new();
        for entry in WalkDir::new(&self.root).follow_links(true) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let parts: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            paths.push(parts.join("/"));
        }
        paths.sort();
        Ok(paths)
    }

    fn contains(&self, path: &str) -> FsResult<bool> {
        Ok(self.resolve(path)?.is_file())
    }
}

impl Sink for DirStore {
    fn write_file(&self, path: &str, data: &[u8]) -> FsResult<()> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).map_err(|e| FsError::io(path, e))?;
        }
        fs::write(&full, data).map_err(|e| FsError::io(path, e))?;
        trace!(path, bytes = data.len(), "wrote file");
        Ok(())
    }
}
