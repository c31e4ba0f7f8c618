use std::sync::Arc;

use crate::error::FsResult;

/// A read-only layer that documents are located in.
///
/// Paths are relative, `/`-separated and already normalized by the caller.
pub trait Source: Send + Sync {
    /// Read the full contents stored at `path`.
    ///
    /// Returns `Ok(None)` if this layer does not hold the path.
    /// Returns `Err` on any other failure.
    fn read(&self, path: &str) -> FsResult<Option<Vec<u8>>>;

    /// List every path this layer holds, sorted.
    fn list(&self) -> FsResult<Vec<String>>;

    /// Check whether this layer holds `path`.
    ///
    /// Default implementation reads the contents. Backends may override
    /// with something cheaper.
    fn contains(&self, path: &str) -> FsResult<bool> {
        Ok(self.read(path)?.is_some())
    }
}

/// A writable destination for documents.
pub trait Sink: Send + Sync {
    /// Write `data` at `path`, replacing any existing content.
    fn write_file(&self, path: &str, data: &[u8]) -> FsResult<()>;
}

impl<S: Source + ?Sized> Source for Arc<S> {
    fn read(&self, path: &str) -> FsResult<Option<Vec<u8>>> {
        (**self).read(path)
    }

    fn list(&self) -> FsResult<Vec<String>> {
        (**self).list()
    }

    fn contains(&self, path: &str) -> FsResult<bool> {
        (**self).contains(path)
    }
}

impl<S: Sink + ?Sized> Sink for Arc<S> {
    fn write_file(&self, path: &str, data: &[u8]) -> FsResult<()> {
        (**self).write_file(path, data)
    }
}
