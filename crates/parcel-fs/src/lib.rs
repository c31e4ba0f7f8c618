//! Byte-level storage collaborators for parcel.
//!
//! Parcel never touches the filesystem directly. It reads document bytes
//! through a priority-ordered stack of read-only [`Source`] layers and writes
//! them through a single [`Sink`]. This crate defines both interfaces and the
//! backends shipped with parcel.
//!
//! # Backends
//!
//! - [`DirStore`] -- a directory on disk, usable as a source and a sink
//! - [`MemoryStore`] -- a `HashMap` behind a lock, for tests and embedding
//!
//! # Layering
//!
//! [`Layers`] orders sources by ascending priority. A read walks the layers
//! front to back and the first layer holding the path wins. "Not found" is
//! reported as `Ok(None)` so it stays distinct from real I/O failures.

pub mod dir;
pub mod error;
pub mod layers;
pub mod memory;
pub mod traits;

pub use dir::DirStore;
pub use error::{FsError, FsResult};
pub use layers::Layers;
pub use memory::MemoryStore;
pub use traits::{Sink, Source};
