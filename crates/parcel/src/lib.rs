//! Object persistence with path-addressed references.
//!
//! `parcel` writes arbitrary values to JSON documents and reads them back.
//! Any value whose type implements [`Persist`] can be stored: scalars,
//! strings, byte buffers, sequences, maps, and records generated with
//! `#[derive(Persist)]`.
//!
//! References ([`Ref`]) are treated specially. When a referenced object has
//! been given a save path, the reference is written as that path and the
//! object lives in its own document. When it has not, the referenced value
//! is inlined. Loading reverses the decision: a path string triggers a
//! (memoized) load of the other document, an object is decoded in place.
//!
//! # Entry points
//!
//! - [`Parcel`] -- the context holding the type registry, the identity
//!   directory, the read layers and the writable destination
//! - [`Parcel::set_save_path`], [`Parcel::save`], [`Parcel::load`]
//!
//! # Example
//!
//! ```
//! use parcel::{MemoryStore, Parcel, Persist, Ref};
//!
//! #[derive(Debug, Default, Persist)]
//! pub struct Level {
//!     pub name: String,
//!     pub next: Option<Ref<Level>>,
//! }
//!
//! let store = MemoryStore::new();
//! let mut parcel = Parcel::new();
//! parcel.register_source(store.clone(), 0);
//! parcel.register_sink(store.clone());
//! parcel.register::<Level>().unwrap();
//!
//! let level = parcel.create::<Level>().unwrap();
//! level.borrow_mut().name = "intro".into();
//! parcel.set_save_path(&level, "levels/intro").unwrap();
//!
//! let mut fresh = Parcel::new();
//! fresh.register_source(store, 0);
//! fresh.register::<Level>().unwrap();
//! let loaded: Ref<Level> = fresh.load("levels/intro").unwrap();
//! assert_eq!(loaded.borrow().name, "intro");
//! ```
//!
//! # Threading
//!
//! A [`Parcel`] is single-threaded: it holds `Rc`s and is neither `Send`
//! nor `Sync`. Use one context per thread.

extern crate self as parcel;

pub mod codec;
pub mod config;
pub mod directory;
pub mod document;
pub mod error;
pub mod inspect;
pub mod key;
pub mod path;
pub mod persist;
pub mod reference;
pub mod registry;
pub mod store;

pub use codec::{Decoder, Encoder};
pub use config::{ParcelConfig, SourceConfig};
pub use directory::Directory;
pub use error::{ParcelError, Result};
pub use key::{MapKey, TextMarshal};
pub use path::{normalize_path, FILE_EXTENSION};
pub use persist::{Persist, Record, Shape};
pub use reference::{ObjectId, Ref};
pub use registry::{TypeDescriptor, TypeRegistry};
pub use store::Parcel;

pub use parcel_derive::Persist;
pub use parcel_fs::{DirStore, Layers, MemoryStore, Sink, Source};

#[doc(hidden)]
pub mod __private {
    pub use serde::de::MapAccess;
    pub use serde::ser::SerializeMap;
    pub use serde::{Deserializer, Serializer};
}
