//! The load/save orchestrator.
//!
//! A [`Parcel`] owns everything one persistence context needs: the type
//! registry, the identity directory, the priority-ordered read layers and
//! the (single) writable destination. It is the explicit replacement for a
//! process-wide default registry.

use std::fmt;

use parcel_fs::{DirStore, Layers, Sink, Source};
use tracing::{debug, trace, warn};

use crate::config::ParcelConfig;
use crate::directory::Directory;
use crate::document;
use crate::error::{ParcelError, Result};
use crate::path::normalize_path;
use crate::persist::Persist;
use crate::reference::Ref;
use crate::registry::TypeRegistry;

/// A persistence context.
///
/// See the [crate docs](crate) for an end-to-end example.
pub struct Parcel {
    registry: TypeRegistry,
    directory: Directory,
    sources: Layers,
    sink: Option<Box<dyn Sink>>,
    pretty: bool,
    /// Paths bound by the load currently in progress, if any.
    pending: Option<Vec<String>>,
}

impl Default for Parcel {
    fn default() -> Self {
        Self {
            registry: TypeRegistry::new(),
            directory: Directory::new(),
            sources: Layers::new(),
            sink: None,
            pretty: true,
            pending: None,
        }
    }
}

impl Parcel {
    /// Create an empty context with no types, sources or destination.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context from configuration: one [`DirStore`] read layer per
    /// configured source and, if set, a [`DirStore`] destination.
    pub fn from_config(config: &ParcelConfig) -> Self {
        let mut parcel = Self::new();
        for source in &config.sources {
            parcel.register_source(DirStore::new(&source.path), source.priority);
        }
        if let Some(output) = &config.output {
            parcel.register_sink(DirStore::new(output));
        }
        parcel.set_pretty(config.pretty);
        parcel
    }

    /// Add a read layer. Lower priorities are searched first.
    pub fn register_source(&mut self, source: impl Source + 'static, priority: i32) {
        debug!(priority, "registered read layer");
        self.sources.push(source, priority);
    }

    /// Set the writable destination, replacing any previous one.
    pub fn register_sink(&mut self, sink: impl Sink + 'static) {
        if self.sink.is_some() {
            debug!("replacing writable destination");
        }
        self.sink = Some(Box::new(sink));
    }

    /// Write pretty-printed (default) or compact JSON.
    pub fn set_pretty(&mut self, pretty: bool) {
        self.pretty = pretty;
    }

    /// Register `T` as a reference target built with `T::default`.
    pub fn register<T: Persist>(&mut self) -> Result<()> {
        self.registry.register::<T>()
    }

    /// Register `T` as a reference target built by `create`.
    pub fn register_factory<T, F>(&mut self, create: F) -> Result<()>
    where
        T: Persist,
        F: Fn() -> Result<T> + 'static,
    {
        self.registry.register_factory::<T, F>(create)
    }

    /// Whether `T` has been registered.
    pub fn is_known<T: 'static>(&self) -> bool {
        self.registry.is_known::<T>()
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    pub fn sources(&self) -> &Layers {
        &self.sources
    }

    /// Build a new, unbound `T` through its registered factory.
    pub fn create<T: Persist>(&self) -> Result<Ref<T>> {
        self.registry.construct::<T>().map(Ref::new)
    }

    /// The path `object` is bound to, if any.
    pub fn path_of<T>(&self, object: &Ref<T>) -> Option<&str> {
        self.directory.path_for_object(object.id())
    }

    /// Bind `object` to `path` and save it there.
    ///
    /// The binding stays in place even if the save fails, so the object can
    /// be saved again once the problem is fixed.
    pub fn set_save_path<T: Persist>(&mut self, object: &Ref<T>, path: &str) -> Result<()> {
        let path = self.directory.bind(object, path)?;
        debug!(id = %object.id(), path = %path, "set save path");
        self.save(object)
    }

    /// Write `object` to its bound path.
    pub fn save<T: Persist>(&self, object: &Ref<T>) -> Result<()> {
        let path = self
            .directory
            .path_for_object(object.id())
            .ok_or(ParcelError::NoSavePath { id: object.id() })?;
        let sink = self.sink.as_ref().ok_or(ParcelError::NoWritableDestination)?;

        let bytes = {
            let value = object.try_borrow()?;
            document::encode(&self.directory, &self.registry, &*value, self.pretty)?
        };
        sink.write_file(path, &bytes)?;
        debug!(path, bytes = bytes.len(), "saved document");
        Ok(())
    }

    /// Load the `T` stored at `path`.
    ///
    /// A path that is already bound returns the bound object without any
    /// I/O, so loading the same path twice yields the same object. If the
    /// load fails, every object bound while it ran is unbound again.
    pub fn load<T: Persist>(&mut self, path: &str) -> Result<Ref<T>> {
        let path = normalize_path(path);
        if let Some(found) = self.directory.object_for_path::<T>(&path)? {
            trace!(path = %path, "load hit");
            return Ok(found);
        }
        if !self.is_known::<T>() {
            return Err(ParcelError::UnknownType {
                type_name: std::any::type_name::<T>().to_string(),
            });
        }

        let outermost = self.pending.is_none();
        if outermost {
            self.pending = Some(Vec::new());
        }
        let loaded = self.load_document::<T>(&path);
        if outermost {
            let bound = self.pending.take().unwrap_or_default();
            if let Err(err) = &loaded {
                warn!(path = %path, error = %err, rolled_back = bound.len(), "load failed");
                for path in bound.iter().rev() {
                    self.directory.unbind(path);
                }
            }
        }
        loaded
    }

    fn load_document<T: Persist>(&mut self, path: &str) -> Result<Ref<T>> {
        let bytes = self
            .sources
            .read(path)?
            .ok_or_else(|| ParcelError::NotFound {
                path: path.to_string(),
            })?;
        debug!(path, bytes = bytes.len(), "load miss, decoding document");

        let object = Ref::new(self.registry.construct::<T>()?);
        self.directory.bind(&object, path)?;
        if let Some(pending) = self.pending.as_mut() {
            pending.push(path.to_string());
        }

        let mut value = object.take()?;
        document::decode(self, path, &bytes, &mut value)?;
        value.post_load();
        object.replace(value)?;
        Ok(object)
    }

    /// Encode a bare value (no document envelope).
    pub fn encode_value<T: Persist>(&self, value: &T) -> Result<Vec<u8>> {
        document::encode_bare(&self.directory, &self.registry, value, self.pretty)
    }

    /// Decode a bare value into `target`. Path references it holds are
    /// loaded through this context.
    pub fn decode_value<T: Persist>(&mut self, bytes: &[u8], target: &mut T) -> Result<()> {
        document::decode_bare(self, "<value>", bytes, target)
    }
}

impl fmt::Debug for Parcel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parcel")
            .field("registry", &self.registry)
            .field("directory", &self.directory)
            .field("sources", &self.sources)
            .field("has_sink", &self.sink.is_some())
            .field("pretty", &self.pretty)
            .finish()
    }
}
