//! The identity directory: which live object each path names.
//!
//! The directory is the single source of truth for object identity. Every
//! load consults it before touching storage, so two references to the same
//! path always resolve to the same object. The mapping is bijective: a path
//! names at most one object and an object is bound to at most one path.

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::error::{ParcelError, Result};
use crate::path::normalize_path;
use crate::reference::{ObjectId, Ref};

struct Binding {
    id: ObjectId,
    type_name: &'static str,
    object: Rc<dyn Any>,
}

/// Bidirectional path/object map.
///
/// Bound objects are owned by the directory and live as long as it does.
#[derive(Default)]
pub struct Directory {
    by_path: HashMap<String, Binding>,
    by_object: HashMap<ObjectId, String>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `object` to `path` (normalized) and return the normalized path.
    ///
    /// Rebinding an object to the path it already holds is a no-op.
    pub fn bind<T: 'static>(&mut self, object: &Ref<T>, path: &str) -> Result<String> {
        let path = normalize_path(path);
        let id = object.id();

        if let Some(existing) = self.by_path.get(&path) {
            if existing.id == id {
                return Ok(path);
            }
            return Err(ParcelError::PathAlreadyBound {
                path,
                bound_type: existing.type_name.to_string(),
            });
        }
        if let Some(bound) = self.by_object.get(&id) {
            return Err(ParcelError::ObjectAlreadyBound {
                id,
                path: bound.clone(),
            });
        }

        debug!(%id, path = %path, "binding object");
        self.by_path.insert(
            path.clone(),
            Binding {
                id,
                type_name: type_name::<T>(),
                object: object.to_any(),
            },
        );
        self.by_object.insert(id, path.clone());
        Ok(path)
    }

    /// The object bound to `path`, if any.
    ///
    /// Fails with [`ParcelError::PathAlreadyBound`] when the path names an
    /// object of another type.
    pub fn object_for_path<T: 'static>(&self, path: &str) -> Result<Option<Ref<T>>> {
        let path = normalize_path(path);
        let Some(binding) = self.by_path.get(&path) else {
            return Ok(None);
        };
        match Ref::<T>::from_any(&binding.object) {
            Some(found) => Ok(Some(found)),
            None => Err(ParcelError::PathAlreadyBound {
                path,
                bound_type: binding.type_name.to_string(),
            }),
        }
    }

    /// The path `id` is bound to, if any.
    pub fn path_for_object(&self, id: ObjectId) -> Option<&str> {
        self.by_object.get(&id).map(String::as_str)
    }

    /// Whether `path` (normalized) is bound.
    pub fn contains_path(&self, path: &str) -> bool {
        self.by_path.contains_key(&normalize_path(path))
    }

    /// Every bound path, sorted.
    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.by_path.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }

    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }

    /// Drop the binding for an already normalized path.
    pub(crate) fn unbind(&mut self, path: &str) {
        if let Some(binding) = self.by_path.remove(path) {
            self.by_object.remove(&binding.id);
            debug!(path, "unbound object");
        }
    }
}

impl fmt::Debug for Directory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Directory")
            .field("paths", &self.paths())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_normalizes_and_resolves_both_ways() {
        let mut dir = Directory::new();
        let obj = Ref::new(3i32);
        assert_eq!(dir.bind(&obj, "a").unwrap(), "a.parcel");

        let found = dir.object_for_path::<i32>("a.parcel").unwrap().unwrap();
        assert!(Ref::ptr_eq(&found, &obj));
        assert_eq!(dir.path_for_object(obj.id()), Some("a.parcel"));
        assert!(dir.contains_path("a"));
        assert_eq!(dir.len(), 1);
    }

    #[test]
    fn rebinding_same_pair_is_noop() {
        let mut dir = Directory::new();
        let obj = Ref::new(String::new());
        dir.bind(&obj, "x").unwrap();
        assert_eq!(dir.bind(&obj, "x.parcel").unwrap(), "x.parcel");
        assert_eq!(dir.len(), 1);
    }

    #[test]
    fn path_names_one_object() {
        let mut dir = Directory::new();
        dir.bind(&Ref::new(1u32), "p").unwrap();
        let err = dir.bind(&Ref::new(2u32), "p").unwrap_err();
        assert!(matches!(err, ParcelError::PathAlreadyBound { .. }));
    }

    #[test]
    fn object_holds_one_path() {
        let mut dir = Directory::new();
        let obj = Ref::new(1u32);
        dir.bind(&obj, "first").unwrap();
        let err = dir.bind(&obj, "second").unwrap_err();
        match err {
            ParcelError::ObjectAlreadyBound { path, .. } => assert_eq!(path, "first.parcel"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(!dir.contains_path("second"));
    }

    #[test]
    fn lookup_with_wrong_type_fails() {
        let mut dir = Directory::new();
        dir.bind(&Ref::new(1u32), "n").unwrap();
        assert!(matches!(
            dir.object_for_path::<String>("n"),
            Err(ParcelError::PathAlreadyBound { .. })
        ));
        assert!(dir.object_for_path::<u32>("missing").unwrap().is_none());
    }

    #[test]
    fn unbind_clears_both_directions() {
        let mut dir = Directory::new();
        let obj = Ref::new(0u8);
        dir.bind(&obj, "gone").unwrap();
        dir.unbind("gone.parcel");
        assert!(dir.is_empty());
        assert_eq!(dir.path_for_object(obj.id()), None);
        dir.bind(&obj, "back").unwrap();
    }

    #[test]
    fn bound_objects_outlive_caller_handles() {
        let mut dir = Directory::new();
        let id = {
            let obj = Ref::new(String::from("kept"));
            dir.bind(&obj, "kept").unwrap();
            obj.id()
        };
        let found = dir.object_for_path::<String>("kept").unwrap().unwrap();
        assert_eq!(found.id(), id);
        assert_eq!(*found.borrow(), "kept");
    }
}
