//! Factories for reference-capable types.
//!
//! Only registered types can be addressed by path. Registration stores a
//! constructor; [`TypeRegistry::construct`] runs it and then the type's
//! post-construct hook.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;

use tracing::trace;

use crate::error::{ParcelError, Result};
use crate::persist::{Persist, Shape};

/// Identifies a concrete record type.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeDescriptor {
    id: TypeId,
    name: &'static str,
}

impl TypeDescriptor {
    /// Descriptor for `T`.
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// Fully qualified type name, as written into documents.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeDescriptor({})", self.name)
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

type Factory = Box<dyn Fn() -> Result<Box<dyn Any>>>;

/// Constructors keyed by type.
#[derive(Default)]
pub struct TypeRegistry {
    factories: HashMap<TypeId, (TypeDescriptor, Factory)>,
}

impl TypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T` with `T::default` as its factory.
    pub fn register<T: Persist>(&mut self) -> Result<()> {
        self.register_factory::<T, _>(|| Ok(T::default()))
    }

    /// Register `T` with a custom factory.
    ///
    /// `T` must be a record. References (`Ref<U>`), optionals and
    /// collections are rejected: only one level of indirection is supported
    /// and the registered type is what a `Ref<T>` points at.
    pub fn register_factory<T, F>(&mut self, create: F) -> Result<()>
    where
        T: Persist,
        F: Fn() -> Result<T> + 'static,
    {
        let descriptor = TypeDescriptor::of::<T>();
        match T::SHAPE {
            Shape::Record => {}
            Shape::Reference => {
                return Err(ParcelError::InvalidRegistration {
                    type_name: descriptor.name.to_string(),
                    reason: "register the pointed-at record, not a reference to it".into(),
                })
            }
            other => {
                return Err(ParcelError::InvalidRegistration {
                    type_name: descriptor.name.to_string(),
                    reason: format!("{other} types cannot be reference targets"),
                })
            }
        }
        let factory: Factory = Box::new(move || create().map(|v| Box::new(v) as Box<dyn Any>));
        self.factories.insert(descriptor.id, (descriptor, factory));
        trace!(type_name = descriptor.name, "registered type");
        Ok(())
    }

    /// Whether `T` has a factory.
    pub fn is_known<T: 'static>(&self) -> bool {
        self.factories.contains_key(&TypeId::of::<T>())
    }

    /// Build a fresh `T` and run its post-construct hook.
    pub fn construct<T: Persist>(&self) -> Result<T> {
        let unknown = || ParcelError::UnknownType {
            type_name: type_name::<T>().to_string(),
        };
        let (_, factory) = self.factories.get(&TypeId::of::<T>()).ok_or_else(unknown)?;
        let mut value = *factory()?.downcast::<T>().map_err(|_| unknown())?;
        value.post_construct();
        Ok(value)
    }

    /// Descriptors of every registered type, sorted by name.
    pub fn descriptors(&self) -> Vec<TypeDescriptor> {
        let mut all: Vec<TypeDescriptor> = self.factories.values().map(|(d, _)| *d).collect();
        all.sort_by_key(|d| d.name);
        all
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &self.descriptors())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::collections::HashMap;
    use std::rc::Rc;

    use super::*;
    use crate::reference::Ref;
    use crate::Persist;

    #[derive(Debug, Default, Persist)]
    #[parcel(post_construct = "mark_constructed")]
    pub struct Widget {
        pub label: String,
        constructed: bool,
    }

    impl Widget {
        fn mark_constructed(&mut self) {
            self.constructed = true;
        }
    }

    #[test]
    fn construct_runs_factory_and_hook() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let mut registry = TypeRegistry::new();
        registry
            .register_factory::<Widget, _>(move || {
                counter.set(counter.get() + 1);
                Ok(Widget {
                    label: "Correct".into(),
                    constructed: false,
                })
            })
            .unwrap();

        let widget = registry.construct::<Widget>().unwrap();
        assert_eq!(widget.label, "Correct");
        assert!(widget.constructed);
        assert_eq!(calls.get(), 1);

        registry.construct::<Widget>().unwrap();
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn unknown_type_is_reported() {
        let registry = TypeRegistry::new();
        assert!(!registry.is_known::<Widget>());
        let err = registry.construct::<Widget>().unwrap_err();
        assert!(matches!(err, ParcelError::UnknownType { .. }));
    }

    #[test]
    fn reference_to_reference_is_rejected() {
        let mut registry = TypeRegistry::new();
        let err = registry.register::<Ref<Widget>>().unwrap_err();
        assert!(matches!(err, ParcelError::InvalidRegistration { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn non_record_types_are_rejected() {
        let mut registry = TypeRegistry::new();
        assert!(matches!(
            registry.register::<i32>(),
            Err(ParcelError::InvalidRegistration { .. })
        ));
        assert!(matches!(
            registry.register::<Vec<u8>>(),
            Err(ParcelError::InvalidRegistration { .. })
        ));
        assert!(matches!(
            registry.register::<HashMap<String, i32>>(),
            Err(ParcelError::InvalidRegistration { .. })
        ));
        assert!(matches!(
            registry.register::<Option<Widget>>(),
            Err(ParcelError::InvalidRegistration { .. })
        ));
    }

    #[test]
    fn factory_errors_propagate() {
        let mut registry = TypeRegistry::new();
        registry
            .register_factory::<Widget, _>(|| Err(ParcelError::Config("no widgets today".into())))
            .unwrap();
        assert!(matches!(
            registry.construct::<Widget>(),
            Err(ParcelError::Config(_))
        ));
    }

    #[test]
    fn descriptors_name_registered_types() {
        let mut registry = TypeRegistry::new();
        registry.register::<Widget>().unwrap();
        let names: Vec<_> = registry.descriptors().iter().map(|d| d.name()).collect();
        assert_eq!(names.len(), 1);
        assert!(names[0].ends_with("Widget"));
        assert_eq!(TypeDescriptor::of::<Widget>().to_string(), names[0]);
    }
}
