//! Shared, identity-carrying references.
//!
//! A [`Ref`] is the only reference kind parcel understands. Cloning a `Ref`
//! shares the object; every object created through `Ref::new` gets a
//! process-unique [`ObjectId`] that the identity directory keys on.

use std::any::Any;
use std::cell::{self, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{ParcelError, Result};

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

/// Stable handle for a referenced object.
///
/// Handles are never reused within a process, so a handle names exactly one
/// object for as long as that object lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    fn next() -> Self {
        Self(NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw handle value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "obj#{}", self.0)
    }
}

pub(crate) struct Node<T> {
    id: ObjectId,
    value: RefCell<T>,
}

/// A shared, mutable reference to a persistable object.
///
/// `Ref<T>` is what makes a field "reference-capable": when `T` is a
/// registered type and the object is bound to a path, the field is written
/// as that path. `Option<Ref<T>>` is the nullable form; `None` is left off
/// the wire entirely.
///
/// Equality compares the referenced values, like `Rc`. Use [`Ref::ptr_eq`]
/// to test identity.
pub struct Ref<T>(Rc<Node<T>>);

impl<T> Ref<T> {
    /// Wrap `value` in a new object with a fresh handle.
    pub fn new(value: T) -> Self {
        Self(Rc::new(Node {
            id: ObjectId::next(),
            value: RefCell::new(value),
        }))
    }

    /// The object's handle.
    pub fn id(&self) -> ObjectId {
        self.0.id
    }

    /// Immutably borrow the object.
    ///
    /// # Panics
    ///
    /// Panics if the object is currently mutably borrowed.
    pub fn borrow(&self) -> cell::Ref<'_, T> {
        self.0.value.borrow()
    }

    /// Mutably borrow the object.
    ///
    /// # Panics
    ///
    /// Panics if the object is currently borrowed.
    pub fn borrow_mut(&self) -> cell::RefMut<'_, T> {
        self.0.value.borrow_mut()
    }

    /// Immutably borrow the object, failing instead of panicking.
    pub fn try_borrow(&self) -> Result<cell::Ref<'_, T>> {
        self.0
            .value
            .try_borrow()
            .map_err(|_| ParcelError::Borrowed { id: self.id() })
    }

    /// Mutably borrow the object, failing instead of panicking.
    pub fn try_borrow_mut(&self) -> Result<cell::RefMut<'_, T>> {
        self.0
            .value
            .try_borrow_mut()
            .map_err(|_| ParcelError::Borrowed { id: self.id() })
    }

    /// Returns `true` if both references point at the same object.
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Rc::ptr_eq(&this.0, &other.0)
    }

    /// Replace the object's value in place, returning the old one.
    /// Outstanding clones observe the new value.
    pub fn replace(&self, value: T) -> Result<T> {
        let mut slot = self.try_borrow_mut()?;
        Ok(std::mem::replace(&mut *slot, value))
    }
}

impl<T: Default> Ref<T> {
    /// Move the value out, leaving `T::default()` behind.
    pub(crate) fn take(&self) -> Result<T> {
        self.replace(T::default())
    }
}

impl<T: 'static> Ref<T> {
    pub(crate) fn to_any(&self) -> Rc<dyn Any> {
        self.0.clone()
    }

    pub(crate) fn from_any(object: &Rc<dyn Any>) -> Option<Self> {
        Rc::clone(object).downcast::<Node<T>>().ok().map(Self)
    }
}

impl<T> Clone for Ref<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T: Default> Default for Ref<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: PartialEq> PartialEq for Ref<T> {
    fn eq(&self, other: &Self) -> bool {
        Self::ptr_eq(self, other) || *self.borrow() == *other.borrow()
    }
}

impl<T: fmt::Debug> fmt::Debug for Ref<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Ref");
        s.field("id", &format_args!("{}", self.id()));
        match self.0.value.try_borrow() {
            Ok(value) => s.field("value", &*value),
            Err(_) => s.field("value", &format_args!("<borrowed>")),
        };
        s.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_unique() {
        let a = Ref::new(1);
        let b = Ref::new(1);
        assert_ne!(a.id(), b.id());
        assert_eq!(a, b);
        assert!(!Ref::ptr_eq(&a, &b));
    }

    #[test]
    fn clones_share_identity_and_value() {
        let a = Ref::new(String::from("x"));
        let b = a.clone();
        assert_eq!(a.id(), b.id());
        assert!(Ref::ptr_eq(&a, &b));
        b.borrow_mut().push('y');
        assert_eq!(*a.borrow(), "xy");
    }

    #[test]
    fn try_borrow_reports_conflict() {
        let a = Ref::new(5);
        let guard = a.borrow_mut();
        assert!(matches!(a.try_borrow(), Err(ParcelError::Borrowed { .. })));
        drop(guard);
        assert_eq!(*a.try_borrow().unwrap(), 5);
    }

    #[test]
    fn replace_keeps_identity() {
        let a = Ref::new(vec![1, 2]);
        let b = a.clone();
        let old = a.replace(vec![3]).unwrap();
        assert_eq!(old, vec![1, 2]);
        assert_eq!(*b.borrow(), vec![3]);
        assert_eq!(a.take().unwrap(), vec![3]);
        assert!(b.borrow().is_empty());
    }

    #[test]
    fn any_roundtrip_requires_matching_type() {
        let a = Ref::new(7u32);
        let any = a.to_any();
        let back = Ref::<u32>::from_any(&any).unwrap();
        assert!(Ref::ptr_eq(&a, &back));
        assert!(Ref::<i64>::from_any(&any).is_none());
    }

    #[test]
    fn debug_shows_handle() {
        let a = Ref::new(3);
        let text = format!("{a:?}");
        assert!(text.contains("obj#"));
        assert!(text.contains('3'));
    }
}
