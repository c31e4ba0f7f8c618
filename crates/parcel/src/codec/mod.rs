//! The structural codec.
//!
//! Encoding drives a serde [`Serializer`] through [`Persist::encode`] while
//! an [`Encoder`] carries the identity directory, so reference fields can be
//! replaced by their bound path. Decoding drives a serde [`Deserializer`]
//! through [`Persist::decode`] while a [`Decoder`] carries the whole context,
//! so a reference field holding a path can load the other document on the
//! spot.
//!
//! Serde error types cannot carry a [`ParcelError`]. Both sides therefore
//! keep the first real error in a side slot and hand serde a text copy; the
//! top-level entry points return the slot's error when there is one.

mod collections;
mod reference;
mod scalar;

use std::any::type_name;
use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;

use serde::de::{self, DeserializeSeed, IgnoredAny, MapAccess, Visitor};
use serde::ser::{self, SerializeMap};
use serde::{Deserializer, Serialize, Serializer};

use crate::directory::Directory;
use crate::error::{ParcelError, Result};
use crate::persist::{Persist, Record};
use crate::reference::{ObjectId, Ref};
use crate::registry::TypeRegistry;
use crate::store::Parcel;

/// Encoding state: the identity directory plus the unbound references
/// currently being inlined.
pub struct Encoder<'a> {
    directory: &'a Directory,
    registry: &'a TypeRegistry,
    inlining: RefCell<Vec<ObjectId>>,
    failure: RefCell<Option<ParcelError>>,
}

impl<'a> Encoder<'a> {
    pub(crate) fn new(directory: &'a Directory, registry: &'a TypeRegistry) -> Self {
        Self {
            directory,
            registry,
            inlining: RefCell::new(Vec::new()),
            failure: RefCell::new(None),
        }
    }

    /// Pair `value` with this encoder so it can be handed to serde.
    pub fn wrap<'v, T: Persist>(&'v self, value: &'v T) -> Encoded<'v, 'a, T> {
        Encoded { value, enc: self }
    }

    /// Record `err` and turn it into the serializer's error type.
    pub fn fail<E: ser::Error>(&self, err: ParcelError) -> E {
        let message = err.to_string();
        let mut slot = self.failure.borrow_mut();
        if slot.is_none() {
            *slot = Some(err);
        }
        E::custom(message)
    }

    /// The path `id` is bound to, if any.
    pub fn path_of(&self, id: ObjectId) -> Option<&'a str> {
        self.directory.path_for_object(id)
    }

    pub(crate) fn is_known<T: 'static>(&self) -> bool {
        self.registry.is_known::<T>()
    }

    pub(crate) fn enter_inline(&self, id: ObjectId) -> Result<InlineGuard<'_>> {
        let mut stack = self.inlining.borrow_mut();
        if stack.contains(&id) {
            return Err(ParcelError::InlineCycle { id });
        }
        stack.push(id);
        Ok(InlineGuard {
            stack: &self.inlining,
        })
    }

    pub(crate) fn finish(self, err: serde_json::Error) -> ParcelError {
        self.failure
            .into_inner()
            .unwrap_or_else(|| ParcelError::Serialization(err.to_string()))
    }
}

pub(crate) struct InlineGuard<'e> {
    stack: &'e RefCell<Vec<ObjectId>>,
}

impl Drop for InlineGuard<'_> {
    fn drop(&mut self) {
        self.stack.borrow_mut().pop();
    }
}

/// A value paired with its encoder; implements [`Serialize`].
pub struct Encoded<'v, 'a, T> {
    value: &'v T,
    enc: &'v Encoder<'a>,
}

impl<T: Persist> Serialize for Encoded<'_, '_, T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.value.encode(self.enc, serializer)
    }
}

/// Decoding state: the parcel context, used to resolve known types and to
/// load referenced documents.
pub struct Decoder<'p> {
    parcel: &'p mut Parcel,
    failure: Option<ParcelError>,
}

impl<'p> Decoder<'p> {
    pub(crate) fn new(parcel: &'p mut Parcel) -> Self {
        Self {
            parcel,
            failure: None,
        }
    }

    /// Record `err` and turn it into the deserializer's error type.
    pub fn fail<E: de::Error>(&mut self, err: ParcelError) -> E {
        let message = err.to_string();
        if self.failure.is_none() {
            self.failure = Some(err);
        }
        E::custom(message)
    }

    pub(crate) fn is_known<T: 'static>(&self) -> bool {
        self.parcel.is_known::<T>()
    }

    pub(crate) fn construct<T: Persist>(&self) -> Result<T> {
        self.parcel.registry().construct::<T>()
    }

    pub(crate) fn load<T: Persist>(&mut self, path: &str) -> Result<Ref<T>> {
        self.parcel.load::<T>(path)
    }

    pub(crate) fn finish(self, path: &str, err: serde_json::Error) -> ParcelError {
        self.failure.unwrap_or_else(|| ParcelError::MalformedDocument {
            path: path.to_string(),
            reason: err.to_string(),
        })
    }
}

/// Seed that decodes the next wire value into an existing slot.
pub struct DecodeSeed<'t, 'd, 'p, T> {
    target: &'t mut T,
    dec: &'d mut Decoder<'p>,
}

impl<'t, 'd, 'p, T> DecodeSeed<'t, 'd, 'p, T> {
    pub fn new(target: &'t mut T, dec: &'d mut Decoder<'p>) -> Self {
        Self { target, dec }
    }
}

impl<'de, T: Persist> DeserializeSeed<'de> for DecodeSeed<'_, '_, '_, T> {
    type Value = ();

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> std::result::Result<(), D::Error> {
        self.target.decode(self.dec, deserializer)
    }
}

/// Seed that builds a new value from the next wire value.
pub struct NewSeed<'d, 'p, T> {
    dec: &'d mut Decoder<'p>,
    marker: PhantomData<fn() -> T>,
}

impl<'d, 'p, T> NewSeed<'d, 'p, T> {
    pub fn new(dec: &'d mut Decoder<'p>) -> Self {
        Self {
            dec,
            marker: PhantomData,
        }
    }
}

impl<'de, T: Persist> DeserializeSeed<'de> for NewSeed<'_, '_, T> {
    type Value = T;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> std::result::Result<T, D::Error> {
        T::decode_new(self.dec, deserializer)
    }
}

/// Write one record field, skipping absent values.
pub fn write_field<M: SerializeMap, T: Persist>(
    enc: &Encoder<'_>,
    map: &mut M,
    name: &'static str,
    value: &T,
) -> std::result::Result<(), M::Error> {
    if value.is_absent() {
        return Ok(());
    }
    map.serialize_entry(name, &enc.wrap(value))
}

/// Decode the current map value into a record field.
pub fn read_field<'de, A: MapAccess<'de>, T: Persist>(
    dec: &mut Decoder<'_>,
    map: &mut A,
    value: &mut T,
) -> std::result::Result<(), A::Error> {
    map.next_value_seed(DecodeSeed::new(value, dec))
}

/// Encode a record as a wire object, one entry per walked field.
pub fn encode_record<T: Record, S: Serializer>(
    record: &T,
    enc: &Encoder<'_>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(None)?;
    record.encode_fields(enc, &mut map)?;
    map.end()
}

/// Decode a wire object into a record field by field.
///
/// Wire fields the record does not declare are skipped. Declared fields
/// missing from the wire keep their current value.
pub fn decode_record<'de, T: Record, D: Deserializer<'de>>(
    record: &mut T,
    dec: &mut Decoder<'_>,
    deserializer: D,
) -> std::result::Result<(), D::Error> {
    deserializer.deserialize_map(RecordVisitor { record, dec })
}

struct RecordVisitor<'r, 'd, 'p, T> {
    record: &'r mut T,
    dec: &'d mut Decoder<'p>,
}

impl<'de, T: Record> Visitor<'de> for RecordVisitor<'_, '_, '_, T> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "an object holding the fields of {} ({})",
            type_name::<T>(),
            T::FIELDS.join(", ")
        )
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<(), A::Error> {
        while let Some(name) = map.next_key::<String>()? {
            if !self.record.decode_field(&name, &mut *self.dec, &mut map)? {
                map.next_value::<IgnoredAny>()?;
            }
        }
        Ok(())
    }
}
