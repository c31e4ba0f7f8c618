//! The [`Persist`] trait: how a type is walked by the structural codec.
//!
//! Implementations exist for scalars, `String`, `Vec<T>`, `[T; N]`,
//! `Option<T>`, `HashMap`/`BTreeMap` with [`MapKey`](crate::MapKey) keys and
//! [`Ref<T>`](crate::Ref). Records get theirs from `#[derive(Persist)]`,
//! which also implements [`Record`].

use std::fmt;

use serde::de::{IgnoredAny, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserializer, Serializer};

use crate::codec::{Decoder, Encoder, NewSeed};

/// Runtime kind of a persistable type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Shape {
    /// Boolean, integer, float, char or string.
    Scalar,
    /// Byte sequence, written as base64 text.
    Bytes,
    /// Ordered sequence of non-byte elements.
    Sequence,
    /// Map with text-renderable keys.
    Map,
    /// Struct-like value with named fields.
    Record,
    /// `Option<T>`.
    Optional,
    /// `Ref<T>`.
    Reference,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar => write!(f, "scalar"),
            Self::Bytes => write!(f, "bytes"),
            Self::Sequence => write!(f, "sequence"),
            Self::Map => write!(f, "map"),
            Self::Record => write!(f, "record"),
            Self::Optional => write!(f, "optional"),
            Self::Reference => write!(f, "reference"),
        }
    }
}

/// A value the structural codec can encode and decode in place.
///
/// `Default` is the zero value: unregistered objects are allocated with it
/// and record fields missing from the wire keep it.
pub trait Persist: Default + 'static {
    /// The kind of value this is.
    const SHAPE: Shape;

    /// Shape of `Vec<Self>` and `[Self; N]`.
    #[doc(hidden)]
    const SLICE_SHAPE: Shape = Shape::Sequence;

    /// Write `self` to `serializer`.
    fn encode<S: Serializer>(&self, enc: &Encoder<'_>, serializer: S) -> Result<S::Ok, S::Error>;

    /// Overwrite `self` with the next wire value.
    fn decode<'de, D: Deserializer<'de>>(
        &mut self,
        dec: &mut Decoder<'_>,
        deserializer: D,
    ) -> Result<(), D::Error>;

    /// Build a new value from the next wire value.
    fn decode_new<'de, D: Deserializer<'de>>(
        dec: &mut Decoder<'_>,
        deserializer: D,
    ) -> Result<Self, D::Error> {
        let mut value = Self::default();
        value.decode(dec, deserializer)?;
        Ok(value)
    }

    /// Whether a record field holding this value is left off the wire.
    fn is_absent(&self) -> bool {
        false
    }

    /// Called once on values built by a registered factory, before they are
    /// handed out or wired into a graph.
    fn post_construct(&mut self) {}

    /// Called once on a loaded document's root after every field, including
    /// transitively loaded references, has been assigned.
    fn post_load(&mut self) {}

    #[doc(hidden)]
    fn encode_slice<S: Serializer>(
        items: &[Self],
        enc: &Encoder<'_>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(items.len()))?;
        for item in items {
            seq.serialize_element(&enc.wrap(item))?;
        }
        seq.end()
    }

    #[doc(hidden)]
    fn decode_vec<'de, D: Deserializer<'de>>(
        items: &mut Vec<Self>,
        dec: &mut Decoder<'_>,
        deserializer: D,
    ) -> Result<(), D::Error> {
        items.clear();
        deserializer.deserialize_seq(VecVisitor { items, dec })
    }

    #[doc(hidden)]
    fn decode_fixed<'de, D: Deserializer<'de>>(
        items: &mut [Self],
        dec: &mut Decoder<'_>,
        deserializer: D,
    ) -> Result<(), D::Error> {
        deserializer.deserialize_seq(FixedVisitor { items, dec })
    }
}

/// A struct-like type whose named fields are walked one by one.
///
/// Implemented by `#[derive(Persist)]`; there is rarely a reason to write
/// it by hand.
pub trait Record: Persist {
    /// Wire names of the walked fields, in declaration order.
    const FIELDS: &'static [&'static str];

    /// Write every present field into `map`.
    fn encode_fields<M: SerializeMap>(&self, enc: &Encoder<'_>, map: &mut M) -> Result<(), M::Error>;

    /// Decode the value of field `name` from `map`.
    ///
    /// Returns `Ok(false)` without consuming anything if the record has no
    /// such field.
    fn decode_field<'de, A: serde::de::MapAccess<'de>>(
        &mut self,
        name: &str,
        dec: &mut Decoder<'_>,
        map: &mut A,
    ) -> Result<bool, A::Error>;
}

struct VecVisitor<'v, 'd, 'p, T> {
    items: &'v mut Vec<T>,
    dec: &'d mut Decoder<'p>,
}

impl<'de, T: Persist> Visitor<'de> for VecVisitor<'_, '_, '_, T> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an array")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<(), A::Error> {
        while let Some(item) = seq.next_element_seed(NewSeed::<T>::new(&mut *self.dec))? {
            self.items.push(item);
        }
        Ok(())
    }
}

// Copies up to the destination's length; extra wire elements are dropped.
struct FixedVisitor<'v, 'd, 'p, T> {
    items: &'v mut [T],
    dec: &'d mut Decoder<'p>,
}

impl<'de, T: Persist> Visitor<'de> for FixedVisitor<'_, '_, '_, T> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "an array of at most {} elements", self.items.len())
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<(), A::Error> {
        let mut index = 0;
        while index < self.items.len() {
            match seq.next_element_seed(NewSeed::<T>::new(&mut *self.dec))? {
                Some(item) => self.items[index] = item,
                None => return Ok(()),
            }
            index += 1;
        }
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(())
    }
}

