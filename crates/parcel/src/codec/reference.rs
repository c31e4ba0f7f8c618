//! `Ref<T>` on the wire.
//!
//! A reference to a registered type that is bound to a path is written as
//! the path. Anything else is written inline as the referenced value. On
//! the way back the first wire token decides: a string is a path to load,
//! an object is decoded into a new instance. Registered types get that
//! instance from their factory, so a bound object already in the slot is
//! never overwritten. Unregistered types decode in place.

use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;

use serde::de::value::MapAccessDeserializer;
use serde::de::{MapAccess, Visitor};
use serde::{Deserializer, Serializer};
use tracing::trace;

use crate::codec::{Decoder, Encoder};
use crate::persist::{Persist, Shape};
use crate::reference::Ref;

impl<T: Persist> Persist for Ref<T> {
    const SHAPE: Shape = Shape::Reference;

    fn encode<S: Serializer>(&self, enc: &Encoder<'_>, serializer: S) -> Result<S::Ok, S::Error> {
        if enc.is_known::<T>() {
            if let Some(path) = enc.path_of(self.id()) {
                return serializer.serialize_str(path);
            }
        }
        let _guard = enc.enter_inline(self.id()).map_err(|e| enc.fail::<S::Error>(e))?;
        let value = self.try_borrow().map_err(|e| enc.fail::<S::Error>(e))?;
        value.encode(enc, serializer)
    }

    fn decode<'de, D: Deserializer<'de>>(
        &mut self,
        dec: &mut Decoder<'_>,
        deserializer: D,
    ) -> Result<(), D::Error> {
        if !dec.is_known::<T>() {
            return decode_inline(self, dec, deserializer);
        }
        *self = deserializer.deserialize_any(RefVisitor::new(dec))?;
        Ok(())
    }

    fn decode_new<'de, D: Deserializer<'de>>(
        dec: &mut Decoder<'_>,
        deserializer: D,
    ) -> Result<Self, D::Error> {
        if !dec.is_known::<T>() {
            return T::decode_new(dec, deserializer).map(Ref::new);
        }
        deserializer.deserialize_any(RefVisitor::new(dec))
    }
}

/// Decode into the referenced object, keeping its identity.
///
/// The value is moved out for the duration so that documents loaded along
/// the way may hold (and clone) the same reference.
fn decode_inline<'de, T: Persist, D: Deserializer<'de>>(
    target: &Ref<T>,
    dec: &mut Decoder<'_>,
    deserializer: D,
) -> Result<(), D::Error> {
    let mut value = target.take().map_err(|e| dec.fail::<D::Error>(e))?;
    let outcome = value.decode(dec, deserializer);
    target.replace(value).map_err(|e| dec.fail::<D::Error>(e))?;
    outcome
}

struct RefVisitor<'d, 'p, T> {
    dec: &'d mut Decoder<'p>,
    marker: PhantomData<T>,
}

impl<'d, 'p, T> RefVisitor<'d, 'p, T> {
    fn new(dec: &'d mut Decoder<'p>) -> Self {
        Self {
            dec,
            marker: PhantomData,
        }
    }
}

impl<'de, T: Persist> Visitor<'de> for RefVisitor<'_, '_, T> {
    type Value = Ref<T>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a document path or an inline {}", type_name::<T>())
    }

    fn visit_str<E: serde::de::Error>(self, path: &str) -> Result<Ref<T>, E> {
        trace!(path, type_name = type_name::<T>(), "following reference");
        let loaded = self.dec.load::<T>(path);
        loaded.map_err(|e| self.dec.fail(e))
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Ref<T>, A::Error> {
        let built = self.dec.construct::<T>();
        let target = Ref::new(built.map_err(|e| self.dec.fail::<A::Error>(e))?);
        decode_inline(&target, self.dec, MapAccessDeserializer::new(map))?;
        Ok(target)
    }
}
