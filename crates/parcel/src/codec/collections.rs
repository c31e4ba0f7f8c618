use std::any::type_name;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;

use serde::de::{Error as _, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserializer, Serializer};

use crate::codec::{Decoder, Encoder, NewSeed};
use crate::key::MapKey;
use crate::persist::{Persist, Shape};

impl<T: Persist> Persist for Vec<T> {
    const SHAPE: Shape = T::SLICE_SHAPE;

    fn encode<S: Serializer>(&self, enc: &Encoder<'_>, serializer: S) -> Result<S::Ok, S::Error> {
        T::encode_slice(self, enc, serializer)
    }

    fn decode<'de, D: Deserializer<'de>>(
        &mut self,
        dec: &mut Decoder<'_>,
        deserializer: D,
    ) -> Result<(), D::Error> {
        T::decode_vec(self, dec, deserializer)
    }
}

impl<T: Persist, const N: usize> Persist for [T; N]
where
    [T; N]: Default,
{
    const SHAPE: Shape = T::SLICE_SHAPE;

    fn encode<S: Serializer>(&self, enc: &Encoder<'_>, serializer: S) -> Result<S::Ok, S::Error> {
        T::encode_slice(self, enc, serializer)
    }

    fn decode<'de, D: Deserializer<'de>>(
        &mut self,
        dec: &mut Decoder<'_>,
        deserializer: D,
    ) -> Result<(), D::Error> {
        T::decode_fixed(self, dec, deserializer)
    }
}

impl<T: Persist> Persist for Option<T> {
    const SHAPE: Shape = Shape::Optional;

    fn encode<S: Serializer>(&self, enc: &Encoder<'_>, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Some(value) => serializer.serialize_some(&enc.wrap(value)),
            None => serializer.serialize_none(),
        }
    }

    fn decode<'de, D: Deserializer<'de>>(
        &mut self,
        dec: &mut Decoder<'_>,
        deserializer: D,
    ) -> Result<(), D::Error> {
        deserializer.deserialize_option(OptionVisitor { slot: self, dec })
    }

    fn is_absent(&self) -> bool {
        self.is_none()
    }
}

struct OptionVisitor<'s, 'd, 'p, T> {
    slot: &'s mut Option<T>,
    dec: &'d mut Decoder<'p>,
}

impl<'de, T: Persist> Visitor<'de> for OptionVisitor<'_, '_, '_, T> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "null or a {}", type_name::<T>())
    }

    fn visit_none<E: serde::de::Error>(self) -> Result<(), E> {
        *self.slot = None;
        Ok(())
    }

    fn visit_unit<E: serde::de::Error>(self) -> Result<(), E> {
        self.visit_none()
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<(), D::Error> {
        if let Some(value) = self.slot.as_mut() {
            return value.decode(self.dec, deserializer);
        }
        *self.slot = Some(T::decode_new(self.dec, deserializer)?);
        Ok(())
    }
}

// Entries are written in key-text order so documents are stable.
fn encode_entries<'e, S, K, V, I>(
    entries: I,
    len: usize,
    enc: &Encoder<'_>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    K: MapKey + 'e,
    V: Persist,
    I: Iterator<Item = (&'e K, &'e V)>,
{
    let mut rendered = Vec::with_capacity(len);
    for (key, value) in entries {
        let text = key.encode_key().map_err(|e| enc.fail::<S::Error>(e))?;
        rendered.push((text, value));
    }
    rendered.sort_by(|(a, _), (b, _)| a.cmp(b));

    let mut map = serializer.serialize_map(Some(rendered.len()))?;
    for (text, value) in &rendered {
        map.serialize_entry(text, &enc.wrap(*value))?;
    }
    map.end()
}

/// Insert decoded entries; existing entries with other keys are kept.
struct EntriesVisitor<'d, 'p, K, V, F> {
    dec: &'d mut Decoder<'p>,
    insert: F,
    marker: PhantomData<fn() -> (K, V)>,
}

impl<'de, K, V, F> Visitor<'de> for EntriesVisitor<'_, '_, K, V, F>
where
    K: MapKey,
    V: Persist,
    F: FnMut(K, V),
{
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "an object keyed by {}", type_name::<K>())
    }

    fn visit_map<A: MapAccess<'de>>(mut self, mut map: A) -> Result<(), A::Error> {
        while let Some(text) = map.next_key::<String>()? {
            let key = K::decode_key(&text).map_err(A::Error::custom)?;
            let value = map.next_value_seed(NewSeed::<V>::new(&mut *self.dec))?;
            (self.insert)(key, value);
        }
        Ok(())
    }
}

impl<K, V> Persist for HashMap<K, V>
where
    K: MapKey + Eq + Hash,
    V: Persist,
{
    const SHAPE: Shape = Shape::Map;

    fn encode<S: Serializer>(&self, enc: &Encoder<'_>, serializer: S) -> Result<S::Ok, S::Error> {
        encode_entries(self.iter(), self.len(), enc, serializer)
    }

    fn decode<'de, D: Deserializer<'de>>(
        &mut self,
        dec: &mut Decoder<'_>,
        deserializer: D,
    ) -> Result<(), D::Error> {
        deserializer.deserialize_map(EntriesVisitor {
            dec,
            insert: |k: K, v: V| {
                self.insert(k, v);
            },
            marker: PhantomData,
        })
    }
}

impl<K, V> Persist for BTreeMap<K, V>
where
    K: MapKey + Ord,
    V: Persist,
{
    const SHAPE: Shape = Shape::Map;

    fn encode<S: Serializer>(&self, enc: &Encoder<'_>, serializer: S) -> Result<S::Ok, S::Error> {
        encode_entries(self.iter(), self.len(), enc, serializer)
    }

    fn decode<'de, D: Deserializer<'de>>(
        &mut self,
        dec: &mut Decoder<'_>,
        deserializer: D,
    ) -> Result<(), D::Error> {
        deserializer.deserialize_map(EntriesVisitor {
            dec,
            insert: |k: K, v: V| {
                self.insert(k, v);
            },
            marker: PhantomData,
        })
    }
}
