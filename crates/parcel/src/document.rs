//! The on-disk document envelope.
//!
//! Each saved object is one JSON document:
//!
//! ```json
//! {
//!   "Type": "game::Level",
//!   "Parent": "",
//!   "Obj": { "name": "intro" }
//! }
//! ```
//!
//! `Type` is informational and `Parent` is reserved; only `Obj` is decoded.

use std::any::type_name;
use std::fmt;

use serde::de::{DeserializeSeed, Error as _, IgnoredAny, MapAccess, Visitor};
use serde::{Deserializer, Serialize};
use tracing::debug;

use crate::codec::{DecodeSeed, Decoder, Encoded, Encoder};
use crate::directory::Directory;
use crate::error::Result;
use crate::persist::Persist;
use crate::registry::TypeRegistry;
use crate::store::Parcel;

const TYPE_KEY: &str = "Type";
const PARENT_KEY: &str = "Parent";
const OBJ_KEY: &str = "Obj";

#[derive(Serialize)]
#[serde(bound(serialize = "T: Persist"))]
struct WireDocument<'v, 'a, T> {
    #[serde(rename = "Type")]
    type_name: &'static str,
    #[serde(rename = "Parent")]
    parent: &'static str,
    #[serde(rename = "Obj")]
    obj: Encoded<'v, 'a, T>,
}

fn write_json<V: Serialize>(value: &V, pretty: bool) -> serde_json::Result<Vec<u8>> {
    if pretty {
        serde_json::to_vec_pretty(value)
    } else {
        serde_json::to_vec(value)
    }
}

/// Encode `value` wrapped in the document envelope.
pub(crate) fn encode<T: Persist>(
    directory: &Directory,
    registry: &TypeRegistry,
    value: &T,
    pretty: bool,
) -> Result<Vec<u8>> {
    let enc = Encoder::new(directory, registry);
    let written = {
        let doc = WireDocument {
            type_name: type_name::<T>(),
            parent: "",
            obj: enc.wrap(value),
        };
        write_json(&doc, pretty)
    };
    written.map_err(|e| enc.finish(e))
}

/// Encode `value` on its own, without the envelope.
pub(crate) fn encode_bare<T: Persist>(
    directory: &Directory,
    registry: &TypeRegistry,
    value: &T,
    pretty: bool,
) -> Result<Vec<u8>> {
    let enc = Encoder::new(directory, registry);
    let written = write_json(&enc.wrap(value), pretty);
    written.map_err(|e| enc.finish(e))
}

/// Decode the `Obj` of the document in `bytes` into `target`.
pub(crate) fn decode<T: Persist>(
    parcel: &mut Parcel,
    path: &str,
    bytes: &[u8],
    target: &mut T,
) -> Result<()> {
    let mut dec = Decoder::new(parcel);
    let mut de = serde_json::Deserializer::from_slice(bytes);
    let outcome = DocumentSeed {
        target,
        dec: &mut dec,
    }
    .deserialize(&mut de)
    .and_then(|()| de.end());
    outcome.map_err(|e| dec.finish(path, e))
}

/// Decode a bare value (no envelope) from `bytes` into `target`.
pub(crate) fn decode_bare<T: Persist>(
    parcel: &mut Parcel,
    label: &str,
    bytes: &[u8],
    target: &mut T,
) -> Result<()> {
    let mut dec = Decoder::new(parcel);
    let mut de = serde_json::Deserializer::from_slice(bytes);
    let outcome = DecodeSeed::new(target, &mut dec)
        .deserialize(&mut de)
        .and_then(|()| de.end());
    outcome.map_err(|e| dec.finish(label, e))
}

struct DocumentSeed<'t, 'd, 'p, T> {
    target: &'t mut T,
    dec: &'d mut Decoder<'p>,
}

impl<'de, T: Persist> DeserializeSeed<'de> for DocumentSeed<'_, '_, '_, T> {
    type Value = ();

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> std::result::Result<(), D::Error> {
        deserializer.deserialize_map(self)
    }
}

impl<'de, T: Persist> Visitor<'de> for DocumentSeed<'_, '_, '_, T> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a parcel document with Type, Parent and Obj")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<(), A::Error> {
        let mut seen_obj = false;
        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                TYPE_KEY => {
                    let written: String = map.next_value()?;
                    if written != type_name::<T>() {
                        debug!(
                            written = %written,
                            expected = type_name::<T>(),
                            "document type differs from requested type"
                        );
                    }
                }
                PARENT_KEY => {
                    map.next_value::<IgnoredAny>()?;
                }
                OBJ_KEY => {
                    map.next_value_seed(DecodeSeed::new(&mut *self.target, &mut *self.dec))?;
                    seen_obj = true;
                }
                _ => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }
        if !seen_obj {
            return Err(A::Error::missing_field(OBJ_KEY));
        }
        Ok(())
    }
}
