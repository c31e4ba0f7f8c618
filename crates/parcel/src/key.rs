//! Map key canonicalization.
//!
//! Wire maps are JSON objects, so every key is text:
//!
//! - `String` keys are written verbatim
//! - integer keys are written in decimal
//! - any type implementing [`TextMarshal`] is written as the text it produces
//!
//! Key types offering none of these do not implement [`MapKey`] and are
//! rejected at compile time.

use std::any::type_name;
use std::fmt::Display;

use crate::error::{ParcelError, Result};

/// A map key type with a canonical text form.
pub trait MapKey: Sized + 'static {
    /// Render the key as wire text.
    fn encode_key(&self) -> Result<String>;

    /// Parse a key back from wire text. The error is a human-readable reason.
    fn decode_key(text: &str) -> std::result::Result<Self, String>;
}

/// Text-marshaling capability for custom key types.
///
/// ```
/// use parcel::TextMarshal;
///
/// #[derive(PartialEq, Eq, Hash, PartialOrd, Ord)]
/// struct Coord(i32, i32);
///
/// impl TextMarshal for Coord {
///     type Error = String;
///
///     fn marshal_text(&self) -> Result<String, String> {
///         Ok(format!("{},{}", self.0, self.1))
///     }
///
///     fn unmarshal_text(text: &str) -> Result<Self, String> {
///         let (x, y) = text.split_once(',').ok_or("missing comma")?;
///         Ok(Coord(
///             x.parse().map_err(|_| "bad x")?,
///             y.parse().map_err(|_| "bad y")?,
///         ))
///     }
/// }
/// ```
pub trait TextMarshal: Sized {
    type Error: Display;

    fn marshal_text(&self) -> std::result::Result<String, Self::Error>;

    fn unmarshal_text(text: &str) -> std::result::Result<Self, Self::Error>;
}

impl MapKey for String {
    fn encode_key(&self) -> Result<String> {
        Ok(self.clone())
    }

    fn decode_key(text: &str) -> std::result::Result<Self, String> {
        Ok(text.to_string())
    }
}

macro_rules! integer_keys {
    ($($ty:ty),* $(,)?) => {$(
        impl MapKey for $ty {
            fn encode_key(&self) -> Result<String> {
                Ok(self.to_string())
            }

            fn decode_key(text: &str) -> std::result::Result<Self, String> {
                text.parse::<$ty>()
                    .map_err(|e| format!("key {text:?} is not a valid {}: {e}", stringify!($ty)))
            }
        }
    )*};
}

integer_keys!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl<T: TextMarshal + 'static> MapKey for T {
    fn encode_key(&self) -> Result<String> {
        self.marshal_text()
            .map_err(|e| ParcelError::UnsupportedKeyType {
                type_name: type_name::<T>().to_string(),
                reason: e.to_string(),
            })
    }

    fn decode_key(text: &str) -> std::result::Result<Self, String> {
        T::unmarshal_text(text).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Named(String);

    impl TextMarshal for Named {
        type Error = String;

        fn marshal_text(&self) -> std::result::Result<String, String> {
            if self.0.is_empty() {
                return Err("empty names cannot be keys".into());
            }
            Ok(format!("name:{}", self.0))
        }

        fn unmarshal_text(text: &str) -> std::result::Result<Self, String> {
            text.strip_prefix("name:")
                .map(|n| Named(n.to_string()))
                .ok_or_else(|| format!("missing prefix in {text:?}"))
        }
    }

    #[test]
    fn string_keys_are_verbatim() {
        assert_eq!("a b".to_string().encode_key().unwrap(), "a b");
        assert_eq!(String::decode_key("a b").unwrap(), "a b");
    }

    #[test]
    fn integer_keys_are_decimal() {
        assert_eq!(7i32.encode_key().unwrap(), "7");
        assert_eq!((-12i64).encode_key().unwrap(), "-12");
        assert_eq!(u64::MAX.encode_key().unwrap(), "18446744073709551615");
        assert_eq!(u8::decode_key("255").unwrap(), 255);
        assert!(u8::decode_key("256").is_err());
        assert!(i32::decode_key("seven").is_err());
    }

    #[test]
    fn marshaled_keys_use_produced_text() {
        let key = Named("A".into());
        assert_eq!(key.encode_key().unwrap(), "name:A");
        assert_eq!(Named::decode_key("name:A").unwrap(), key);
        assert!(Named::decode_key("A").is_err());
    }

    #[test]
    fn marshal_failure_is_unsupported_key() {
        let err = Named(String::new()).encode_key().unwrap_err();
        assert!(matches!(err, ParcelError::UnsupportedKeyType { .. }));
    }
}
