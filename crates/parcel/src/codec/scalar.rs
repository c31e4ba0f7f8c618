use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::codec::{Decoder, Encoder};
use crate::error::ParcelError;
use crate::persist::{Persist, Shape};

/// Standard alphabet, written without padding. Padded input is accepted.
const RAW_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

macro_rules! scalar {
    ($($ty:ty),* $(,)?) => {$(
        impl Persist for $ty {
            const SHAPE: Shape = Shape::Scalar;

            fn encode<S: Serializer>(&self, _enc: &Encoder<'_>, serializer: S) -> Result<S::Ok, S::Error> {
                Serialize::serialize(self, serializer)
            }

            fn decode<'de, D: Deserializer<'de>>(
                &mut self,
                _dec: &mut Decoder<'_>,
                deserializer: D,
            ) -> Result<(), D::Error> {
                *self = <$ty as Deserialize>::deserialize(deserializer)?;
                Ok(())
            }
        }
    )*};
}

scalar!(bool, i8, i16, i32, i64, isize, u16, u32, u64, usize, char, String);

// JSON has no NaN or infinity; serde_json would write them as null.
macro_rules! float {
    ($($ty:ty),* $(,)?) => {$(
        impl Persist for $ty {
            const SHAPE: Shape = Shape::Scalar;

            fn encode<S: Serializer>(&self, enc: &Encoder<'_>, serializer: S) -> Result<S::Ok, S::Error> {
                if !self.is_finite() {
                    return Err(enc.fail(ParcelError::Serialization(format!(
                        "{} {self} has no JSON form",
                        stringify!($ty)
                    ))));
                }
                Serialize::serialize(self, serializer)
            }

            fn decode<'de, D: Deserializer<'de>>(
                &mut self,
                _dec: &mut Decoder<'_>,
                deserializer: D,
            ) -> Result<(), D::Error> {
                *self = <$ty as Deserialize>::deserialize(deserializer)?;
                Ok(())
            }
        }
    )*};
}

float!(f32, f64);

// `u8` is a scalar on its own but turns any sequence of it into bytes.
impl Persist for u8 {
    const SHAPE: Shape = Shape::Scalar;
    const SLICE_SHAPE: Shape = Shape::Bytes;

    fn encode<S: Serializer>(&self, _enc: &Encoder<'_>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self)
    }

    fn decode<'de, D: Deserializer<'de>>(
        &mut self,
        _dec: &mut Decoder<'_>,
        deserializer: D,
    ) -> Result<(), D::Error> {
        *self = u8::deserialize(deserializer)?;
        Ok(())
    }

    fn encode_slice<S: Serializer>(
        items: &[u8],
        _enc: &Encoder<'_>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&RAW_BASE64.encode(items))
    }

    fn decode_vec<'de, D: Deserializer<'de>>(
        items: &mut Vec<u8>,
        _dec: &mut Decoder<'_>,
        deserializer: D,
    ) -> Result<(), D::Error> {
        *items = decode_base64(deserializer)?;
        Ok(())
    }

    fn decode_fixed<'de, D: Deserializer<'de>>(
        items: &mut [u8],
        _dec: &mut Decoder<'_>,
        deserializer: D,
    ) -> Result<(), D::Error> {
        let bytes = decode_base64(deserializer)?;
        let copied = bytes.len().min(items.len());
        items[..copied].copy_from_slice(&bytes[..copied]);
        items[copied..].fill(0);
        Ok(())
    }
}

fn decode_base64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    let text = String::deserialize(deserializer)?;
    RAW_BASE64
        .decode(text.as_bytes())
        .map_err(|e| D::Error::custom(format!("invalid base64 byte string: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_base64_has_no_padding() {
        assert_eq!(RAW_BASE64.encode(b"a"), "YQ");
        assert_eq!(RAW_BASE64.encode(b"this is a test"), "dGhpcyBpcyBhIHRlc3Q");
    }

    #[test]
    fn raw_base64_accepts_padded_input() {
        assert_eq!(RAW_BASE64.decode("YQ==").unwrap(), b"a");
        assert_eq!(RAW_BASE64.decode("YQ").unwrap(), b"a");
    }
}
