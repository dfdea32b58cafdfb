//! Payload serialization.
//!
//! Exactly one backend is compiled in: [`bincode`](https://crates.io/crates/bincode)
//! (the default) or [`rmp-serde`](https://crates.io/crates/rmp-serde) behind the
//! `messagepack` feature. Both reject truncated input and trailing bytes.

use serde::{Serialize, de::DeserializeOwned};

use crate::Error;

#[cfg(feature = "bincode")]
pub(crate) fn serialize_value<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, Error> {
    bincode::serde::encode_to_vec(value, bincode::config::standard())
        .map_err(|e| Error::Encode(e.to_string()))
}

#[cfg(feature = "bincode")]
pub(crate) fn deserialize_value<T: DeserializeOwned>(value: &[u8]) -> Result<T, Error> {
    let (decoded, read) =
        bincode::serde::decode_from_slice(value, bincode::config::standard())
            .map_err(|e| Error::Decode(e.to_string()))?;

    check_consumed(read, value.len())?;
    Ok(decoded)
}

#[cfg(all(feature = "messagepack", not(feature = "bincode")))]
pub(crate) fn serialize_value<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, Error> {
    rmp_serde::to_vec_named(value).map_err(|e| Error::Encode(e.to_string()))
}

#[cfg(all(feature = "messagepack", not(feature = "bincode")))]
pub(crate) fn deserialize_value<T: DeserializeOwned>(value: &[u8]) -> Result<T, Error> {
    let mut cursor = std::io::Cursor::new(value);
    let decoded = {
        let mut de = rmp_serde::Deserializer::new(&mut cursor);
        <T as serde::Deserialize>::deserialize(&mut de).map_err(|e| Error::Decode(e.to_string()))?
    };

    check_consumed(cursor.position() as usize, value.len())?;
    Ok(decoded)
}

fn check_consumed(read: usize, len: usize) -> Result<(), Error> {
    if read != len {
        return Err(Error::Decode(format!(
            "{} trailing bytes after payload",
            len - read
        )));
    }
    Ok(())
}
