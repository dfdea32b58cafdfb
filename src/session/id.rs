use std::fmt::{self, Display};

use base64::Engine;
use base64::prelude::BASE64_URL_SAFE_NO_PAD;
use rand::TryRngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Number of random bytes behind a generated id (256 bits).
pub const ID_BYTES: usize = 32;

/// Length of a generated id once encoded with unpadded URL-safe base64.
pub const ID_LEN: usize = 43;

/// A session identifier.
///
/// Generated ids are 256 random bits from the OS CSPRNG, encoded with the URL-safe
/// base64 alphabet and no padding, so they can be placed in a cookie unescaped. Ids
/// presented by clients are only ever used as lookup keys and are kept verbatim.
#[derive(Clone, Debug, Deserialize, Serialize, Eq, Hash, PartialEq)]
#[serde(transparent)]
pub struct Id(String);

impl Id {
    /// Draws a fresh id from the OS random source.
    ///
    /// Fails with [`Error::Entropy`] if the source is unavailable.
    pub fn generate() -> Result<Self, Error> {
        Self::generate_from(&mut OsRng)
    }

    pub(crate) fn generate_from<R: TryRngCore + ?Sized>(rng: &mut R) -> Result<Self, Error> {
        let mut bytes = [0u8; ID_BYTES];
        rng.try_fill_bytes(&mut bytes).map_err(|err| {
            tracing::error!(err = %err, "failed to read from the random source");
            Error::Entropy(err.to_string())
        })?;

        Ok(Self(BASE64_URL_SAFE_NO_PAD.encode(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Id {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Id {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}
