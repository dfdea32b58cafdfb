use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::registry::SharedSession;
use crate::{Session, store};

#[derive(Error, Debug)]
pub enum Error {
    /// The OS random source could not produce a session id.
    #[error("entropy source unavailable: {0}")]
    Entropy(String),

    #[error("Encoding failed with: {0}")]
    Encode(String),

    #[error("Decoding failed with: {0}")]
    Decode(String),

    /// No live record exists for the session id.
    #[error("session not found")]
    NotFound,

    #[error(transparent)]
    Store(#[from] store::Error),

    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Returned by [`SessionStore::new_session`](crate::SessionStore::new_session) when a
/// session cookie was present but the session could not be resumed.
///
/// The fresh session is still usable, so request handling can proceed with it.
#[derive(Error, Debug)]
#[error("failed to resume session: {source}")]
pub struct NewSessionError {
    pub session: Box<Session>,
    #[source]
    pub source: Error,
}

impl NewSessionError {
    /// Discards the error and returns the fresh session.
    pub fn into_session(self) -> Session {
        *self.session
    }
}

/// Returned by [`SessionStore::get`](crate::SessionStore::get) for every lookup of a
/// session whose resumption failed earlier in the same request.
#[derive(Error, Debug, Clone)]
#[error("failed to resume session: {source}")]
pub struct RegistryError {
    pub session: SharedSession,
    #[source]
    pub source: Arc<Error>,
}
