use std::fmt::Debug;
use std::future::Future;

use time::OffsetDateTime;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A lookup could not be completed.
    #[error("store read failed: {0}")]
    Read(String),

    /// A create, replace or delete could not be completed.
    #[error("store write failed: {0}")]
    Write(String),
}

/// A session document as held by the backing store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record<R> {
    /// The store's own handle for the document.
    pub store_ref: R,
    /// Key prefix followed by the session id.
    pub logical_id: String,
    pub payload: Vec<u8>,
    pub expires_at: OffsetDateTime,
}

/// A document store holding one document per session.
///
/// Documents are located through a secondary index on their logical id, but created,
/// replaced and deleted through the reference the store hands out on creation. The
/// store has no "upsert by logical id"; callers look a document up first and decide
/// between [`create`](RecordStore::create) and [`replace`](RecordStore::replace).
///
/// Every method is a remote call. Implementations must not cache.
pub trait RecordStore: Send + Sync + 'static {
    /// Opaque document reference. Only ever obtained from [`find`](RecordStore::find)
    /// or [`create`](RecordStore::create).
    type Ref: Clone + Debug + Send + Sync;

    /// Looks up the live document for `logical_id`.
    ///
    /// Returns `Ok(None)` if there is none, or if the only document has expired and
    /// has not been collected yet.
    fn find(
        &self,
        logical_id: &str,
    ) -> impl Future<Output = Result<Option<Record<Self::Ref>>, Error>> + Send;

    /// Inserts a new document and returns its reference.
    fn create(
        &self,
        logical_id: &str,
        payload: &[u8],
        expires_at: OffsetDateTime,
    ) -> impl Future<Output = Result<Self::Ref, Error>> + Send;

    /// Overwrites the document behind `store_ref`.
    ///
    /// Fails with [`Error::Write`] if the document no longer exists.
    fn replace(
        &self,
        store_ref: &Self::Ref,
        logical_id: &str,
        payload: &[u8],
        expires_at: OffsetDateTime,
    ) -> impl Future<Output = Result<(), Error>> + Send;

    /// Deletes the document behind `store_ref`. Deleting a document that is already
    /// gone succeeds.
    fn delete(&self, store_ref: &Self::Ref) -> impl Future<Output = Result<(), Error>> + Send;
}
