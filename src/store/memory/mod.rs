use crate::store::{Error, Record, RecordStore};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use time::OffsetDateTime;

/// How often writes sweep expired documents unless configured otherwise.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
struct Document {
    logical_id: String,
    payload: Vec<u8>,
    expires_at: OffsetDateTime,
}

impl Document {
    fn is_live(&self, now: OffsetDateTime) -> bool {
        self.expires_at > now
    }
}

/// An in-memory document store.
///
/// Documents are keyed by a sequential `u64` reference and indexed by logical id.
/// The index is unique, so a second create for the same logical id is rejected
/// while the first document is live.
///
/// Expired documents are hidden from lookups straight away. They are physically
/// removed by a sweep that writes trigger at most once per sweep interval, or by
/// calling [`cleanup_expired`](MemoryStore::cleanup_expired).
///
/// ### Note
///
/// Do not use this in a production environment.
#[derive(Debug)]
pub struct MemoryStore {
    documents: DashMap<u64, Document>,
    index: DashMap<String, u64>,
    next_ref: AtomicU64,
    sweep_interval: Duration,
    last_sweep: Mutex<Instant>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_sweep_interval(DEFAULT_SWEEP_INTERVAL)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sweep_interval(sweep_interval: Duration) -> Self {
        Self {
            documents: DashMap::new(),
            index: DashMap::new(),
            next_ref: AtomicU64::new(0),
            sweep_interval,
            last_sweep: Mutex::new(Instant::now()),
        }
    }

    /// Number of live documents.
    pub fn len(&self) -> usize {
        let now = OffsetDateTime::now_utc();
        self.documents
            .iter()
            .filter(|document| document.is_live(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every expired document and its index entry.
    pub fn cleanup_expired(&self) {
        let now = OffsetDateTime::now_utc();
        self.documents.retain(|_, document| document.is_live(now));
        self.index
            .retain(|_, store_ref| self.documents.contains_key(store_ref));
    }

    fn sweep_if_due(&self) {
        // another task is already sweeping
        let Some(mut last_sweep) = self.last_sweep.try_lock() else {
            return;
        };
        if last_sweep.elapsed() < self.sweep_interval {
            return;
        }
        *last_sweep = Instant::now();
        drop(last_sweep);

        self.cleanup_expired();
    }

    fn insert_document(
        &self,
        logical_id: &str,
        payload: &[u8],
        expires_at: OffsetDateTime,
    ) -> u64 {
        let store_ref = self.next_ref.fetch_add(1, Ordering::Relaxed) + 1;
        self.documents.insert(
            store_ref,
            Document {
                logical_id: logical_id.to_owned(),
                payload: payload.to_vec(),
                expires_at,
            },
        );
        store_ref
    }
}

impl RecordStore for MemoryStore {
    type Ref = u64;

    async fn find(&self, logical_id: &str) -> Result<Option<Record<u64>>, Error> {
        let Some(store_ref) = self.index.get(logical_id).map(|entry| *entry) else {
            return Ok(None);
        };

        let now = OffsetDateTime::now_utc();
        Ok(self
            .documents
            .get(&store_ref)
            .filter(|document| document.is_live(now))
            .map(|document| Record {
                store_ref,
                logical_id: document.logical_id.clone(),
                payload: document.payload.clone(),
                expires_at: document.expires_at,
            }))
    }

    async fn create(
        &self,
        logical_id: &str,
        payload: &[u8],
        expires_at: OffsetDateTime,
    ) -> Result<u64, Error> {
        self.sweep_if_due();

        let now = OffsetDateTime::now_utc();
        match self.index.entry(logical_id.to_owned()) {
            Entry::Occupied(mut entry) => {
                let held = self
                    .documents
                    .get(entry.get())
                    .is_some_and(|document| document.is_live(now));
                if held {
                    return Err(Error::Write(format!(
                        "a document with logical id {logical_id} already exists"
                    )));
                }

                // the indexed document expired before a sweep removed it
                self.documents.remove(entry.get());
                let store_ref = self.insert_document(logical_id, payload, expires_at);
                entry.insert(store_ref);
                Ok(store_ref)
            }
            Entry::Vacant(entry) => {
                let store_ref = self.insert_document(logical_id, payload, expires_at);
                entry.insert(store_ref);
                Ok(store_ref)
            }
        }
    }

    async fn replace(
        &self,
        store_ref: &u64,
        logical_id: &str,
        payload: &[u8],
        expires_at: OffsetDateTime,
    ) -> Result<(), Error> {
        self.sweep_if_due();

        let now = OffsetDateTime::now_utc();
        let mut document = self
            .documents
            .get_mut(store_ref)
            .filter(|document| document.is_live(now))
            .ok_or_else(|| Error::Write(format!("document {store_ref} does not exist")))?;

        if document.logical_id != logical_id {
            return Err(Error::Write(format!(
                "document {store_ref} belongs to a different logical id"
            )));
        }

        document.payload = payload.to_vec();
        document.expires_at = expires_at;
        Ok(())
    }

    async fn delete(&self, store_ref: &u64) -> Result<(), Error> {
        if let Some((_, document)) = self.documents.remove(store_ref) {
            self.index
                .remove_if(&document.logical_id, |_, indexed| indexed == store_ref);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn in_a_minute() -> OffsetDateTime {
        OffsetDateTime::now_utc() + Duration::minutes(1)
    }

    #[tokio::test]
    async fn test_basic_operations() {
        let store = MemoryStore::new();
        assert!(store.find("session:a").await.unwrap().is_none());

        let store_ref = store.create("session:a", b"one", in_a_minute()).await.unwrap();
        let record = store.find("session:a").await.unwrap().unwrap();
        assert_eq!(record.store_ref, store_ref);
        assert_eq!(record.logical_id, "session:a");
        assert_eq!(record.payload, b"one");

        store
            .replace(&store_ref, "session:a", b"two", in_a_minute())
            .await
            .unwrap();
        let record = store.find("session:a").await.unwrap().unwrap();
        assert_eq!(record.payload, b"two");
        assert_eq!(store.len(), 1);

        store.delete(&store_ref).await.unwrap();
        assert!(store.find("session:a").await.unwrap().is_none());
        assert!(store.is_empty());

        // already gone
        store.delete(&store_ref).await.unwrap();
    }

    #[tokio::test]
    async fn test_logical_id_is_unique() {
        let store = MemoryStore::new();
        store.create("session:a", b"one", in_a_minute()).await.unwrap();

        let result = store.create("session:a", b"two", in_a_minute()).await;
        assert!(matches!(result, Err(Error::Write(_))));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_replace_requires_existing_document() {
        let store = MemoryStore::new();
        let result = store.replace(&7, "session:a", b"x", in_a_minute()).await;
        assert!(matches!(result, Err(Error::Write(_))));

        let a = store.create("session:a", b"a", in_a_minute()).await.unwrap();
        let result = store.replace(&a, "session:b", b"b", in_a_minute()).await;
        assert!(matches!(result, Err(Error::Write(_))));
    }

    #[tokio::test]
    async fn test_expired_documents_are_absent() {
        let store = MemoryStore::new();
        let past = OffsetDateTime::now_utc() - Duration::seconds(1);
        store.create("session:old", b"stale", past).await.unwrap();

        assert!(store.find("session:old").await.unwrap().is_none());
        assert!(store.is_empty());

        // the expired document no longer blocks its logical id
        store
            .create("session:old", b"fresh", in_a_minute())
            .await
            .unwrap();
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_reads_do_not_sweep() {
        let store = MemoryStore::new();
        let past = OffsetDateTime::now_utc() - Duration::seconds(1);
        store.create("session:old", b"stale", past).await.unwrap();

        assert!(store.find("session:old").await.unwrap().is_none());
        assert!(store.is_empty());
        // hidden, but still held until a sweep
        assert_eq!(store.documents.len(), 1);

        store.cleanup_expired();
        assert!(store.documents.is_empty());
        assert!(store.index.is_empty());
    }

    #[tokio::test]
    async fn test_writes_sweep_once_the_interval_elapsed() {
        let store = MemoryStore::with_sweep_interval(std::time::Duration::ZERO);
        let past = OffsetDateTime::now_utc() - Duration::seconds(1);
        store.create("session:old", b"stale", past).await.unwrap();

        store.create("session:new", b"fresh", in_a_minute()).await.unwrap();
        assert_eq!(store.documents.len(), 1);
        assert!(!store.index.contains_key("session:old"));
    }

    #[tokio::test]
    async fn test_expired_document_cannot_be_replaced() {
        let store = MemoryStore::new();
        let past = OffsetDateTime::now_utc() - Duration::seconds(1);
        let store_ref = store.create("session:old", b"stale", past).await.unwrap();

        let result = store
            .replace(&store_ref, "session:old", b"x", in_a_minute())
            .await;
        assert!(matches!(result, Err(Error::Write(_))));
    }
}
