#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use cookie::Cookie;
use cookie::time::Duration;
use dossier::CookieAccess;
use dossier::store::memory::MemoryStore;
use dossier::store::{Error, Record, RecordStore};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct TestUser {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct TestSession {
    pub user: TestUser,
    pub preferences: TestPreferences,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct TestPreferences {
    pub theme: String,
    pub language: String,
}

pub fn create_test_session() -> TestSession {
    TestSession {
        user: TestUser {
            id: 1,
            name: "Test User".to_string(),
        },
        preferences: TestPreferences {
            theme: "dark".to_string(),
            language: "en".to_string(),
        },
    }
}

/// Cookies of one request/response exchange.
#[derive(Debug, Default)]
pub struct TestJar {
    request: HashMap<String, String>,
    response: Mutex<Vec<Cookie<'static>>>,
}

impl TestJar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cookie(name: &str, value: &str) -> Self {
        let mut jar = Self::default();
        jar.request.insert(name.to_owned(), value.to_owned());
        jar
    }

    /// The last cookie queued on the response under `name`.
    pub fn response_cookie(&self, name: &str) -> Option<Cookie<'static>> {
        self.response
            .lock()
            .iter()
            .rev()
            .find(|cookie| cookie.name() == name)
            .cloned()
    }

    pub fn response_is_empty(&self) -> bool {
        self.response.lock().is_empty()
    }

    /// The cookies a browser would send on its next request.
    pub fn next_request(&self) -> TestJar {
        let mut request = self.request.clone();
        for cookie in self.response.lock().iter() {
            let removed = cookie.value().is_empty() || cookie.max_age() == Some(Duration::ZERO);
            if removed {
                request.remove(cookie.name());
            } else {
                request.insert(cookie.name().to_owned(), cookie.value().to_owned());
            }
        }

        TestJar {
            request,
            response: Mutex::new(Vec::new()),
        }
    }
}

impl CookieAccess for TestJar {
    fn get(&self, name: &str) -> Option<String> {
        self.request.get(name).cloned()
    }

    fn add(&self, cookie: Cookie<'static>) {
        self.response.lock().push(cookie);
    }
}

/// A [`MemoryStore`] whose calls can be made to fail or hang, and which counts writes.
#[derive(Debug, Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
    pub stall: AtomicBool,
    /// Lookups report no document, as if a concurrent create had not landed yet.
    pub stale_reads: AtomicBool,
    pub creates: AtomicUsize,
    pub replaces: AtomicUsize,
    pub deletes: AtomicUsize,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn gate(&self) {
        if self.stall.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
    }

    fn check_write(&self) -> Result<(), Error> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Write("connection reset by peer".to_string()));
        }
        Ok(())
    }
}

impl RecordStore for FlakyStore {
    type Ref = u64;

    async fn find(&self, logical_id: &str) -> Result<Option<Record<u64>>, Error> {
        self.gate().await;
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::Read("connection reset by peer".to_string()));
        }
        if self.stale_reads.load(Ordering::SeqCst) {
            return Ok(None);
        }
        self.inner.find(logical_id).await
    }

    async fn create(
        &self,
        logical_id: &str,
        payload: &[u8],
        expires_at: OffsetDateTime,
    ) -> Result<u64, Error> {
        self.gate().await;
        self.check_write()?;
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.inner.create(logical_id, payload, expires_at).await
    }

    async fn replace(
        &self,
        store_ref: &u64,
        logical_id: &str,
        payload: &[u8],
        expires_at: OffsetDateTime,
    ) -> Result<(), Error> {
        self.gate().await;
        self.check_write()?;
        self.replaces.fetch_add(1, Ordering::SeqCst);
        self.inner
            .replace(store_ref, logical_id, payload, expires_at)
            .await
    }

    async fn delete(&self, store_ref: &u64) -> Result<(), Error> {
        self.gate().await;
        self.check_write()?;
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(store_ref).await
    }
}
