use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::RegistryError;
use crate::{Error, Session};

/// A session shared by every lookup of its name within one request.
pub type SharedSession = Arc<tokio::sync::Mutex<Session>>;

#[derive(Debug)]
struct Entry {
    session: SharedSession,
    error: Option<Arc<Error>>,
}

impl Entry {
    fn to_result(&self) -> Result<SharedSession, RegistryError> {
        match &self.error {
            None => Ok(Arc::clone(&self.session)),
            Some(error) => Err(RegistryError {
                session: Arc::clone(&self.session),
                source: Arc::clone(error),
            }),
        }
    }
}

/// Per-request cache of sessions, keyed by cookie name.
///
/// Repeated [`SessionStore::get`](crate::SessionStore::get) calls for the same name
/// within a request return the same session instance instead of loading it again.
/// Clones share the same cache. Create one per request; [`SessionLayer`](crate::SessionLayer)
/// does this for you.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached session for `name`, together with the error its creation produced.
    pub fn lookup(&self, name: &str) -> Option<Result<SharedSession, RegistryError>> {
        self.entries.lock().get(name).map(Entry::to_result)
    }

    /// Caches `session` under its name unless another task got there first, in which
    /// case the existing entry wins and is returned.
    pub(crate) fn register(
        &self,
        session: Session,
        error: Option<Error>,
    ) -> Result<SharedSession, RegistryError> {
        let mut entries = self.entries.lock();
        entries
            .entry(session.name().to_owned())
            .or_insert_with(|| Entry {
                session: Arc::new(tokio::sync::Mutex::new(session)),
                error: error.map(Arc::new),
            })
            .to_result()
    }

    /// Every session cached so far.
    pub fn sessions(&self) -> Vec<SharedSession> {
        self.entries
            .lock()
            .values()
            .map(|entry| Arc::clone(&entry.session))
            .collect()
    }

    /// Names of cached sessions that were modified but not saved.
    ///
    /// Sessions locked by someone else are skipped.
    pub fn unsaved(&self) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .filter(|(_, entry)| {
                entry
                    .session
                    .try_lock()
                    .map(|session| session.is_modified())
                    .unwrap_or(false)
            })
            .map(|(name, _)| name.clone())
            .collect()
    }
}
