//! Session lifecycle on top of a [`RecordStore`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;

use crate::cookies::CookieAccess;
use crate::error::{NewSessionError, RegistryError, Result};
use crate::registry::{Registry, SharedSession};
use crate::store::{self, RecordStore};
use crate::{CookieOptions, Error, Id, Session, SessionValues};

/// Configuration shared by every session of a [`SessionStore`].
///
/// # Example
///
/// ```rust
/// use dossier::{CookieOptions, StoreConfig};
/// use std::time::Duration;
///
/// let config = StoreConfig::build()
///     .key_prefix("app-session:")
///     .default_options(CookieOptions::build().max_age(3600).secure(true))
///     .operation_timeout(Duration::from_secs(2));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreConfig {
    /// Prepended to session ids to form the logical id of their documents.
    pub key_prefix: String,
    /// Copied into every new session.
    pub default_options: CookieOptions,
    /// Upper bound for each call to the record store. `None` waits indefinitely.
    pub operation_timeout: Option<Duration>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            key_prefix: "session:".to_string(),
            default_options: CookieOptions::default(),
            operation_timeout: None,
        }
    }
}

impl StoreConfig {
    /// Creates a new `StoreConfig` with default values.
    pub fn build() -> Self {
        Self::default()
    }

    pub fn key_prefix(mut self, key_prefix: impl Into<String>) -> Self {
        self.key_prefix = key_prefix.into();
        self
    }

    pub fn default_options(mut self, options: CookieOptions) -> Self {
        self.default_options = options;
        self
    }

    pub fn operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = Some(timeout);
        self
    }
}

/// Creates, resumes, persists and deletes sessions.
///
/// Every operation goes to the record store; nothing is cached between calls, so
/// several processes can share one backing store. The store holds no per-session
/// state and is cheap to clone.
///
/// Two concurrent saves of an existing session are last-writer-wins: both look the
/// document up, and the later replace overwrites the earlier one. If both find no
/// document, the store's unique logical id index rejects the second create and that
/// save fails with a write error.
#[derive(Debug)]
pub struct SessionStore<R: RecordStore> {
    records: Arc<R>,
    config: Arc<StoreConfig>,
}

impl<R: RecordStore> Clone for SessionStore<R> {
    fn clone(&self) -> Self {
        Self {
            records: Arc::clone(&self.records),
            config: Arc::clone(&self.config),
        }
    }
}

impl<R: RecordStore> SessionStore<R> {
    /// Creates a store over `records` with the default [`StoreConfig`].
    pub fn new(records: Arc<R>) -> Self {
        Self {
            records,
            config: Arc::new(StoreConfig::default()),
        }
    }

    pub fn with_config(mut self, config: StoreConfig) -> Self {
        self.config = Arc::new(config);
        self
    }

    /// Replaces the options copied into sessions created from now on. Existing
    /// sessions keep their own copies.
    pub fn set_default_options(&mut self, options: CookieOptions) {
        Arc::make_mut(&mut self.config).default_options = options;
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn records(&self) -> &R {
        &self.records
    }

    /// Returns the session named `name` for the current request, creating it with
    /// [`new_session`](Self::new_session) on first use and serving it from `registry`
    /// afterwards.
    ///
    /// If creation failed, every call for that name returns the same error, which
    /// still carries the usable session.
    pub async fn get<C>(
        &self,
        registry: &Registry,
        cookies: &C,
        name: &str,
    ) -> std::result::Result<SharedSession, RegistryError>
    where
        C: CookieAccess + Sync + ?Sized,
    {
        if let Some(cached) = registry.lookup(name) {
            return cached;
        }

        match self.new_session(cookies, name).await {
            Ok(session) => registry.register(session, None),
            Err(err) => registry.register(*err.session, Some(err.source)),
        }
    }

    /// Creates the session named `name`, resuming it from the store if the request
    /// carries its cookie.
    ///
    /// Without a cookie this returns a new, unbound session and no error. If the cookie
    /// is present but loading fails, including when no document exists, the error
    /// carries a fresh session with the cookie's id and `is_new` set.
    #[tracing::instrument(name = "creating session", skip(self, cookies))]
    pub async fn new_session<C>(
        &self,
        cookies: &C,
        name: &str,
    ) -> std::result::Result<Session, NewSessionError>
    where
        C: CookieAccess + Sync + ?Sized,
    {
        let mut session = Session::new(name, self.config.default_options.clone());

        let Some(value) = cookies.get(name).filter(|value| !value.is_empty()) else {
            tracing::debug!("no session cookie in the request");
            return Ok(session);
        };

        session.set_id(Id::from(value));
        match self.load(&mut session).await {
            Ok(()) => {
                session.mark_resumed();
                Ok(session)
            }
            Err(err) => Err(NewSessionError {
                session: Box::new(session),
                source: err,
            }),
        }
    }

    /// Replaces the session's values with those of its stored document.
    ///
    /// Fails with [`Error::NotFound`] if the session has no id or no live document.
    /// Expiry is left to the record store's own filtering. On failure the session's
    /// values are untouched.
    #[tracing::instrument(name = "loading session from store", skip(self, session), fields(name = session.name()))]
    pub async fn load(&self, session: &mut Session) -> Result<()> {
        let Some(id) = session.id() else {
            return Err(Error::NotFound);
        };

        let logical_id = self.logical_id(id);
        let record = self
            .remote(self.records.find(&logical_id))
            .await
            .map_err(|err| {
                tracing::error!(err = %err, "failed to look up session");
                err
            })?
            .ok_or_else(|| {
                tracing::debug!("no live document for session");
                Error::NotFound
            })?;

        let values = SessionValues::decode(&record.payload).map_err(|err| {
            tracing::error!(err = %err, "failed to decode session payload");
            err
        })?;
        session.set_values(values);

        Ok(())
    }

    /// Persists the session and sets its cookie, or deletes it and clears the cookie
    /// if its `max_age` is zero or less.
    ///
    /// A session without an id gets a fresh one first. An existing document is
    /// replaced, otherwise one is created; a failed lookup aborts the save rather than
    /// risk a second document for the same session. On failure no cookie is written.
    #[tracing::instrument(name = "saving session to store", skip(self, cookies, session), fields(name = session.name()))]
    pub async fn save<C>(&self, cookies: &C, session: &mut Session) -> Result<()>
    where
        C: CookieAccess + Sync + ?Sized,
    {
        self.save_with(cookies, session, Id::generate).await
    }

    async fn save_with<C>(
        &self,
        cookies: &C,
        session: &mut Session,
        generate_id: impl FnOnce() -> Result<Id>,
    ) -> Result<()>
    where
        C: CookieAccess + Sync + ?Sized,
    {
        if session.options().is_deletion() {
            self.delete(session).await?;
            cookies.clear(session.name(), session.options());
            session.mark_saved();
            return Ok(());
        }

        let id = match session.id() {
            Some(id) => id.clone(),
            None => {
                let id = generate_id()?;
                session.set_id(id.clone());
                id
            }
        };

        let payload = session.values().encode().map_err(|err| {
            tracing::error!(err = %err, "failed to encode session values");
            err
        })?;
        let expires_at = OffsetDateTime::now_utc()
            .saturating_add(time::Duration::seconds(session.options().max_age));
        let logical_id = self.logical_id(&id);

        let existing = self
            .remote(self.records.find(&logical_id))
            .await
            .map_err(|err| {
                tracing::error!(err = %err, "failed to look up session, not saving");
                err
            })?;

        let written = match existing {
            Some(record) => {
                tracing::debug!(store_ref = ?record.store_ref, "replacing session document");
                self.remote(self.records.replace(
                    &record.store_ref,
                    &logical_id,
                    &payload,
                    expires_at,
                ))
                .await
            }
            None => {
                tracing::debug!("creating session document");
                self.remote(self.records.create(&logical_id, &payload, expires_at))
                    .await
                    .map(|_| ())
            }
        };
        written.map_err(|err| {
            tracing::error!(err = %err, "failed to write session to store");
            err
        })?;

        cookies.set(session.name(), id.as_str(), session.options());
        session.mark_saved();
        Ok(())
    }

    /// Deletes the session's document. Succeeds if there is none, including when the
    /// session never got an id.
    #[tracing::instrument(name = "deleting session from store", skip(self, session), fields(name = session.name()))]
    pub async fn delete(&self, session: &Session) -> Result<()> {
        let Some(id) = session.id() else {
            return Ok(());
        };

        let logical_id = self.logical_id(id);
        let existing = self
            .remote(self.records.find(&logical_id))
            .await
            .map_err(|err| {
                tracing::error!(err = %err, "failed to look up session");
                err
            })?;

        match existing {
            Some(record) => self
                .remote(self.records.delete(&record.store_ref))
                .await
                .map_err(|err| {
                    tracing::error!(err = %err, "failed to delete session from store");
                    err
                }),
            None => {
                tracing::debug!("session already absent from store");
                Ok(())
            }
        }
    }

    fn logical_id(&self, id: &Id) -> String {
        format!("{}{}", self.config.key_prefix, id)
    }

    async fn remote<T>(
        &self,
        operation: impl Future<Output = std::result::Result<T, store::Error>>,
    ) -> Result<T> {
        match self.config.operation_timeout {
            Some(limit) => tokio::time::timeout(limit, operation)
                .await
                .map_err(|_| Error::Timeout(limit))?
                .map_err(Error::from),
            None => operation.await.map_err(Error::from),
        }
    }
}
