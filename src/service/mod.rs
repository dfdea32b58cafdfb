//! Session middleware for tower applications.
//!
//! [`SessionLayer`] gives every request a fresh [`Registry`] and exposes the store to
//! handlers through [`Sessions`].

use http::{Request, Response};
use tower::{Layer, Service};
use tower_cookies::Cookies;

use crate::error::RegistryError;
use crate::registry::{Registry, SharedSession};
use crate::store::RecordStore;
use crate::{Result, Session, SessionStore};
use pin_project_lite::pin_project;
use std::fmt::{self, Debug};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

/// Request-scoped access to sessions.
///
/// Bundles the [`SessionStore`], the request's [`Registry`] and its cookies. With the
/// `axum` feature it can be used directly as an extractor.
pub struct Sessions<R: RecordStore> {
    store: SessionStore<R>,
    registry: Registry,
    cookies: Cookies,
}

impl<R: RecordStore> Clone for Sessions<R> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            registry: self.registry.clone(),
            cookies: self.cookies.clone(),
        }
    }
}

impl<R: RecordStore + Debug> Debug for Sessions<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sessions")
            .field("store", &self.store)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl<R: RecordStore> Sessions<R> {
    pub fn new(store: SessionStore<R>, registry: Registry, cookies: Cookies) -> Self {
        Self {
            store,
            registry,
            cookies,
        }
    }

    /// The session named `name`, shared by every call within this request.
    pub async fn get(&self, name: &str) -> std::result::Result<SharedSession, RegistryError> {
        self.store.get(&self.registry, &self.cookies, name).await
    }

    /// Persists `session` and updates its cookie on the response.
    pub async fn save(&self, session: &mut Session) -> Result<()> {
        self.store.save(&self.cookies, session).await
    }

    /// Removes `session` from the store without touching its cookie.
    pub async fn delete(&self, session: &Session) -> Result<()> {
        self.store.delete(session).await
    }

    pub fn store(&self) -> &SessionStore<R> {
        &self.store
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

/// A Tower Middleware to use [`Sessions`].
#[derive(Debug)]
pub struct SessionService<S, R: RecordStore> {
    inner: S,
    store: SessionStore<R>,
}

impl<S: Clone, R: RecordStore> Clone for SessionService<S, R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            store: self.store.clone(),
        }
    }
}

impl<ReqBody, ResBody, S, R> Service<Request<ReqBody>> for SessionService<S, R>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    R: RecordStore,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = ResponseFuture<S::Future>;

    #[inline]
    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let registry = Registry::new();

        match req.extensions().get::<Cookies>().cloned() {
            Some(cookies) => {
                let sessions = Sessions::new(self.store.clone(), registry.clone(), cookies);
                req.extensions_mut().insert(sessions);
            }
            None => {
                tracing::error!(
                    "cookies not found in the request extensions, is CookieManagerLayer applied?"
                );
            }
        }

        ResponseFuture {
            future: self.inner.call(req),
            registry,
        }
    }
}

/// Layer to apply [`SessionService`] middleware.
///
/// Must be applied before the `CookieManagerLayer`, which has to wrap it.
///
/// # Example
///
/// ```rust
/// use dossier::store::memory::MemoryStore;
/// use dossier::{SessionLayer, SessionStore, StoreConfig};
/// use std::sync::Arc;
///
/// let store = SessionStore::new(Arc::new(MemoryStore::new()))
///     .with_config(StoreConfig::build().key_prefix("session:"));
/// let session_layer = SessionLayer::new(store);
/// ```
#[derive(Debug)]
pub struct SessionLayer<R: RecordStore> {
    store: SessionStore<R>,
}

impl<R: RecordStore> Clone for SessionLayer<R> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<R: RecordStore> SessionLayer<R> {
    /// Create a new session layer.
    pub fn new(store: SessionStore<R>) -> Self {
        Self { store }
    }
}

impl<S, R: RecordStore> Layer<S> for SessionLayer<R> {
    type Service = SessionService<S, R>;

    fn layer(&self, inner: S) -> Self::Service {
        SessionService {
            inner,
            store: self.store.clone(),
        }
    }
}

pin_project! {
    /// Response future for [`SessionService`]
    #[derive(Debug)]
    pub struct ResponseFuture<F> {
        #[pin]
        future: F,
        registry: Registry,
    }
}

impl<F, Body, E> Future for ResponseFuture<F>
where
    F: Future<Output = std::result::Result<Response<Body>, E>>,
{
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let res = ready!(this.future.poll(cx))?;

        for name in this.registry.unsaved() {
            tracing::warn!(session = %name, "session was modified but never saved");
        }

        Poll::Ready(Ok(res))
    }
}
