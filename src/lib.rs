//! # Dossier: cookie-identified sessions in a document store
//!
//! `dossier` keeps server-side session data in a backing document store and ties it to
//! the client with a random id carried in a cookie. Values are serialized into a
//! single opaque payload per session; the document carries an absolute expiry the
//! store uses to hide and eventually collect stale sessions.
//!
//! # Quick Start
//!
//! Here's a basic example with [Axum](https://docs.rs/axum/latest/axum/) and the
//! in-memory store. This requires the `axum` feature (enabled by default).
//!
//! ```rust,no_run
//! use axum::{Router, routing::get};
//! use dossier::store::memory::MemoryStore;
//! use dossier::{CookieOptions, SessionLayer, SessionStore, Sessions, StoreConfig};
//! use std::sync::Arc;
//! use tower_cookies::CookieManagerLayer;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = StoreConfig::build()
//!         .key_prefix("session:")
//!         .default_options(CookieOptions::build().max_age(3600).secure(true));
//!     let store = SessionStore::new(Arc::new(MemoryStore::new())).with_config(config);
//!
//!     let app = Router::new()
//!         .route("/", get(handler))
//!         .layer(SessionLayer::new(store))
//!         .layer(CookieManagerLayer::new()); // CookieManagerLayer must be after
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//! }
//!
//! async fn handler(sessions: Sessions<MemoryStore>) -> String {
//!     // A failed resume still hands back a usable, empty session.
//!     let shared = sessions.get("visit").await.unwrap_or_else(|err| err.session);
//!     let mut session = shared.lock().await;
//!
//!     let count = session.get::<u32>("count").unwrap_or_default().unwrap_or(0) + 1;
//!     session.insert("count", &count).unwrap();
//!     sessions.save(&mut session).await.unwrap();
//!
//!     format!("You've visited this page {count} times")
//! }
//! ```
//!
//! # Session lifecycle
//!
//! - [`SessionStore::new_session`] reads the named cookie and resumes the session from
//!   the store. Without a cookie it returns a new, unbound session.
//! - [`SessionStore::save`] assigns an id on first save, then replaces the existing
//!   document or creates one, and sets the cookie. A session whose `max_age` is zero or
//!   less is deleted instead and its cookie cleared.
//! - [`SessionStore::delete`] removes the document; deleting an absent session succeeds.
//! - [`SessionStore::get`] caches sessions per request through a [`Registry`].
//!
//! # Stores
//!
//! Any document store implementing [`store::RecordStore`] can back sessions.
//!
//! ## Memory
//! [`store::memory::MemoryStore`], for tests and development.
//!
//! ## Postgres
//! `store::postgres::PostgresStore`, behind the `postgres-store` feature.
//!
//! ```rust,ignore
//! use dossier::store::postgres::PostgresStoreBuilder;
//! use sqlx::PgPool;
//!
//! let pool = PgPool::connect(&database_url).await?;
//! // Creates the document table when the second argument is `true`.
//! let store = PostgresStoreBuilder::new(pool, true)
//!     .table_name("sessions")
//!     .build()
//!     .await?;
//! ```
//!
//! ## Serialization
//! Session payloads are serialized with one of:
//!
//! - [`bincode`](https://crates.io/crates/bincode) (default)
//! - [`rmp-serde`](https://crates.io/crates/rmp-serde) (MessagePack), with
//!   `default-features = false, features = ["axum", "messagepack"]`
//!
//! # Known limitations
//!
//! - Saves of an existing session are last-writer-wins. Two requests saving it
//!   concurrently do not see each other's changes.
//! - Both bundled stores keep logical ids unique. If two saves of the same id both find
//!   no document, the second create fails with [`store::Error::Write`] and that save
//!   sets no cookie.
//! - Expired documents are hidden by the store and collected asynchronously; there is
//!   no additional staleness check on load.

pub use cookie;

#[cfg(feature = "axum")]
mod extract;

#[cfg(feature = "postgres-store")]
pub use sqlx;

mod codec;

mod cookies;
pub use cookies::CookieAccess;

mod error;
pub use error::{Error, NewSessionError, RegistryError, Result};

mod registry;
pub use registry::{Registry, SharedSession};

mod service;
pub use service::*;

mod session;
pub use session::*;

mod session_store;
pub use session_store::{SessionStore, StoreConfig};

pub mod store;

pub use tower_cookies;
