use axum::{Router, http::StatusCode, routing::get};
use dossier::store::memory::MemoryStore;
use dossier::{CookieOptions, SessionLayer, SessionStore, Sessions, StoreConfig};
use std::sync::Arc;
use std::time::Duration;
use tower_cookies::CookieManagerLayer;
use tracing_subscriber::EnvFilter;

const SESSION_NAME: &str = "visit";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("dossier=debug".parse().unwrap()),
        )
        .init();

    // Configure session defaults
    let config = StoreConfig::build()
        .key_prefix("visit:")
        .operation_timeout(Duration::from_secs(2))
        .default_options(
            CookieOptions::build()
                .http_only(true)
                .same_site(cookie::SameSite::Lax)
                .max_age(3600) // 1 hour
                .path("/"),
        );
    let store = SessionStore::new(Arc::new(MemoryStore::new())).with_config(config);

    let app = Router::new()
        .route("/", get(count))
        .route("/logout", get(logout))
        .layer(SessionLayer::new(store))
        .layer(CookieManagerLayer::new());

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

async fn count(sessions: Sessions<MemoryStore>) -> Result<String, StatusCode> {
    // A cookie pointing at a vanished session still yields a fresh one
    let shared = sessions.get(SESSION_NAME).await.unwrap_or_else(|err| {
        tracing::info!(error = %err.source, "starting over");
        err.session
    });
    let mut session = shared.lock().await;

    let count = session.get::<u32>("count").unwrap_or_default().unwrap_or(0) + 1;
    session
        .insert("count", &count)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    sessions
        .save(&mut session)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(format!("You've visited this page {count} times"))
}

async fn logout(sessions: Sessions<MemoryStore>) -> Result<&'static str, StatusCode> {
    let shared = sessions
        .get(SESSION_NAME)
        .await
        .unwrap_or_else(|err| err.session);
    let mut session = shared.lock().await;

    session.options_mut().max_age = -1;
    sessions
        .save(&mut session)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok("Bye")
}
