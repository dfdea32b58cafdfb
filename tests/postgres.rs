#![cfg(feature = "postgres-store")]

mod common;

#[cfg(test)]
mod tests {
    use super::common::*;
    use dossier::store::postgres::{PostgresStore, PostgresStoreBuilder};
    use dossier::store::{self, RecordStore};
    use dossier::{CookieAccess, Error, SessionStore};
    use sqlx::PgPool;
    use std::sync::Arc;
    use time::{Duration, OffsetDateTime};

    async fn setup_store(table: &str) -> Arc<PostgresStore> {
        let database_url =
            std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");
        let pool = PgPool::connect(&database_url).await.unwrap();

        // Clean up table before each test run
        sqlx::query(&format!("drop table if exists \"{table}\" cascade"))
            .execute(&pool)
            .await
            .unwrap();

        let store = PostgresStoreBuilder::new(pool, true)
            .table_name(table)
            .build()
            .await
            .unwrap();
        Arc::new(store)
    }

    fn in_a_minute() -> OffsetDateTime {
        OffsetDateTime::now_utc() + Duration::minutes(1)
    }

    #[tokio::test]
    async fn test_create_find_replace_delete() {
        let store = setup_store("t_docs_crud").await;
        assert!(store.find("session:a").await.unwrap().is_none());

        let store_ref = store.create("session:a", b"one", in_a_minute()).await.unwrap();
        let record = store.find("session:a").await.unwrap().unwrap();
        assert_eq!(record.store_ref, store_ref);
        assert_eq!(record.payload, b"one");

        store
            .replace(&store_ref, "session:a", b"two", in_a_minute())
            .await
            .unwrap();
        let record = store.find("session:a").await.unwrap().unwrap();
        assert_eq!(record.payload, b"two");

        store.delete(&store_ref).await.unwrap();
        assert!(store.find("session:a").await.unwrap().is_none());
        store.delete(&store_ref).await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_create_is_rejected() {
        let store = setup_store("t_docs_unique").await;
        store.create("session:a", b"one", in_a_minute()).await.unwrap();

        let result = store.create("session:a", b"two", in_a_minute()).await;
        assert!(matches!(result, Err(store::Error::Write(_))));
    }

    #[tokio::test]
    async fn test_expired_document_is_hidden_and_taken_over() {
        let store = setup_store("t_docs_expiry").await;
        let past = OffsetDateTime::now_utc() - Duration::seconds(5);
        store.create("session:old", b"stale", past).await.unwrap();

        assert!(store.find("session:old").await.unwrap().is_none());

        store
            .create("session:old", b"fresh", in_a_minute())
            .await
            .unwrap();
        let record = store.find("session:old").await.unwrap().unwrap();
        assert_eq!(record.payload, b"fresh");
    }

    #[tokio::test]
    async fn test_replace_of_missing_document_fails() {
        let store = setup_store("t_docs_missing").await;
        let result = store.replace(&42, "session:a", b"x", in_a_minute()).await;
        assert!(matches!(result, Err(store::Error::Write(_))));
    }

    #[tokio::test]
    async fn test_session_round_trip() {
        let sessions = SessionStore::new(setup_store("t_docs_sessions").await);
        let jar = TestJar::new();

        let mut session = sessions.new_session(&jar, "hello").await.unwrap();
        session.insert("profile", &create_test_session()).unwrap();
        sessions.save(&jar, &mut session).await.unwrap();

        let jar = jar.next_request();
        let mut resumed = sessions.new_session(&jar, "hello").await.unwrap();
        assert_eq!(
            resumed.get::<TestSession>("profile").unwrap(),
            Some(create_test_session())
        );

        let id = resumed.id().unwrap().clone();
        resumed.options_mut().max_age = -1;
        sessions.save(&jar, &mut resumed).await.unwrap();
        assert_eq!(jar.response_cookie("hello").unwrap().value(), "");
        assert!(jar.next_request().get("hello").is_none());

        // a client replaying the old cookie no longer finds the session
        let replay = TestJar::with_cookie("hello", id.as_str());
        let err = sessions.new_session(&replay, "hello").await.unwrap_err();
        assert!(matches!(err.source, Error::NotFound));
        assert!(err.session.is_new());
    }
}
