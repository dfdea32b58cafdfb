use crate::store::{Error, Record, RecordStore};
use sqlx::PgPool;
use time::OffsetDateTime;

// Re-export Duration
pub use tokio::time::Duration;

/// A builder for creating a `PostgresStore`.
///
/// This allows for customizing the table and schema names for session storage.
#[derive(Debug)]
pub struct PostgresStoreBuilder {
    pool: PgPool,
    table_name: String,
    create_table: bool,
    schema_name: Option<String>,
    cleanup_interval: Option<Duration>,
}

impl PostgresStoreBuilder {
    /// Creates a new builder with a database pool and default settings.
    pub fn new(pool: PgPool, create_table: bool) -> Self {
        Self {
            pool,
            table_name: "t_session_documents".to_string(),
            create_table,
            schema_name: None,
            cleanup_interval: None,
        }
    }

    /// Sets a custom table name for the session store. Defaults to "t_session_documents".
    pub fn table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = table_name.into();
        self
    }

    /// Sets a custom schema name for the session store.
    pub fn schema_name(mut self, schema_name: impl Into<String>) -> Self {
        self.schema_name = Some(schema_name.into());
        self
    }

    /// Sets the interval for the background task that deletes expired documents.
    ///
    /// If this is not set, the cleanup task defaults to running every 5 minutes.
    pub fn cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = Some(interval);
        self
    }

    /// Builds the `PostgresStore`, creating the schema and table if requested.
    pub async fn build(self) -> Result<PostgresStore, sqlx::Error> {
        let table = if let Some(schema) = &self.schema_name {
            format!("\"{}\".\"{}\"", schema, self.table_name)
        } else {
            format!("\"{}\"", self.table_name)
        };

        if self.create_table {
            if let Some(schema) = &self.schema_name {
                sqlx::query(&format!("create schema if not exists \"{schema}\""))
                    .execute(&self.pool)
                    .await?;
            }

            let index_prefix = &self.table_name;
            sqlx::raw_sql(&format!(
                r#"
                create table if not exists {table} (
                    doc_ref bigserial primary key,
                    logical_id text not null,
                    payload bytea not null,
                    expires_at timestamptz not null
                );
                -- the secondary index sessions are located through
                create unique index if not exists "{index_prefix}_logical_id_idx" on {table}(logical_id);
                create index if not exists "{index_prefix}_expires_at_idx" on {table}(expires_at);
                "#
            ))
            .execute(&self.pool)
            .await?;
        }

        let pool = self.pool.clone();
        let cleanup_table = table.clone();
        let interval = self.cleanup_interval.unwrap_or(Duration::from_secs(300));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let result = sqlx::query(&format!(
                    "delete from {cleanup_table} where expires_at < now()"
                ))
                .execute(&pool)
                .await;

                match result {
                    Ok(done) if done.rows_affected() > 0 => {
                        tracing::debug!(count = done.rows_affected(), "collected expired sessions");
                    }
                    Ok(_) => {}
                    Err(err) => {
                        tracing::warn!(err = %err, "failed to collect expired sessions");
                    }
                }
            }
        });

        Ok(PostgresStore {
            pool: self.pool,
            table,
        })
    }
}

/// A Postgres-backed document store.
///
/// Each session is a row addressed by its `doc_ref` column; the unique index on
/// `logical_id` serves lookups. Rows past `expires_at` are invisible to lookups and are
/// deleted by a background task. Until then, a create for the same logical id takes
/// the expired row over.
#[derive(Clone, Debug)]
pub struct PostgresStore {
    pool: PgPool,
    table: String,
}

fn read_error(err: sqlx::Error) -> Error {
    Error::Read(err.to_string())
}

fn write_error(err: sqlx::Error) -> Error {
    Error::Write(err.to_string())
}

impl RecordStore for PostgresStore {
    type Ref = i64;

    async fn find(&self, logical_id: &str) -> Result<Option<Record<i64>>, Error> {
        let query = format!(
            r#"
            select doc_ref, logical_id, payload, expires_at
            from {table}
            where logical_id = $1
              and expires_at > now()
            "#,
            table = self.table
        );

        let row: Option<(i64, String, Vec<u8>, OffsetDateTime)> = sqlx::query_as(&query)
            .bind(logical_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(read_error)?;

        Ok(row.map(|(store_ref, logical_id, payload, expires_at)| Record {
            store_ref,
            logical_id,
            payload,
            expires_at,
        }))
    }

    async fn create(
        &self,
        logical_id: &str,
        payload: &[u8],
        expires_at: OffsetDateTime,
    ) -> Result<i64, Error> {
        let query = format!(
            r#"
            insert into {table} (logical_id, payload, expires_at)
            values ($1, $2, $3)
            on conflict (logical_id) do update
            set payload = excluded.payload,
                expires_at = excluded.expires_at
            where {table}.expires_at <= now()
            returning doc_ref
            "#,
            table = self.table
        );

        let store_ref: Option<i64> = sqlx::query_scalar(&query)
            .bind(logical_id)
            .bind(payload)
            .bind(expires_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(write_error)?;

        store_ref.ok_or_else(|| {
            Error::Write(format!(
                "a document with logical id {logical_id} already exists"
            ))
        })
    }

    async fn replace(
        &self,
        store_ref: &i64,
        logical_id: &str,
        payload: &[u8],
        expires_at: OffsetDateTime,
    ) -> Result<(), Error> {
        let query = format!(
            "update {table} set logical_id = $2, payload = $3, expires_at = $4 where doc_ref = $1",
            table = self.table
        );

        let result = sqlx::query(&query)
            .bind(store_ref)
            .bind(logical_id)
            .bind(payload)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(write_error)?;

        if result.rows_affected() == 0 {
            return Err(Error::Write(format!("document {store_ref} does not exist")));
        }
        Ok(())
    }

    async fn delete(&self, store_ref: &i64) -> Result<(), Error> {
        let query = format!("delete from {table} where doc_ref = $1", table = self.table);
        sqlx::query(&query)
            .bind(store_ref)
            .execute(&self.pool)
            .await
            .map_err(write_error)?;
        Ok(())
    }
}
