use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    Document, DocumentId, DocumentQuery, Result, StoreError, Version,
    store::{DocumentStore, WriteOptions},
};

const SELECT_COLUMNS: &str = "id, collection, version, created_at, updated_at, body";

/// PostgreSQL-backed document store implementation.
///
/// Bodies live in a JSONB column; query filters are evaluated with JSONB
/// containment (`body @> filter`).
#[derive(Clone)]
pub struct PostgresDocumentStore {
    pool: PgPool,
}

impl PostgresDocumentStore {
    /// Creates a new PostgreSQL document store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to the database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_document(row: PgRow) -> Result<Document> {
        Ok(Document {
            id: DocumentId::from_uuid(row.try_get::<Uuid, _>("id")?),
            collection: row.try_get("collection")?,
            version: Version::new(row.try_get("version")?),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            body: row.try_get("body")?,
        })
    }
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    async fn insert(&self, document: Document) -> Result<Document> {
        let sql = format!(
            "INSERT INTO documents (id, collection, version, created_at, updated_at, body) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {SELECT_COLUMNS}"
        );

        let row = sqlx::query(&sql)
            .bind(document.id.as_uuid())
            .bind(&document.collection)
            .bind(Version::first().as_i64())
            .bind(document.created_at)
            .bind(document.updated_at)
            .bind(&document.body)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.constraint() == Some("documents_pkey")
                {
                    return StoreError::Duplicate {
                        collection: document.collection.clone(),
                        id: document.id,
                    };
                }
                StoreError::Database(e)
            })?;

        Self::row_to_document(row)
    }

    async fn get(&self, collection: &str, id: DocumentId) -> Result<Option<Document>> {
        let sql =
            format!("SELECT {SELECT_COLUMNS} FROM documents WHERE collection = $1 AND id = $2");

        let row = sqlx::query(&sql)
            .bind(collection)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_document).transpose()
    }

    async fn find(&self, query: DocumentQuery) -> Result<Vec<Document>> {
        let mut sql = format!(
            "SELECT {SELECT_COLUMNS} FROM documents WHERE collection = $1 AND body @> $2 \
             ORDER BY seq ASC"
        );
        let mut param_count = 2;

        if query.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }
        if query.offset.is_some() {
            param_count += 1;
            sql.push_str(&format!(" OFFSET ${param_count}"));
        }

        let mut sqlx_query = sqlx::query(&sql)
            .bind(&query.collection)
            .bind(query.filter_value());

        if let Some(limit) = query.limit {
            sqlx_query = sqlx_query.bind(limit as i64);
        }
        if let Some(offset) = query.offset {
            sqlx_query = sqlx_query.bind(offset as i64);
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_document).collect()
    }

    async fn replace(
        &self,
        collection: &str,
        id: DocumentId,
        body: serde_json::Value,
        options: WriteOptions,
    ) -> Result<Document> {
        let sql = format!(
            "UPDATE documents SET body = $3, version = version + 1, updated_at = $4 \
             WHERE collection = $1 AND id = $2 AND ($5::BIGINT IS NULL OR version = $5) \
             RETURNING {SELECT_COLUMNS}"
        );

        let row = sqlx::query(&sql)
            .bind(collection)
            .bind(id.as_uuid())
            .bind(&body)
            .bind(Utc::now())
            .bind(options.expected_version.map(|v| v.as_i64()))
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = row {
            return Self::row_to_document(row);
        }

        // Nothing was updated: distinguish a missing document from a stale version
        let current: Option<i64> =
            sqlx::query_scalar("SELECT version FROM documents WHERE collection = $1 AND id = $2")
                .bind(collection)
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

        match (current, options.expected_version) {
            (Some(actual), Some(expected)) => Err(StoreError::ConcurrencyConflict {
                collection: collection.to_string(),
                id,
                expected,
                actual: Version::new(actual),
            }),
            _ => Err(StoreError::NotFound {
                collection: collection.to_string(),
                id,
            }),
        }
    }

    async fn delete(&self, collection: &str, id: DocumentId) -> Result<Option<Document>> {
        let sql = format!(
            "DELETE FROM documents WHERE collection = $1 AND id = $2 RETURNING {SELECT_COLUMNS}"
        );

        let row = sqlx::query(&sql)
            .bind(collection)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_document).transpose()
    }
}
