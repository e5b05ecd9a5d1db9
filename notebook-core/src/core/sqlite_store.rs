//! SQLite-backed [`DocumentStore`].
//!
//! Every record lives in one `documents` table keyed by `(collection, id)`,
//! with its fields as a JSON object. The autoincrement `seq` column gives
//! listings their insertion order.

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::core::document::{apply_query, CollectionPath, DocumentRecord, Fields, Filter, OrderBy};
use crate::core::error::StoreError;
use crate::core::store::{DocumentStore, StoreResult};

pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Creates (or upgrades in place) a store database at `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(include_str!("schema.sql"))?;
        Ok(Self::from_connection(conn))
    }

    /// Opens an existing store database, rejecting files that lack its tables.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        verify_schema(&conn)?;
        Ok(Self::from_connection(conn))
    }

    /// Opens `path` if it is already a store database, otherwise creates it.
    ///
    /// A file with no schema objects at all, such as a freshly touched empty
    /// file, is initialized like a new one. Any other file must already be a
    /// store database.
    pub fn open_or_create<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open(path)?;

        let object_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master",
            [],
            |row| row.get(0),
        )?;

        if object_count == 0 {
            conn.execute_batch(include_str!("schema.sql"))?;
        } else {
            verify_schema(&conn)?;
        }

        Ok(Self::from_connection(conn))
    }

    /// An in-memory database; contents vanish when the store is dropped.
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(include_str!("schema.sql"))?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Runs `f` against the connection on the blocking thread pool.
    async fn with_conn<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Connection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| StoreError::Unavailable("connection lock poisoned".to_string()))?;
            f(&mut guard)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("store task failed: {e}")))?
    }
}

fn verify_schema(conn: &Connection) -> StoreResult<()> {
    let table_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master
         WHERE type='table'
         AND name IN ('documents', 'store_meta')",
        [],
        |row| row.get(0),
    )?;

    if table_count != 2 {
        return Err(StoreError::InvalidDatabase(
            "Not a valid Notebook database".to_string(),
        ));
    }
    Ok(())
}

fn parse_fields(json: &str) -> StoreResult<Fields> {
    Ok(serde_json::from_str(json)?)
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn insert(&self, collection: &CollectionPath, fields: Fields) -> StoreResult<String> {
        let collection = collection.to_string();
        let fields_json = serde_json::to_string(&fields)?;
        let id = Uuid::new_v4().to_string();
        let new_id = id.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO documents (collection, id, fields_json) VALUES (?1, ?2, ?3)",
                rusqlite::params![collection, new_id, fields_json],
            )?;
            Ok(())
        })
        .await?;
        Ok(id)
    }

    async fn get(
        &self,
        collection: &CollectionPath,
        id: &str,
    ) -> StoreResult<Option<DocumentRecord>> {
        let collection = collection.to_string();
        let id = id.to_string();
        self.with_conn(move |conn| {
            let fields_json: Option<String> = conn
                .query_row(
                    "SELECT fields_json FROM documents WHERE collection = ?1 AND id = ?2",
                    rusqlite::params![collection, id],
                    |row| row.get(0),
                )
                .optional()?;
            fields_json
                .map(|json| {
                    Ok(DocumentRecord {
                        id,
                        fields: parse_fields(&json)?,
                    })
                })
                .transpose()
        })
        .await
    }

    async fn list(
        &self,
        collection: &CollectionPath,
        filter: Option<&Filter>,
        order_by: Option<&OrderBy>,
    ) -> StoreResult<Vec<DocumentRecord>> {
        let collection = collection.to_string();
        let rows: Vec<(String, String)> = self
            .with_conn(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, fields_json FROM documents WHERE collection = ?1 ORDER BY seq",
                )?;
                let rows = stmt
                    .query_map(rusqlite::params![collection], |row| {
                        Ok((row.get(0)?, row.get(1)?))
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .await?;

        let records = rows
            .into_iter()
            .map(|(id, json)| {
                Ok(DocumentRecord {
                    id,
                    fields: parse_fields(&json)?,
                })
            })
            .collect::<StoreResult<Vec<_>>>()?;
        Ok(apply_query(records, filter, order_by))
    }

    async fn update(
        &self,
        collection: &CollectionPath,
        id: &str,
        fields: Fields,
    ) -> StoreResult<()> {
        let collection = collection.to_string();
        let id = id.to_string();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let existing: Option<String> = tx
                .query_row(
                    "SELECT fields_json FROM documents WHERE collection = ?1 AND id = ?2",
                    rusqlite::params![collection, id],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(existing) = existing else {
                return Err(StoreError::NotFound { collection, id });
            };

            let mut merged = parse_fields(&existing)?;
            merged.extend(fields);
            tx.execute(
                "UPDATE documents SET fields_json = ?1 WHERE collection = ?2 AND id = ?3",
                rusqlite::params![serde_json::to_string(&merged)?, collection, id],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn delete(&self, collection: &CollectionPath, id: &str) -> StoreResult<()> {
        let collection = collection.to_string();
        let id = id.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
                rusqlite::params![collection, id],
            )?;
            Ok(())
        })
        .await
    }
}
