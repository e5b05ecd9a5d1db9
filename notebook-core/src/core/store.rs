//! The document-store boundary consumed by [`HierarchyStore`](crate::HierarchyStore).
//!
//! A store offers plain collection CRUD with no foreign keys and no
//! cascading deletes; referential integrity is the hierarchy's job.

use async_trait::async_trait;

use crate::core::document::{CollectionPath, DocumentRecord, Fields, Filter, OrderBy};
use crate::core::error::StoreError;

/// Result type for store calls.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Async collection CRUD over a schemaless document database.
///
/// Implementations must make [`delete`](Self::delete) idempotent: deleting
/// an id that is not present succeeds.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Inserts a new record and returns its store-generated id.
    async fn insert(&self, collection: &CollectionPath, fields: Fields) -> StoreResult<String>;

    /// Fetches one record, or `None` if it does not exist.
    async fn get(
        &self,
        collection: &CollectionPath,
        id: &str,
    ) -> StoreResult<Option<DocumentRecord>>;

    /// Lists a collection in insertion order, optionally filtered and sorted.
    async fn list(
        &self,
        collection: &CollectionPath,
        filter: Option<&Filter>,
        order_by: Option<&OrderBy>,
    ) -> StoreResult<Vec<DocumentRecord>>;

    /// Merges `fields` into an existing record.
    ///
    /// Returns [`StoreError::NotFound`] if the record does not exist.
    async fn update(
        &self,
        collection: &CollectionPath,
        id: &str,
        fields: Fields,
    ) -> StoreResult<()>;

    /// Removes a record. A missing id is not an error.
    async fn delete(&self, collection: &CollectionPath, id: &str) -> StoreResult<()>;
}
