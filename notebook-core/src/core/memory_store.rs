//! In-process [`DocumentStore`] for tests.
//!
//! Besides plain CRUD it can simulate an unreachable backend, either
//! entirely ([`MemoryStore::set_offline`]) or after a number of successful
//! deletes ([`MemoryStore::fail_deletes_after`]), which is how partial
//! cascade failures are exercised.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::core::document::{apply_query, CollectionPath, DocumentRecord, Fields, Filter, OrderBy};
use crate::core::error::StoreError;
use crate::core::store::{DocumentStore, StoreResult};

#[derive(Default)]
struct State {
    collections: HashMap<CollectionPath, Vec<DocumentRecord>>,
    delete_log: Vec<String>,
    deletes_until_failure: Option<usize>,
}

/// A [`DocumentStore`] held entirely in memory.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// When `offline` is true every call fails with [`StoreError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Lets `successes` more deletes through, then fails every delete until
    /// [`clear_faults`](Self::clear_faults) is called.
    pub async fn fail_deletes_after(&self, successes: usize) {
        self.state.write().await.deletes_until_failure = Some(successes);
    }

    /// Removes every injected fault and forgets the recorded deletes.
    pub async fn clear_faults(&self) {
        self.set_offline(false);
        let mut state = self.state.write().await;
        state.deletes_until_failure = None;
        state.delete_log.clear();
    }

    /// Ids passed to successful deletes since the last
    /// [`clear_faults`](Self::clear_faults), in call order.
    pub async fn delete_log(&self) -> Vec<String> {
        self.state.read().await.delete_log.clone()
    }

    /// Total number of records across every collection.
    pub async fn record_count(&self) -> usize {
        self.state
            .read()
            .await
            .collections
            .values()
            .map(Vec::len)
            .sum()
    }

    fn check_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "memory store is offline".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(&self, collection: &CollectionPath, fields: Fields) -> StoreResult<String> {
        self.check_online()?;
        let id = Uuid::new_v4().to_string();
        let mut state = self.state.write().await;
        state
            .collections
            .entry(collection.clone())
            .or_default()
            .push(DocumentRecord {
                id: id.clone(),
                fields,
            });
        Ok(id)
    }

    async fn get(
        &self,
        collection: &CollectionPath,
        id: &str,
    ) -> StoreResult<Option<DocumentRecord>> {
        self.check_online()?;
        let state = self.state.read().await;
        Ok(state
            .collections
            .get(collection)
            .and_then(|records| records.iter().find(|r| r.id == id))
            .cloned())
    }

    async fn list(
        &self,
        collection: &CollectionPath,
        filter: Option<&Filter>,
        order_by: Option<&OrderBy>,
    ) -> StoreResult<Vec<DocumentRecord>> {
        self.check_online()?;
        let records = self
            .state
            .read()
            .await
            .collections
            .get(collection)
            .cloned()
            .unwrap_or_default();
        Ok(apply_query(records, filter, order_by))
    }

    async fn update(
        &self,
        collection: &CollectionPath,
        id: &str,
        fields: Fields,
    ) -> StoreResult<()> {
        self.check_online()?;
        let mut state = self.state.write().await;
        let record = state
            .collections
            .get_mut(collection)
            .and_then(|records| records.iter_mut().find(|r| r.id == id))
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;
        record.fields.extend(fields);
        Ok(())
    }

    async fn delete(&self, collection: &CollectionPath, id: &str) -> StoreResult<()> {
        self.check_online()?;
        let mut state = self.state.write().await;
        let remaining = state.deletes_until_failure;
        match remaining {
            Some(0) => {
                return Err(StoreError::Unavailable(format!(
                    "injected delete failure for {collection}/{id}"
                )));
            }
            Some(n) => state.deletes_until_failure = Some(n - 1),
            None => {}
        }
        if let Some(records) = state.collections.get_mut(collection) {
            records.retain(|r| r.id != id);
            if records.is_empty() {
                state.collections.remove(collection);
            }
        }
        state.delete_log.push(id.to_string());
        Ok(())
    }
}
