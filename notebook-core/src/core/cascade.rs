//! Ordered, children-first cascade deletes over a [`DocumentStore`].
//!
//! The store has no transactions spanning collections, so a cascade is a
//! sequence of independent deletes. A [`CascadePlan`] is computed up front
//! with every child ahead of its parent; [`CascadePlan::execute`] then walks
//! it in order and stops at the first failure. Whatever point a cascade stops
//! at, the remaining records still form a valid subtree under an existing
//! parent, and running the same cascade again finishes the job because
//! store deletes are idempotent.
//!
//! ## Serialization
//!
//! [`DeleteResult`] serializes in camelCase (`deletedCount`, `affectedIds`)
//! like the other value types of this crate.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::core::document::CollectionPath;
use crate::core::error::{NotebookError, Result};
use crate::core::model::EntityKind;
use crate::core::store::DocumentStore;

/// One delete in a cascade.
#[derive(Debug, Clone, PartialEq)]
pub struct CascadeStep {
    pub kind: EntityKind,
    pub collection: CollectionPath,
    pub id: String,
}

/// A precomputed list of deletes, children before parents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CascadePlan {
    steps: Vec<CascadeStep>,
}

/// The outcome of a completed cascade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    /// Number of deletes issued (ids already absent included).
    pub deleted_count: usize,

    /// Every id the cascade deleted, in deletion order.
    pub affected_ids: Vec<String>,
}

impl CascadePlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: EntityKind, collection: CollectionPath, id: &str) {
        self.steps.push(CascadeStep {
            kind,
            collection,
            id: id.to_string(),
        });
    }

    /// Appends another plan's steps after this one's.
    pub fn extend(&mut self, other: CascadePlan) {
        self.steps.extend(other.steps);
    }

    pub fn steps(&self) -> &[CascadeStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Deletes every step in order.
    ///
    /// If `cancel` is given and fires, execution stops before the next step
    /// with [`NotebookError::CascadeCancelled`]. A failing delete stops
    /// execution with [`NotebookError::CascadeInterrupted`], which records how
    /// many steps had already succeeded.
    pub async fn execute(
        &self,
        store: &dyn DocumentStore,
        cancel: Option<&CancellationToken>,
    ) -> Result<DeleteResult> {
        let total = self.steps.len();
        let mut affected_ids = Vec::with_capacity(total);

        for (completed, step) in self.steps.iter().enumerate() {
            if cancel.is_some_and(CancellationToken::is_cancelled) {
                warn!("cascade cancelled after {completed} of {total} deletes");
                return Err(NotebookError::CascadeCancelled { completed, total });
            }

            if let Err(source) = store.delete(&step.collection, &step.id).await {
                warn!(
                    "cascade interrupted at {} {} in {} after {completed} of {total}: {source}",
                    step.kind, step.id, step.collection
                );
                return Err(NotebookError::CascadeInterrupted {
                    completed,
                    total,
                    failed_id: step.id.clone(),
                    source,
                });
            }
            affected_ids.push(step.id.clone());
        }

        if let Some(root) = self.steps.last() {
            info!(
                "deleted {} {} with {} descendants",
                root.kind, root.id, total - 1
            );
        }

        Ok(DeleteResult {
            deleted_count: affected_ids.len(),
            affected_ids,
        })
    }
}
