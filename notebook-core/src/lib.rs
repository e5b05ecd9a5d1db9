//! Core library for Notebook: a single-user hierarchy of workbooks, pages and notes.
//!
//! The primary entry point is [`HierarchyStore`], which keeps the
//! workbook → page → note tree consistent on top of any [`DocumentStore`].
//! Two stores ship with the crate: [`SqliteStore`] for real data and
//! [`MemoryStore`] for tests.
//!
//! Types are re-exported from their respective sub-modules for convenience;
//! consumers should import from the crate root rather than the `core` module.

pub mod core;

// Re-export commonly used types.
#[doc(inline)]
pub use crate::core::{
    auth::{AccessPolicy, Identity, Session},
    cascade::{CascadePlan, CascadeStep, DeleteResult},
    clock::{Clock, ManualClock, SystemClock},
    document::{CollectionPath, DocumentRecord, Fields, Filter, OrderBy, SortDirection},
    error::{NotebookError, Result, StoreError},
    hierarchy::{HierarchyStore, DEFAULT_RECENT_LIMIT},
    memory_store::MemoryStore,
    model::{EntityKind, Note, Page, Workbook},
    sanitize::sanitize_note_html,
    sqlite_store::SqliteStore,
    store::{DocumentStore, StoreResult},
};

/// Re-exported so callers can build cancellation signals for cascades
/// without depending on `tokio-util` directly.
pub use tokio_util::sync::CancellationToken;
