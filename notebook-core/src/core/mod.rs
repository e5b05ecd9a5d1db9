//! Internal domain modules for the Notebook core library.
//!
//! All public types from these modules are re-exported at the crate root
//! with `#[doc(inline)]`; import from there in preference to this module.

pub mod auth;
pub mod cascade;
pub mod clock;
pub mod document;
pub mod error;
pub mod hierarchy;
pub mod memory_store;
pub mod model;
pub mod sanitize;
pub mod sqlite_store;
pub mod store;

#[doc(inline)]
pub use auth::{AccessPolicy, Identity, Session};
#[doc(inline)]
pub use cascade::{CascadePlan, CascadeStep, DeleteResult};
#[doc(inline)]
pub use clock::{Clock, ManualClock, SystemClock};
#[doc(inline)]
pub use document::{CollectionPath, DocumentRecord, Fields, Filter, OrderBy, SortDirection};
#[doc(inline)]
pub use error::{NotebookError, Result, StoreError};
#[doc(inline)]
pub use hierarchy::{HierarchyStore, DEFAULT_RECENT_LIMIT};
#[doc(inline)]
pub use memory_store::MemoryStore;
#[doc(inline)]
pub use model::{EntityKind, Note, Page, Workbook};
#[doc(inline)]
pub use sanitize::sanitize_note_html;
#[doc(inline)]
pub use sqlite_store::SqliteStore;
#[doc(inline)]
pub use store::{DocumentStore, StoreResult};
