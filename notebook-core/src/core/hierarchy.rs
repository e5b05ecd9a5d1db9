//! Workbook → page → note operations over a [`DocumentStore`].

use log::debug;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::core::auth::Session;
use crate::core::cascade::{CascadePlan, DeleteResult};
use crate::core::clock::{next_modification, Clock, SystemClock};
use crate::core::document::{CollectionPath, Filter, OrderBy};
use crate::core::error::{NotebookError, Result, StoreError};
use crate::core::model::{
    sort_recent_first, EntityKind, Note, Page, Workbook, FIELD_LAST_MODIFIED, FIELD_USER_ID,
};
use crate::core::sanitize::sanitize_note_html;
use crate::core::store::DocumentStore;

/// How many notes [`HierarchyStore::recent_notes`] returns when the caller has no preference.
pub const DEFAULT_RECENT_LIMIT: usize = 5;

/// The workbook/page/note tree kept consistent on top of a plain document store.
///
/// The store knows nothing about parents and children. `HierarchyStore`
/// refuses to create children under missing parents and deletes subtrees
/// children-first, so a page never outlives its workbook and a note never
/// outlives its page. Every mutation returns what the store confirmed;
/// nothing is reported as done before the store call succeeds.
pub struct HierarchyStore {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
}

impl HierarchyStore {
    /// Wraps `store`, stamping notes with wall-clock time.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    // ── Workbooks ─────────────────────────────────────────────────

    /// Creates a workbook named `name` (trimmed) owned by `owner_id`.
    ///
    /// # Errors
    ///
    /// Returns [`NotebookError::Validation`] if `name` or `owner_id` is blank.
    pub async fn create_workbook(&self, owner_id: &str, name: &str) -> Result<Workbook> {
        if owner_id.trim().is_empty() {
            return Err(NotebookError::Validation(
                "Workbook owner cannot be empty".to_string(),
            ));
        }
        let name = require_name(EntityKind::Workbook, name)?;
        let doc = Workbook::to_fields(&name, owner_id);
        let id = self.store.insert(&CollectionPath::Workbooks, doc).await?;
        debug!("created workbook {id} for {owner_id}");
        Ok(Workbook {
            id,
            name,
            owner_id: owner_id.to_string(),
        })
    }

    /// Fetches a workbook by id.
    ///
    /// # Errors
    ///
    /// Returns [`NotebookError::NotFound`] if it does not exist.
    pub async fn get_workbook(&self, workbook_id: &str) -> Result<Workbook> {
        let record = self
            .store
            .get(&CollectionPath::Workbooks, workbook_id)
            .await?
            .ok_or_else(|| NotebookError::not_found(EntityKind::Workbook, workbook_id))?;
        Workbook::from_record(&record)
    }

    /// Fetches a workbook and checks that `session` owns it.
    ///
    /// # Errors
    ///
    /// Returns [`NotebookError::NotFound`] for a missing workbook and
    /// [`NotebookError::Authorization`] for someone else's.
    pub async fn authorize_workbook(
        &self,
        session: &Session,
        workbook_id: &str,
    ) -> Result<Workbook> {
        let workbook = self.get_workbook(workbook_id).await?;
        if workbook.owner_id != session.owner_id() {
            return Err(NotebookError::Authorization(format!(
                "workbook {workbook_id} belongs to another user"
            )));
        }
        Ok(workbook)
    }

    /// Lists the workbooks owned by `owner_id`, in creation order.
    pub async fn list_workbooks(&self, owner_id: &str) -> Result<Vec<Workbook>> {
        let filter = Filter::eq(FIELD_USER_ID, owner_id);
        self.store
            .list(&CollectionPath::Workbooks, Some(&filter), None)
            .await?
            .iter()
            .map(Workbook::from_record)
            .collect()
    }

    /// Deletes a workbook, all of its pages and all of their notes.
    ///
    /// Deleting a workbook that does not exist is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`NotebookError::Store`] if the subtree cannot be enumerated
    /// (nothing has been deleted yet) or
    /// [`NotebookError::CascadeInterrupted`] if a delete fails part way.
    pub async fn delete_workbook(&self, workbook_id: &str) -> Result<DeleteResult> {
        let plan = self.plan_workbook_delete(workbook_id).await?;
        plan.execute(self.store.as_ref(), None).await
    }

    /// [`delete_workbook`](Self::delete_workbook) that stops between deletes once `cancel` fires.
    pub async fn delete_workbook_cancellable(
        &self,
        workbook_id: &str,
        cancel: &CancellationToken,
    ) -> Result<DeleteResult> {
        let plan = self.plan_workbook_delete(workbook_id).await?;
        plan.execute(self.store.as_ref(), Some(cancel)).await
    }

    /// Builds the children-first delete plan for a workbook: each page's
    /// notes, then that page, and the workbook last.
    pub async fn plan_workbook_delete(&self, workbook_id: &str) -> Result<CascadePlan> {
        let pages = self
            .store
            .list(&CollectionPath::pages(workbook_id), None, None)
            .await?;

        let mut plan = CascadePlan::new();
        for page in &pages {
            plan.extend(self.plan_page_delete(workbook_id, &page.id).await?);
        }
        plan.push(EntityKind::Workbook, CollectionPath::Workbooks, workbook_id);
        Ok(plan)
    }

    // ── Pages ─────────────────────────────────────────────────────

    /// Creates a page named `name` (trimmed) under an existing workbook.
    ///
    /// # Errors
    ///
    /// Returns [`NotebookError::Validation`] for a blank name and
    /// [`NotebookError::NotFound`] if the workbook does not exist.
    pub async fn create_page(&self, workbook_id: &str, name: &str) -> Result<Page> {
        let name = require_name(EntityKind::Page, name)?;
        self.get_workbook(workbook_id).await?;
        let id = self
            .store
            .insert(&CollectionPath::pages(workbook_id), Page::to_fields(&name))
            .await?;
        debug!("created page {id} in workbook {workbook_id}");
        Ok(Page {
            id,
            workbook_id: workbook_id.to_string(),
            name,
        })
    }

    /// Fetches a page by id.
    ///
    /// # Errors
    ///
    /// Returns [`NotebookError::NotFound`] if it does not exist.
    pub async fn get_page(&self, workbook_id: &str, page_id: &str) -> Result<Page> {
        let record = self
            .store
            .get(&CollectionPath::pages(workbook_id), page_id)
            .await?
            .ok_or_else(|| NotebookError::not_found(EntityKind::Page, page_id))?;
        Page::from_record(workbook_id, &record)
    }

    /// Lists a workbook's pages in creation order.
    pub async fn list_pages(&self, workbook_id: &str) -> Result<Vec<Page>> {
        self.store
            .list(&CollectionPath::pages(workbook_id), None, None)
            .await?
            .iter()
            .map(|record| Page::from_record(workbook_id, record))
            .collect()
    }

    /// Deletes a page and all of its notes, notes first.
    ///
    /// Deleting a page that does not exist is a no-op.
    ///
    /// # Errors
    ///
    /// Same as [`delete_workbook`](Self::delete_workbook).
    pub async fn delete_page(&self, workbook_id: &str, page_id: &str) -> Result<DeleteResult> {
        let plan = self.plan_page_delete(workbook_id, page_id).await?;
        plan.execute(self.store.as_ref(), None).await
    }

    /// [`delete_page`](Self::delete_page) that stops between deletes once `cancel` fires.
    pub async fn delete_page_cancellable(
        &self,
        workbook_id: &str,
        page_id: &str,
        cancel: &CancellationToken,
    ) -> Result<DeleteResult> {
        let plan = self.plan_page_delete(workbook_id, page_id).await?;
        plan.execute(self.store.as_ref(), Some(cancel)).await
    }

    /// Builds the delete plan for a page: its notes, then the page.
    ///
    /// Works on raw records so that notes which fail to decode are still
    /// removed with their page.
    pub async fn plan_page_delete(&self, workbook_id: &str, page_id: &str) -> Result<CascadePlan> {
        let notes_path = CollectionPath::notes(workbook_id, page_id);
        let notes = self.store.list(&notes_path, None, None).await?;

        let mut plan = CascadePlan::new();
        for note in &notes {
            plan.push(EntityKind::Note, notes_path.clone(), &note.id);
        }
        let pages_path = CollectionPath::pages(workbook_id);
        plan.push(EntityKind::Page, pages_path, page_id);
        Ok(plan)
    }

    // ── Notes ─────────────────────────────────────────────────────

    /// Creates a note under an existing page with `createdAt == lastModified == now`.
    ///
    /// `text` is cleaned of unsafe HTML before it is stored.
    ///
    /// # Errors
    ///
    /// Returns [`NotebookError::Validation`] if the cleaned text is blank and
    /// [`NotebookError::NotFound`] if the page does not exist.
    pub async fn create_note(
        &self,
        workbook_id: &str,
        page_id: &str,
        title: &str,
        text: &str,
    ) -> Result<Note> {
        let text = require_text(text)?;
        self.get_page(workbook_id, page_id).await?;
        self.insert_note(workbook_id, page_id, title.to_string(), text)
            .await
    }

    /// Fetches a note by id.
    ///
    /// # Errors
    ///
    /// Returns [`NotebookError::NotFound`] if it does not exist.
    pub async fn get_note(&self, workbook_id: &str, page_id: &str, note_id: &str) -> Result<Note> {
        let record = self
            .store
            .get(&CollectionPath::notes(workbook_id, page_id), note_id)
            .await?
            .ok_or_else(|| NotebookError::not_found(EntityKind::Note, note_id))?;
        Note::from_record(workbook_id, page_id, &record)
    }

    /// Replaces a note's title and text and moves `lastModified` forward.
    ///
    /// `createdAt` is preserved. The returned note is re-read from the store.
    ///
    /// # Errors
    ///
    /// Returns [`NotebookError::Validation`] if the cleaned text is blank and
    /// [`NotebookError::NotFound`] if the note does not exist.
    pub async fn update_note(
        &self,
        workbook_id: &str,
        page_id: &str,
        note_id: &str,
        title: &str,
        text: &str,
    ) -> Result<Note> {
        let text = require_text(text)?;
        let existing = self.get_note(workbook_id, page_id, note_id).await?;
        let last_modified = next_modification(self.clock.as_ref(), existing.last_modified);

        self.store
            .update(
                &CollectionPath::notes(workbook_id, page_id),
                note_id,
                Note::edit_fields(title, &text, last_modified),
            )
            .await
            .map_err(|e| match e {
                // Deleted between the read and the write.
                StoreError::NotFound { .. } => NotebookError::not_found(EntityKind::Note, note_id),
                other => NotebookError::Store(other),
            })?;
        debug!("updated note {note_id}");

        self.get_note(workbook_id, page_id, note_id).await
    }

    /// Copies a note's text into a new note titled `"<title> (Copy)"` with fresh timestamps.
    ///
    /// # Errors
    ///
    /// Returns [`NotebookError::NotFound`] if the source note does not exist.
    pub async fn duplicate_note(
        &self,
        workbook_id: &str,
        page_id: &str,
        note_id: &str,
    ) -> Result<Note> {
        let source = self.get_note(workbook_id, page_id, note_id).await?;
        self.insert_note(
            workbook_id,
            page_id,
            format!("{} (Copy)", source.title),
            source.text,
        )
        .await
    }

    /// Deletes a single note. Deleting a missing note is a no-op.
    pub async fn delete_note(
        &self,
        workbook_id: &str,
        page_id: &str,
        note_id: &str,
    ) -> Result<DeleteResult> {
        let mut plan = CascadePlan::new();
        plan.push(
            EntityKind::Note,
            CollectionPath::notes(workbook_id, page_id),
            note_id,
        );
        plan.execute(self.store.as_ref(), None).await
    }

    /// Lists a page's notes, most recently modified first.
    pub async fn list_notes(&self, workbook_id: &str, page_id: &str) -> Result<Vec<Note>> {
        let notes_path = CollectionPath::notes(workbook_id, page_id);
        let order = OrderBy::desc(FIELD_LAST_MODIFIED);
        let mut notes = self
            .store
            .list(&notes_path, None, Some(&order))
            .await?
            .iter()
            .map(|record| Note::from_record(workbook_id, page_id, record))
            .collect::<Result<Vec<_>>>()?;
        // Stores are only asked to sort; the order is guaranteed here.
        sort_recent_first(&mut notes);
        Ok(notes)
    }

    /// The `limit` most recently modified notes across every workbook owned
    /// by `owner_id`.
    ///
    /// This walks the whole tree: one listing per workbook and per page.
    pub async fn recent_notes(&self, owner_id: &str, limit: usize) -> Result<Vec<Note>> {
        let mut all = Vec::new();
        for workbook in self.list_workbooks(owner_id).await? {
            for page in self.list_pages(&workbook.id).await? {
                all.extend(self.list_notes(&workbook.id, &page.id).await?);
            }
        }
        sort_recent_first(&mut all);
        all.truncate(limit);
        Ok(all)
    }

    // ── Search ────────────────────────────────────────────────────

    /// A page's notes whose title or text contains `term`, ignoring case.
    ///
    /// A blank term returns every note.
    pub async fn search_notes(
        &self,
        workbook_id: &str,
        page_id: &str,
        term: &str,
    ) -> Result<Vec<Note>> {
        let needle = term.trim().to_lowercase();
        let notes = self.list_notes(workbook_id, page_id).await?;
        Ok(notes.into_iter().filter(|n| n.matches(&needle)).collect())
    }

    /// The owner's workbooks whose name contains `term`, ignoring case.
    pub async fn search_workbooks(&self, owner_id: &str, term: &str) -> Result<Vec<Workbook>> {
        let needle = term.trim().to_lowercase();
        let workbooks = self.list_workbooks(owner_id).await?;
        Ok(workbooks
            .into_iter()
            .filter(|w| w.name.to_lowercase().contains(&needle))
            .collect())
    }

    /// Pages across all of the owner's workbooks whose name contains `term`, ignoring case.
    pub async fn search_pages(&self, owner_id: &str, term: &str) -> Result<Vec<Page>> {
        let needle = term.trim().to_lowercase();
        let mut found = Vec::new();
        for workbook in self.list_workbooks(owner_id).await? {
            found.extend(
                self.list_pages(&workbook.id)
                    .await?
                    .into_iter()
                    .filter(|p| p.name.to_lowercase().contains(&needle)),
            );
        }
        Ok(found)
    }

    async fn insert_note(
        &self,
        workbook_id: &str,
        page_id: &str,
        title: String,
        text: String,
    ) -> Result<Note> {
        let now = self.clock.now();
        let id = self
            .store
            .insert(
                &CollectionPath::notes(workbook_id, page_id),
                Note::to_fields(&title, &text, now, now),
            )
            .await?;
        debug!("created note {id} in page {page_id}");
        Ok(Note {
            id,
            workbook_id: workbook_id.to_string(),
            page_id: page_id.to_string(),
            title,
            text,
            created_at: now,
            last_modified: now,
        })
    }
}

fn require_name(kind: EntityKind, name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(NotebookError::Validation(format!(
            "{kind} name cannot be empty"
        )));
    }
    Ok(trimmed.to_string())
}

/// Cleans note HTML and rejects a note that is blank afterwards.
fn require_text(text: &str) -> Result<String> {
    let clean = sanitize_note_html(text);
    if clean.trim().is_empty() {
        return Err(NotebookError::Validation(
            "Note cannot be empty".to_string(),
        ));
    }
    Ok(clean)
}
