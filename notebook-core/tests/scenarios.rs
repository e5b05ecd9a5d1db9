use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use notebook_core::{
    CollectionPath, DocumentStore, HierarchyStore, ManualClock, MemoryStore, NotebookError,
    SqliteStore, DEFAULT_RECENT_LIMIT,
};
use tempfile::NamedTempFile;

fn manual_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap(),
    ))
}

#[tokio::test]
async fn test_create_edit_and_list_a_note() {
    let clock = manual_clock();
    let hierarchy = HierarchyStore::with_clock(Arc::new(MemoryStore::new()), clock.clone());

    let wb = hierarchy.create_workbook("u1", "Personal").await.unwrap();
    let page = hierarchy.create_page(&wb.id, "Ideas").await.unwrap();
    let note = hierarchy
        .create_note(&wb.id, &page.id, "A", "hello")
        .await
        .unwrap();
    assert_eq!(note.created_at, note.last_modified);

    clock.advance(Duration::milliseconds(250));
    let edited = hierarchy
        .update_note(&wb.id, &page.id, &note.id, "A", "hello world")
        .await
        .unwrap();
    assert!(edited.last_modified > note.last_modified);
    assert_eq!(edited.created_at, note.created_at);

    let notes = hierarchy.list_notes(&wb.id, &page.id).await.unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].text, "hello world");
    assert_eq!(notes[0], edited);
}

#[tokio::test]
async fn test_workbook_cascade_leaves_no_orphans() {
    let store = Arc::new(MemoryStore::new());
    let hierarchy = HierarchyStore::new(store.clone());

    let wb = hierarchy.create_workbook("u1", "Personal").await.unwrap();
    let other = hierarchy.create_workbook("u1", "Work").await.unwrap();
    let survivor_page = hierarchy.create_page(&other.id, "Keep").await.unwrap();
    hierarchy
        .create_note(&other.id, &survivor_page.id, "keep", "me")
        .await
        .unwrap();

    let mut pages = Vec::new();
    for name in ["One", "Two"] {
        let page = hierarchy.create_page(&wb.id, name).await.unwrap();
        for i in 0..2 {
            hierarchy
                .create_note(&wb.id, &page.id, "n", &format!("{name} {i}"))
                .await
                .unwrap();
        }
        pages.push(page);
    }

    let result = hierarchy.delete_workbook(&wb.id).await.unwrap();
    assert_eq!(result.deleted_count, 7);
    assert_eq!(result.affected_ids.last(), Some(&wb.id));

    assert!(hierarchy.list_pages(&wb.id).await.unwrap().is_empty());
    for page in &pages {
        let notes = hierarchy.list_notes(&wb.id, &page.id).await.unwrap();
        assert!(notes.is_empty());
    }
    assert!(matches!(
        hierarchy.get_workbook(&wb.id).await,
        Err(NotebookError::NotFound { .. })
    ));

    // Only the other workbook, its page and its note remain.
    assert_eq!(store.record_count().await, 3);
    assert_eq!(hierarchy.list_workbooks("u1").await.unwrap(), vec![other]);
}

#[tokio::test]
async fn test_interrupted_workbook_cascade_can_be_retried() {
    let store = Arc::new(MemoryStore::new());
    let hierarchy = HierarchyStore::new(store.clone());

    let wb = hierarchy.create_workbook("u1", "Personal").await.unwrap();
    for name in ["One", "Two"] {
        let page = hierarchy.create_page(&wb.id, name).await.unwrap();
        for i in 0..2 {
            hierarchy
                .create_note(&wb.id, &page.id, "n", &format!("{name} {i}"))
                .await
                .unwrap();
        }
    }

    // The first page's notes and the page itself go; the second page's first note fails.
    store.fail_deletes_after(3).await;
    let err = hierarchy.delete_workbook(&wb.id).await.unwrap_err();
    match &err {
        NotebookError::CascadeInterrupted {
            completed, total, ..
        } => {
            assert_eq!(*completed, 3);
            assert_eq!(*total, 7);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.is_retryable());

    // What is left is still a well-formed subtree.
    assert!(hierarchy.get_workbook(&wb.id).await.is_ok());
    let remaining = hierarchy.list_pages(&wb.id).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].name, "Two");

    store.clear_faults().await;
    hierarchy.delete_workbook(&wb.id).await.unwrap();
    assert_eq!(store.record_count().await, 0);
}

#[tokio::test]
async fn test_duplicate_note() {
    let clock = manual_clock();
    let hierarchy = HierarchyStore::with_clock(Arc::new(MemoryStore::new()), clock.clone());
    let wb = hierarchy.create_workbook("u1", "Personal").await.unwrap();
    let page = hierarchy.create_page(&wb.id, "Ideas").await.unwrap();
    let original = hierarchy
        .create_note(&wb.id, &page.id, "X", "y")
        .await
        .unwrap();

    clock.advance(Duration::seconds(3));
    let copy = hierarchy
        .duplicate_note(&wb.id, &page.id, &original.id)
        .await
        .unwrap();

    assert_ne!(copy.id, original.id);
    assert_eq!(copy.title, "X (Copy)");
    assert_eq!(copy.text, "y");
    assert!(copy.created_at > original.created_at);
    assert_eq!(copy.created_at, copy.last_modified);
    assert_eq!(
        hierarchy
            .get_note(&wb.id, &page.id, &original.id)
            .await
            .unwrap(),
        original
    );

    assert!(matches!(
        hierarchy.duplicate_note(&wb.id, &page.id, "ghost").await,
        Err(NotebookError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_recent_notes_spans_workbooks_and_respects_limit() {
    let clock = manual_clock();
    let hierarchy = HierarchyStore::with_clock(Arc::new(MemoryStore::new()), clock.clone());

    let stranger = hierarchy.create_workbook("u2", "Not mine").await.unwrap();
    let stranger_page = hierarchy.create_page(&stranger.id, "P").await.unwrap();

    let mut expected = Vec::new();
    for wb_name in ["A", "B"] {
        let wb = hierarchy.create_workbook("u1", wb_name).await.unwrap();
        for page_name in ["x", "y"] {
            let page = hierarchy.create_page(&wb.id, page_name).await.unwrap();
            for i in 0..2 {
                clock.advance(Duration::seconds(1));
                let note = hierarchy
                    .create_note(&wb.id, &page.id, &format!("{wb_name}{page_name}{i}"), "t")
                    .await
                    .unwrap();
                expected.push(note.id);
            }
        }
    }
    // Newest overall, but owned by someone else.
    clock.advance(Duration::seconds(1));
    hierarchy
        .create_note(&stranger.id, &stranger_page.id, "theirs", "t")
        .await
        .unwrap();

    let recent = hierarchy
        .recent_notes("u1", DEFAULT_RECENT_LIMIT)
        .await
        .unwrap();
    let ids: Vec<String> = recent.iter().map(|n| n.id.clone()).collect();
    expected.reverse();
    expected.truncate(DEFAULT_RECENT_LIMIT);
    assert_eq!(ids, expected);
    assert!(recent
        .windows(2)
        .all(|pair| pair[0].last_modified >= pair[1].last_modified));

    assert_eq!(hierarchy.recent_notes("u1", 100).await.unwrap().len(), 8);
    let none = hierarchy.recent_notes("nobody", 5).await.unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_hierarchy_over_sqlite_survives_reopen() {
    let temp = NamedTempFile::new().unwrap();
    let (wb_id, page_id) = {
        let hierarchy = HierarchyStore::new(Arc::new(SqliteStore::create(temp.path()).unwrap()));
        let wb = hierarchy.create_workbook("u1", "Personal").await.unwrap();
        let page = hierarchy.create_page(&wb.id, "Ideas").await.unwrap();
        hierarchy
            .create_note(&wb.id, &page.id, "A", "<p>hello</p>")
            .await
            .unwrap();
        (wb.id, page.id)
    };

    let store = Arc::new(SqliteStore::open(temp.path()).unwrap());
    let hierarchy = HierarchyStore::new(store.clone());
    let notes = hierarchy.list_notes(&wb_id, &page_id).await.unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].text, "<p>hello</p>");

    hierarchy.delete_workbook(&wb_id).await.unwrap();
    assert!(store
        .list(&CollectionPath::notes(&wb_id, &page_id), None, None)
        .await
        .unwrap()
        .is_empty());
    assert!(hierarchy.list_workbooks("u1").await.unwrap().is_empty());
}
