//! Saving through the changeset.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::json;

use changeset_core::{Changeset, ChangesetError};

use super::helpers::{content, Record};

#[tokio::test]
async fn test_save_without_content_save_applies_and_clears() {
    let store = content(json!({ "name": "Jim" }));
    let changeset = Changeset::with_content(Arc::clone(&store));
    changeset.write("name", json!("Bob")).unwrap();

    let result = changeset.save(None).await.unwrap();

    assert_eq!(result, None);
    assert_eq!(*store.read(), json!({ "name": "Bob" }));
    assert!(changeset.is_pristine());
}

#[tokio::test]
async fn test_save_returns_content_result() {
    let record = Record::new(json!({ "name": "Jim" }));
    let saves = Arc::clone(&record.saves);
    let changeset = Changeset::with_content(Arc::new(RwLock::new(record)));
    changeset.write("name", json!("Bob")).unwrap();

    let result = changeset.save(Some(json!({ "adapter": "rest" }))).await.unwrap();

    assert_eq!(
        result,
        Some(json!({ "saved": { "name": "Bob" }, "options": { "adapter": "rest" } }))
    );
    assert_eq!(saves.load(Ordering::SeqCst), 1);
    assert!(changeset.is_pristine());
    assert_eq!(changeset.read("name"), json!("Bob"));
}

#[tokio::test]
async fn test_failed_save_keeps_pending_changes() {
    let record = Record::failing(json!({ "name": "Jim" }), "server unavailable");
    let changeset = Changeset::with_content(Arc::new(RwLock::new(record)));
    changeset.write("name", json!("Bob")).unwrap();

    let err = changeset.save(None).await.unwrap_err();

    assert_eq!(err, ChangesetError::SaveFailed("server unavailable".to_string()));
    assert!(changeset.is_dirty());
    assert_eq!(changeset.read("name"), json!("Bob"));
}

#[tokio::test]
async fn test_invalid_changeset_saves_without_applying() {
    let record = Record::new(json!({ "name": "Jim" }));
    let changeset = Changeset::with_content(Arc::new(RwLock::new(record)));
    changeset.write("name", json!("Bob")).unwrap();
    changeset.add_error("email", "required").unwrap();

    let result = changeset.save(None).await.unwrap();

    assert_eq!(
        result,
        Some(json!({ "saved": { "name": "Jim" }, "options": null }))
    );
    assert!(changeset.is_pristine());
    assert!(changeset.is_valid());
}
