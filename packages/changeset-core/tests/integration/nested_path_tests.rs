//! Nested path writes, relays and execute into nested content.

use std::sync::Arc;

use ntest::timeout;
use serde_json::{json, Value};

use changeset_core::validation::Validation;
use changeset_core::{Changeset, ChangesetError, Validator};

use super::helpers::{changeset_with, content};

fn usa() -> Value {
    json!({ "org": { "usa": { "ca": null, "ny": null, "ma": { "name": null } } } })
}

#[timeout(1000)]
#[test]
fn test_nested_writes_execute_into_content() {
    let store = content(usa());
    let changeset = Changeset::with_content(Arc::clone(&store));

    changeset.write("org.usa.ca", json!("ca")).unwrap();
    changeset.write("org.usa.ny", json!("")).unwrap();
    changeset
        .write("org.usa.ma", json!({ "name": "Massachusetts" }))
        .unwrap();
    changeset.execute();

    assert_eq!(
        *store.read(),
        json!({ "org": { "usa": { "ca": "ca", "ny": "", "ma": { "name": "Massachusetts" } } } })
    );
}

#[timeout(1000)]
#[test]
fn test_nested_changes_are_stored_nested() {
    let changeset = Changeset::with_content(content(usa()));
    changeset.write("org.usa.ca", json!("ca")).unwrap();

    assert_eq!(
        Value::Object(changeset.change()),
        json!({ "org": { "usa": { "ca": "ca" } } })
    );
    let listed = changeset.changes();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].key, "org");
}

#[timeout(1000)]
#[test]
fn test_reading_parent_keeps_unchanged_siblings() {
    let changeset = Changeset::with_content(content(usa()));
    changeset.write("org.usa.ca", json!("ca")).unwrap();

    assert!(changeset.get("org.usa").is_relay());
    assert_eq!(
        changeset.read("org.usa"),
        json!({ "ca": "ca", "ny": null, "ma": { "name": null } })
    );
    // Content is untouched until execute
    assert_eq!(changeset.content().read().pointer("/org/usa/ca"), Some(&Value::Null));
}

#[timeout(1000)]
#[test]
fn test_setting_nested_value_back_prunes_buffer() {
    let changeset = Changeset::with_content(content(usa()));
    changeset.write("org.usa.ca", json!("ca")).unwrap();
    changeset.write("org.usa.ca", Value::Null).unwrap();

    assert!(changeset.is_pristine());
    assert!(changeset.change().is_empty());
}

#[timeout(1000)]
#[test]
fn test_nested_error_is_exact_path() {
    let validator = Validator::new(|args| {
        if args.key == "org.usa.ny" && args.new_value == &json!("") {
            "required".into()
        } else {
            true.into()
        }
    });
    let changeset = changeset_with(usa(), validator);
    let relay = changeset.get("org.usa").as_relay().cloned().unwrap();

    relay.write("ny", json!("")).unwrap();
    relay.write("ca", json!("ca")).unwrap();

    assert!(changeset.is_invalid());
    assert!(!relay.is_valid());
    assert_eq!(
        changeset.error().keys().collect::<Vec<_>>(),
        vec!["org.usa.ny"]
    );
    assert_eq!(
        changeset.error()["org.usa.ny"].validation,
        Validation::Message("required".to_string())
    );
    assert_eq!(relay.read("ny"), json!(""));
    assert_eq!(
        relay.value(),
        json!({ "ca": "ca", "ny": "", "ma": { "name": null } })
    );
}

#[timeout(1000)]
#[test]
fn test_relay_nested_in_relay() {
    let changeset = Changeset::with_content(content(usa()));
    let org = changeset.get("org").as_relay().cloned().unwrap();
    let usa = org.get("usa").as_relay().cloned().unwrap();
    assert_eq!(usa.key(), "org.usa");

    let ma = usa.get("ma").as_relay().cloned().unwrap();
    ma.write("name", json!("Massachusetts")).unwrap();

    assert_eq!(changeset.read("org.usa.ma.name"), json!("Massachusetts"));
    assert_eq!(
        Value::Object(org.changes()),
        json!({ "usa": { "ma": { "name": "Massachusetts" } } })
    );
}

#[timeout(1000)]
#[test]
fn test_deep_delete_is_unsupported() {
    let changeset = Changeset::with_content(content(json!({ "a": { "b": { "c": { "d": 1 } } } })));
    changeset.write("a.b.c.d", json!(2)).unwrap();
    assert_eq!(changeset.read("a.b.c.d"), json!(2));

    let err = changeset.write("a.b.c.d", json!(1)).unwrap_err();
    assert_eq!(err, ChangesetError::UnsupportedNestingDepth { depth: 4 });
}

#[timeout(1000)]
#[test]
fn test_written_mapping_reads_back_as_written() {
    let store = content(json!({ "profile": { "a": 0, "b": 2 } }));
    let changeset = Changeset::with_content(Arc::clone(&store));

    changeset.write("profile", json!({ "a": 1 })).unwrap();
    assert!(!changeset.get("profile").is_relay());
    assert_eq!(changeset.read("profile"), json!({ "a": 1 }));
    assert_eq!(changeset.read("profile.a"), json!(1));
    assert_eq!(changeset.read("profile.b"), Value::Null);

    changeset.execute();
    assert_eq!(*store.read(), json!({ "profile": { "a": 1 } }));
}

#[timeout(1000)]
#[test]
fn test_empty_mapping_write_round_trips() {
    let store = content(json!({ "profile": { "a": 0 } }));
    let changeset = Changeset::with_content(Arc::clone(&store));

    changeset.write("profile", json!({})).unwrap();
    assert!(changeset.is_dirty());
    assert_eq!(changeset.read("profile"), json!({}));

    changeset.execute();
    assert_eq!(*store.read(), json!({ "profile": {} }));
    assert_eq!(changeset.read("profile"), json!({}));
}

#[timeout(1000)]
#[test]
fn test_write_inside_written_mapping_edits_it() {
    let store = content(json!({ "profile": { "a": 0, "b": 2 } }));
    let changeset = Changeset::with_content(Arc::clone(&store));

    changeset.write("profile", json!({ "a": 1 })).unwrap();
    changeset.write("profile.c", json!(3)).unwrap();
    assert_eq!(changeset.read("profile"), json!({ "a": 1, "c": 3 }));

    changeset.execute();
    assert_eq!(*store.read(), json!({ "profile": { "a": 1, "c": 3 } }));
}

#[timeout(1000)]
#[test]
fn test_stale_relay_sees_written_mapping() {
    let changeset = Changeset::with_content(content(json!({ "profile": { "a": 0, "b": 2 } })));
    let relay = changeset.get("profile").as_relay().cloned().unwrap();

    changeset.write("profile", json!({ "a": 1 })).unwrap();
    assert_eq!(relay.value(), json!({ "a": 1 }));
    assert_eq!(relay.read("b"), Value::Null);
}

