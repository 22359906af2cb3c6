use coffre_model::{is_standard_field, CompareOptions, Entry, Field, HistoryPolicy};
use coffre_types::Timestamp;
use pretty_assertions::assert_eq;

fn entry_with_title(title: &str) -> Entry {
    let mut entry = Entry::new();
    entry.set_field("Title", Field::plain(title));
    entry
}

// ── Fields ────────────────────────────────────────────────────────

#[test]
fn field_accessors() {
    let mut entry = Entry::new();
    assert_eq!(entry.title(), "");
    entry.set_field("Title", Field::plain("site"));
    entry.set_field("Password", Field::protected("s3cret"));
    assert_eq!(entry.title(), "site");
    assert_eq!(entry.field_value("Password"), Some("s3cret"));
    assert_eq!(entry.field_value("Missing"), None);
}

#[test]
fn standard_field_names() {
    assert!(is_standard_field("Title"));
    assert!(is_standard_field("Password"));
    assert!(!is_standard_field("MyCustom"));
}

// ── Comparison ────────────────────────────────────────────────────

#[test]
fn equals_same_content() {
    let entry = entry_with_title("a");
    let copy = entry.clone();
    assert!(entry.equals(&copy, CompareOptions::merge()));
}

#[test]
fn equals_rejects_different_identity() {
    let a = entry_with_title("same");
    let mut b = a.clone();
    b.regenerate_uuid();
    assert!(!a.equals(&b, CompareOptions::merge()));
}

#[test]
fn equals_missing_standard_field_is_empty() {
    let mut a = Entry::new();
    a.set_field("Title", Field::plain("x"));
    a.set_field("UserName", Field::plain(""));
    let mut b = a.clone();
    b.fields.remove("UserName");
    assert!(a.equals(&b, CompareOptions::merge()));
}

#[test]
fn equals_missing_custom_field_differs() {
    let mut a = Entry::new();
    a.set_field("Custom", Field::plain(""));
    let mut b = a.clone();
    b.fields.remove("Custom");
    assert!(!a.equals(&b, CompareOptions::merge()));
}

#[test]
fn equals_ignores_protection_flag() {
    let mut a = Entry::new();
    a.set_field("Password", Field::plain("pw"));
    let mut b = a.clone();
    b.set_field("Password", Field::protected("pw"));
    assert!(a.equals(&b, CompareOptions::merge()));
}

#[test]
fn equals_detects_value_change() {
    let a = entry_with_title("one");
    let mut b = a.clone();
    b.set_field("Title", Field::plain("two"));
    assert!(!a.equals(&b, CompareOptions::merge()));
}

#[test]
fn merge_comparison_ignores_location_and_access() {
    let a = entry_with_title("x");
    let mut b = a.clone();
    b.location_changed = Timestamp::from_millis(999_999);
    b.times.last_access = Timestamp::from_millis(999_999);
    assert!(a.equals(&b, CompareOptions::merge()));
}

#[test]
fn merge_comparison_sees_modification_time() {
    let a = entry_with_title("x");
    let mut b = a.clone();
    b.times.last_modification = b.times.last_modification.plus_millis(1);
    assert!(!a.equals(&b, CompareOptions::merge()));
}

// ── History ───────────────────────────────────────────────────────

#[test]
fn snapshot_has_no_nested_history() {
    let mut entry = entry_with_title("v1");
    entry.push_history_snapshot();
    entry.set_field("Title", Field::plain("v2"));
    entry.push_history_snapshot();

    assert_eq!(entry.history.len(), 2);
    assert!(entry.history.iter().all(|h| h.history.is_empty()));
    assert_eq!(entry.history[0].title(), "v1");
}

#[test]
fn has_history_matching_finds_snapshot() {
    let mut entry = entry_with_title("v1");
    let old = entry.clone();
    entry.push_history_snapshot();
    entry.set_field("Title", Field::plain("v2"));
    entry.times.touch_modified(entry.times.last_modification.plus_millis(1));

    assert!(entry.has_history_matching(&old));
    assert!(!entry.has_history_matching(&entry.clone()));
}

#[test]
fn prune_history_caps_item_count() {
    let mut entry = entry_with_title("base");
    for i in 0..5 {
        entry.times.last_modification = Timestamp::from_millis(100 + i);
        entry.push_history_snapshot();
    }
    entry.prune_history(&HistoryPolicy {
        max_items: Some(2),
        max_size: None,
    });
    assert_eq!(entry.history.len(), 2);
    // The oldest snapshots are the ones evicted
    assert_eq!(
        entry.history[0].times.last_modification,
        Timestamp::from_millis(103)
    );
}

#[test]
fn prune_history_caps_total_size() {
    let mut entry = Entry::new();
    entry.set_field("Notes", Field::plain("x".repeat(1000)));
    for i in 0..4 {
        entry.times.last_modification = Timestamp::from_millis(100 + i);
        entry.push_history_snapshot();
    }
    entry.prune_history(&HistoryPolicy {
        max_items: None,
        max_size: Some(2500),
    });
    assert!(entry.history.len() < 4);
    let total: u64 = entry.history.iter().map(Entry::approximate_size).sum();
    assert!(total <= 2500);
}

#[test]
fn unlimited_policy_keeps_everything() {
    let mut entry = entry_with_title("base");
    for _ in 0..20 {
        entry.push_history_snapshot();
    }
    entry.prune_history(&HistoryPolicy {
        max_items: None,
        max_size: None,
    });
    assert_eq!(entry.history.len(), 20);
}

#[test]
fn approximate_size_grows_with_content() {
    let mut entry = Entry::new();
    let empty = entry.approximate_size();
    entry.set_field("Notes", Field::plain("hello"));
    entry.binaries.insert("blob".to_string(), vec![0u8; 64]);
    assert!(entry.approximate_size() > empty);
}

#[test]
fn regenerate_uuid_updates_history_identity() {
    let mut entry = entry_with_title("v1");
    entry.push_history_snapshot();
    let old = entry.uuid;
    entry.regenerate_uuid();
    assert_ne!(entry.uuid, old);
    assert_eq!(entry.history[0].uuid, entry.uuid);
}
