use coffre_model::{Entry, Field, Group, StructureItem, Visit};
use coffre_types::Timestamp;
use pretty_assertions::assert_eq;

fn named_entry(title: &str) -> Entry {
    let mut entry = Entry::new();
    entry.set_field("Title", Field::plain(title));
    entry
}

// ── Child management ──────────────────────────────────────────────

#[test]
fn add_group_links_parent() {
    let mut root = Group::new("root");
    let child = Group::new("child");
    let child_id = child.uuid;
    root.add_group(child);
    assert_eq!(root.groups[0].parent, Some(root.uuid));
    assert_eq!(root.groups[0].uuid, child_id);
}

#[test]
fn add_entry_links_parent() {
    let mut root = Group::new("root");
    root.add_entry(named_entry("a"));
    assert_eq!(root.entries[0].parent, Some(root.uuid));
}

#[test]
fn insert_group_clamps_index() {
    let mut root = Group::new("root");
    root.add_group(Group::new("a"));
    let b = Group::new("b");
    let b_id = b.uuid;
    root.insert_group(99, b);
    assert_eq!(root.groups[1].uuid, b_id);
}

#[test]
fn insert_entry_at_position() {
    let mut root = Group::new("root");
    root.add_entry(named_entry("a"));
    root.add_entry(named_entry("c"));
    let b = named_entry("b");
    root.insert_entry(1, b);
    let titles: Vec<&str> = root.entries.iter().map(Entry::title).collect();
    assert_eq!(titles, vec!["a", "b", "c"]);
}

#[test]
fn take_group_detaches() {
    let mut root = Group::new("root");
    let child = Group::new("child");
    let child_id = child.uuid;
    root.add_group(child);
    let taken = root.take_group(child_id).unwrap();
    assert_eq!(taken.parent, None);
    assert!(root.groups.is_empty());
    assert!(root.take_group(child_id).is_none());
}

#[test]
fn take_entry_detaches() {
    let mut root = Group::new("root");
    let entry = named_entry("a");
    let id = entry.uuid;
    root.add_entry(entry);
    let taken = root.take_entry(id).unwrap();
    assert_eq!(taken.parent, None);
    assert!(root.entries.is_empty());
}

#[test]
fn remove_group_recursive_reaches_deep() {
    let mut root = Group::new("root");
    let mut mid = Group::new("mid");
    let leaf = Group::new("leaf");
    let leaf_id = leaf.uuid;
    mid.add_group(leaf);
    root.add_group(mid);
    let removed = root.remove_group_recursive(leaf_id).unwrap();
    assert_eq!(removed.uuid, leaf_id);
    assert!(root.find_group(leaf_id).is_none());
}

#[test]
fn remove_entry_recursive_reaches_deep() {
    let mut root = Group::new("root");
    let mut mid = Group::new("mid");
    let entry = named_entry("deep");
    let id = entry.uuid;
    mid.add_entry(entry);
    root.add_group(mid);
    let removed = root.remove_entry_recursive(id).unwrap();
    assert_eq!(removed.uuid, id);
    assert!(root.find_entry(id).is_none());
}

// ── Lookup ────────────────────────────────────────────────────────

#[test]
fn find_group_includes_self() {
    let root = Group::new("root");
    assert_eq!(root.find_group(root.uuid).map(|g| g.uuid), Some(root.uuid));
}

#[test]
fn find_group_mut_deep() {
    let mut root = Group::new("root");
    let mut mid = Group::new("mid");
    let leaf = Group::new("leaf");
    let leaf_id = leaf.uuid;
    mid.add_group(leaf);
    root.add_group(mid);

    let found = root.find_group_mut(leaf_id).unwrap();
    found.name = "renamed".to_string();
    assert_eq!(root.groups[0].groups[0].name, "renamed");
}

#[test]
fn find_entry_mut_deep() {
    let mut root = Group::new("root");
    let mut mid = Group::new("mid");
    let entry = named_entry("old");
    let id = entry.uuid;
    mid.add_entry(entry);
    root.add_group(mid);

    let found = root.find_entry_mut(id).unwrap();
    found.set_field("Title", Field::plain("new"));
    assert_eq!(root.groups[0].entries[0].title(), "new");
}

#[test]
fn path_to_self_is_empty() {
    let root = Group::new("root");
    assert_eq!(root.path_to(root.uuid), Some(Vec::new()));
}

#[test]
fn path_to_and_descend_agree() {
    let mut root = Group::new("root");
    let mut a = Group::new("a");
    let b = Group::new("b");
    let b_id = b.uuid;
    a.add_group(b);
    root.add_group(Group::new("zero"));
    root.add_group(a);

    let path = root.path_to(b_id).unwrap();
    assert_eq!(path, vec![1, 0]);
    assert_eq!(root.descend_mut(&path).uuid, b_id);
}

#[test]
fn path_to_unknown_is_none() {
    let root = Group::new("root");
    assert_eq!(root.path_to(coffre_types::ObjectId::new()), None);
}

// ── Traversal ─────────────────────────────────────────────────────

#[test]
fn traverse_is_pre_order() {
    let mut root = Group::new("root");
    root.add_entry(named_entry("e1"));
    let mut sub = Group::new("sub");
    sub.add_entry(named_entry("e2"));
    root.add_group(sub);

    let seen = std::cell::RefCell::new(Vec::new());
    root.traverse(
        &mut |g| {
            seen.borrow_mut().push(g.name.clone());
            Visit::Continue
        },
        &mut |e| {
            seen.borrow_mut().push(e.title().to_string());
            Visit::Continue
        },
    );
    assert_eq!(seen.into_inner(), vec!["root", "e1", "sub", "e2"]);
}

#[test]
fn traverse_stops_early() {
    let mut root = Group::new("root");
    root.add_group(Group::new("a"));
    root.add_group(Group::new("b"));

    let mut visited = 0;
    let completed = root.traverse(
        &mut |_| {
            visited += 1;
            if visited == 2 {
                Visit::Stop
            } else {
                Visit::Continue
            }
        },
        &mut |_| Visit::Continue,
    );
    assert!(!completed);
    assert_eq!(visited, 2);
}

#[test]
fn group_and_entry_ids_cover_subtree() {
    let mut root = Group::new("root");
    root.add_entry(named_entry("a"));
    let mut sub = Group::new("sub");
    sub.add_entry(named_entry("b"));
    root.add_group(sub);

    assert_eq!(root.group_ids().len(), 2);
    assert_eq!(root.entry_ids().len(), 2);
    assert_eq!(root.group_ids()[0], root.uuid);
}

#[test]
fn contains_group_covers_self_and_descendants() {
    let mut root = Group::new("root");
    let child = Group::new("child");
    let child_id = child.uuid;
    root.add_group(child);
    assert!(root.contains_group(root.uuid));
    assert!(root.contains_group(child_id));
    assert!(!root.contains_group(coffre_types::ObjectId::new()));
}

// ── Properties ────────────────────────────────────────────────────

#[test]
fn assign_properties_respects_newer_flag() {
    let mut local = Group::new("old");
    local.times.last_modification = Timestamp::from_millis(200);
    let mut other = Group::new("new");
    other.times.last_modification = Timestamp::from_millis(100);

    local.assign_properties(&other, true);
    assert_eq!(local.name, "old");

    local.assign_properties(&other, false);
    assert_eq!(local.name, "new");
}

#[test]
fn clone_shell_drops_children_and_parent() {
    let mut group = Group::new("g");
    group.add_entry(named_entry("e"));
    group.add_group(Group::new("sub"));
    let mut holder = Group::new("holder");
    let id = group.uuid;
    holder.add_group(group);

    let shell = holder.groups[0].clone_shell();
    assert_eq!(shell.uuid, id);
    assert_eq!(shell.parent, None);
    assert!(shell.groups.is_empty());
    assert!(shell.entries.is_empty());
}

#[test]
fn regenerate_uuids_relinks_everything() {
    let mut root = Group::new("root");
    root.add_entry(named_entry("e"));
    let mut sub = Group::new("sub");
    sub.add_entry(named_entry("deep"));
    root.add_group(sub);
    let old_ids: Vec<_> = root.group_ids().into_iter().chain(root.entry_ids()).collect();

    root.regenerate_uuids();

    for old in old_ids {
        assert!(root.find_group(old).is_none());
        assert!(root.find_entry(old).is_none());
    }
    assert_eq!(root.entries[0].parent, Some(root.uuid));
    assert_eq!(root.groups[0].parent, Some(root.uuid));
    assert_eq!(root.groups[0].entries[0].parent, Some(root.groups[0].uuid));
}

#[test]
fn structure_item_accessors() {
    let mut group = Group::new("g");
    let at = Timestamp::from_millis(777);
    group.set_location_changed(at);
    assert_eq!(group.location_changed(), at);
    assert_eq!(group.previous_parent(), None);
    let other = coffre_types::ObjectId::new();
    group.set_previous_parent(Some(other));
    assert_eq!(group.previous_parent(), Some(other));
}
