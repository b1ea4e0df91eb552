use pretty_assertions::assert_eq;

use super::*;

fn snapshot(keys: &[&str]) -> Snapshot {
	Snapshot::new(
		keys.iter().map(|key| (key.to_string(), ScalarValue::from(*key))).collect(),
		1,
	)
}

#[test]
fn top_level_children() {
	let snap = snapshot(&["db:doc1:a", "db:doc1:b", "db:doc2:c"]);
	assert_eq!(snap.child_keys(Vec::<String>::new(), None), vec!["db"]);
	assert_eq!(snap.child_keys(Vec::<String>::new(), Some("")), vec!["db"]);
}

#[test]
fn children_of_a_document() {
	let snap = snapshot(&["db:doc1:a", "db:doc1:b", "db:doc2:c"]);
	assert_eq!(snap.child_keys(Vec::<String>::new(), Some("db:doc1")), vec!["a", "b"]);
	assert_eq!(snap.child_keys(Vec::<String>::new(), Some("db")), vec!["doc1", "doc2"]);
}

#[test]
fn nested_children_are_deduplicated() {
	let snap = snapshot(&["db:app:logging:level", "db:app:logging:json", "db:app:name"]);
	assert_eq!(snap.child_keys(Vec::<String>::new(), Some("db:app")), vec!["logging", "name"]);
}

#[test]
fn earlier_keys_are_merged() {
	let snap = snapshot(&["db:doc1:a", "db:doc1:b"]);
	assert_eq!(snap.child_keys(["z", "a", "a"], Some("db:doc1")), vec!["a", "b", "z"]);
}

#[test]
fn prefix_must_end_on_segment_boundary() {
	let snap = snapshot(&["db:doc:a", "db:doc10:b", "db:docs:c"]);
	assert_eq!(snap.child_keys(Vec::<String>::new(), Some("db:doc")), vec!["a"]);
}

#[test]
fn unknown_parent_yields_only_earlier() {
	let snap = snapshot(&["db:doc:a"]);
	assert_eq!(snap.child_keys(["x"], Some("other")), vec!["x"]);
	assert!(snap.child_keys(Vec::<String>::new(), Some("db:doc:a")).is_empty());
}

#[test]
fn array_indices_list_numerically() {
	let keys: Vec<String> = (0..12).map(|i| format!("db:doc:hosts:{i}")).collect();
	let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
	let snap = snapshot(&refs);
	let children = snap.child_keys(Vec::<String>::new(), Some("db:doc:hosts"));
	let expected: Vec<String> = (0..12).map(|i| i.to_string()).collect();
	assert_eq!(children, expected);
}

#[test]
fn lookups_are_exact() {
	let snap = snapshot(&["db:doc:a"]);
	assert_eq!(snap.get("db:doc:a"), Some(&ScalarValue::from("db:doc:a")));
	assert_eq!(snap.get("DB:DOC:A"), None);
	assert_eq!(snap.get("db:doc"), None);
	assert!(!snap.contains_key("db"));
}

#[test]
fn section_strips_prefix() {
	let snap = snapshot(&["db:app:a", "db:app:b:c", "db:apple:x"]);
	let section: Vec<&str> = snap.section("db:app").map(|(key, _)| key).collect();
	assert_eq!(section, vec!["a", "b:c"]);
}
