mod common;

use common::{deliver, peer};
use dom_stream::{memory::MemoryHub, Dom, Field, NodeId, RecordId, Store, StoreKey, SyncConfig, Value};

const A: u64 = 10;
const B: u64 = 11;
const C: u64 = 12;
const D: u64 = 13;
const E: u64 = 14;

fn ids(ids: &[u64]) -> Value {
	Value::from(ids.iter().copied().map(RecordId).collect::<Vec<_>>())
}

fn list(hub: &MemoryHub, children: &[u64]) -> common::Tree {
	hub.insert_record(RecordId(1), &[("tagName", Value::from("UL")), ("children", ids(children))]);
	for (id, text) in [(A, "A"), (B, "B"), (C, "C"), (D, "D"), (E, "E")] {
		hub.insert_record(RecordId(id), &[("textContent", Value::from(text))]);
	}
	let mut viewer = peer(hub, SyncConfig::new());
	viewer.read_from_store(NodeId(1)).unwrap();
	viewer.start_stream(|| ());
	viewer
}

fn texts(tree: &common::Tree) -> String {
	let root = tree.dom().document_element().unwrap();
	tree.dom().children(&root).iter().map(|child| tree.dom().text_content(child)).collect()
}

#[test]
fn reorder_keeps_an_increasing_run() {
	let hub = MemoryHub::new();
	let mut viewer = list(&hub, &[A, B, C, D]);
	let root = viewer.dom().document_element().unwrap();
	let before = viewer.dom().children(&root);

	hub.peer().set(&StoreKey::node(NodeId(1), Field::Children), ids(&[D, B, A, E]));
	deliver(&mut viewer);

	let after = viewer.dom().children(&root);
	assert_eq!(texts(&viewer), "DBAE");
	assert_eq!(after[2], before[0], "A survives");
	assert_ne!(after[0], before[3], "D is materialized afresh");
	assert_ne!(after[1], before[1], "B is materialized afresh");
	for removed in [before[1], before[2], before[3]] {
		assert_eq!(viewer.dom().parent(&removed), None);
		assert_eq!(viewer.node_id(&removed), None);
	}
	assert_eq!(viewer.node_from_id(NodeId(D)), Some(after[0]));
	assert_eq!(viewer.node_from_id(NodeId(C)), None);
	assert_eq!(viewer.store().write_count(), 0);
	assert_eq!(viewer.dom().pending_records(), 0);
}

#[test]
fn unchanged_lists_touch_nothing() {
	let hub = MemoryHub::new();
	let mut viewer = list(&hub, &[A, B, C]);
	let root = viewer.dom().document_element().unwrap();
	let before = viewer.dom().children(&root);

	hub.peer().set(&StoreKey::node(NodeId(1), Field::Children), ids(&[A, B, C]));
	deliver(&mut viewer);
	assert_eq!(viewer.dom().children(&root), before);
}

#[test]
fn inserts_land_between_kept_children() {
	let hub = MemoryHub::new();
	let mut viewer = list(&hub, &[A, C]);
	let root = viewer.dom().document_element().unwrap();
	let before = viewer.dom().children(&root);

	hub.peer().set(&StoreKey::node(NodeId(1), Field::Children), ids(&[E, A, B, C, D]));
	deliver(&mut viewer);
	let after = viewer.dom().children(&root);
	assert_eq!(texts(&viewer), "EABCD");
	assert_eq!((after[1], after[3]), (before[0], before[1]));
}

#[test]
fn unsynchronized_children_are_removed() {
	let hub = MemoryHub::new();
	let mut viewer = list(&hub, &[A]);
	let root = viewer.dom().document_element().unwrap();
	viewer.disconnect_stream();
	let comment = viewer.dom_mut().create_comment("local only");
	viewer.dom_mut().insert_before(&root, &comment, None).unwrap();

	hub.peer().set(&StoreKey::node(NodeId(1), Field::Children), ids(&[A, B]));
	deliver(&mut viewer);
	assert_eq!(texts(&viewer), "AB");
	assert_eq!(viewer.dom().parent(&comment), None);
}

#[test]
fn emptying_unregisters_subtrees() {
	let hub = MemoryHub::new();
	let mut viewer = list(&hub, &[A, B]);
	assert_eq!(viewer.registry().len(), 3);

	hub.peer().set(&StoreKey::node(NodeId(1), Field::Children), ids(&[]));
	deliver(&mut viewer);
	assert_eq!(texts(&viewer), "");
	assert_eq!(viewer.registry().len(), 1);
}
