#![cfg(target_arch = "wasm32")]

use dom_stream::{
	memory::{MemoryHub, MemoryStore},
	web::{self, WebStream},
	Store, StoreKey, SyncConfig, Value,
};
use std::sync::Once;
use wasm_bindgen::JsCast;
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::{window, HtmlBodyElement, Node};

wasm_bindgen_test_configure!(run_in_browser);

static TRACING: Once = Once::new();

fn body() -> HtmlBodyElement {
	window().unwrap().document().unwrap().body().unwrap().dyn_into::<HtmlBodyElement>().unwrap()
}

fn stream(hub: &MemoryHub) -> WebStream<MemoryStore> {
	TRACING.call_once(tracing_wasm::set_as_global_default);
	let stream = web::connect(hub.peer(), SyncConfig::new()).unwrap();
	stream.tree().borrow_mut().set_on_store().unwrap();
	stream.tree().borrow_mut().start_stream(|| ());
	stream
}

fn body_attribute_key(stream: &WebStream<MemoryStore>, name: &str) -> StoreKey {
	let tree = stream.tree().borrow();
	let body: Node = body().into();
	let id = tree.node_id(&body).unwrap();
	StoreKey::attribute(tree.tree_node(id).unwrap().attribute_bag.unwrap(), name)
}

#[wasm_bindgen_test]
fn local_attribute_changes_are_written() {
	let hub = MemoryHub::new();
	let stream = stream(&hub);
	let key = body_attribute_key(&stream, "data-local");

	body().set_attribute("data-local", "1").unwrap();
	stream.tree().borrow_mut().pump();
	assert_eq!(stream.tree().borrow().store().field(&key), Some(Value::from("1")));

	body().remove_attribute("data-local").unwrap();
	stream.tree().borrow_mut().pump();
	assert_eq!(stream.tree().borrow().store().field(&key), None);
	stream.disconnect();
}

#[wasm_bindgen_test]
fn remote_attribute_changes_are_applied_without_echo() {
	let hub = MemoryHub::new();
	let stream = stream(&hub);
	let key = body_attribute_key(&stream, "data-remote");
	let writes = stream.tree().borrow().store().write_count();

	hub.peer().set(&key, Value::from("2"));
	let changes = stream.tree().borrow().store().take_changes();
	for change in &changes {
		stream.on_store_change(change);
	}
	assert_eq!(body().get_attribute("data-remote").as_deref(), Some("2"));
	assert_eq!(stream.tree().borrow().store().write_count(), writes);

	stream.disconnect();
	body().remove_attribute("data-remote").unwrap();
}
