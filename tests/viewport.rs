mod common;

use common::{deliver, peer};
use dom_stream::{
	memory::MemoryHub,
	viewport::{Dimension, DIMENSION_KEY, REMOTE_CLICK_KEY, SCROLL_POS_KEY},
	Dom, RecordId, Store, SyncConfig, Value, ViewportRole,
};

fn local_and_remote(hub: &MemoryHub) -> (common::Tree, common::Tree) {
	let mut local = peer(hub, SyncConfig::new().with_viewport(ViewportRole::Local));
	let dom = local.dom_mut();
	let button = dom.element("BUTTON", &[], &[]);
	let body = dom.element("BODY", &[], &[button]);
	let html = dom.element("HTML", &[], &[body]);
	dom.replace_document_element(&html).unwrap();
	let root = local.set_on_store().unwrap();
	local.start_stream(|| ());

	let mut remote = peer(hub, SyncConfig::new().with_viewport(ViewportRole::Remote));
	remote.read_from_store(root).unwrap();
	remote.start_stream(|| ());
	(local, remote)
}

fn button(tree: &common::Tree) -> dom_stream::memory::MemoryNode {
	let html = tree.dom().document_element().unwrap();
	let body = tree.dom().children(&html)[0];
	tree.dom().children(&body)[0]
}

#[test]
fn window_size_flows_from_local_to_remote() {
	let hub = MemoryHub::new();
	let (mut local, mut remote) = local_and_remote(&hub);

	local.dom_mut().user_resize_window(800, 600);
	local.pump();
	assert_eq!(local.store().global(DIMENSION_KEY), Some(Value::from(r#"{"width":800,"height":600}"#)));

	deliver(&mut remote);
	assert_eq!(remote.viewport().unwrap().remote_dimension(), Some(Dimension { width: 800, height: 600 }));

	let writes = remote.store().write_count();
	remote.dom_mut().user_resize_window(100, 100);
	remote.pump();
	assert_eq!(remote.store().write_count(), writes);
}

#[test]
fn window_scroll_is_shared_without_rewrites() {
	let hub = MemoryHub::new();
	let (mut local, mut remote) = local_and_remote(&hub);

	remote.dom_mut().user_scroll_window(0, 300);
	remote.pump();
	assert_eq!(remote.store().global(SCROLL_POS_KEY), Some(Value::from("[0,300]")));

	deliver(&mut local);
	assert_eq!(local.dom().window_scroll(), (0, 300));

	let writes = local.store().write_count();
	local.dom_mut().user_scroll_window(0, 300);
	local.pump();
	assert_eq!(local.store().write_count(), writes);
}

#[test]
fn remote_clicks_are_replayed_locally() {
	let hub = MemoryHub::new();
	let (mut local, mut remote) = local_and_remote(&hub);
	let remote_button = button(&remote);
	let id = remote.node_id(&remote_button).unwrap();

	remote.dom_mut().user_click(remote_button);
	remote.pump();
	assert_eq!(remote.store().global(REMOTE_CLICK_KEY), Some(Value::Id(RecordId::from(id))));

	deliver(&mut local);
	assert_eq!(local.dom().clicked(), [button(&local)]);
	assert!(remote.dom().clicked().is_empty());
}

#[test]
fn local_clicks_are_not_forwarded() {
	let hub = MemoryHub::new();
	let (mut local, _remote) = local_and_remote(&hub);
	let local_button = button(&local);

	local.dom_mut().user_click(local_button);
	local.pump();
	assert_eq!(local.store().global(REMOTE_CLICK_KEY), None);
}

#[test]
fn disabled_sync_stays_quiet() {
	let hub = MemoryHub::new();
	let (mut local, mut remote) = local_and_remote(&hub);
	remote.viewport_mut().unwrap().disable_sync();
	let remote_button = button(&remote);

	remote.dom_mut().user_scroll_window(0, 50);
	remote.dom_mut().user_click(remote_button);
	remote.pump();
	assert_eq!(remote.store().global(SCROLL_POS_KEY), None);
	assert_eq!(remote.store().global(REMOTE_CLICK_KEY), None);

	local.dom_mut().user_scroll_window(0, 70);
	local.pump();
	deliver(&mut remote);
	assert_eq!(remote.dom().window_scroll(), (0, 0));
}
