#![allow(dead_code)]

use dom_stream::{
	memory::{MemoryDom, MemoryHub, MemoryStore},
	StreamTree, SyncConfig, SyncError,
};
use std::{cell::RefCell, rc::Rc};

pub type Tree = StreamTree<MemoryDom, MemoryStore>;

pub fn init_tracing() {
	let _ = tracing_subscriber::fmt().with_test_writer().with_max_level(tracing::Level::TRACE).try_init();
}

/// Connects a new peer to `hub` with an empty document.
pub fn peer(hub: &MemoryHub, config: SyncConfig) -> Tree {
	init_tracing();
	StreamTree::new(MemoryDom::new(), hub.peer(), config)
}

/// Collects the kinds of all errors `tree` reports from now on.
pub fn collect_errors(tree: &mut Tree) -> Rc<RefCell<Vec<&'static str>>> {
	let errors = Rc::new(RefCell::new(Vec::new()));
	tree.set_error_handler({
		let errors = Rc::clone(&errors);
		move |error: &SyncError| errors.borrow_mut().push(error.kind())
	});
	errors
}

/// Hands every store notification `tree` has received to it, then processes its local records and events.
pub fn deliver(tree: &mut Tree) {
	for change in tree.store().take_changes() {
		tree.on_store_change(&change);
	}
	tree.pump();
}
