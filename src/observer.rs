//! Projection of local mutation records and UI events into the store.

use crate::{
	error::SyncError,
	key::{encode_scroll_pos, AttributeBagId, Field, StoreKey, Value},
	patch::patch_attribute,
	platform::{Dom, MutationKind, MutationRecord, NodeKind, UiEvent},
	registry::TreeNode,
	store::Store,
	stream::StreamTree,
};
use tracing::{instrument, trace, trace_span};

/// `<input>` types whose value is synchronized.
const SYNCHRONIZED_INPUT_TYPES: &[&str] = &["text", "search"];

impl<D: Dom, S: Store> StreamTree<D, S> {
	/// Projects one batch of local mutation records into the store, in order.
	///
	/// Batches delivered while a remote change is being applied are dropped entirely.
	#[instrument(skip(self, records), fields(records = records.len()))]
	pub fn handle_mutations(&mut self, records: Vec<MutationRecord<D::Node>>) {
		if self.applying_remote {
			trace!("Dropping mutation records caused by a remote change.");
			return;
		}
		for record in records {
			self.handle_mutation(record);
		}
		self.batch_flushed();
	}

	fn handle_mutation(&mut self, record: MutationRecord<D::Node>) {
		let tree_node = match self.registry.tree_node(&self.dom, &record.target) {
			Some(tree_node) => tree_node.clone(),
			None => {
				self.report(SyncError::UnobservedMutationTarget { mutation: record.kind.name() });
				return;
			}
		};

		let span = trace_span!("Mutation", node = %tree_node.id, kind = record.kind.name());
		let _enter = span.enter();

		match record.kind {
			MutationKind::ChildList => {
				if tree_node.kind.capabilities().has_children {
					let children = self.emit_children(&tree_node.node);
					self.store.set(&StoreKey::node(tree_node.id, Field::Children), children.into());
				}
			}
			MutationKind::Attributes { name } => self.update_attribute(&tree_node, &name),
			MutationKind::CharacterData => {
				if tree_node.kind == NodeKind::Text {
					self.store.set(&StoreKey::node(tree_node.id, Field::TextContent), self.dom.text_content(&tree_node.node).into());
				} else {
					self.report(SyncError::CharacterDataOnNonTextNode { node: tree_node.id });
				}
			}
		}
	}

	fn update_attribute(&mut self, element: &TreeNode<D::Node>, name: &str) {
		let value = self.dom.attribute(&element.node, name);
		let value = match patch_attribute(self.config.base_url.as_ref(), element.id, name, value) {
			Ok(value) => value,
			Err(error) => return self.report(error),
		};
		let attribute_bag = match element.attribute_bag {
			Some(attribute_bag) => attribute_bag,
			None => self.assign_attribute_bag(element),
		};
		let key = StoreKey::attribute(attribute_bag, name);
		match value {
			Some(value) => self.store.set(&key, value.into()),
			None => self.store.delete(&key),
		}
	}

	/// Gives an element that was materialized without an attribute bag a fresh one.
	fn assign_attribute_bag(&mut self, element: &TreeNode<D::Node>) -> AttributeBagId {
		let attribute_bag = AttributeBagId(self.store.next_id().0);
		trace!("Assigning attribute bag {} to node {}.", attribute_bag, element.id);
		self.store.set(&StoreKey::node(element.id, Field::Attributes), Value::Id(attribute_bag.into()));
		self.registry.assign_attribute_bag(element.id, attribute_bag);
		attribute_bag
	}

	/// Handles one UI event collected by the [`Dom`].
	///
	/// Element-level events write the element's current state only if it differs from the store.
	pub fn handle_event(&mut self, event: UiEvent<D::Node>) {
		if self.applying_remote {
			return;
		}
		match event {
			UiEvent::Scroll(element) => {
				if let Some(id) = self.registry.node_to_id(&self.dom, &element) {
					let (left, top) = self.dom.scroll_position(&element);
					self.set_if_changed(&StoreKey::node(id, Field::ScrollPos), encode_scroll_pos(left, top).into());
				}
			}
			UiEvent::Input(input) => {
				let tree_node = match self.registry.tree_node(&self.dom, &input) {
					Some(tree_node) if tree_node.kind == NodeKind::Input => tree_node.clone(),
					_ => return,
				};
				let input_type = self.dom.input_type(&input);
				if SYNCHRONIZED_INPUT_TYPES.contains(&input_type.as_str()) {
					self.set_if_changed(&StoreKey::node(tree_node.id, Field::InputValue), self.dom.input_value(&input).into());
				} else {
					trace!(input_type = %input_type, "Ignoring input on unsynchronized input type.");
				}
			}
			UiEvent::WindowScroll => self.window_scrolled(),
			UiEvent::WindowResize => self.window_resized(),
			UiEvent::Click(target) => self.clicked(&target),
		}
	}

	fn set_if_changed(&mut self, key: &StoreKey, value: Value) {
		if self.store.field(key).as_ref() != Some(&value) {
			self.store.set(key, value);
		}
	}
}
