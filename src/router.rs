//! Routing of remote store changes to live nodes, with a queue for changes whose target doesn't exist yet.

use crate::{
	error::SyncError,
	key::{decode_scroll_pos, AttributeBagId, Field, NodeId, RecordId, StoreKey, Value},
	platform::{is_valid_name, Dom},
	registry::TreeNode,
	store::{Store, StoreChange},
	stream::{LogValue, StreamTree},
};
use tracing::{debug, instrument, trace};

/// A remote change that arrived before its target was materialized.
///
/// Buffered in arrival order and only reprocessed by [`StreamTree::flush_pending_mutation_events`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMutation {
	pub id: RecordId,
	pub field: String,
	pub value: Option<Value>,
	pub deleted: bool,
}

impl<D: Dom, S: Store> StreamTree<D, S> {
	/// Applies one store change notification to the live tree.
	///
	/// Changes this peer wrote itself are ignored, as is everything that arrives before
	/// [`StreamTree::read_from_store`] or [`StreamTree::set_on_store`].
	#[instrument(skip(self, change), fields(key = %change.key, value = ?LogValue(change.value.as_ref())))]
	pub fn on_store_change(&mut self, change: &StoreChange) {
		if change.local {
			trace!("Ignoring local change.");
			return;
		}
		if !self.syncing {
			trace!("Not bound to the store yet. Ignoring change.");
			return;
		}

		let key = match StoreKey::decode(&change.key) {
			Ok(key) => key,
			Err(error) => {
				if !self.apply_viewport_change(&change.key, change.value.as_ref()) {
					if change.key.starts_with('[') {
						self.report(error.into());
					} else {
						trace!("Ignoring unrelated global key.");
					}
				}
				return;
			}
		};

		let mutation = PendingMutation { id: key.id, field: key.field, value: change.value.clone(), deleted: change.deleted };
		self.apply_remote(|this| {
			if let Some(unresolved) = this.route(mutation) {
				trace!(pending = this.pending.len() + 1, "Target not materialized yet. Buffering change.");
				this.pending.push(unresolved);
			}
		});
	}

	/// Reprocesses all buffered changes in arrival order, then clears the buffer.
	///
	/// Changes whose target still doesn't exist are dropped rather than buffered again.
	/// Buffered `scrollPos` and `inputValue` changes take the same fast path as live ones instead of only the generic node and attribute steps.
	#[instrument(skip(self), fields(pending = self.pending.len()))]
	pub fn flush_pending_mutation_events(&mut self) {
		if self.pending.is_empty() {
			return;
		}
		let pending = core::mem::take(&mut self.pending);
		self.apply_remote(|this| {
			for mutation in pending {
				if let Some(unresolved) = this.route(mutation) {
					debug!(id = %unresolved.id, field = %unresolved.field, "Dropping change whose target still isn't materialized.");
				}
			}
		});
	}

	/// Number of buffered remote changes.
	#[must_use]
	pub fn pending_mutation_events(&self) -> usize {
		self.pending.len()
	}

	/// Applies `mutation` to its target node or attribute bag.
	///
	/// Returns it back iff neither is registered.
	fn route(&mut self, mutation: PendingMutation) -> Option<PendingMutation> {
		if let Some(tree_node) = self.registry.id_to_node(NodeId(mutation.id.0)) {
			let tree_node = tree_node.clone();
			self.apply_to_node(&tree_node, &mutation);
			return None;
		}
		let attribute_bag = AttributeBagId(mutation.id.0);
		if let Some(element) = self.registry.attribute_bag_to_element(attribute_bag) {
			let element = element.clone();
			self.apply_to_attribute(&element, &mutation);
			return None;
		}
		Some(mutation)
	}

	fn apply_to_node(&mut self, tree_node: &TreeNode<D::Node>, mutation: &PendingMutation) {
		let capabilities = tree_node.kind.capabilities();
		let text = mutation.value.as_ref().and_then(Value::as_text);
		match Field::parse(&mutation.field) {
			Field::ScrollPos if capabilities.has_children => match (mutation.deleted, text) {
				(true, _) => self.dom.set_scroll_position(&tree_node.node, 0, 0),
				(false, Some(text)) => self.apply_scroll_pos(tree_node.id, &tree_node.node, text),
				(false, None) => self.malformed(mutation, "a scroll position"),
			},
			Field::InputValue if capabilities.has_input_value => match (mutation.deleted, text) {
				(true, _) => self.dom.set_input_value(&tree_node.node, ""),
				(false, Some(text)) => self.dom.set_input_value(&tree_node.node, text),
				(false, None) => self.malformed(mutation, "text"),
			},
			Field::TextContent => match (mutation.deleted, text) {
				(true, _) => self.dom.set_text_content(&tree_node.node, ""),
				(false, Some(text)) => self.dom.set_text_content(&tree_node.node, text),
				(false, None) => self.malformed(mutation, "text"),
			},
			Field::Children if capabilities.has_children => {
				let target = if mutation.deleted {
					Vec::new()
				} else {
					match mutation.value.as_ref().and_then(Value::as_ids) {
						Some(ids) => ids.to_vec(),
						None => return self.malformed(mutation, "a list of node ids"),
					}
				};
				self.reconcile_children(&tree_node.node, &target);
			}
			Field::Attributes if tree_node.attribute_bag.is_none() && capabilities.has_attributes => match mutation.value.as_ref().and_then(Value::as_id) {
				Some(attribute_bag) if !mutation.deleted => {
					let attribute_bag = AttributeBagId(attribute_bag.0);
					trace!(%attribute_bag, "Element received its first attribute bag.");
					self.registry.assign_attribute_bag(tree_node.id, attribute_bag);
					self.apply_attribute_bag(tree_node.id, &tree_node.node, attribute_bag);
				}
				_ => debug!("Ignoring attribute bag change that doesn't name a bag."),
			},
			field if field.is_structural() => debug!(%field, "Ignoring change to a field that is only read on materialization."),
			_ => self.report(SyncError::UnknownStoreField { node: tree_node.id, field: mutation.field.clone() }),
		}
	}

	fn apply_to_attribute(&mut self, element: &TreeNode<D::Node>, mutation: &PendingMutation) {
		let name = mutation.field.as_str();
		if !is_valid_name(name) {
			return self.report(SyncError::InvalidAttributeName { element: element.id, name: name.to_owned() });
		}
		if mutation.deleted {
			if let Err(error) = self.dom.remove_attribute(&element.node, name) {
				self.report(SyncError::PlatformRejected { id: element.id.into(), operation: "removeAttribute", error });
			}
			return;
		}
		match mutation.value.as_ref().and_then(Value::as_text) {
			Some(value) => self.set_attribute(element.id, &element.node, name, value),
			None => self.malformed(mutation, "text"),
		}
	}

	pub(crate) fn apply_scroll_pos(&mut self, id: NodeId, element: &D::Node, scroll_pos: &str) {
		match decode_scroll_pos(scroll_pos) {
			Ok((left, top)) => self.dom.set_scroll_position(element, left, top),
			Err(_) => self.report(SyncError::MalformedValue { id: id.into(), field: Field::ScrollPos.as_str().to_owned(), expected: "a scroll position" }),
		}
	}

	fn malformed(&mut self, mutation: &PendingMutation, expected: &'static str) {
		self.report(SyncError::MalformedValue { id: mutation.id, field: mutation.field.clone(), expected });
	}
}
