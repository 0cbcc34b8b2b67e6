//! Emission of local platform nodes into the store.

use crate::{
	key::{encode_scroll_pos, AttributeBagId, Field, NodeId, RecordId, StoreKey, Value},
	patch::patch_attribute,
	platform::{Dom, Listen, NodeKind, XHTML_NAMESPACE},
	store::Store,
	stream::StreamTree,
};
use tracing::{trace, trace_span};

impl<D: Dom, S: Store> StreamTree<D, S> {
	/// Returns the id of `node`, first writing it and its whole subtree to the store if it isn't registered yet.
	///
	/// A node's own fields are written before any record refers to it.
	/// [`None`] for node types that aren't synchronized.
	pub(crate) fn emit(&mut self, node: &D::Node) -> Option<NodeId> {
		if let Some(id) = self.registry.node_to_id(&self.dom, node) {
			return Some(id);
		}
		let kind = match self.dom.kind(node) {
			Some(kind) => kind,
			None => {
				trace!("Skipping unsynchronized node.");
				return None;
			}
		};
		let id = NodeId(self.store.next_id().0);

		let span = trace_span!("Emitting", node = %id, ?kind);
		let _enter = span.enter();

		if kind.is_element() {
			self.emit_element(node, id, kind);
		} else {
			self.store.set(&StoreKey::node(id, Field::TextContent), self.dom.text_content(node).into());
			self.registry.register_text(&mut self.dom, node, id);
		}
		self.dom.listen(node, Listen::for_kind(kind));
		Some(id)
	}

	fn emit_element(&mut self, element: &D::Node, id: NodeId, kind: NodeKind) {
		let attribute_bag = AttributeBagId(self.store.next_id().0);

		self.store.set(&StoreKey::node(id, Field::TagName), self.dom.tag_name(element).into());
		if let Some(namespace) = self.dom.namespace_uri(element).filter(|namespace| namespace != XHTML_NAMESPACE) {
			self.store.set(&StoreKey::node(id, Field::NamespaceUri), namespace.into());
		}
		for name in self.dom.attribute_names(element) {
			let value = self.dom.attribute(element, &name);
			match patch_attribute(self.config.base_url.as_ref(), id, &name, value) {
				Ok(Some(value)) => self.store.set(&StoreKey::attribute(attribute_bag, &name), value.into()),
				Ok(None) => (),
				Err(error) => self.report(error),
			}
		}
		self.store.set(&StoreKey::node(id, Field::Attributes), Value::Id(attribute_bag.into()));

		self.registry.register_element(&mut self.dom, element, id, Some(attribute_bag), kind);

		let children = self.emit_children(element);
		self.store.set(&StoreKey::node(id, Field::Children), children.into());

		if kind == NodeKind::Input {
			let value = self.dom.input_value(element);
			if !value.is_empty() {
				self.store.set(&StoreKey::node(id, Field::InputValue), value.into());
			}
		}
		let (left, top) = self.dom.scroll_position(element);
		if (left, top) != (0, 0) {
			self.store.set(&StoreKey::node(id, Field::ScrollPos), encode_scroll_pos(left, top).into());
		}
	}

	/// Emits the synchronized children of `parent`, returning their ids in order.
	pub(crate) fn emit_children(&mut self, parent: &D::Node) -> Vec<RecordId> {
		self.dom.children(parent).iter().filter_map(|child| self.emit(child)).map(RecordId::from).collect()
	}
}
