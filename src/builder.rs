//! Materialization of store records into live platform nodes.

use crate::{
	error::{DomError, SyncError},
	key::{AttributeBagId, Field, NodeId, RecordId},
	platform::{Dom, Listen, NodeKind, XLINK_NAMESPACE},
	store::{Record, Store},
	stream::StreamTree,
};
use tracing::{trace, trace_span};

impl<D: Dom, S: Store> StreamTree<D, S> {
	/// Returns the live node for `id`, building and registering its whole subtree from the store if necessary.
	///
	/// Idempotent: an already registered id returns the same node without touching the store or the tree.
	/// Records without `tagName` become text nodes.
	pub(crate) fn materialize(&mut self, id: NodeId) -> Option<D::Node> {
		if let Some(tree_node) = self.registry.id_to_node(id) {
			return Some(tree_node.node.clone());
		}
		if !self.materializing.insert(id) {
			self.report(SyncError::MalformedValue { id: id.into(), field: Field::Children.as_str().to_owned(), expected: "an acyclic child list" });
			return None;
		}

		let span = trace_span!("Materializing", node = %id);
		let _enter = span.enter();

		let node = match self.store.record(id.into()) {
			None => {
				self.report(SyncError::MissingStoreRecord { id: id.into() });
				None
			}
			Some(record) => match record.tag_name() {
				Some(tag_name) => {
					let tag_name = tag_name.to_owned();
					self.materialize_element(id, &tag_name, &record)
				}
				None => Some(self.materialize_text(id, &record)),
			},
		};
		self.materializing.remove(&id);
		node
	}

	fn materialize_element(&mut self, id: NodeId, tag_name: &str, record: &Record) -> Option<D::Node> {
		let element = match self.dom.create_element(record.namespace_uri(), tag_name) {
			Ok(element) => element,
			Err(error) => {
				self.report(SyncError::PlatformRejected { id: id.into(), operation: "createElement", error });
				return None;
			}
		};

		let attribute_bag = record.attributes();
		match attribute_bag {
			Some(attribute_bag) => self.apply_attribute_bag(id, &element, attribute_bag),
			None => trace!("Element record has no attribute bag."),
		}

		let children = record.children().map(<[RecordId]>::to_vec).unwrap_or_default();
		for child in children {
			if let Some(child_node) = self.materialize(NodeId(child.0)) {
				if let Err(error) = self.dom.insert_before(&element, &child_node, None) {
					self.report(SyncError::PlatformRejected { id: child, operation: "appendChild", error });
				}
			}
		}

		let kind = self.dom.kind(&element).unwrap_or_else(|| NodeKind::of_element(tag_name));
		if kind == NodeKind::Input {
			if let Some(value) = record.input_value() {
				self.dom.set_input_value(&element, value);
			}
		}
		if let Some(scroll_pos) = record.scroll_pos() {
			self.apply_scroll_pos(id, &element, scroll_pos);
		}

		self.registry.register_element(&mut self.dom, &element, id, attribute_bag, kind);
		self.dom.listen(&element, Listen::for_kind(kind));
		Some(element)
	}

	fn materialize_text(&mut self, id: NodeId, record: &Record) -> D::Node {
		let text = self.dom.create_text(record.text_content().unwrap_or_default());
		self.registry.register_text(&mut self.dom, &text, id);
		text
	}

	/// Sets every attribute currently stored in `attribute_bag` on `element`.
	pub(crate) fn apply_attribute_bag(&mut self, id: NodeId, element: &D::Node, attribute_bag: AttributeBagId) {
		if let Some(attributes) = self.store.record(attribute_bag.into()) {
			for (name, value) in attributes.iter() {
				match value.as_text() {
					Some(value) => self.set_attribute(id, element, name, value),
					None => self.report(SyncError::MalformedValue { id: attribute_bag.into(), field: name.to_owned(), expected: "text" }),
				}
			}
		}
	}

	/// Sets one attribute received from the store, restoring the XLink namespace of `xlink:href`.
	pub(crate) fn set_attribute(&mut self, id: NodeId, element: &D::Node, name: &str, value: &str) {
		let result = if name == "xlink:href" {
			self.dom.set_attribute_ns(element, XLINK_NAMESPACE, name, value)
		} else {
			self.dom.set_attribute(element, name, value)
		};
		match result {
			Ok(()) => (),
			Err(DomError::InvalidCharacter(_)) => self.report(SyncError::InvalidAttributeName { element: id, name: name.to_owned() }),
			Err(error) => self.report(SyncError::PlatformRejected { id: id.into(), operation: "setAttribute", error }),
		}
	}
}
