//! Bookkeeping between node ids, attribute bag ids and live platform nodes.

use crate::{
	key::{AttributeBagId, NodeId},
	platform::{Dom, NodeKind},
};
use hashbrown::HashMap;
use tracing::{trace, warn};

/// The engine's view of one live platform node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode<N> {
	pub id: NodeId,
	/// Always [`None`] for text nodes.
	pub attribute_bag: Option<AttributeBagId>,
	pub kind: NodeKind,
	/// Non-owning in spirit: the platform tree decides this node's lifetime.
	pub node: N,
}

/// Canonical `nodeId → TreeNode` map plus the secondary indices.
///
/// The `platform node → nodeId` direction is stored on the platform nodes themselves via [`Dom::set_tag`],
/// so that it never keeps a node alive. A tag whose id no longer maps back to the same node is stale and reads as absent.
#[derive(Debug)]
pub struct NodeRegistry<N> {
	nodes: HashMap<NodeId, TreeNode<N>>,
	attribute_bags: HashMap<AttributeBagId, NodeId>,
}

impl<N> Default for NodeRegistry<N> {
	fn default() -> Self {
		Self { nodes: HashMap::new(), attribute_bags: HashMap::new() }
	}
}

impl<N: Clone + PartialEq> NodeRegistry<N> {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// `attribute_bag` is [`None`] only for elements whose record lacks one.
	pub fn register_element<D: Dom<Node = N>>(&mut self, dom: &mut D, node: &N, id: NodeId, attribute_bag: Option<AttributeBagId>, kind: NodeKind) {
		debug_assert!(kind.is_element());
		if let Some(attribute_bag) = attribute_bag {
			self.attribute_bags.insert(attribute_bag, id);
		}
		self.insert(dom, TreeNode { id, attribute_bag, kind, node: node.clone() });
	}

	/// Associates a freshly allocated attribute bag with a registered element that had none.
	pub fn assign_attribute_bag(&mut self, id: NodeId, attribute_bag: AttributeBagId) {
		if let Some(tree_node) = self.nodes.get_mut(&id) {
			tree_node.attribute_bag = Some(attribute_bag);
			self.attribute_bags.insert(attribute_bag, id);
		}
	}

	pub fn register_text<D: Dom<Node = N>>(&mut self, dom: &mut D, node: &N, id: NodeId) {
		self.insert(dom, TreeNode { id, attribute_bag: None, kind: NodeKind::Text, node: node.clone() });
	}

	fn insert<D: Dom<Node = N>>(&mut self, dom: &mut D, tree_node: TreeNode<N>) {
		dom.set_tag(&tree_node.node, Some(tree_node.id));
		if let Some(previous) = self.nodes.insert(tree_node.id, tree_node) {
			warn!("Node {} was registered twice. The previous platform node is forgotten.", previous.id);
			if let Some(current) = self.nodes.get(&previous.id) {
				if current.node != previous.node {
					dom.set_tag(&previous.node, None);
				}
			}
		}
	}

	#[must_use]
	pub fn id_to_node(&self, id: NodeId) -> Option<&TreeNode<N>> {
		self.nodes.get(&id)
	}

	/// [`None`] for nodes that were never registered or have since been unregistered.
	#[must_use]
	pub fn node_to_id<D: Dom<Node = N>>(&self, dom: &D, node: &N) -> Option<NodeId> {
		let id = dom.tag(node)?;
		match self.nodes.get(&id) {
			Some(tree_node) if tree_node.node == *node => Some(id),
			_ => {
				trace!("Ignoring stale tag {} on platform node.", id);
				None
			}
		}
	}

	#[must_use]
	pub fn tree_node<D: Dom<Node = N>>(&self, dom: &D, node: &N) -> Option<&TreeNode<N>> {
		self.node_to_id(dom, node).and_then(|id| self.nodes.get(&id))
	}

	#[must_use]
	pub fn attribute_bag_to_element(&self, attribute_bag: AttributeBagId) -> Option<&TreeNode<N>> {
		self.attribute_bags.get(&attribute_bag).and_then(|id| self.nodes.get(id))
	}

	/// Forgets `node` and all of its registered descendants, which have been detached from the tree.
	pub fn unregister_subtree<D: Dom<Node = N>>(&mut self, dom: &mut D, node: &N) {
		let mut stack = vec![node.clone()];
		while let Some(node) = stack.pop() {
			if let Some(id) = self.node_to_id(dom, &node) {
				if let Some(tree_node) = self.nodes.remove(&id) {
					if let Some(attribute_bag) = tree_node.attribute_bag {
						self.attribute_bags.remove(&attribute_bag);
					}
					trace!("Unregistered node {}.", id);
				}
				dom.set_tag(&node, None);
			}
			stack.extend(dom.children(&node));
		}
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::memory::MemoryDom;

	#[test]
	fn lookups_in_both_directions() {
		let mut dom = MemoryDom::new();
		let div = dom.create_element(None, "DIV").unwrap();
		let text = dom.create_text("hi");

		let mut registry = NodeRegistry::new();
		registry.register_element(&mut dom, &div, NodeId(1), Some(AttributeBagId(2)), NodeKind::Element);
		registry.register_text(&mut dom, &text, NodeId(3));

		assert_eq!(registry.node_to_id(&dom, &div), Some(NodeId(1)));
		assert_eq!(registry.node_to_id(&dom, &text), Some(NodeId(3)));
		assert_eq!(registry.id_to_node(NodeId(3)).map(|n| n.node), Some(text));
		assert_eq!(registry.attribute_bag_to_element(AttributeBagId(2)).map(|n| n.id), Some(NodeId(1)));
	}

	#[test]
	fn id_namespaces_are_disjoint() {
		let mut dom = MemoryDom::new();
		let div = dom.create_element(None, "DIV").unwrap();

		let mut registry = NodeRegistry::new();
		registry.register_element(&mut dom, &div, NodeId(1), Some(AttributeBagId(2)), NodeKind::Element);

		assert!(registry.id_to_node(NodeId(2)).is_none());
		assert!(registry.attribute_bag_to_element(AttributeBagId(1)).is_none());
	}

	#[test]
	fn unregistered_subtrees_read_as_absent() {
		let mut dom = MemoryDom::new();
		let div = dom.create_element(None, "DIV").unwrap();
		let text = dom.create_text("hi");
		dom.insert_before(&div, &text, None).unwrap();

		let mut registry = NodeRegistry::new();
		registry.register_element(&mut dom, &div, NodeId(1), Some(AttributeBagId(2)), NodeKind::Element);
		registry.register_text(&mut dom, &text, NodeId(3));
		registry.unregister_subtree(&mut dom, &div);

		assert!(registry.is_empty());
		assert_eq!(registry.node_to_id(&dom, &div), None);
		assert_eq!(registry.node_to_id(&dom, &text), None);
		assert!(registry.attribute_bag_to_element(AttributeBagId(2)).is_none());
	}

	#[test]
	fn stale_tags_are_ignored() {
		let mut dom = MemoryDom::new();
		let old = dom.create_text("old");
		let new = dom.create_text("new");

		let mut registry = NodeRegistry::new();
		registry.register_text(&mut dom, &old, NodeId(1));
		dom.set_tag(&old, Some(NodeId(1)));
		registry.register_text(&mut dom, &new, NodeId(1));
		dom.set_tag(&old, Some(NodeId(1)));

		assert_eq!(registry.node_to_id(&dom, &old), None);
		assert_eq!(registry.node_to_id(&dom, &new), Some(NodeId(1)));
	}
}
