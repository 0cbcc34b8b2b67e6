//! Child list reconciliation against a target list of node ids.
//!
//! The first pass keeps the longest run of current children whose target positions increase strictly,
//! scanning greedily from the front, and removes every other child.
//! The second pass materializes and inserts the missing ids around the kept children.
//! Removed subtrees are unregistered, so an id that was removed only to be reordered is materialized afresh.

use crate::{
	error::SyncError,
	key::{NodeId, RecordId},
	platform::Dom,
	store::Store,
	stream::StreamTree,
};
use hashbrown::HashMap;
use tracing::{trace, trace_span};

impl<D: Dom, S: Store> StreamTree<D, S> {
	/// Makes the children of `parent` match `target`, in order.
	pub(crate) fn reconcile_children(&mut self, parent: &D::Node, target: &[RecordId]) {
		let span = trace_span!("Reconciling children", target = target.len());
		let _enter = span.enter();

		// Duplicate ids resolve to their last position.
		let target_indices: HashMap<NodeId, usize> = target.iter().enumerate().map(|(index, id)| (NodeId(id.0), index)).collect();

		let mut kept = Vec::new();
		let mut last_kept_index = None;
		for child in self.dom.children(parent) {
			let index = self.registry.node_to_id(&self.dom, &child).and_then(|id| target_indices.get(&id).copied());
			match index {
				Some(index) if last_kept_index.map_or(true, |last| index > last) => {
					last_kept_index = Some(index);
					kept.push((child, index));
				}
				_ => self.remove_child(parent, &child),
			}
		}
		trace!(kept = kept.len(), "Pruned children.");

		let mut next_insert_index = 0;
		for (child, index) in &kept {
			for &id in &target[next_insert_index..*index] {
				self.insert_materialized(parent, id, Some(child));
			}
			next_insert_index = index + 1;
		}
		for &id in &target[next_insert_index..] {
			self.insert_materialized(parent, id, None);
		}
	}

	fn remove_child(&mut self, parent: &D::Node, child: &D::Node) {
		match self.dom.remove_child(parent, child) {
			Ok(()) => self.registry.unregister_subtree(&mut self.dom, child),
			Err(error) => {
				let id = self.registry.node_to_id(&self.dom, child).map_or(RecordId(0), RecordId::from);
				self.report(SyncError::PlatformRejected { id, operation: "removeChild", error });
			}
		}
	}

	fn insert_materialized(&mut self, parent: &D::Node, id: RecordId, reference: Option<&D::Node>) {
		if let Some(child) = self.materialize(NodeId(id.0)) {
			if let Err(error) = self.dom.insert_before(parent, &child, reference) {
				self.report(SyncError::PlatformRejected { id, operation: "insertBefore", error });
			}
		}
	}
}
