//! Window-level synchronization between a controlling (local) and a viewing (remote) peer.
//!
//! Uses three global store keys:
//!
//! - [`SCROLL_POS_KEY`] holds the window scroll position as `"[x,y]"`, written and applied by both roles,
//! - [`REMOTE_CLICK_KEY`] holds the id of the last node clicked by the remote peer,
//! - [`DIMENSION_KEY`] holds the local peer's window size as `{"width":…,"height":…}`.

use crate::{
	key::{decode_scroll_pos, encode_scroll_pos, NodeId, Value},
	platform::Dom,
	store::Store,
	stream::{LogValue, StreamTree},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace, warn};

pub const SCROLL_POS_KEY: &str = "SCROLLPOS";
pub const REMOTE_CLICK_KEY: &str = "REMOTECLICK";
pub const DIMENSION_KEY: &str = "DIMENSION";

/// Which side of the window synchronization this peer is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportRole {
	/// Views another peer's document. Forwards clicks, follows the window size.
	Remote,
	/// Hosts the document. Replays forwarded clicks, publishes its window size.
	Local,
}

/// Window size as published under [`DIMENSION_KEY`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
	pub width: u32,
	pub height: u32,
}

#[derive(Debug)]
pub struct ViewportSync {
	role: ViewportRole,
	enabled: bool,
	remote_dimension: Option<Dimension>,
}

impl ViewportSync {
	#[must_use]
	pub fn new(role: ViewportRole) -> Self {
		Self { role, enabled: true, remote_dimension: None }
	}

	#[must_use]
	pub fn role(&self) -> ViewportRole {
		self.role
	}

	#[must_use]
	pub fn is_enabled(&self) -> bool {
		self.enabled
	}

	/// Stops all window-level synchronization in both directions. There is no way back.
	pub fn disable_sync(&mut self) {
		debug!("Viewport synchronization disabled.");
		self.enabled = false;
	}

	/// The last window size published by the local peer, as seen by a remote one.
	#[must_use]
	pub fn remote_dimension(&self) -> Option<Dimension> {
		self.remote_dimension
	}

	/// Parses a stored scroll position. [`None`] for absent, `null` and malformed values.
	#[must_use]
	pub fn load_scroll_pos(value: Option<&Value>) -> Option<(i32, i32)> {
		let text = value?.as_text()?;
		match decode_scroll_pos(text) {
			Ok(position) => Some(position),
			Err(error) => {
				if text != "null" {
					warn!("Malformed window scroll position: {}", error);
				}
				None
			}
		}
	}

	pub(crate) fn window_scrolled<S: Store>(&self, store: &mut S, (x, y): (i32, i32)) {
		if self.enabled {
			store.set_if_changed(SCROLL_POS_KEY, encode_scroll_pos(x, y).into());
		}
	}

	pub(crate) fn window_resized<S: Store>(&self, store: &mut S, (width, height): (u32, u32)) {
		if self.enabled && self.role == ViewportRole::Local {
			let dimension = serde_json::to_string(&Dimension { width, height }).expect("infallible");
			store.set_if_changed(DIMENSION_KEY, dimension.into());
		}
	}

	pub(crate) fn clicked<S: Store>(&self, store: &mut S, target: Option<NodeId>) {
		if !self.enabled || self.role != ViewportRole::Remote {
			return;
		}
		match target {
			Some(target) => store.set_global(REMOTE_CLICK_KEY, Value::Id(target.into())),
			None => debug!("Click target is not a synchronized node. Not forwarding."),
		}
	}
}

impl<D: Dom, S: Store> StreamTree<D, S> {
	/// Applies a remote change of a global key.
	///
	/// Returns whether the key belongs to window-level synchronization.
	#[instrument(skip(self, value), fields(value = ?LogValue(value)))]
	pub(crate) fn apply_viewport_change(&mut self, name: &str, value: Option<&Value>) -> bool {
		let viewport = match &mut self.viewport {
			Some(viewport) => viewport,
			None => return false,
		};
		match name {
			SCROLL_POS_KEY => {
				if !viewport.enabled {
					return true;
				}
				if let Some((x, y)) = ViewportSync::load_scroll_pos(value) {
					if self.dom.window_scroll() != (x, y) {
						self.dom.scroll_window_to(x, y);
					}
				}
			}
			REMOTE_CLICK_KEY => {
				if !viewport.enabled || viewport.role != ViewportRole::Local {
					return true;
				}
				let target = value.and_then(Value::as_id).map(|id| NodeId(id.0));
				match target.and_then(|target| self.registry.id_to_node(target)) {
					Some(tree_node) => {
						let node = tree_node.node.clone();
						trace!("Replaying remote click.");
						self.dom.click(&node);
					}
					None => debug!("Remote click target {:?} is not materialized here.", target),
				}
			}
			DIMENSION_KEY => {
				if !viewport.enabled || viewport.role != ViewportRole::Remote {
					return true;
				}
				match value.and_then(Value::as_text).map(serde_json::from_str::<Dimension>) {
					Some(Ok(dimension)) => viewport.remote_dimension = Some(dimension),
					Some(Err(error)) => warn!("Malformed window dimension: {}", error),
					None => viewport.remote_dimension = None,
				}
			}
			_ => return false,
		}
		true
	}

	pub(crate) fn window_scrolled(&mut self) {
		if let Some(viewport) = &self.viewport {
			viewport.window_scrolled(&mut self.store, self.dom.window_scroll());
		}
	}

	pub(crate) fn window_resized(&mut self) {
		if let Some(viewport) = &self.viewport {
			viewport.window_resized(&mut self.store, self.dom.window_size());
		}
	}

	pub(crate) fn clicked(&mut self, target: &D::Node) {
		if let Some(viewport) = &self.viewport {
			let target = self.registry.node_to_id(&self.dom, target);
			viewport.clicked(&mut self.store, target);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn scroll_positions_load_leniently() {
		assert_eq!(ViewportSync::load_scroll_pos(Some(&Value::from("[3,4]"))), Some((3, 4)));
		assert_eq!(ViewportSync::load_scroll_pos(Some(&Value::from("null"))), None);
		assert_eq!(ViewportSync::load_scroll_pos(Some(&Value::from("nope"))), None);
		assert_eq!(ViewportSync::load_scroll_pos(None), None);
	}

	#[test]
	fn dimension_wire_format() {
		assert_eq!(serde_json::to_string(&Dimension { width: 800, height: 600 }).unwrap(), r#"{"width":800,"height":600}"#);
	}
}
