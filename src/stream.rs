use crate::{
	config::SyncConfig,
	error::SyncError,
	key::{NodeId, Value},
	platform::Dom,
	registry::{NodeRegistry, TreeNode},
	router::PendingMutation,
	store::Store,
	viewport::ViewportSync,
};
use core::fmt::{self, Debug, Formatter};
use hashbrown::HashSet;
use tracing::{debug, error, instrument, trace, warn};

/// Keeps one live [`Dom`] and one replicated [`Store`] synchronized in both directions.
///
/// The two directions are driven by the host:
///
/// - local mutations and UI events are collected by the [`Dom`] and processed by [`StreamTree::pump`]
///   (or [`StreamTree::handle_mutations`] and [`StreamTree::handle_event`] directly),
/// - store notifications are passed to [`StreamTree::on_store_change`].
///
/// Each call runs to completion. Everything applied on behalf of a remote change is hidden from
/// local observation, so no remote change is ever echoed back into the store.
///
/// # Correct Use
///
/// Bind the store either by building the document from it ([`StreamTree::read_from_store`])
/// or by writing an existing document into it ([`StreamTree::set_on_store`]),
/// then call [`StreamTree::start_stream`] to begin projecting local edits.
pub struct StreamTree<D: Dom, S: Store> {
	pub(crate) dom: D,
	pub(crate) store: S,
	pub(crate) config: SyncConfig,
	pub(crate) registry: NodeRegistry<D::Node>,
	pub(crate) pending: Vec<PendingMutation>,
	/// Ids whose materialization is in progress, to break cycles in child lists.
	pub(crate) materializing: HashSet<NodeId>,
	pub(crate) viewport: Option<ViewportSync>,
	/// Set for exactly the duration of a remote apply.
	pub(crate) applying_remote: bool,
	streaming: bool,
	pub(crate) syncing: bool,
	on_batch_flushed: Option<Box<dyn FnMut()>>,
	on_error: Option<Box<dyn FnMut(&SyncError)>>,
}

impl<D: Dom + Debug, S: Store + Debug> Debug for StreamTree<D, S> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("StreamTree")
			.field("dom", &self.dom)
			.field("store", &self.store)
			.field("registered", &self.registry.len())
			.field("pending", &self.pending.len())
			.field("applying_remote", &self.applying_remote)
			.field("streaming", &self.streaming)
			.field("syncing", &self.syncing)
			.finish()
	}
}

/// Shows a store value only with the `dangerous-logging` feature.
pub(crate) struct LogValue<'a>(pub Option<&'a Value>);

impl Debug for LogValue<'_> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self.0 {
			None => f.write_str("<deleted>"),
			Some(value) if cfg!(feature = "dangerous-logging") => value.fmt(f),
			Some(value) => write!(f, "<{}>", value.kind()),
		}
	}
}

impl<D: Dom, S: Store> StreamTree<D, S> {
	#[must_use]
	pub fn new(dom: D, store: S, config: SyncConfig) -> Self {
		Self {
			viewport: config.viewport.map(ViewportSync::new),
			dom,
			store,
			config,
			registry: NodeRegistry::new(),
			pending: Vec::new(),
			materializing: HashSet::new(),
			applying_remote: false,
			streaming: false,
			syncing: false,
			on_batch_flushed: None,
			on_error: None,
		}
	}

	#[must_use]
	pub fn dom(&self) -> &D {
		&self.dom
	}

	/// Local edits made through this reference are picked up by the next [`StreamTree::pump`].
	pub fn dom_mut(&mut self) -> &mut D {
		&mut self.dom
	}

	#[must_use]
	pub fn store(&self) -> &S {
		&self.store
	}

	pub fn store_mut(&mut self) -> &mut S {
		&mut self.store
	}

	#[must_use]
	pub fn config(&self) -> &SyncConfig {
		&self.config
	}

	#[must_use]
	pub fn registry(&self) -> &NodeRegistry<D::Node> {
		&self.registry
	}

	#[must_use]
	pub fn viewport(&self) -> Option<&ViewportSync> {
		self.viewport.as_ref()
	}

	pub fn viewport_mut(&mut self) -> Option<&mut ViewportSync> {
		self.viewport.as_mut()
	}

	/// Receives every [`SyncError`] after it was logged.
	pub fn set_error_handler(&mut self, on_error: impl 'static + FnMut(&SyncError)) {
		self.on_error = Some(Box::new(on_error));
	}

	pub(crate) fn report(&mut self, error: SyncError) {
		match error {
			SyncError::InvalidAttributeName { .. } | SyncError::UnknownStoreField { .. } => warn!(kind = error.kind(), "{}", error),
			_ => error!(kind = error.kind(), "{}", error),
		}
		if let Some(on_error) = &mut self.on_error {
			on_error(&error);
		}
	}

	/// The id of a registered node. [`None`] for nodes that were never registered or have since been unregistered.
	#[must_use]
	pub fn node_id(&self, node: &D::Node) -> Option<NodeId> {
		self.registry.node_to_id(&self.dom, node)
	}

	#[must_use]
	pub fn node_from_id(&self, id: NodeId) -> Option<D::Node> {
		self.registry.id_to_node(id).map(|tree_node| tree_node.node.clone())
	}

	#[must_use]
	pub fn tree_node(&self, id: NodeId) -> Option<&TreeNode<D::Node>> {
		self.registry.id_to_node(id)
	}

	#[must_use]
	pub fn is_streaming(&self) -> bool {
		self.streaming
	}

	/// Begins projecting local mutations into the store.
	///
	/// `on_batch_flushed` runs after each processed mutation batch.
	#[instrument(skip(self, on_batch_flushed))]
	pub fn start_stream(&mut self, on_batch_flushed: impl 'static + FnMut()) {
		if !self.syncing {
			warn!("Streaming local mutations before the store is bound. Unemitted targets will be reported.");
		}
		self.on_batch_flushed = Some(Box::new(on_batch_flushed));
		self.streaming = true;
		self.dom.set_observing(true);
	}

	/// Stops projecting local mutations. Unprocessed records are discarded.
	#[instrument(skip(self))]
	pub fn disconnect_stream(&mut self) {
		self.dom.set_observing(false);
		let discarded = self.dom.take_records().len();
		if discarded > 0 {
			debug!("Discarded {} unprocessed mutation record(s).", discarded);
		}
		self.streaming = false;
		self.on_batch_flushed = None;
	}

	/// Processes all mutation records and UI events the [`Dom`] has collected.
	pub fn pump(&mut self) {
		let records = self.dom.take_records();
		if !records.is_empty() {
			self.handle_mutations(records);
		}
		for event in self.dom.take_events() {
			self.handle_event(event);
		}
	}

	pub(crate) fn batch_flushed(&mut self) {
		if let Some(on_batch_flushed) = &mut self.on_batch_flushed {
			on_batch_flushed();
		}
	}

	/// Runs `apply` with local observation suppressed.
	///
	/// Local records that are already queued are processed first, so that pausing the observer can't lose them.
	/// Suppression begins before `apply`'s first side effect and ends after its last.
	pub(crate) fn apply_remote<R>(&mut self, apply: impl FnOnce(&mut Self) -> R) -> R {
		debug_assert!(!self.applying_remote, "Remote applies must not nest.");
		if self.streaming {
			let records = self.dom.take_records();
			if !records.is_empty() {
				trace!("Processing {} local record(s) ahead of a remote change.", records.len());
				self.handle_mutations(records);
			}
			self.dom.set_observing(false);
		}
		self.applying_remote = true;

		let result = apply(self);

		self.applying_remote = false;
		if self.streaming {
			self.dom.set_observing(true);
		}
		result
	}

	/// Replaces the document element with the tree materialized from `root`,
	/// then starts applying remote changes.
	///
	/// Returns the new document element, or [`None`] if `root` couldn't be materialized.
	#[instrument(skip(self))]
	pub fn read_from_store(&mut self, root: NodeId) -> Option<D::Node> {
		self.syncing = true;
		self.apply_remote(|this| {
			let element = this.materialize(root)?;
			if let Err(error) = this.dom.replace_document_element(&element) {
				this.report(SyncError::PlatformRejected { id: root.into(), operation: "replaceDocumentElement", error });
				return None;
			}
			debug!("Document element replaced by node {}.", root);
			Some(element)
		})
	}

	/// Writes the existing document into the store and starts applying remote changes.
	///
	/// Returns the id of the document element, which peers pass to [`StreamTree::read_from_store`].
	#[instrument(skip(self))]
	pub fn set_on_store(&mut self) -> Option<NodeId> {
		let root = match self.dom.document_element() {
			Some(root) => root,
			None => {
				warn!("No document element to write to the store.");
				return None;
			}
		};
		let id = self.emit(&root);
		self.syncing = true;
		if let Some(id) = id {
			debug!("Document written to the store as node {}. {} node(s) registered.", id, self.registry.len());
		}
		id
	}
}
