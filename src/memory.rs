//! In-process platform: an arena-backed [`Dom`] and a replicated [`Store`] hub.
//!
//! [`MemoryDom`] behaves like a browser document with a `subtree` [***MutationObserver***](https://developer.mozilla.org/en-US/docs/Web/API/MutationObserver)
//! attached to it: while observing, every mutation of a connected node is recorded,
//! including the ones made through the [`Dom`] trait.
//!
//! [`MemoryHub`] fans every write out to all of its [`MemoryStore`] peers, flagged as local for the writer.

use crate::{
	error::DomError,
	key::{NodeId, RecordId, StoreKey, Value},
	platform::{is_valid_name, Dom, Listen, MutationKind, MutationRecord, NodeKind, UiEvent, XHTML_NAMESPACE},
	store::{Record, Store, StoreChange},
};
use core::fmt::Write as _;
use hashbrown::HashMap;
use std::{cell::RefCell, collections::VecDeque, rc::Rc};

/// Handle to a node of a [`MemoryDom`]. Only meaningful for the [`MemoryDom`] that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemoryNode(usize);

#[derive(Debug)]
enum Data {
	Element { namespace: Option<String>, tag_name: String, attributes: Vec<(String, String)>, input_value: String },
	Text(String),
	Comment(String),
}

#[derive(Debug)]
struct Slot {
	data: Data,
	parent: Option<MemoryNode>,
	children: Vec<MemoryNode>,
	scroll: (i32, i32),
	tag: Option<NodeId>,
	listen: Listen,
}

#[derive(Debug)]
pub struct MemoryDom {
	slots: Vec<Slot>,
	document_element: Option<MemoryNode>,
	observing: bool,
	records: Vec<MutationRecord<MemoryNode>>,
	events: Vec<UiEvent<MemoryNode>>,
	window_scroll: (i32, i32),
	window_size: (u32, u32),
	clicked: Vec<MemoryNode>,
}

impl Default for MemoryDom {
	fn default() -> Self {
		Self::new()
	}
}

impl MemoryDom {
	#[must_use]
	pub fn new() -> Self {
		Self {
			slots: Vec::new(),
			document_element: None,
			observing: false,
			records: Vec::new(),
			events: Vec::new(),
			window_scroll: (0, 0),
			window_size: (1024, 768),
			clicked: Vec::new(),
		}
	}

	fn slot(&self, node: MemoryNode) -> &Slot {
		&self.slots[node.0]
	}

	fn slot_mut(&mut self, node: MemoryNode) -> &mut Slot {
		&mut self.slots[node.0]
	}

	fn push(&mut self, data: Data) -> MemoryNode {
		self.slots.push(Slot { data, parent: None, children: Vec::new(), scroll: (0, 0), tag: None, listen: Listen::default() });
		MemoryNode(self.slots.len() - 1)
	}

	fn record(&mut self, target: MemoryNode, kind: MutationKind) {
		if self.observing && self.is_connected(&target) {
			self.records.push(MutationRecord { target, kind });
		}
	}

	/// A node type that isn't synchronized.
	pub fn create_comment(&mut self, text: &str) -> MemoryNode {
		self.push(Data::Comment(text.to_owned()))
	}

	/// Convenience for building fixtures: creates an HTML element with attributes and children and returns it.
	///
	/// # Panics
	///
	/// Iff `tag_name` or an attribute name is invalid.
	pub fn element(&mut self, tag_name: &str, attributes: &[(&str, &str)], children: &[MemoryNode]) -> MemoryNode {
		let element = self.create_element(None, tag_name).expect("valid tag name");
		for &(name, value) in attributes {
			self.set_attribute(&element, name, value).expect("valid attribute name");
		}
		for child in children {
			self.insert_before(&element, child, None).expect("insertable child");
		}
		element
	}

	/// Scrolls an element as a user would, firing `scroll` if listened to.
	pub fn user_scroll(&mut self, element: MemoryNode, left: i32, top: i32) {
		self.slot_mut(element).scroll = (left, top);
		if self.slot(element).listen.scroll {
			self.events.push(UiEvent::Scroll(element));
		}
	}

	/// Types into an `<input>` as a user would, firing `input` if listened to.
	/// Like in browsers, this does not touch the `value` attribute.
	pub fn user_input(&mut self, input: MemoryNode, value: &str) {
		if let Data::Element { input_value, .. } = &mut self.slot_mut(input).data {
			*input_value = value.to_owned();
		}
		if self.slot(input).listen.input {
			self.events.push(UiEvent::Input(input));
		}
	}

	pub fn user_scroll_window(&mut self, x: i32, y: i32) {
		self.window_scroll = (x, y);
		self.events.push(UiEvent::WindowScroll);
	}

	pub fn user_resize_window(&mut self, width: u32, height: u32) {
		self.window_size = (width, height);
		self.events.push(UiEvent::WindowResize);
	}

	pub fn user_click(&mut self, target: MemoryNode) {
		self.events.push(UiEvent::Click(target));
	}

	/// Nodes that received a programmatic [`Dom::click`], in order.
	#[must_use]
	pub fn clicked(&self) -> &[MemoryNode] {
		&self.clicked
	}

	#[must_use]
	pub fn listening(&self, node: MemoryNode) -> Listen {
		self.slot(node).listen
	}

	#[must_use]
	pub fn is_observing(&self) -> bool {
		self.observing
	}

	/// Number of observed but not yet taken mutation records.
	#[must_use]
	pub fn pending_records(&self) -> usize {
		self.records.len()
	}

	/// Serializes a subtree as HTML-ish markup, for assertions.
	#[must_use]
	pub fn outer_html(&self, node: MemoryNode) -> String {
		let mut html = String::new();
		self.write_html(node, &mut html);
		html
	}

	fn write_html(&self, node: MemoryNode, html: &mut String) {
		let slot = self.slot(node);
		match &slot.data {
			Data::Element { tag_name, attributes, .. } => {
				let tag_name = tag_name.to_ascii_lowercase();
				let _ = write!(html, "<{}", tag_name);
				for (name, value) in attributes {
					let _ = write!(html, " {}=\"{}\"", name, value);
				}
				html.push('>');
				for &child in &slot.children {
					self.write_html(child, html);
				}
				let _ = write!(html, "</{}>", tag_name);
			}
			Data::Text(text) => html.push_str(text),
			Data::Comment(text) => {
				let _ = write!(html, "<!--{}-->", text);
			}
		}
	}

	fn detach(&mut self, child: MemoryNode) {
		if let Some(parent) = self.slot(child).parent {
			self.record(parent, MutationKind::ChildList);
			self.slot_mut(parent).children.retain(|&c| c != child);
			self.slot_mut(child).parent = None;
		}
	}

	fn is_inclusive_ancestor(&self, ancestor: MemoryNode, mut node: MemoryNode) -> bool {
		loop {
			if node == ancestor {
				return true;
			}
			match self.slot(node).parent {
				Some(parent) => node = parent,
				None => return false,
			}
		}
	}
}

impl Dom for MemoryDom {
	type Node = MemoryNode;

	fn kind(&self, node: &MemoryNode) -> Option<NodeKind> {
		match &self.slot(*node).data {
			Data::Element { tag_name, .. } => Some(NodeKind::of_element(tag_name)),
			Data::Text(_) => Some(NodeKind::Text),
			Data::Comment(_) => None,
		}
	}

	fn create_element(&mut self, namespace: Option<&str>, tag_name: &str) -> Result<MemoryNode, DomError> {
		if !is_valid_name(tag_name) {
			return Err(DomError::InvalidCharacter(tag_name.to_owned()));
		}
		let (namespace, tag_name) = match namespace {
			None | Some(XHTML_NAMESPACE) => (Some(XHTML_NAMESPACE.to_owned()), tag_name.to_ascii_uppercase()),
			Some(namespace) => (Some(namespace.to_owned()), tag_name.to_owned()),
		};
		Ok(self.push(Data::Element { namespace, tag_name, attributes: Vec::new(), input_value: String::new() }))
	}

	fn create_text(&mut self, text: &str) -> MemoryNode {
		self.push(Data::Text(text.to_owned()))
	}

	fn tag_name(&self, element: &MemoryNode) -> String {
		match &self.slot(*element).data {
			Data::Element { tag_name, .. } => tag_name.clone(),
			_ => String::new(),
		}
	}

	fn namespace_uri(&self, element: &MemoryNode) -> Option<String> {
		match &self.slot(*element).data {
			Data::Element { namespace, .. } => namespace.clone(),
			_ => None,
		}
	}

	fn attribute_names(&self, element: &MemoryNode) -> Vec<String> {
		match &self.slot(*element).data {
			Data::Element { attributes, .. } => attributes.iter().map(|(name, _)| name.clone()).collect(),
			_ => Vec::new(),
		}
	}

	fn attribute(&self, element: &MemoryNode, name: &str) -> Option<String> {
		match &self.slot(*element).data {
			Data::Element { attributes, .. } => attributes.iter().find(|(n, _)| n == name).map(|(_, value)| value.clone()),
			_ => None,
		}
	}

	fn set_attribute(&mut self, element: &MemoryNode, name: &str, value: &str) -> Result<(), DomError> {
		if !is_valid_name(name) {
			return Err(DomError::InvalidCharacter(name.to_owned()));
		}
		match &mut self.slot_mut(*element).data {
			Data::Element { attributes, .. } => match attributes.iter_mut().find(|(n, _)| n == name) {
				Some((_, existing)) => *existing = value.to_owned(),
				None => attributes.push((name.to_owned(), value.to_owned())),
			},
			_ => return Err(DomError::Js("not an element".to_owned())),
		}
		self.record(*element, MutationKind::Attributes { name: name.to_owned() });
		Ok(())
	}

	fn set_attribute_ns(&mut self, element: &MemoryNode, _namespace: &str, qualified_name: &str, value: &str) -> Result<(), DomError> {
		// Attribute namespaces aren't modelled; the qualified name is what gets stored and read back.
		self.set_attribute(element, qualified_name, value)
	}

	fn remove_attribute(&mut self, element: &MemoryNode, name: &str) -> Result<(), DomError> {
		let removed = match &mut self.slot_mut(*element).data {
			Data::Element { attributes, .. } => {
				let before = attributes.len();
				attributes.retain(|(n, _)| n != name);
				attributes.len() != before
			}
			_ => return Err(DomError::Js("not an element".to_owned())),
		};
		if removed {
			self.record(*element, MutationKind::Attributes { name: name.to_owned() });
		}
		Ok(())
	}

	fn children(&self, node: &MemoryNode) -> Vec<MemoryNode> {
		self.slot(*node).children.clone()
	}

	fn parent(&self, node: &MemoryNode) -> Option<MemoryNode> {
		self.slot(*node).parent
	}

	fn insert_before(&mut self, parent: &MemoryNode, child: &MemoryNode, reference: Option<&MemoryNode>) -> Result<(), DomError> {
		let (parent, child) = (*parent, *child);
		if !matches!(self.slot(parent).data, Data::Element { .. }) {
			return Err(DomError::Js("HierarchyRequestError: parent is not an element".to_owned()));
		}
		if self.is_inclusive_ancestor(child, parent) {
			return Err(DomError::Js("HierarchyRequestError: cycle".to_owned()));
		}
		if let Some(&reference) = reference {
			if reference == child {
				return Ok(());
			}
			if self.slot(reference).parent != Some(parent) {
				return Err(DomError::NotFound);
			}
		}
		self.detach(child);
		let index = match reference {
			Some(reference) => self.slot(parent).children.iter().position(|c| c == reference).ok_or(DomError::NotFound)?,
			None => self.slot(parent).children.len(),
		};
		self.slot_mut(parent).children.insert(index, child);
		self.slot_mut(child).parent = Some(parent);
		self.record(parent, MutationKind::ChildList);
		Ok(())
	}

	fn remove_child(&mut self, parent: &MemoryNode, child: &MemoryNode) -> Result<(), DomError> {
		if self.slot(*child).parent != Some(*parent) {
			return Err(DomError::NotFound);
		}
		self.detach(*child);
		Ok(())
	}

	fn text_content(&self, node: &MemoryNode) -> String {
		match &self.slot(*node).data {
			Data::Text(text) | Data::Comment(text) => text.clone(),
			Data::Element { .. } => self.slot(*node).children.iter().map(|child| self.text_content(child)).collect(),
		}
	}

	fn set_text_content(&mut self, node: &MemoryNode, text: &str) {
		let node = *node;
		if let Data::Text(data) | Data::Comment(data) = &mut self.slot_mut(node).data {
			*data = text.to_owned();
			return self.record(node, MutationKind::CharacterData);
		}
		for child in self.children(&node) {
			self.detach(child);
		}
		if !text.is_empty() {
			let text = self.create_text(text);
			let _ = self.insert_before(&node, &text, None);
		}
	}

	fn scroll_position(&self, element: &MemoryNode) -> (i32, i32) {
		self.slot(*element).scroll
	}

	fn set_scroll_position(&mut self, element: &MemoryNode, left: i32, top: i32) {
		self.slot_mut(*element).scroll = (left.max(0), top.max(0));
	}

	fn input_type(&self, input: &MemoryNode) -> String {
		self.attribute(input, "type").map_or_else(|| "text".to_owned(), |t| t.to_ascii_lowercase())
	}

	fn input_value(&self, input: &MemoryNode) -> String {
		match &self.slot(*input).data {
			Data::Element { input_value, .. } => input_value.clone(),
			_ => String::new(),
		}
	}

	fn set_input_value(&mut self, input: &MemoryNode, value: &str) {
		if let Data::Element { input_value, .. } = &mut self.slot_mut(*input).data {
			*input_value = value.to_owned();
		}
	}

	fn document_element(&self) -> Option<MemoryNode> {
		self.document_element
	}

	fn replace_document_element(&mut self, root: &MemoryNode) -> Result<(), DomError> {
		if !matches!(self.slot(*root).data, Data::Element { .. }) {
			return Err(DomError::Js("HierarchyRequestError: document element must be an element".to_owned()));
		}
		self.detach(*root);
		self.document_element = Some(*root);
		Ok(())
	}

	fn is_connected(&self, node: &MemoryNode) -> bool {
		self.document_element.map_or(false, |root| self.is_inclusive_ancestor(root, *node))
	}

	fn listen(&mut self, node: &MemoryNode, listen: Listen) {
		let current = &mut self.slot_mut(*node).listen;
		current.scroll |= listen.scroll;
		current.input |= listen.input;
	}

	fn set_observing(&mut self, observing: bool) {
		self.observing = observing;
	}

	fn take_records(&mut self) -> Vec<MutationRecord<MemoryNode>> {
		core::mem::take(&mut self.records)
	}

	fn take_events(&mut self) -> Vec<UiEvent<MemoryNode>> {
		core::mem::take(&mut self.events)
	}

	fn set_tag(&mut self, node: &MemoryNode, id: Option<NodeId>) {
		self.slot_mut(*node).tag = id;
	}

	fn tag(&self, node: &MemoryNode) -> Option<NodeId> {
		self.slot(*node).tag
	}

	fn window_scroll(&self) -> (i32, i32) {
		self.window_scroll
	}

	fn scroll_window_to(&mut self, x: i32, y: i32) {
		self.window_scroll = (x, y);
	}

	fn window_size(&self) -> (u32, u32) {
		self.window_size
	}

	fn click(&mut self, node: &MemoryNode) {
		self.clicked.push(*node);
	}
}

#[derive(Debug, Default)]
struct Hub {
	records: HashMap<RecordId, Record>,
	globals: HashMap<String, Value>,
	next_id: u64,
	inboxes: Vec<VecDeque<StoreChange>>,
	writes: Vec<usize>,
}

impl Hub {
	fn broadcast(&mut self, writer: usize, change: impl Fn(bool) -> StoreChange) {
		self.writes[writer] += 1;
		for (peer, inbox) in self.inboxes.iter_mut().enumerate() {
			inbox.push_back(change(peer == writer));
		}
	}
}

/// Shared state of an in-process replicated store.
#[derive(Debug, Clone, Default)]
pub struct MemoryHub(Rc<RefCell<Hub>>);

impl MemoryHub {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Connects a new peer. It only receives changes made from now on.
	#[must_use]
	pub fn peer(&self) -> MemoryStore {
		let mut hub = self.0.borrow_mut();
		hub.inboxes.push(VecDeque::new());
		hub.writes.push(0);
		MemoryStore { hub: self.clone(), peer: hub.inboxes.len() - 1 }
	}

	/// Writes a value without notifying anyone, as if it had been there before any peer connected.
	pub fn insert(&self, key: &StoreKey, value: Value) {
		let mut hub = self.0.borrow_mut();
		hub.next_id = hub.next_id.max(key.id.0 + 1);
		hub.records.entry(key.id).or_default().insert(key.field.clone(), value);
	}

	/// Convenience over [`MemoryHub::insert`] for a whole record.
	pub fn insert_record(&self, id: RecordId, fields: &[(&str, Value)]) {
		for (field, value) in fields {
			self.insert(&StoreKey::new(id, *field), value.clone());
		}
	}

	#[must_use]
	pub fn record(&self, id: RecordId) -> Option<Record> {
		self.0.borrow().records.get(&id).cloned()
	}
}

/// One peer's connection to a [`MemoryHub`].
#[derive(Debug)]
pub struct MemoryStore {
	hub: MemoryHub,
	peer: usize,
}

impl MemoryStore {
	/// Drains this peer's pending change notifications, in write order.
	#[must_use]
	pub fn take_changes(&self) -> Vec<StoreChange> {
		self.hub.0.borrow_mut().inboxes[self.peer].drain(..).collect()
	}

	/// How many writes (sets and deletes) this peer has made.
	#[must_use]
	pub fn write_count(&self) -> usize {
		self.hub.0.borrow().writes[self.peer]
	}

	#[must_use]
	pub fn hub(&self) -> &MemoryHub {
		&self.hub
	}
}

impl Store for MemoryStore {
	fn next_id(&mut self) -> RecordId {
		let mut hub = self.hub.0.borrow_mut();
		hub.next_id = hub.next_id.max(1);
		let id = RecordId(hub.next_id);
		hub.next_id += 1;
		id
	}

	fn record(&self, id: RecordId) -> Option<Record> {
		self.hub.record(id)
	}

	fn field(&self, key: &StoreKey) -> Option<Value> {
		self.hub.0.borrow().records.get(&key.id).and_then(|record| record.get(&key.field)).cloned()
	}

	fn set(&mut self, key: &StoreKey, value: Value) {
		let mut hub = self.hub.0.borrow_mut();
		hub.records.entry(key.id).or_default().insert(key.field.clone(), value.clone());
		hub.broadcast(self.peer, |local| StoreChange::set(key, value.clone(), local));
	}

	fn delete(&mut self, key: &StoreKey) {
		let mut hub = self.hub.0.borrow_mut();
		if let Some(record) = hub.records.get_mut(&key.id) {
			record.remove(&key.field);
		}
		hub.broadcast(self.peer, |local| StoreChange::delete(key, local));
	}

	fn global(&self, name: &str) -> Option<Value> {
		self.hub.0.borrow().globals.get(name).cloned()
	}

	fn set_global(&mut self, name: &str, value: Value) {
		let mut hub = self.hub.0.borrow_mut();
		hub.globals.insert(name.to_owned(), value.clone());
		hub.broadcast(self.peer, |local| StoreChange { key: name.to_owned(), value: Some(value.clone()), deleted: false, local });
	}
}
