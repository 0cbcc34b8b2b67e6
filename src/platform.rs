//! The live tree this crate synchronizes, abstracted over its host.
//!
//! See [`memory::MemoryDom`](`crate::memory::MemoryDom`) and [`web::WebDom`](`crate::web::WebDom`).

use crate::{error::DomError, key::NodeId};
use core::fmt::Debug;

/// [XHTML namespace](https://infra.spec.whatwg.org/#html-namespace), implied when a record has no `namespaceURI`.
pub const XHTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";
pub const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";
/// The only attribute namespace that is restored on materialization, for `xlink:href`.
pub const XLINK_NAMESPACE: &str = "http://www.w3.org/1999/xlink";

/// Roughly the XML `Name` production, restricted to what documents use in practice.
///
/// Stricter than the HTML parser: parsed attributes like `@click` or `[disabled]` are rejected,
/// so they are reported as [`InvalidAttributeName`](`crate::SyncError::InvalidAttributeName`) and never reach the store.
#[must_use]
pub fn is_valid_name(name: &str) -> bool {
	let mut chars = name.chars();
	match chars.next() {
		Some(first) if first.is_alphabetic() || first == '_' || first == ':' => {}
		_ => return false,
	}
	chars.all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'))
}

/// The kinds of node that are synchronized. Comments and other node types are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
	Element,
	Text,
	/// An `<input>` element.
	Input,
}

/// What a [`NodeKind`] carries, and therefore which store fields it reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct Capabilities {
	pub has_attributes: bool,
	pub has_children: bool,
	pub has_text_content: bool,
	pub has_input_value: bool,
}

impl NodeKind {
	#[must_use]
	pub fn capabilities(self) -> Capabilities {
		match self {
			Self::Element => Capabilities { has_attributes: true, has_children: true, has_text_content: false, has_input_value: false },
			Self::Text => Capabilities { has_attributes: false, has_children: false, has_text_content: true, has_input_value: false },
			Self::Input => Capabilities { has_attributes: true, has_children: true, has_text_content: false, has_input_value: true },
		}
	}

	#[must_use]
	pub fn is_element(self) -> bool {
		self.capabilities().has_attributes
	}

	/// Classifies an element by its tag name.
	#[must_use]
	pub fn of_element(tag_name: &str) -> Self {
		if tag_name.eq_ignore_ascii_case("input") {
			Self::Input
		} else {
			Self::Element
		}
	}
}

/// What changed, as delivered in a mutation batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationKind {
	ChildList,
	Attributes { name: String },
	CharacterData,
}

impl MutationKind {
	#[must_use]
	pub fn name(&self) -> &'static str {
		match self {
			Self::ChildList => "childList",
			Self::Attributes { .. } => "attributes",
			Self::CharacterData => "characterData",
		}
	}
}

/// One entry of a batched mutation notification, see [***MutationRecord***](https://developer.mozilla.org/en-US/docs/Web/API/MutationRecord).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord<N> {
	pub target: N,
	pub kind: MutationKind,
}

/// UI events that are synchronized outside of the mutation records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent<N> {
	/// `scroll` on a listened-to element.
	Scroll(N),
	/// `input` on a listened-to `<input>` element.
	Input(N),
	WindowScroll,
	WindowResize,
	/// `click` anywhere in the window, with the event target.
	Click(N),
}

/// Which element-level events [`Dom::listen`] subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Listen {
	pub scroll: bool,
	pub input: bool,
}

impl Listen {
	#[must_use]
	pub fn for_kind(kind: NodeKind) -> Self {
		Self { scroll: kind.is_element(), input: kind == NodeKind::Input }
	}
}

/// A mutable document tree plus the window it is displayed in.
///
/// Mutations made through this trait are observed like any other while observation is on,
/// so the engine pauses observation around everything it applies itself.
pub trait Dom {
	/// Handle to a platform node. Equality is identity.
	type Node: Clone + PartialEq + Debug;

	/// [`None`] for node types that aren't synchronized.
	fn kind(&self, node: &Self::Node) -> Option<NodeKind>;

	/// # Errors
	///
	/// Iff the platform rejects the tag name.
	fn create_element(&mut self, namespace: Option<&str>, tag_name: &str) -> Result<Self::Node, DomError>;

	fn create_text(&mut self, text: &str) -> Self::Node;

	fn tag_name(&self, element: &Self::Node) -> String;

	fn namespace_uri(&self, element: &Self::Node) -> Option<String>;

	/// In document order.
	fn attribute_names(&self, element: &Self::Node) -> Vec<String>;

	fn attribute(&self, element: &Self::Node, name: &str) -> Option<String>;

	/// # Errors
	///
	/// [`DomError::InvalidCharacter`] iff `name` isn't a valid attribute name.
	fn set_attribute(&mut self, element: &Self::Node, name: &str, value: &str) -> Result<(), DomError>;

	/// # Errors
	///
	/// [`DomError::InvalidCharacter`] iff `qualified_name` isn't a valid attribute name.
	fn set_attribute_ns(&mut self, element: &Self::Node, namespace: &str, qualified_name: &str, value: &str) -> Result<(), DomError>;

	/// Removing an absent attribute is not an error.
	///
	/// # Errors
	///
	/// Iff the platform throws.
	fn remove_attribute(&mut self, element: &Self::Node, name: &str) -> Result<(), DomError>;

	fn children(&self, node: &Self::Node) -> Vec<Self::Node>;

	fn parent(&self, node: &Self::Node) -> Option<Self::Node>;

	/// Inserts `child` before `reference`, or appends it if `reference` is [`None`].
	/// `child` is moved if it is already attached elsewhere.
	///
	/// # Errors
	///
	/// Iff `reference` is not a child of `parent` or the insertion is otherwise invalid.
	fn insert_before(&mut self, parent: &Self::Node, child: &Self::Node, reference: Option<&Self::Node>) -> Result<(), DomError>;

	/// # Errors
	///
	/// [`DomError::NotFound`] iff `child` is not a child of `parent`.
	fn remove_child(&mut self, parent: &Self::Node, child: &Self::Node) -> Result<(), DomError>;

	fn text_content(&self, node: &Self::Node) -> String;

	fn set_text_content(&mut self, node: &Self::Node, text: &str);

	fn scroll_position(&self, element: &Self::Node) -> (i32, i32);

	fn set_scroll_position(&mut self, element: &Self::Node, left: i32, top: i32);

	/// The `type` of an `<input>`, lowercased.
	fn input_type(&self, input: &Self::Node) -> String;

	fn input_value(&self, input: &Self::Node) -> String;

	fn set_input_value(&mut self, input: &Self::Node, value: &str);

	fn document_element(&self) -> Option<Self::Node>;

	/// Makes `root` the document element, replacing the current one.
	///
	/// # Errors
	///
	/// Iff the platform refuses `root` as document element.
	fn replace_document_element(&mut self, root: &Self::Node) -> Result<(), DomError>;

	/// Whether `node` is attached to the document.
	fn is_connected(&self, node: &Self::Node) -> bool;

	/// Subscribes to element-level UI events, delivered through [`Dom::take_events`].
	fn listen(&mut self, node: &Self::Node, listen: Listen);

	/// Pauses or resumes mutation observation over the whole document.
	///
	/// While paused, mutations produce no records at all.
	fn set_observing(&mut self, observing: bool);

	/// Drains mutation records that were observed but not yet delivered.
	fn take_records(&mut self) -> Vec<MutationRecord<Self::Node>>;

	/// Drains pending UI events.
	fn take_events(&mut self) -> Vec<UiEvent<Self::Node>>;

	/// Attaches the engine's id to a node as a weak back-reference, or detaches it.
	///
	/// Implementations must not keep `node` alive because of this.
	fn set_tag(&mut self, node: &Self::Node, id: Option<NodeId>);

	fn tag(&self, node: &Self::Node) -> Option<NodeId>;

	fn window_scroll(&self) -> (i32, i32);

	fn scroll_window_to(&mut self, x: i32, y: i32);

	fn window_size(&self) -> (u32, u32);

	/// Dispatches a `click` at `node`.
	fn click(&mut self, node: &Self::Node);
}
