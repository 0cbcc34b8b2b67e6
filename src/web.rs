//! Browser platform on top of `web-sys`.
//!
//! [`WebDom`] observes the whole document with one [***MutationObserver***](https://developer.mozilla.org/en-US/docs/Web/API/MutationObserver)
//! and routes all UI events through one shared listener. Both queue what they receive and then wake the engine,
//! which is [`connect`]'s job to wire up.

use crate::{
	config::SyncConfig,
	error::DomError,
	key::NodeId,
	platform::{Dom, Listen, MutationKind, MutationRecord, NodeKind, UiEvent},
	store::{Store, StoreChange},
	stream::StreamTree,
};
use core::cell::RefCell;
use js_sys::{Array, Function, Object, Reflect};
use std::rc::{Rc, Weak};
use tracing::{error, instrument, trace, trace_span, warn};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use web_sys::{Document, Element, Event, EventTarget, HtmlElement, HtmlInputElement, MutationObserver, MutationObserverInit, Node, Window};

/// Expando property holding a node's id.
const TAG_PROPERTY: &str = "__domStreamNodeId";

#[derive(Default)]
struct Queue {
	records: Vec<web_sys::MutationRecord>,
	events: Vec<UiEvent<Node>>,
	wake: Option<Rc<dyn Fn()>>,
}

impl Queue {
	fn push_records(queue: &RefCell<Self>, records: impl IntoIterator<Item = web_sys::MutationRecord>) {
		queue.borrow_mut().records.extend(records);
		Self::wake(queue);
	}

	fn push_event(queue: &RefCell<Self>, event: UiEvent<Node>) {
		queue.borrow_mut().events.push(event);
		Self::wake(queue);
	}

	fn wake(queue: &RefCell<Self>) {
		let wake = queue.borrow().wake.clone();
		if let Some(wake) = wake {
			wake();
		}
	}
}

/// The live browser document.
///
/// Dropping it stops observation and removes the window-level listeners.
pub struct WebDom {
	window: Window,
	document: Document,
	observer: MutationObserver,
	observer_init: MutationObserverInit,
	observing: bool,
	queue: Rc<RefCell<Queue>>,
	_mutation_handler: Closure<dyn Fn(Array, MutationObserver)>,
	event_handler: Closure<dyn Fn(Event)>,
}

impl core::fmt::Debug for WebDom {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.debug_struct("WebDom").field("document", &self.document).field("observing", &self.observing).finish_non_exhaustive()
	}
}

const WINDOW_EVENTS: &[(&str, bool)] = &[("scroll", false), ("resize", false), ("click", true)];

impl WebDom {
	/// # Errors
	///
	/// Iff there is no window with a document, or the observer can't be created.
	#[instrument]
	pub fn new() -> Result<Self, JsValue> {
		let window = web_sys::window().ok_or_else(|| JsValue::from_str("dom-stream: No `window` found."))?;
		let document = window.document().ok_or_else(|| JsValue::from_str("dom-stream: No `document` found."))?;
		let queue = Rc::new(RefCell::new(Queue::default()));

		let mutation_handler = Closure::wrap(Box::new({
			let queue = Rc::downgrade(&queue);
			move |records: Array, _observer: MutationObserver| {
				let span = trace_span!("mutation_handler", records = records.length());
				let _enter = span.enter();
				if let Some(queue) = queue.upgrade() {
					Queue::push_records(&queue, records.iter().map(JsCast::unchecked_into));
				}
			}
		}) as Box<dyn Fn(Array, MutationObserver)>);
		let observer = MutationObserver::new(mutation_handler.as_ref().unchecked_ref())?;

		let observer_init = MutationObserverInit::new();
		observer_init.set_child_list(true);
		observer_init.set_attributes(true);
		observer_init.set_character_data(true);
		observer_init.set_subtree(true);

		let event_handler = Closure::wrap(Box::new({
			let queue = Rc::downgrade(&queue);
			move |event: Event| {
				let span = trace_span!("event_handler", event_type = %event.type_());
				let _enter = span.enter();
				let queue = match queue.upgrade() {
					Some(queue) => queue,
					None => return,
				};
				let from_window = event.current_target().map_or(false, |target| target.is_instance_of::<Window>());
				let target = event.target().and_then(|target| target.dyn_into::<Node>().ok());
				let event = match (event.type_().as_str(), from_window, target) {
					("scroll", true, _) => UiEvent::WindowScroll,
					("resize", true, _) => UiEvent::WindowResize,
					("click", true, Some(target)) => UiEvent::Click(target),
					("scroll", false, Some(target)) => UiEvent::Scroll(target),
					("input", false, Some(target)) => UiEvent::Input(target),
					(other, _, _) => return trace!("Ignoring `{}` event.", other),
				};
				Queue::push_event(&queue, event);
			}
		}) as Box<dyn Fn(Event)>);
		for &(event, capture) in WINDOW_EVENTS {
			window.add_event_listener_with_callback_and_bool(event, event_handler.as_ref().unchecked_ref(), capture)?;
		}

		Ok(Self { window, document, observer, observer_init, observing: false, queue, _mutation_handler: mutation_handler, event_handler })
	}

	/// Sets what runs after new records or events were queued.
	pub fn set_wake(&mut self, wake: Option<Rc<dyn Fn()>>) {
		self.queue.borrow_mut().wake = wake;
	}

	#[must_use]
	pub fn document(&self) -> &Document {
		&self.document
	}

	fn handler(&self) -> &Function {
		self.event_handler.as_ref().unchecked_ref()
	}

	fn element<'a>(node: &'a Node, operation: &str) -> Option<&'a Element> {
		let element = node.dyn_ref::<Element>();
		if element.is_none() {
			warn!("`{}` on a non-element node.", operation);
		}
		element
	}

	fn convert_record(record: &web_sys::MutationRecord) -> Option<MutationRecord<Node>> {
		let kind = match record.type_().as_str() {
			"childList" => MutationKind::ChildList,
			"attributes" => MutationKind::Attributes { name: record.attribute_name()? },
			"characterData" => MutationKind::CharacterData,
			other => {
				warn!("Unexpected mutation record type `{}`.", other);
				return None;
			}
		};
		Some(MutationRecord { target: record.target()?, kind })
	}

	fn number(target: &JsValue, property: &str) -> f64 {
		Reflect::get(target, &JsValue::from_str(property)).ok().and_then(|value| value.as_f64()).unwrap_or_default()
	}
}

impl Drop for WebDom {
	fn drop(&mut self) {
		self.observer.disconnect();
		for &(event, capture) in WINDOW_EVENTS {
			if let Err(error) = self.window.remove_event_listener_with_callback_and_bool(event, self.handler(), capture) {
				error!("Failed to remove window `{}` listener: {:?}", event, error);
			}
		}
	}
}

impl From<JsValue> for DomError {
	fn from(error: JsValue) -> Self {
		let name = Reflect::get(&error, &JsValue::from_str("name")).ok().and_then(|name| name.as_string());
		let message = Reflect::get(&error, &JsValue::from_str("message")).ok().and_then(|message| message.as_string());
		match name.as_deref() {
			Some("InvalidCharacterError") => Self::InvalidCharacter(message.unwrap_or_default()),
			Some("NotFoundError") => Self::NotFound,
			_ => Self::Js(message.unwrap_or_else(|| format!("{:?}", error))),
		}
	}
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
impl Dom for WebDom {
	type Node = Node;

	fn kind(&self, node: &Node) -> Option<NodeKind> {
		match node.node_type() {
			Node::ELEMENT_NODE if node.is_instance_of::<HtmlInputElement>() => Some(NodeKind::Input),
			Node::ELEMENT_NODE => Some(NodeKind::Element),
			Node::TEXT_NODE => Some(NodeKind::Text),
			_ => None,
		}
	}

	fn create_element(&mut self, namespace: Option<&str>, tag_name: &str) -> Result<Node, DomError> {
		let element = match namespace {
			Some(namespace) => self.document.create_element_ns(Some(namespace), tag_name)?,
			None => self.document.create_element(tag_name)?,
		};
		Ok(element.into())
	}

	fn create_text(&mut self, text: &str) -> Node {
		self.document.create_text_node(text).into()
	}

	fn tag_name(&self, element: &Node) -> String {
		element.dyn_ref::<Element>().map(Element::tag_name).unwrap_or_default()
	}

	fn namespace_uri(&self, element: &Node) -> Option<String> {
		element.dyn_ref::<Element>().and_then(Element::namespace_uri)
	}

	fn attribute_names(&self, element: &Node) -> Vec<String> {
		element.dyn_ref::<Element>().map_or_else(Vec::new, |element| element.get_attribute_names().iter().filter_map(|name| name.as_string()).collect())
	}

	fn attribute(&self, element: &Node, name: &str) -> Option<String> {
		element.dyn_ref::<Element>()?.get_attribute(name)
	}

	fn set_attribute(&mut self, element: &Node, name: &str, value: &str) -> Result<(), DomError> {
		match Self::element(element, "setAttribute") {
			Some(element) => Ok(element.set_attribute(name, value)?),
			None => Err(DomError::Js("not an element".to_owned())),
		}
	}

	fn set_attribute_ns(&mut self, element: &Node, namespace: &str, qualified_name: &str, value: &str) -> Result<(), DomError> {
		match Self::element(element, "setAttributeNS") {
			Some(element) => Ok(element.set_attribute_ns(Some(namespace), qualified_name, value)?),
			None => Err(DomError::Js("not an element".to_owned())),
		}
	}

	fn remove_attribute(&mut self, element: &Node, name: &str) -> Result<(), DomError> {
		match Self::element(element, "removeAttribute") {
			Some(element) => Ok(element.remove_attribute(name)?),
			None => Err(DomError::Js("not an element".to_owned())),
		}
	}

	fn children(&self, node: &Node) -> Vec<Node> {
		let child_nodes = node.child_nodes();
		(0..child_nodes.length()).filter_map(|i| child_nodes.item(i)).collect()
	}

	fn parent(&self, node: &Node) -> Option<Node> {
		node.parent_node()
	}

	fn insert_before(&mut self, parent: &Node, child: &Node, reference: Option<&Node>) -> Result<(), DomError> {
		parent.insert_before(child, reference)?;
		Ok(())
	}

	fn remove_child(&mut self, parent: &Node, child: &Node) -> Result<(), DomError> {
		parent.remove_child(child)?;
		Ok(())
	}

	fn text_content(&self, node: &Node) -> String {
		node.text_content().unwrap_or_default()
	}

	fn set_text_content(&mut self, node: &Node, text: &str) {
		node.set_text_content(Some(text));
	}

	fn scroll_position(&self, element: &Node) -> (i32, i32) {
		(Self::number(element, "scrollLeft").round() as i32, Self::number(element, "scrollTop").round() as i32)
	}

	fn set_scroll_position(&mut self, element: &Node, left: i32, top: i32) {
		for (property, value) in [("scrollLeft", left), ("scrollTop", top)] {
			if let Err(error) = Reflect::set(element, &JsValue::from_str(property), &JsValue::from(value)) {
				error!("Failed to set `{}`: {:?}", property, error);
			}
		}
	}

	fn input_type(&self, input: &Node) -> String {
		input.dyn_ref::<HtmlInputElement>().map(|input| input.type_().to_ascii_lowercase()).unwrap_or_default()
	}

	fn input_value(&self, input: &Node) -> String {
		input.dyn_ref::<HtmlInputElement>().map(HtmlInputElement::value).unwrap_or_default()
	}

	fn set_input_value(&mut self, input: &Node, value: &str) {
		if let Some(input) = input.dyn_ref::<HtmlInputElement>() {
			input.set_value(value);
		}
	}

	fn document_element(&self) -> Option<Node> {
		self.document.document_element().map(Into::into)
	}

	fn replace_document_element(&mut self, root: &Node) -> Result<(), DomError> {
		match self.document.document_element() {
			Some(current) => self.document.replace_child(root, &current)?,
			None => self.document.append_child(root)?,
		};
		Ok(())
	}

	fn is_connected(&self, node: &Node) -> bool {
		node.is_connected()
	}

	fn listen(&mut self, node: &Node, listen: Listen) {
		let target: &EventTarget = node.as_ref();
		for (event, enabled) in [("scroll", listen.scroll), ("input", listen.input)] {
			if enabled {
				if let Err(error) = target.add_event_listener_with_callback(event, self.handler()) {
					error!("Failed to listen to `{}`: {:?}", event, error);
				}
			}
		}
	}

	fn set_observing(&mut self, observing: bool) {
		if observing == self.observing {
			return;
		}
		if observing {
			if let Err(error) = self.observer.observe_with_options(&self.document, &self.observer_init) {
				error!("Failed to observe the document: {:?}", error);
				return;
			}
		} else {
			self.observer.disconnect();
		}
		self.observing = observing;
	}

	fn take_records(&mut self) -> Vec<MutationRecord<Node>> {
		let mut records = core::mem::take(&mut self.queue.borrow_mut().records);
		records.extend(self.observer.take_records().iter().map(JsCast::unchecked_into));
		records.iter().filter_map(Self::convert_record).collect()
	}

	fn take_events(&mut self) -> Vec<UiEvent<Node>> {
		core::mem::take(&mut self.queue.borrow_mut().events)
	}

	fn set_tag(&mut self, node: &Node, id: Option<NodeId>) {
		let key = JsValue::from_str(TAG_PROPERTY);
		let result = match id {
			Some(id) => Reflect::set(node, &key, &JsValue::from(id.0 as f64)).map(drop),
			None => Reflect::delete_property(node.unchecked_ref::<Object>(), &key).map(drop),
		};
		if let Err(error) = result {
			error!("Failed to tag node: {:?}", error);
		}
	}

	fn tag(&self, node: &Node) -> Option<NodeId> {
		let value = Reflect::get(node, &JsValue::from_str(TAG_PROPERTY)).ok()?.as_f64()?;
		Some(NodeId(value as u64))
	}

	fn window_scroll(&self) -> (i32, i32) {
		(self.window.scroll_x().unwrap_or_default().round() as i32, self.window.scroll_y().unwrap_or_default().round() as i32)
	}

	fn scroll_window_to(&mut self, x: i32, y: i32) {
		self.window.scroll_to_with_x_and_y(x.into(), y.into());
	}

	fn window_size(&self) -> (u32, u32) {
		let size = |property| Self::number(&self.window, property).max(0.).round() as u32;
		(size("innerWidth"), size("innerHeight"))
	}

	fn click(&mut self, node: &Node) {
		match node.dyn_ref::<HtmlElement>() {
			Some(element) => element.click(),
			None => warn!("Remote click target is not an HTML element."),
		}
	}
}

/// A [`StreamTree`] over the browser document, pumped automatically whenever local records or events arrive.
pub struct WebStream<S: Store> {
	tree: Rc<RefCell<StreamTree<WebDom, S>>>,
}

/// Wires a [`StreamTree`] to the current document.
///
/// Bind the store through [`WebStream::tree`], then call [`StreamTree::start_stream`].
///
/// # Errors
///
/// Iff [`WebDom::new`] fails.
pub fn connect<S: 'static + Store>(store: S, config: SyncConfig) -> Result<WebStream<S>, JsValue> {
	let tree = Rc::new(RefCell::new(StreamTree::new(WebDom::new()?, store, config)));
	let weak: Weak<RefCell<StreamTree<WebDom, S>>> = Rc::downgrade(&tree);
	let wake: Rc<dyn Fn()> = Rc::new(move || {
		if let Some(tree) = weak.upgrade() {
			// Already borrowed means the engine is running and picks the queue up before it returns.
			if let Ok(mut tree) = tree.try_borrow_mut() {
				tree.pump();
			}
		}
	});
	tree.borrow_mut().dom_mut().set_wake(Some(wake));
	Ok(WebStream { tree })
}

impl<S: Store> WebStream<S> {
	#[must_use]
	pub fn tree(&self) -> &Rc<RefCell<StreamTree<WebDom, S>>> {
		&self.tree
	}

	/// Forwards a store notification, then processes whatever it caused locally.
	pub fn on_store_change(&self, change: &StoreChange) {
		let mut tree = self.tree.borrow_mut();
		tree.on_store_change(change);
		tree.pump();
	}

	/// Stops observation and detaches the engine from the document.
	pub fn disconnect(self) {
		let mut tree = self.tree.borrow_mut();
		tree.disconnect_stream();
		tree.dom_mut().set_wake(None);
	}
}

impl<S: Store> Drop for WebStream<S> {
	fn drop(&mut self) {
		match self.tree.try_borrow_mut() {
			Ok(mut tree) => tree.dom_mut().set_wake(None),
			Err(_) => warn!("`WebStream` dropped while its tree is borrowed."),
		}
	}
}
