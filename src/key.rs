//! Identities, compound store keys and store values.
//!
//! Every value in the store is addressed by a record id and a field name.
//! On the wire, the pair is encoded as the JSON array `[id, "field"]`.
//! [`StoreKey::encode`] and [`StoreKey::decode`] are the only two places that know this format,
//! so the writing and the parsing side can't drift apart.

use core::fmt::{self, Display, Formatter};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The raw identity of a record in the store.
///
/// Node ids and attribute bag ids are both allocated from this space,
/// but are kept apart by [`NodeId`] and [`AttributeBagId`] on the engine side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u64);

/// Stable identity of a tree node, shared with all peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

/// Identity of the record holding an element's attributes.
///
/// Never look up an [`AttributeBagId`] as a [`NodeId`] or vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttributeBagId(pub u64);

impl From<NodeId> for RecordId {
	fn from(id: NodeId) -> Self {
		Self(id.0)
	}
}

impl From<AttributeBagId> for RecordId {
	fn from(id: AttributeBagId) -> Self {
		Self(id.0)
	}
}

impl Display for RecordId {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		self.0.fmt(f)
	}
}

impl Display for NodeId {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		self.0.fmt(f)
	}
}

impl Display for AttributeBagId {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "@{}", self.0)
	}
}

/// The fields of a node record that the engine gives meaning to.
///
/// Attribute bag records use attribute names as field names, which all parse as [`Field::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field<'a> {
	TagName,
	NamespaceUri,
	/// Points to the element's [`AttributeBagId`].
	Attributes,
	Children,
	TextContent,
	/// Transient. JSON text `[left, top]`.
	ScrollPos,
	/// Transient. Raw value of a text or search input.
	InputValue,
	Other(&'a str),
}

impl<'a> Field<'a> {
	#[must_use]
	pub fn parse(name: &'a str) -> Self {
		match name {
			"tagName" => Self::TagName,
			"namespaceURI" => Self::NamespaceUri,
			"attributes" => Self::Attributes,
			"children" => Self::Children,
			"textContent" => Self::TextContent,
			"scrollPos" => Self::ScrollPos,
			"inputValue" => Self::InputValue,
			other => Self::Other(other),
		}
	}

	#[must_use]
	pub fn as_str(self) -> &'a str {
		match self {
			Self::TagName => "tagName",
			Self::NamespaceUri => "namespaceURI",
			Self::Attributes => "attributes",
			Self::Children => "children",
			Self::TextContent => "textContent",
			Self::ScrollPos => "scrollPos",
			Self::InputValue => "inputValue",
			Self::Other(other) => other,
		}
	}

	/// Fields that only take effect when a node is materialized.
	#[must_use]
	pub fn is_structural(self) -> bool {
		matches!(self, Self::TagName | Self::NamespaceUri | Self::Attributes)
	}
}

impl Display for Field<'_> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A compound `(id, field)` store key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreKey {
	pub id: RecordId,
	pub field: String,
}

#[derive(Debug, Error)]
#[error("malformed store key {key:?}: {source}")]
pub struct KeyError {
	pub key: String,
	#[source]
	pub source: serde_json::Error,
}

impl StoreKey {
	#[must_use]
	pub fn new(id: impl Into<RecordId>, field: impl Into<String>) -> Self {
		Self { id: id.into(), field: field.into() }
	}

	#[must_use]
	pub fn node(id: NodeId, field: Field<'_>) -> Self {
		Self::new(id, field.as_str())
	}

	#[must_use]
	pub fn attribute(bag: AttributeBagId, name: &str) -> Self {
		Self::new(bag, name)
	}

	#[must_use]
	pub fn field(&self) -> Field<'_> {
		Field::parse(&self.field)
	}

	/// Canonical wire form: `[id,"field"]`.
	#[must_use]
	pub fn encode(&self) -> String {
		serde_json::to_string(&(self.id, self.field.as_str())).expect("An integer and a string always serialize.")
	}

	/// Parses the canonical wire form produced by [`StoreKey::encode`].
	///
	/// # Errors
	///
	/// Iff `key` is not a two-element JSON array of an unsigned integer and a string.
	pub fn decode(key: &str) -> Result<Self, KeyError> {
		serde_json::from_str::<(RecordId, String)>(key)
			.map(|(id, field)| Self { id, field })
			.map_err(|source| KeyError { key: key.to_owned(), source })
	}
}

impl Display for StoreKey {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str(&self.encode())
	}
}

/// A value held by the store.
///
/// The untagged representation is plain JSON: a number, an array of numbers, or a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
	Id(RecordId),
	Ids(Vec<RecordId>),
	Text(String),
}

impl Value {
	#[must_use]
	pub fn as_text(&self) -> Option<&str> {
		match self {
			Self::Text(text) => Some(text),
			_ => None,
		}
	}

	#[must_use]
	pub fn as_id(&self) -> Option<RecordId> {
		match *self {
			Self::Id(id) => Some(id),
			_ => None,
		}
	}

	#[must_use]
	pub fn as_ids(&self) -> Option<&[RecordId]> {
		match self {
			Self::Ids(ids) => Some(ids),
			_ => None,
		}
	}

	/// Short description for logs that must not contain page content.
	#[must_use]
	pub fn kind(&self) -> &'static str {
		match self {
			Self::Id(_) => "id",
			Self::Ids(_) => "id list",
			Self::Text(_) => "text",
		}
	}
}

impl From<&str> for Value {
	fn from(text: &str) -> Self {
		Self::Text(text.to_owned())
	}
}

impl From<String> for Value {
	fn from(text: String) -> Self {
		Self::Text(text)
	}
}

impl From<RecordId> for Value {
	fn from(id: RecordId) -> Self {
		Self::Id(id)
	}
}

impl From<Vec<RecordId>> for Value {
	fn from(ids: Vec<RecordId>) -> Self {
		Self::Ids(ids)
	}
}

/// Serializes a scroll offset the way `scrollPos` stores it.
#[must_use]
pub fn encode_scroll_pos(left: i32, top: i32) -> String {
	serde_json::to_string(&[left, top]).expect("Two integers always serialize.")
}

/// Parses a `scrollPos` value. Fractional offsets are rounded.
///
/// # Errors
///
/// Iff `text` is not a JSON array of exactly two numbers.
#[allow(clippy::cast_possible_truncation)]
pub fn decode_scroll_pos(text: &str) -> Result<(i32, i32), serde_json::Error> {
	let [left, top] = serde_json::from_str::<[f64; 2]>(text)?;
	Ok((left.round() as i32, top.round() as i32))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn key_encoding_is_a_json_pair() {
		let key = StoreKey::node(NodeId(42), Field::Children);
		assert_eq!(key.encode(), r#"[42,"children"]"#);
		assert_eq!(StoreKey::decode(r#"[42,"children"]"#).unwrap(), key);
	}

	#[test]
	fn key_decoding_accepts_whitespace_and_escapes() {
		let key = StoreKey::decode(" [ 7 , \"data-\\\"q\\\"\" ] ").unwrap();
		assert_eq!(key.id, RecordId(7));
		assert_eq!(key.field, "data-\"q\"");
		assert_eq!(StoreKey::decode(&key.encode()).unwrap(), key);
	}

	#[test]
	fn non_compound_keys_are_rejected() {
		assert!(StoreKey::decode("SCROLLPOS").is_err());
		assert!(StoreKey::decode("[1]").is_err());
		assert!(StoreKey::decode(r#"[-1,"children"]"#).is_err());
		assert!(StoreKey::decode(r#"["1","children"]"#).is_err());
	}

	#[test]
	fn field_names_round_trip() {
		for name in ["tagName", "namespaceURI", "attributes", "children", "textContent", "scrollPos", "inputValue", "href"] {
			assert_eq!(Field::parse(name).as_str(), name);
		}
		assert_eq!(Field::parse("href"), Field::Other("href"));
	}

	#[test]
	fn values_are_plain_json() {
		assert_eq!(serde_json::to_string(&Value::Id(RecordId(3))).unwrap(), "3");
		assert_eq!(serde_json::to_string(&Value::Ids(vec![RecordId(1), RecordId(2)])).unwrap(), "[1,2]");
		assert_eq!(serde_json::from_str::<Value>("\"DIV\"").unwrap(), Value::from("DIV"));
		assert_eq!(serde_json::from_str::<Value>("[]").unwrap(), Value::Ids(vec![]));
	}

	#[test]
	fn scroll_positions() {
		assert_eq!(encode_scroll_pos(12, 34), "[12,34]");
		assert_eq!(decode_scroll_pos("[12,34]").unwrap(), (12, 34));
		assert_eq!(decode_scroll_pos("[1.6, 0.2]").unwrap(), (2, 0));
		assert!(decode_scroll_pos("[1]").is_err());
	}
}
