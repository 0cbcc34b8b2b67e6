//! The replicated key-value store this crate synchronizes with.
//!
//! The store itself (its merge protocol, transport and persistence) is external.
//! [`Store`] is the boundary: per-record reads, per-key writes, and id allocation.
//! Change notifications are delivered by the host to [`StreamTree::on_store_change`](`crate::StreamTree::on_store_change`) as [`StoreChange`]s.

use crate::key::{AttributeBagId, Field, RecordId, StoreKey, Value};
use std::collections::BTreeMap;

/// Field map of one record, as read from the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
	fields: BTreeMap<String, Value>,
}

impl Record {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn get(&self, field: &str) -> Option<&Value> {
		self.fields.get(field)
	}

	pub fn insert(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
		self.fields.insert(field.into(), value)
	}

	pub fn remove(&mut self, field: &str) -> Option<Value> {
		self.fields.remove(field)
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.fields.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
		self.fields.iter().map(|(field, value)| (field.as_str(), value))
	}

	fn text(&self, field: Field<'_>) -> Option<&str> {
		self.get(field.as_str()).and_then(Value::as_text)
	}

	#[must_use]
	pub fn tag_name(&self) -> Option<&str> {
		self.text(Field::TagName)
	}

	#[must_use]
	pub fn namespace_uri(&self) -> Option<&str> {
		self.text(Field::NamespaceUri)
	}

	#[must_use]
	pub fn attributes(&self) -> Option<AttributeBagId> {
		self.get(Field::Attributes.as_str()).and_then(Value::as_id).map(|id| AttributeBagId(id.0))
	}

	#[must_use]
	pub fn children(&self) -> Option<&[RecordId]> {
		self.get(Field::Children.as_str()).and_then(Value::as_ids)
	}

	#[must_use]
	pub fn text_content(&self) -> Option<&str> {
		self.text(Field::TextContent)
	}

	#[must_use]
	pub fn scroll_pos(&self) -> Option<&str> {
		self.text(Field::ScrollPos)
	}

	#[must_use]
	pub fn input_value(&self) -> Option<&str> {
		self.text(Field::InputValue)
	}
}

impl FromIterator<(String, Value)> for Record {
	fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
		Self { fields: iter.into_iter().collect() }
	}
}

/// A single changed key, as reported by the store's subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreChange {
	/// The changed key in wire form. Either a [`StoreKey`] encoding or a global key like `SCROLLPOS`.
	pub key: String,
	/// The new value. [`None`] if deleted.
	pub value: Option<Value>,
	pub deleted: bool,
	/// Whether this peer wrote the change itself.
	pub local: bool,
}

impl StoreChange {
	#[must_use]
	pub fn set(key: &StoreKey, value: Value, local: bool) -> Self {
		Self { key: key.encode(), value: Some(value), deleted: false, local }
	}

	#[must_use]
	pub fn delete(key: &StoreKey, local: bool) -> Self {
		Self { key: key.encode(), value: None, deleted: true, local }
	}
}

/// Per-key last-writer-consistent replicated store.
///
/// No ordering guarantee is assumed across different keys.
pub trait Store {
	/// Allocates a record id that is unique across all peers.
	fn next_id(&mut self) -> RecordId;

	/// Reads the full field map of a record, if it exists.
	fn record(&self, id: RecordId) -> Option<Record>;

	fn field(&self, key: &StoreKey) -> Option<Value>;

	fn set(&mut self, key: &StoreKey, value: Value);

	fn delete(&mut self, key: &StoreKey);

	/// Reads a global (non-record) key such as `SCROLLPOS`.
	fn global(&self, name: &str) -> Option<Value>;

	fn set_global(&mut self, name: &str, value: Value);

	/// Writes a global key only if `value` differs from what it currently holds.
	fn set_if_changed(&mut self, name: &str, value: Value) {
		if self.global(name).as_ref() != Some(&value) {
			self.set_global(name, value);
		}
	}
}
