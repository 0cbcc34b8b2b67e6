use crate::key::{KeyError, NodeId, RecordId};
use thiserror::Error;

/// Failure reported by a [`Dom`](`crate::Dom`) implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
	/// The platform rejected a name, like `setAttribute` throwing `InvalidCharacterError`.
	#[error("invalid name {0:?}")]
	InvalidCharacter(String),
	/// The referenced node is not where the operation expects it.
	#[error("node not found")]
	NotFound,
	/// Any other exception thrown by the platform, stringified.
	#[error("{0}")]
	Js(String),
}

/// Everything that can go wrong while synchronizing.
///
/// None of these are fatal: each one is scoped to a single mutation record or store field,
/// which is skipped. They are logged and then handed to the handler installed with
/// [`StreamTree::set_error_handler`](`crate::StreamTree::set_error_handler`).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
	/// A local mutation record targets a node that was never emitted.
	#[error("mutation target was not emitted ({mutation})")]
	UnobservedMutationTarget { mutation: &'static str },

	#[error("invalid attribute name {name:?} on {element}")]
	InvalidAttributeName { element: NodeId, name: String },

	#[error("unknown store field {field:?} for node {node}")]
	UnknownStoreField { node: NodeId, field: String },

	#[error("character data changed on non-text node {node}")]
	CharacterDataOnNonTextNode { node: NodeId },

	#[error("no store record for {id}")]
	MissingStoreRecord { id: RecordId },

	#[error("malformed store key: {0}")]
	MalformedStoreKey(String),

	#[error("malformed {field} value for {id}: expected {expected}")]
	MalformedValue { id: RecordId, field: String, expected: &'static str },

	#[error("platform rejected {operation} on {id}: {error}")]
	PlatformRejected { id: RecordId, operation: &'static str, error: DomError },
}

impl From<KeyError> for SyncError {
	fn from(error: KeyError) -> Self {
		Self::MalformedStoreKey(error.to_string())
	}
}

impl SyncError {
	/// The name of this error's kind, for compact assertions and logs.
	#[must_use]
	pub fn kind(&self) -> &'static str {
		match self {
			Self::UnobservedMutationTarget { .. } => "UnobservedMutationTarget",
			Self::InvalidAttributeName { .. } => "InvalidAttributeName",
			Self::UnknownStoreField { .. } => "UnknownStoreField",
			Self::CharacterDataOnNonTextNode { .. } => "CharacterDataOnNonTextNode",
			Self::MissingStoreRecord { .. } => "MissingStoreRecord",
			Self::MalformedStoreKey(_) => "MalformedStoreKey",
			Self::MalformedValue { .. } => "MalformedValue",
			Self::PlatformRejected { .. } => "PlatformRejected",
		}
	}
}
