#![doc(html_root_url = "https://docs.rs/dom-stream/0.1.0")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Bidirectional synchronization between a live DOM tree and a replicated key-value store.
//!
//! Each synchronized node is one store record. Elements reference an attribute bag record and list their children by id.
//! See [`StreamTree`] for the engine, [`memory`] for an in-process platform and [`web`] for the browser.
//!
//! # Logging
//!
//! All diagnostics go through [`tracing`]. Store values and attribute contents are only logged
//! with the `dangerous-logging` feature enabled, since they may contain personal information.

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

mod builder;
mod config;
mod emit;
mod error;
mod key;
pub mod memory;
mod observer;
mod patch;
mod platform;
mod reconcile;
mod registry;
mod router;
mod store;
mod stream;
pub mod viewport;
pub mod web;

pub use config::SyncConfig;
pub use error::{DomError, SyncError};
pub use key::{decode_scroll_pos, encode_scroll_pos, AttributeBagId, Field, KeyError, NodeId, RecordId, StoreKey, Value};
pub use patch::patch_attribute;
pub use platform::{is_valid_name, Capabilities, Dom, Listen, MutationKind, MutationRecord, NodeKind, UiEvent, SVG_NAMESPACE, XHTML_NAMESPACE, XLINK_NAMESPACE};
pub use registry::{NodeRegistry, TreeNode};
pub use router::PendingMutation;
pub use store::{Record, Store, StoreChange};
pub use stream::StreamTree;
pub use viewport::{ViewportRole, ViewportSync};
