use crate::viewport::ViewportRole;
use url::Url;

/// Runtime configuration of a [`StreamTree`](`crate::StreamTree`).
///
/// Log verbosity is configured through `tracing` and the `dangerous-logging` feature instead.
#[derive(Debug, Clone, Default)]
pub struct SyncConfig {
	/// Base against which relative URLs in emitted attributes are resolved.
	pub base_url: Option<Url>,
	/// Enables window-level synchronization in the given role.
	pub viewport: Option<ViewportRole>,
}

impl SyncConfig {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn with_base_url(mut self, base_url: Url) -> Self {
		self.base_url = Some(base_url);
		self
	}

	#[must_use]
	pub fn with_viewport(mut self, role: ViewportRole) -> Self {
		self.viewport = Some(role);
		self
	}
}
