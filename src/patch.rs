//! Rewriting of attribute values before they are written to the store.

use crate::{error::SyncError, key::NodeId, platform::is_valid_name};
use tracing::trace;
use url::Url;

/// Attributes whose values are URLs that peers must be able to load without the original document's base.
const URL_ATTRIBUTES: &[&str] = &["action", "background", "cite", "href", "poster", "src"];

/// Applies the attribute patching rule to a value read from the live tree.
///
/// `value` is [`None`] if the attribute is absent, which is passed through so that the caller deletes the key.
/// With a `base_url`, relative URLs in URL-valued attributes are made absolute.
/// Fragment-only references (`#top`) stay relative so they keep pointing into the synchronized document.
///
/// # Errors
///
/// [`SyncError::InvalidAttributeName`] iff `name` can't be an attribute name.
pub fn patch_attribute(base_url: Option<&Url>, element: NodeId, name: &str, value: Option<String>) -> Result<Option<String>, SyncError> {
	if !is_valid_name(name) {
		return Err(SyncError::InvalidAttributeName { element, name: name.to_owned() });
	}
	let value = match value {
		Some(value) => value,
		None => return Ok(None),
	};
	let base_url = match base_url {
		Some(base_url) if is_url_attribute(name) && !value.is_empty() && !value.starts_with('#') => base_url,
		_ => return Ok(Some(value)),
	};
	match base_url.join(value.trim()) {
		Ok(absolute) => {
			trace!(attribute = name, "Resolved relative URL.");
			Ok(Some(absolute.into()))
		}
		// Not a URL after all. Keep whatever the page had.
		Err(_) => Ok(Some(value)),
	}
}

fn is_url_attribute(name: &str) -> bool {
	URL_ATTRIBUTES.iter().any(|candidate| candidate.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn base() -> Url {
		Url::parse("https://example.com/docs/page.html").unwrap()
	}

	#[test]
	fn relative_urls_are_resolved() {
		let base = base();
		assert_eq!(patch_attribute(Some(&base), NodeId(1), "src", Some("img/a.png".to_owned())).unwrap().as_deref(), Some("https://example.com/docs/img/a.png"));
		assert_eq!(patch_attribute(Some(&base), NodeId(1), "HREF", Some("/b".to_owned())).unwrap().as_deref(), Some("https://example.com/b"));
	}

	#[test]
	fn other_values_pass_through() {
		let base = base();
		assert_eq!(patch_attribute(Some(&base), NodeId(1), "href", Some("#top".to_owned())).unwrap().as_deref(), Some("#top"));
		assert_eq!(patch_attribute(Some(&base), NodeId(1), "class", Some("a b".to_owned())).unwrap().as_deref(), Some("a b"));
		assert_eq!(patch_attribute(None, NodeId(1), "src", Some("img/a.png".to_owned())).unwrap().as_deref(), Some("img/a.png"));
		assert_eq!(patch_attribute(Some(&base), NodeId(1), "src", None).unwrap(), None);
	}

	#[test]
	fn invalid_names_are_reported() {
		assert_eq!(
			patch_attribute(None, NodeId(7), "a\"b", Some(String::new())),
			Err(SyncError::InvalidAttributeName { element: NodeId(7), name: "a\"b".to_owned() })
		);
	}

	#[test]
	fn framework_attribute_names_are_rejected() {
		for name in ["@click", "[disabled]", "(click)", "#ref"] {
			assert_eq!(
				patch_attribute(None, NodeId(3), name, Some(String::new())),
				Err(SyncError::InvalidAttributeName { element: NodeId(3), name: name.to_owned() })
			);
		}
		assert_eq!(patch_attribute(None, NodeId(3), "xlink:href", Some("#a".to_owned())).unwrap().as_deref(), Some("#a"));
		assert_eq!(patch_attribute(None, NodeId(3), "data-x.y_z", Some(String::new())).unwrap().as_deref(), Some(""));
	}
}
