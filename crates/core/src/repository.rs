//! Notebook addresses.

use std::fmt;

use serde::{Serialize, Serializer};
use url::Url;

use crate::error::{DriverError, Result};

/// Absolute URL of a notebook. The last path segment is its stable id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryHandle {
	url: Url,
	id: String,
}

impl RepositoryHandle {
	pub fn url(&self) -> &Url {
		&self.url
	}

	pub fn id(&self) -> &str {
		&self.id
	}
}

impl fmt::Display for RepositoryHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.url.as_str())
	}
}

impl Serialize for RepositoryHandle {
	fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
		serializer.serialize_str(self.url.as_str())
	}
}

/// What an address-bar URL says about a notebook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlShape {
	/// A notebook with a real id.
	Ready(RepositoryHandle),
	/// The placeholder shown while a notebook is being created.
	Provisioning,
	/// Not a notebook page.
	Elsewhere,
}

/// Where notebooks live in the application: `<base>/<segment>/<id>`.
#[derive(Debug, Clone)]
pub struct RepositoryLayout {
	base: Url,
	segment: String,
	provisioning_id: String,
}

impl RepositoryLayout {
	pub fn new(base: Url, segment: &str, provisioning_id: &str) -> Result<Self> {
		let segment = segment.trim_matches('/');
		if segment.is_empty() || segment.contains('/') {
			return Err(DriverError::InvalidInput(format!("repository segment must be a single path segment, got {segment:?}")));
		}
		if base.cannot_be_a_base() || base.host_str().is_none() {
			return Err(DriverError::InvalidInput(format!("base URL {base} has no host")));
		}
		Ok(Self {
			base,
			segment: segment.to_string(),
			provisioning_id: provisioning_id.to_string(),
		})
	}

	/// The application's landing page, where notebooks are created.
	pub fn home(&self) -> &Url {
		&self.base
	}

	pub fn classify(&self, raw: &str) -> UrlShape {
		let Ok(url) = Url::parse(raw) else {
			return UrlShape::Elsewhere;
		};
		if url.host_str() != self.base.host_str() || url.port_or_known_default() != self.base.port_or_known_default() {
			return UrlShape::Elsewhere;
		}
		let Some(segments) = url.path_segments() else {
			return UrlShape::Elsewhere;
		};
		let segments: Vec<&str> = segments.filter(|s| !s.is_empty()).collect();
		let Some(pos) = segments.iter().position(|s| *s == self.segment) else {
			return UrlShape::Elsewhere;
		};
		match segments.get(pos + 1) {
			Some(id) if *id == self.provisioning_id => UrlShape::Provisioning,
			Some(id) if is_id(id) => UrlShape::Ready(self.handle_for(id)),
			_ => UrlShape::Elsewhere,
		}
	}

	/// Parses a caller-supplied notebook URL or bare id.
	pub fn parse_handle(&self, raw: &str) -> Result<RepositoryHandle> {
		let raw = raw.trim();
		if !raw.contains("://") {
			if is_id(raw) && raw != self.provisioning_id {
				return Ok(self.handle_for(raw));
			}
			return Err(DriverError::InvalidInput(format!("{raw:?} is neither a notebook URL nor a notebook id")));
		}
		match self.classify(raw) {
			UrlShape::Ready(handle) => Ok(handle),
			UrlShape::Provisioning => Err(DriverError::InvalidInput(format!("{raw} is a notebook that is still being created"))),
			UrlShape::Elsewhere => Err(DriverError::InvalidInput(format!(
				"{raw} is not a notebook URL (expected {}/{}/<id>)",
				self.base.as_str().trim_end_matches('/'),
				self.segment
			))),
		}
	}

	fn handle_for(&self, id: &str) -> RepositoryHandle {
		let mut url = self.base.clone();
		url.set_query(None);
		url.set_fragment(None);
		url.set_path(&format!("/{}/{}", self.segment, id));
		RepositoryHandle { url, id: id.to_string() }
	}
}

fn is_id(candidate: &str) -> bool {
	!candidate.is_empty() && candidate.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
