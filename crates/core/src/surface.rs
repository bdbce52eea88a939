//! The capability seam between the driver and a browser.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::affordance::Affordance;
use crate::error::Result;

/// An element found by [`Surface::locate`], valid until the page re-renders it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle {
	id: String,
	label: String,
}

impl ElementHandle {
	pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			label: label.into(),
		}
	}

	pub fn id(&self) -> &str {
		&self.id
	}

	/// The visible label the element matched with.
	pub fn label(&self) -> &str {
		&self.label
	}
}

/// One open page in a browser bound to a profile.
///
/// `locate` and `count` only consider visible elements; an affordance that is
/// rendered but hidden is reported as absent.
#[async_trait]
pub trait Surface: Send + Sync {
	/// Navigates and waits for the document's content-loaded milestone.
	async fn goto(&self, url: &str, timeout: Duration) -> Result<()>;

	async fn current_url(&self) -> Result<String>;

	async fn locate(&self, affordance: &Affordance) -> Result<Option<ElementHandle>>;

	async fn count(&self, affordance: &Affordance) -> Result<usize>;

	async fn click(&self, element: &ElementHandle) -> Result<()>;

	/// Replaces the element's content with `text`.
	async fn fill(&self, element: &ElementHandle, text: &str) -> Result<()>;

	async fn press_enter(&self, element: &ElementHandle) -> Result<()>;

	async fn text(&self, element: &ElementHandle) -> Result<String>;

	/// Shuts the browser down and flushes the profile.
	async fn close(self) -> Result<()>
	where
		Self: Sized;
}

/// Why a browser could not be opened on a profile.
#[derive(Debug, Error)]
pub enum LaunchError {
	/// Another process owns the profile directory.
	#[error("profile is already in use by {holder}")]
	InUse { holder: String },

	#[error("{0}")]
	Failed(String),
}

impl LaunchError {
	/// Sorts a free-form launch failure into the in-use class when its wording says so.
	pub fn from_message(message: impl Into<String>) -> Self {
		let message = message.into();
		let lower = message.to_lowercase();
		if ["already in use", "singletonlock", "profile is locked", "user data directory is already"]
			.iter()
			.any(|needle| lower.contains(needle))
		{
			LaunchError::InUse { holder: message }
		} else {
			LaunchError::Failed(message)
		}
	}
}

/// Opens surfaces on a profile directory.
#[async_trait]
pub trait Launcher: Send + Sync {
	type Surface: Surface;

	async fn launch(&self, profile: &Path, headless: bool) -> std::result::Result<Self::Surface, LaunchError>;
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn in_use_wording_is_recognized() {
		assert!(matches!(
			LaunchError::from_message("The user data directory is already in use, please specify a unique value"),
			LaunchError::InUse { .. }
		));
		assert!(matches!(LaunchError::from_message("chrome: not found"), LaunchError::Failed(_)));
	}
}
