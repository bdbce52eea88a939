//! Opening the application's pages and waiting until they are usable.

use tracing::debug;

use crate::affordance::names;
use crate::context::Context;
use crate::error::{DriverError, Result};
use crate::repository::RepositoryHandle;
use crate::surface::Surface;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
	/// The landing page, where notebooks are created.
	Home,
	Repository(RepositoryHandle),
}

impl Target {
	pub fn url(&self, home: &url::Url) -> String {
		match self {
			Target::Home => home.to_string(),
			Target::Repository(handle) => handle.to_string(),
		}
	}

	/// Affordance whose visibility means the page is ready.
	fn readiness_marker(&self) -> Option<&'static str> {
		match self {
			Target::Home => None,
			Target::Repository(_) => Some(names::QUESTION_INPUT),
		}
	}
}

/// Loads `target`, waits for its readiness marker, then settles.
pub(crate) async fn open<S: Surface>(ctx: &Context<'_>, surface: &S, target: &Target) -> Result<()> {
	let url = target.url(ctx.layout.home());
	let step = ctx.config.timeouts.step();
	debug!(target = "nbd", url = %url, "navigating");
	surface.goto(&url, step).await?;

	if let Some(marker) = target.readiness_marker() {
		let affordance = ctx.affordance(marker)?;
		if ctx.wait_visible(surface, affordance, step).await?.is_none() {
			let landed_on = surface.current_url().await.unwrap_or_default();
			return Err(DriverError::NavigationTimeout { target: url, landed_on });
		}
	}

	ctx.clock.sleep(ctx.config.timeouts.settle()).await;
	Ok(())
}
