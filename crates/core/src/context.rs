use std::time::Duration;

use tracing::debug;

use crate::affordance::{Affordance, AffordanceCatalog};
use crate::clock::Clock;
use crate::config::DriverConfig;
use crate::error::{DriverError, Result};
use crate::repository::RepositoryLayout;
use crate::surface::{ElementHandle, Surface};

/// Everything a page operation reads besides the surface itself.
pub(crate) struct Context<'a> {
	pub clock: &'a dyn Clock,
	pub config: &'a DriverConfig,
	pub affordances: &'a AffordanceCatalog,
	pub layout: &'a RepositoryLayout,
}

impl Context<'_> {
	pub fn affordance(&self, name: &str) -> Result<&Affordance> {
		self.affordances.get(name)
	}

	/// Polls until `affordance` is visible or `timeout` passes.
	///
	/// Lookup errors while polling count as "not yet"; pages throw them while
	/// a navigation swaps the document.
	pub async fn wait_visible<S: Surface>(&self, surface: &S, affordance: &Affordance, timeout: Duration) -> Result<Option<ElementHandle>> {
		let deadline = self.clock.now() + timeout;
		loop {
			match surface.locate(affordance).await {
				Ok(Some(element)) => return Ok(Some(element)),
				Ok(None) => {}
				Err(e) => debug!(target = "nbd", affordance = affordance.name(), error = %e, "lookup failed while waiting"),
			}
			if self.clock.now() >= deadline {
				return Ok(None);
			}
			self.clock.sleep(self.config.timeouts.poll()).await;
		}
	}

	/// Polls until `affordances` are all absent. `false` on timeout.
	pub async fn wait_gone<S: Surface>(&self, surface: &S, affordances: &[&Affordance], timeout: Duration) -> Result<bool> {
		let deadline = self.clock.now() + timeout;
		loop {
			let mut present = false;
			for affordance in affordances {
				match surface.locate(affordance).await {
					Ok(Some(_)) => {
						present = true;
						break;
					}
					Ok(None) => {}
					Err(e) => {
						debug!(target = "nbd", affordance = affordance.name(), error = %e, "lookup failed while waiting");
						present = true;
						break;
					}
				}
			}
			if !present {
				return Ok(true);
			}
			if self.clock.now() >= deadline {
				return Ok(false);
			}
			self.clock.sleep(self.config.timeouts.poll()).await;
		}
	}

	/// Waits one UI step for `name`, failing with [`DriverError::AffordanceNotFound`].
	pub async fn require<S: Surface>(&self, surface: &S, name: &str) -> Result<ElementHandle> {
		let affordance = self.affordance(name)?;
		match self.wait_visible(surface, affordance, self.config.timeouts.step()).await? {
			Some(element) => Ok(element),
			None => Err(DriverError::AffordanceNotFound {
				affordance: name.to_string(),
				description: affordance.description.clone(),
				url: surface.current_url().await.unwrap_or_default(),
			}),
		}
	}
}
