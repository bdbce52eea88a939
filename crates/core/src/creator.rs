//! Creating a notebook.
//!
//! ```text
//! Idle → Navigating → Clicking → WaitingForIdentifier → Ready
//! ```
//!
//! After the create click the application first shows a provisioning
//! placeholder in the address bar and only later swaps in the real id.

use tracing::{debug, info};

use crate::affordance::names;
use crate::context::Context;
use crate::error::{DriverError, Result};
use crate::navigator::{self, Target};
use crate::repository::{RepositoryHandle, UrlShape};
use crate::surface::Surface;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreatorPhase {
	Idle,
	Navigating,
	Clicking,
	WaitingForIdentifier,
	Ready(RepositoryHandle),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreatorEvent {
	Begin,
	HomeLoaded,
	Clicked,
	/// The address bar, classified.
	Address(UrlShape),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreatorAction {
	NavigateHome,
	ClickCreate,
	/// Wait one interval and read the address bar again.
	PollAddress,
	ConfirmReady,
}

impl CreatorPhase {
	pub fn advance(self, event: CreatorEvent) -> Option<(CreatorPhase, CreatorAction)> {
		match (self, event) {
			(CreatorPhase::Idle, CreatorEvent::Begin) => Some((CreatorPhase::Navigating, CreatorAction::NavigateHome)),
			(CreatorPhase::Navigating, CreatorEvent::HomeLoaded) => Some((CreatorPhase::Clicking, CreatorAction::ClickCreate)),
			(CreatorPhase::Clicking, CreatorEvent::Clicked) => Some((CreatorPhase::WaitingForIdentifier, CreatorAction::PollAddress)),
			(CreatorPhase::WaitingForIdentifier, CreatorEvent::Address(UrlShape::Ready(handle))) => {
				Some((CreatorPhase::Ready(handle), CreatorAction::ConfirmReady))
			}
			(CreatorPhase::WaitingForIdentifier, CreatorEvent::Address(_)) => {
				Some((CreatorPhase::WaitingForIdentifier, CreatorAction::PollAddress))
			}
			_ => None,
		}
	}
}

/// Creates a notebook and returns its handle once its page is usable.
pub(crate) async fn create<S: Surface>(ctx: &Context<'_>, surface: &S) -> Result<RepositoryHandle> {
	let step = ctx.config.timeouts.step();
	let mut phase = CreatorPhase::Idle;
	let mut event = CreatorEvent::Begin;
	let mut deadline = None;
	let mut last_url = String::new();

	loop {
		let (next, action) = phase
			.clone()
			.advance(event.clone())
			.ok_or_else(|| DriverError::Internal(format!("creator cannot handle {event:?} while {phase:?}")))?;
		debug!(target = "nbd", from = ?phase, to = ?next, ?action, "creator step");
		phase = next;

		event = match action {
			CreatorAction::NavigateHome => {
				navigator::open(ctx, surface, &Target::Home).await?;
				CreatorEvent::HomeLoaded
			}
			CreatorAction::ClickCreate => {
				let button = ctx.require(surface, names::CREATE_REPOSITORY).await?;
				surface.click(&button).await?;
				deadline = Some(ctx.clock.now() + step);
				CreatorEvent::Clicked
			}
			CreatorAction::PollAddress => {
				if deadline.is_some_and(|at| ctx.clock.now() >= at) {
					return Err(DriverError::CreationTimeout {
						ms: ctx.config.timeouts.step_ms,
						last_url,
					});
				}
				ctx.clock.sleep(ctx.config.timeouts.creation_poll()).await;
				last_url = surface.current_url().await?;
				CreatorEvent::Address(ctx.layout.classify(&last_url))
			}
			CreatorAction::ConfirmReady => {
				let CreatorPhase::Ready(handle) = &phase else {
					return Err(DriverError::Internal("confirming readiness outside the ready phase".into()));
				};
				let marker = ctx.affordance(names::QUESTION_INPUT)?;
				if ctx.wait_visible(surface, marker, step).await?.is_none() {
					return Err(DriverError::NavigationTimeout {
						target: handle.to_string(),
						landed_on: surface.current_url().await.unwrap_or_default(),
					});
				}
				info!(target = "nbd", repository = %handle, "notebook created");
				return Ok(handle.clone());
			}
		};
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{Effect, FakeSurface, Harness};

	const HOME: &str = "https://notebooklm.google.com/";
	const CREATING: &str = "https://notebooklm.google.com/notebook/creating";
	const CREATED: &str = "https://notebooklm.google.com/notebook/4b1e9c";

	fn home_page() -> FakeSurface {
		let surface = FakeSurface::new();
		surface.on_goto(vec![Effect::Show(names::CREATE_REPOSITORY)]);
		surface
	}

	#[test]
	fn placeholder_keeps_waiting() {
		let phase = CreatorPhase::WaitingForIdentifier;
		let (next, action) = phase.advance(CreatorEvent::Address(UrlShape::Provisioning)).unwrap();
		assert_eq!(next, CreatorPhase::WaitingForIdentifier);
		assert_eq!(action, CreatorAction::PollAddress);
	}

	#[test]
	fn clicking_before_home_loads_is_rejected() {
		assert!(CreatorPhase::Idle.advance(CreatorEvent::Clicked).is_none());
	}

	#[tokio::test]
	async fn waits_past_the_provisioning_placeholder() {
		let hx = Harness::new();
		let surface = home_page();
		surface.on_click(
			names::CREATE_REPOSITORY,
			vec![
				Effect::Urls(vec![HOME.into(), CREATING.into(), CREATING.into(), CREATED.into()]),
				Effect::Show(names::QUESTION_INPUT),
			],
		);

		let handle = create(&hx.ctx(), &surface).await.unwrap();

		assert_eq!(handle.to_string(), CREATED);
		assert_eq!(handle.id(), "4b1e9c");
		let polls = hx.clock.sleeps().iter().filter(|d| **d == hx.config.timeouts.creation_poll()).count();
		assert!(polls >= 4, "polled {polls} times");
	}

	#[tokio::test]
	async fn placeholder_forever_times_out() {
		let hx = Harness::new();
		let surface = home_page();
		surface.on_click(names::CREATE_REPOSITORY, vec![Effect::Urls(vec![CREATING.into()])]);

		match create(&hx.ctx(), &surface).await {
			Err(DriverError::CreationTimeout { last_url, .. }) => assert_eq!(last_url, CREATING),
			other => panic!("expected creation timeout, got {other:?}"),
		}
	}

	#[tokio::test]
	async fn missing_create_button_is_reported() {
		let hx = Harness::new();
		let surface = FakeSurface::new();

		match create(&hx.ctx(), &surface).await {
			Err(DriverError::AffordanceNotFound { affordance, .. }) => assert_eq!(affordance, names::CREATE_REPOSITORY),
			other => panic!("expected missing create button, got {other:?}"),
		}
	}
}
