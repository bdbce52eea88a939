//! The add-source dialog.
//!
//! ```text
//! Closed → Opening → KindSelected → PayloadFilled → Submitting → Closing → Closed
//! ```
//!
//! [`DialogPhase::advance`] is the whole state machine; [`add_artifact`] only
//! performs the actions it returns and reports what it saw.

use tracing::{debug, info};

use crate::affordance::names;
use crate::artifact::{ArtifactKind, ArtifactRequest};
use crate::context::Context;
use crate::error::{DriverError, Result};
use crate::navigator::{self, Target};
use crate::repository::RepositoryHandle;
use crate::surface::Surface;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogPhase {
	Closed,
	Opening,
	KindSelected,
	PayloadFilled,
	Submitting,
	Closing,
}

/// What the executor observed after its last action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogEvent {
	/// The page is ready; `overlay_open` when the dialog was already showing.
	Started { overlay_open: bool },
	OverlayShown,
	KindChosen,
	PayloadEntered,
	Submitted,
	OverlayGone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogAction {
	ClickOpen,
	AwaitOverlay,
	SelectKind,
	FillPayload,
	ClickConfirm,
	AwaitClosure,
	/// Final pause before the session may close.
	Settle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
	pub next: DialogPhase,
	pub action: DialogAction,
}

impl DialogPhase {
	/// `None` when `event` cannot happen in this phase.
	pub fn advance(self, event: DialogEvent) -> Option<Transition> {
		use DialogAction as A;
		use DialogEvent as E;
		use DialogPhase as P;

		let (next, action) = match (self, event) {
			(P::Closed, E::Started { overlay_open: false }) => (P::Opening, A::ClickOpen),
			(P::Closed, E::Started { overlay_open: true }) => (P::Opening, A::AwaitOverlay),
			(P::Opening, E::OverlayShown) => (P::KindSelected, A::SelectKind),
			(P::KindSelected, E::KindChosen) => (P::PayloadFilled, A::FillPayload),
			(P::PayloadFilled, E::PayloadEntered) => (P::Submitting, A::ClickConfirm),
			(P::Submitting, E::Submitted) => (P::Closing, A::AwaitClosure),
			(P::Closing, E::OverlayGone) => (P::Closed, A::Settle),
			_ => return None,
		};
		Some(Transition { next, action })
	}
}

fn kind_affordance(kind: ArtifactKind) -> &'static str {
	match kind {
		ArtifactKind::PastedText => names::KIND_PASTED_TEXT,
		ArtifactKind::UrlList => names::KIND_WEBSITES,
	}
}

/// Adds one source to `repository`. An empty URL list does nothing.
pub(crate) async fn add_artifact<S: Surface>(ctx: &Context<'_>, surface: &S, repository: &RepositoryHandle, request: &ArtifactRequest) -> Result<()> {
	if request.is_empty() {
		debug!(target = "nbd", "no urls left to add");
		return Ok(());
	}
	navigator::open(ctx, surface, &Target::Repository(repository.clone())).await?;
	run_dialog(ctx, surface, request).await?;
	info!(target = "nbd", repository = %repository, source = %request.describe(), "source added");
	Ok(())
}

async fn run_dialog<S: Surface>(ctx: &Context<'_>, surface: &S, request: &ArtifactRequest) -> Result<()> {
	let kind_name = kind_affordance(request.kind());
	let kind = ctx.affordance(kind_name)?;
	let overlay = ctx.affordance(names::DIALOG_OVERLAY)?;
	let confirm = ctx.affordance(names::CONFIRM)?;
	let step = ctx.config.timeouts.step();

	// the overlay only matches the source dialog's own wording
	let overlay_open = surface.locate(kind).await?.is_some() || surface.locate(overlay).await?.is_some();
	let mut phase = DialogPhase::Closed;
	let mut event = DialogEvent::Started { overlay_open };

	loop {
		let Transition { next, action } = phase
			.advance(event)
			.ok_or_else(|| DriverError::Internal(format!("dialog cannot handle {event:?} while {phase:?}")))?;
		debug!(target = "nbd", from = ?phase, to = ?next, ?action, "dialog step");
		phase = next;

		event = match action {
			DialogAction::ClickOpen => {
				let open = ctx.require(surface, names::ADD_SOURCE).await?;
				surface.click(&open).await?;
				ctx.require(surface, kind_name).await?;
				DialogEvent::OverlayShown
			}
			DialogAction::AwaitOverlay => {
				ctx.require(surface, kind_name).await?;
				DialogEvent::OverlayShown
			}
			DialogAction::SelectKind => {
				let button = ctx.require(surface, kind_name).await?;
				surface.click(&button).await?;
				DialogEvent::KindChosen
			}
			DialogAction::FillPayload => {
				let field = ctx.require(surface, names::PAYLOAD_FIELD).await?;
				surface.fill(&field, &request.payload()).await?;
				DialogEvent::PayloadEntered
			}
			DialogAction::ClickConfirm => {
				let button = ctx.require(surface, names::CONFIRM).await?;
				surface.click(&button).await?;
				DialogEvent::Submitted
			}
			DialogAction::AwaitClosure => {
				if !ctx.wait_gone(surface, &[kind, confirm], step).await? {
					return Err(DriverError::DialogTimeout {
						ms: ctx.config.timeouts.step_ms,
					});
				}
				DialogEvent::OverlayGone
			}
			DialogAction::Settle => {
				ctx.clock.sleep(ctx.config.timeouts.post_submit()).await;
				return Ok(());
			}
		};
	}
}
