//! The caller-facing operations.

use std::sync::Arc;

use tracing::{debug, info};

use crate::affordance::AffordanceCatalog;
use crate::artifact::ArtifactRequest;
use crate::cdp::ChromeLauncher;
use crate::clock::{Clock, TokioClock};
use crate::config::DriverConfig;
use crate::context::Context;
use crate::error::{DriverError, Result};
use crate::repository::{RepositoryHandle, RepositoryLayout};
use crate::retry::{Failure, RetryPolicy};
use crate::session::SessionAcquirer;
use crate::surface::Launcher;
use crate::{creator, dialog, query};

/// Creates notebooks, adds sources and asks questions.
///
/// Every call opens its own browser session and closes it before returning.
/// Calls on one driver should not overlap: they share a profile.
pub struct NotebookDriver<L> {
	launcher: L,
	config: DriverConfig,
	affordances: AffordanceCatalog,
	layout: RepositoryLayout,
	clock: Arc<dyn Clock>,
}

impl NotebookDriver<ChromeLauncher> {
	/// A driver on a real Chromium, configured from `config`.
	pub fn from_config(config: DriverConfig) -> Result<Self> {
		let launcher = ChromeLauncher::new(config.chrome_path.clone(), config.timeouts.launch());
		let affordances = config.affordance_catalog()?;
		Self::new(launcher, config, affordances, Arc::new(TokioClock))
	}
}

impl<L: Launcher> NotebookDriver<L> {
	pub fn new(launcher: L, config: DriverConfig, affordances: AffordanceCatalog, clock: Arc<dyn Clock>) -> Result<Self> {
		let missing = affordances.missing();
		if !missing.is_empty() {
			return Err(DriverError::InvalidInput(format!("affordance catalog lacks {}", missing.join(", "))));
		}
		let layout = config.layout()?;
		Ok(Self {
			launcher,
			config,
			affordances,
			layout,
			clock,
		})
	}

	pub fn config(&self) -> &DriverConfig {
		&self.config
	}

	pub fn layout(&self) -> &RepositoryLayout {
		&self.layout
	}

	/// Parses a caller-supplied notebook URL or id.
	pub fn repository(&self, raw: &str) -> std::result::Result<RepositoryHandle, Failure> {
		self.layout.parse_handle(raw).map_err(|e| Failure::invalid_input("parse_repository", &e))
	}

	fn context(&self) -> Context<'_> {
		Context {
			clock: self.clock.as_ref(),
			config: &self.config,
			affordances: &self.affordances,
			layout: &self.layout,
		}
	}

	fn acquirer(&self) -> SessionAcquirer<'_, L> {
		SessionAcquirer::new(&self.launcher, &self.config.profile_dir)
	}

	fn policy(&self) -> RetryPolicy {
		self.config.retry_policy()
	}

	/// Creates a notebook. Never retried: a retry could create a second notebook.
	pub async fn create_repository(&self) -> std::result::Result<RepositoryHandle, Failure> {
		let ctx = self.context();
		self.policy()
			.with_attempts(1)
			.run(self.clock.as_ref(), "create_repository", |_| {
				self.acquirer()
					.with_session(self.config.headless, async |session| creator::create(&ctx, session.surface()).await)
			})
			.await
	}

	/// Adds one source. An empty URL list returns at once without opening a browser.
	pub async fn add_artifact(&self, request: &ArtifactRequest, repository: &RepositoryHandle) -> std::result::Result<(), Failure> {
		if request.is_empty() {
			info!(target = "nbd", repository = %repository, "no sources left after filtering, nothing to add");
			return Ok(());
		}
		let attempts = if self.config.retry.artifacts { self.config.retry.max_attempts } else { 1 };
		let ctx = self.context();
		self.policy()
			.with_attempts(attempts)
			.run(self.clock.as_ref(), "add_artifact", |n| {
				debug!(target = "nbd", attempt = n, source = %request.describe(), "adding source");
				self.acquirer().with_session(self.config.headless, async |session| {
					dialog::add_artifact(&ctx, session.surface(), repository, request).await
				})
			})
			.await
	}

	/// Adds sources one after another, each in its own session.
	pub async fn add_artifacts(&self, requests: &[ArtifactRequest], repository: &RepositoryHandle) -> Vec<std::result::Result<(), Failure>> {
		let mut outcomes = Vec::with_capacity(requests.len());
		for request in requests {
			outcomes.push(self.add_artifact(request, repository).await);
		}
		outcomes
	}

	/// Asks a question and returns the settled answer.
	pub async fn ask(&self, question: &str, repository: &RepositoryHandle) -> std::result::Result<String, Failure> {
		let question = question.trim();
		if question.is_empty() {
			return Err(Failure::invalid_input("ask", &DriverError::InvalidInput("question is empty".into())));
		}
		let ctx = self.context();
		self.policy()
			.run(self.clock.as_ref(), "ask", |_| {
				self.acquirer().with_session(self.config.headless, async |session| {
					query::ask(&ctx, session.surface(), repository, question).await
				})
			})
			.await
	}
}
