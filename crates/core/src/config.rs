//! Driver configuration.
//!
//! Every field has a default, so an empty or partial `config.json` is valid.
//! Precedence, lowest first: defaults, the config file, `NBD_*` environment
//! variables, then whatever the caller sets explicitly.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::affordance::AffordanceCatalog;
use crate::artifact::UrlFilter;
use crate::error::{DriverError, Result};
use crate::repository::RepositoryLayout;
use crate::retry::RetryPolicy;

pub const CONFIG_DIR_NAME: &str = "nbd";
pub const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DriverConfig {
	/// Origin of the notebook application.
	pub base_url: String,
	/// Path segment preceding a notebook id, as in `/notebook/<id>`.
	pub repository_segment: String,
	/// Id shown in the address bar while a new notebook is still provisioning.
	pub provisioning_id: String,
	/// Signed-in browser profile (Chrome user-data-dir).
	pub profile_dir: PathBuf,
	pub headless: bool,
	pub chrome_path: Option<PathBuf>,
	/// Affordance catalog layered over the built-in one.
	pub affordances: Option<PathBuf>,
	/// Identical consecutive reads needed before an answer counts as final.
	pub stable_reads: u32,
	pub timeouts: Timeouts,
	pub retry: RetryConfig,
	pub url_filter: UrlFilterConfig,
}

impl Default for DriverConfig {
	fn default() -> Self {
		Self {
			base_url: "https://notebooklm.google.com".to_string(),
			repository_segment: "notebook".to_string(),
			provisioning_id: "creating".to_string(),
			profile_dir: default_profile_dir(),
			headless: true,
			chrome_path: None,
			affordances: None,
			stable_reads: 3,
			timeouts: Timeouts::default(),
			retry: RetryConfig::default(),
			url_filter: UrlFilterConfig::default(),
		}
	}
}

/// Milliseconds for every wait the driver performs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Timeouts {
	pub launch_ms: u64,
	/// Upper bound for a single UI step: load, readiness, a control appearing.
	pub step_ms: u64,
	/// Overall deadline for an answer to arrive and settle.
	pub response_ms: u64,
	pub thinking_grace_ms: u64,
	pub thinking_ms: u64,
	/// Pause after a page becomes ready.
	pub settle_ms: u64,
	/// Pause after a source dialog closes.
	pub post_submit_ms: u64,
	/// Interval between answer text reads.
	pub poll_ms: u64,
	/// Interval between address-bar checks while a notebook is created.
	pub creation_poll_ms: u64,
}

impl Default for Timeouts {
	fn default() -> Self {
		Self {
			launch_ms: 20_000,
			step_ms: 30_000,
			response_ms: 120_000,
			thinking_grace_ms: 5_000,
			thinking_ms: 90_000,
			settle_ms: 1_500,
			post_submit_ms: 3_000,
			poll_ms: 1_000,
			creation_poll_ms: 1_000,
		}
	}
}

impl Timeouts {
	pub fn launch(&self) -> Duration {
		Duration::from_millis(self.launch_ms)
	}
	pub fn step(&self) -> Duration {
		Duration::from_millis(self.step_ms)
	}
	pub fn response(&self) -> Duration {
		Duration::from_millis(self.response_ms)
	}
	pub fn thinking_grace(&self) -> Duration {
		Duration::from_millis(self.thinking_grace_ms)
	}
	pub fn thinking(&self) -> Duration {
		Duration::from_millis(self.thinking_ms)
	}
	pub fn settle(&self) -> Duration {
		Duration::from_millis(self.settle_ms)
	}
	pub fn post_submit(&self) -> Duration {
		Duration::from_millis(self.post_submit_ms)
	}
	pub fn poll(&self) -> Duration {
		Duration::from_millis(self.poll_ms)
	}
	pub fn creation_poll(&self) -> Duration {
		Duration::from_millis(self.creation_poll_ms)
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RetryConfig {
	pub max_attempts: u32,
	pub delay_ms: u64,
	/// Case-insensitive phrases marking a failure as a sign-in problem.
	pub vocabulary: Vec<String>,
	/// Retry source additions too. A retried addition may leave a duplicate source.
	pub artifacts: bool,
}

impl Default for RetryConfig {
	fn default() -> Self {
		Self {
			max_attempts: 3,
			delay_ms: 2_500,
			vocabulary: [
				"login",
				"log in",
				"sign in",
				"signin",
				"session expired",
				"authentication",
				"unauthorized",
				"not authenticated",
				"accounts.google.com",
				"servicelogin",
			]
			.into_iter()
			.map(String::from)
			.collect(),
			artifacts: false,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UrlFilterConfig {
	/// `host` or `host/path-prefix` patterns for search-result and redirect pages.
	pub blocked: Vec<String>,
}

impl Default for UrlFilterConfig {
	fn default() -> Self {
		Self {
			blocked: [
				"vertexaisearch.cloud.google.com",
				"google.com/search",
				"google.com/url",
				"bing.com/search",
				"bing.com/ck",
				"duckduckgo.com/l",
				"html.duckduckgo.com",
				"search.yahoo.com",
				"r.search.yahoo.com",
				"search.brave.com",
			]
			.into_iter()
			.map(String::from)
			.collect(),
		}
	}
}

fn default_profile_dir() -> PathBuf {
	dirs::data_dir()
		.unwrap_or_else(std::env::temp_dir)
		.join(CONFIG_DIR_NAME)
		.join("chrome-profile")
}

impl DriverConfig {
	/// `<config_dir>/nbd/config.json`.
	pub fn default_path() -> Option<PathBuf> {
		dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
	}

	/// Reads a config file. A missing file yields the defaults.
	pub fn load(path: &Path) -> Result<Self> {
		match std::fs::read_to_string(path) {
			Ok(raw) => {
				debug!(target = "nbd", path = %path.display(), "loaded config");
				Ok(serde_json::from_str(&raw)?)
			}
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
			Err(e) => Err(e.into()),
		}
	}

	/// Applies `NBD_PROFILE_DIR`, `NBD_BASE_URL`, `NBD_HEADLESS` and `NBD_CHROME`.
	pub fn apply_env(&mut self) {
		self.apply_env_from(|key| std::env::var(key).ok());
	}

	pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
		if let Some(dir) = lookup("NBD_PROFILE_DIR").filter(|v| !v.is_empty()) {
			self.profile_dir = PathBuf::from(dir);
		}
		if let Some(url) = lookup("NBD_BASE_URL").filter(|v| !v.is_empty()) {
			self.base_url = url;
		}
		if let Some(flag) = lookup("NBD_HEADLESS") {
			match flag.trim().to_ascii_lowercase().as_str() {
				"1" | "true" | "yes" | "on" => self.headless = true,
				"0" | "false" | "no" | "off" => self.headless = false,
				other => debug!(target = "nbd", value = other, "ignoring unrecognized NBD_HEADLESS"),
			}
		}
		if let Some(path) = lookup("NBD_CHROME").filter(|v| !v.is_empty()) {
			self.chrome_path = Some(PathBuf::from(path));
		}
	}

	pub fn layout(&self) -> Result<RepositoryLayout> {
		let base = Url::parse(&self.base_url).map_err(|e| DriverError::InvalidInput(format!("base URL {}: {e}", self.base_url)))?;
		RepositoryLayout::new(base, &self.repository_segment, &self.provisioning_id)
	}

	pub fn url_filter(&self) -> UrlFilter {
		UrlFilter::new(self.url_filter.blocked.iter().cloned())
	}

	pub fn retry_policy(&self) -> RetryPolicy {
		RetryPolicy {
			max_attempts: self.retry.max_attempts.max(1),
			delay: Duration::from_millis(self.retry.delay_ms),
			vocabulary: self.retry.vocabulary.clone(),
		}
	}

	/// The built-in catalog with this config's override file applied.
	pub fn affordance_catalog(&self) -> Result<AffordanceCatalog> {
		match &self.affordances {
			Some(path) => AffordanceCatalog::with_overrides(path),
			None => AffordanceCatalog::builtin(),
		}
	}
}
