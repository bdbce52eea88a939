//! Driver error taxonomy.

use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DriverError>;

/// Errors raised by the driver's components.
///
/// These propagate unchanged to the retry layer, which classifies them and
/// turns them into a user-facing [`Failure`](crate::retry::Failure).
#[derive(Debug, Error)]
pub enum DriverError {
	/// No browser could be opened on the profile or on a clone of it.
	#[error("could not open a browser session: {0}")]
	Session(String),

	/// The readiness marker never appeared after navigating.
	#[error("{target} did not become ready (landed on {landed_on})")]
	NavigationTimeout { target: String, landed_on: String },

	/// A required control could not be found on the page.
	#[error("{affordance} not found on {url}")]
	AffordanceNotFound {
		affordance: String,
		description: String,
		url: String,
	},

	/// The add-source dialog did not close after submitting.
	#[error("source dialog still open after {ms}ms")]
	DialogTimeout { ms: u64 },

	/// No notebook identifier appeared in the address bar after creating one.
	#[error("notebook identifier did not appear within {ms}ms (last url: {last_url})")]
	CreationTimeout { ms: u64, last_url: String },

	/// The answer kept changing, or never arrived, until the deadline.
	#[error("answer did not settle within {ms}ms ({received} characters received)")]
	ResponseTimeout { ms: u64, received: usize },

	/// Transport or script failure at the browser seam.
	#[error("browser: {0}")]
	Surface(String),

	/// Caller input was rejected before touching the browser.
	#[error("invalid input: {0}")]
	InvalidInput(String),

	/// Broken internal invariant.
	#[error("internal error: {0}")]
	Internal(String),

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

impl From<nbd_runtime::Error> for DriverError {
	fn from(err: nbd_runtime::Error) -> Self {
		DriverError::Surface(err.to_string())
	}
}

/// Stable machine-readable failure codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
	SessionUnavailable,
	AuthSession,
	NavigationTimeout,
	AffordanceNotFound,
	DialogTimeout,
	CreationTimeout,
	ResponseTimeout,
	BrowserError,
	InvalidInput,
	InternalError,
}

impl ErrorCode {
	pub fn as_str(self) -> &'static str {
		match self {
			ErrorCode::SessionUnavailable => "SESSION_UNAVAILABLE",
			ErrorCode::AuthSession => "AUTH_SESSION",
			ErrorCode::NavigationTimeout => "NAVIGATION_TIMEOUT",
			ErrorCode::AffordanceNotFound => "AFFORDANCE_NOT_FOUND",
			ErrorCode::DialogTimeout => "DIALOG_TIMEOUT",
			ErrorCode::CreationTimeout => "CREATION_TIMEOUT",
			ErrorCode::ResponseTimeout => "RESPONSE_TIMEOUT",
			ErrorCode::BrowserError => "BROWSER_ERROR",
			ErrorCode::InvalidInput => "INVALID_INPUT",
			ErrorCode::InternalError => "INTERNAL_ERROR",
		}
	}
}

impl std::fmt::Display for ErrorCode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

impl DriverError {
	pub fn code(&self) -> ErrorCode {
		match self {
			DriverError::Session(_) => ErrorCode::SessionUnavailable,
			DriverError::NavigationTimeout { .. } => ErrorCode::NavigationTimeout,
			DriverError::AffordanceNotFound { .. } => ErrorCode::AffordanceNotFound,
			DriverError::DialogTimeout { .. } => ErrorCode::DialogTimeout,
			DriverError::CreationTimeout { .. } => ErrorCode::CreationTimeout,
			DriverError::ResponseTimeout { .. } => ErrorCode::ResponseTimeout,
			DriverError::Surface(_) => ErrorCode::BrowserError,
			DriverError::InvalidInput(_) => ErrorCode::InvalidInput,
			DriverError::Internal(_) | DriverError::Io(_) | DriverError::Json(_) => ErrorCode::InternalError,
		}
	}

	/// Describes the failure without selectors or protocol detail.
	pub fn user_message(&self) -> String {
		match self {
			DriverError::Session(_) => "The browser could not be started on the configured profile".to_string(),
			DriverError::NavigationTimeout { target, .. } => format!("The notebook page at {target} did not finish loading"),
			DriverError::AffordanceNotFound { description, .. } => format!("The {description} could not be found on the page"),
			DriverError::DialogTimeout { .. } => "The add-source dialog did not close after submitting".to_string(),
			DriverError::CreationTimeout { .. } => "The new notebook did not receive an identifier in time".to_string(),
			DriverError::ResponseTimeout { .. } => "The answer did not finish streaming in time".to_string(),
			DriverError::Surface(_) => "The browser connection failed".to_string(),
			DriverError::InvalidInput(reason) => format!("Invalid input: {reason}"),
			DriverError::Internal(_) | DriverError::Io(_) | DriverError::Json(_) => "An unexpected internal error occurred".to_string(),
		}
	}
}
