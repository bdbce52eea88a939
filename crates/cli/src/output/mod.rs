//! Result envelope printed by every command.
//!
//! ```json
//! { "ok": true, "op": "ask", "data": { "answer": "..." } }
//! ```
//!
//! On failure:
//!
//! ```json
//! {
//!   "ok": false,
//!   "op": "ask",
//!   "error": {
//!     "code": "AUTH_SESSION",
//!     "kind": "likely_auth",
//!     "message": "The notebook page at https://... did not finish loading",
//!     "remedy": "Likely a session or sign-in issue: ...",
//!     "attempts": 3
//!   }
//! }
//! ```


use nbd::{ErrorCode, FailureKind};
use serde::Serialize;

/// Current schema version for command output.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
	/// Pretty JSON envelope (default)
	#[default]
	Json,
	/// Plain answers and URLs for people
	Text,
}

impl std::fmt::Display for OutputFormat {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			OutputFormat::Json => write!(f, "json"),
			OutputFormat::Text => write!(f, "text"),
		}
	}
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult<T: Serialize> {
	pub schema_version: u32,
	pub ok: bool,
	pub op: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<T>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<CommandError>,
}

impl<T: Serialize> CommandResult<T> {
	pub fn success(op: &str, data: T) -> Self {
		Self {
			schema_version: SCHEMA_VERSION,
			ok: true,
			op: op.to_string(),
			data: Some(data),
			error: None,
		}
	}

	pub fn failure(op: &str, error: CommandError) -> Self {
		Self {
			schema_version: SCHEMA_VERSION,
			ok: false,
			op: op.to_string(),
			data: None,
			error: Some(error),
		}
	}
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandError {
	pub code: ErrorCode,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub kind: Option<FailureKind>,
	pub message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub remedy: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub attempts: Option<u32>,
}

/// What `-f text` prints for a successful command.
pub trait TextOutput {
	fn text(&self) -> String;
}

/// Prints the JSON envelope. Text mode prints successes via [`print_success`]
/// and failures via [`print_error_stderr`] only.
pub fn print_result<T: Serialize>(result: &CommandResult<T>) {
	match serde_json::to_string_pretty(result) {
		Ok(json) => println!("{json}"),
		Err(e) => tracing::error!(op = %result.op, error = %e, "could not serialize command result"),
	}
}

/// Prints a success, using the data's own text rendering for `-f text`.
pub fn print_success<T: Serialize + TextOutput>(op: &str, data: T, format: OutputFormat) {
	match format {
		OutputFormat::Text => println!("{}", data.text()),
		OutputFormat::Json => print_result(&CommandResult::success(op, data)),
	}
}

pub fn print_error_stderr(error: &CommandError) {
	eprintln!("Error [{}]: {}", error.code, error.message);
	if let Some(remedy) = &error.remedy {
		eprintln!("  {remedy}");
	}
}
