//! Error types for the browser runtime.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while launching or talking to the browser.
#[derive(Debug, Error)]
pub enum Error {
	/// No Chrome/Chromium executable could be located.
	#[error("Could not find a Chrome/Chromium executable. Install Chrome or set `chrome_path`.")]
	ExecutableNotFound,

	/// Another browser process currently owns the profile directory.
	#[error("Browser profile {} is already in use by {holder}", path.display())]
	ProfileInUse { path: PathBuf, holder: String },

	/// Browser process could not be started or exited during startup.
	#[error("Failed to launch browser: {0}")]
	LaunchFailed(String),

	/// Failed to establish the debugging connection.
	#[error("Failed to connect to browser: {0}")]
	ConnectionFailed(String),

	/// Error returned by the browser for a protocol call.
	#[error("{method} failed ({code}): {message}")]
	Remote {
		method: String,
		code: i64,
		message: String,
	},

	/// A page script threw.
	#[error("Script error: {0}")]
	Script(String),

	/// Navigation failed at the network level.
	#[error("Navigation to '{url}' failed: {reason}")]
	Navigation { url: String, reason: String },

	/// I/O error.
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	/// JSON serialization/deserialization error.
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	/// Timeout waiting for operation.
	#[error("Timeout: {0}")]
	Timeout(String),

	/// Connection closed while a request was pending.
	#[error("Channel closed unexpectedly")]
	ChannelClosed,
}
