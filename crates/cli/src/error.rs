use nbd::{ErrorCode, Failure};
use thiserror::Error;

use crate::output::CommandError;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
	#[error("configuration: {0}")]
	Config(String),

	/// Bad arguments or unreadable input files.
	#[error("{0}")]
	Input(String),

	#[error(transparent)]
	Failure(#[from] Failure),

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Json(#[from] serde_json::Error),

	#[error(transparent)]
	Anyhow(#[from] anyhow::Error),
}

impl From<nbd::DriverError> for CliError {
	fn from(err: nbd::DriverError) -> Self {
		CliError::Config(err.to_string())
	}
}

impl CliError {
	/// Converts this error to the envelope's error object.
	pub fn to_command_error(&self) -> CommandError {
		let (code, message) = match self {
			CliError::Failure(failure) => {
				return CommandError {
					code: failure.code,
					kind: Some(failure.kind),
					message: failure.message.clone(),
					remedy: Some(failure.remedy.clone()),
					attempts: Some(failure.attempts),
				};
			}
			CliError::Config(msg) => (ErrorCode::InvalidInput, format!("Configuration error: {msg}")),
			CliError::Input(msg) => (ErrorCode::InvalidInput, msg.clone()),
			CliError::Io(err) => (ErrorCode::InvalidInput, err.to_string()),
			CliError::Json(err) => (ErrorCode::InvalidInput, format!("JSON error: {err}")),
			// anyhow errors carry file context, print the whole chain
			CliError::Anyhow(err) => (ErrorCode::InvalidInput, format!("{err:#}")),
		};
		CommandError {
			code,
			kind: None,
			message,
			remedy: None,
			attempts: None,
		}
	}

	/// Full text for debug logs, including details hidden from users.
	pub fn detail(&self) -> String {
		match self {
			CliError::Failure(failure) => failure.detail.clone(),
			CliError::Anyhow(err) => format!("{err:?}"),
			other => other.to_string(),
		}
	}
}

#[cfg(test)]
mod tests {
	use nbd::FailureKind;

	use super::*;

	#[test]
	fn failure_keeps_kind_attempts_and_remedy() {
		let failure = Failure {
			operation: "ask",
			kind: FailureKind::LikelyAuth,
			code: ErrorCode::AuthSession,
			attempts: 3,
			message: "The notebook page did not finish loading".into(),
			remedy: "Sign in again".into(),
			detail: "navigation timeout on .question-box".into(),
		};
		let err = CliError::from(failure);
		let cmd = err.to_command_error();
		assert_eq!(cmd.code, ErrorCode::AuthSession);
		assert_eq!(cmd.kind, Some(FailureKind::LikelyAuth));
		assert_eq!(cmd.attempts, Some(3));
		assert!(!cmd.message.contains(".question-box"));
		assert!(err.detail().contains(".question-box"));
	}

	#[test]
	fn anyhow_context_is_kept_in_message() {
		let err: CliError = anyhow::anyhow!("No such file").context("reading summary.json").into();
		let cmd = err.to_command_error();
		assert_eq!(cmd.code, ErrorCode::InvalidInput);
		assert_eq!(cmd.message, "reading summary.json: No such file");
	}
}
