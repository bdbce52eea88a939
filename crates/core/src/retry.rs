//! Retrying operations that failed because the sign-in lapsed.
//!
//! Only failures whose wording matches the sign-in vocabulary are retried.
//! Nothing is rolled back between attempts: a retried source addition whose
//! first attempt got as far as submitting leaves a duplicate source behind.

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use tracing::{error, warn};

use crate::clock::Clock;
use crate::error::{DriverError, ErrorCode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
	pub max_attempts: u32,
	pub delay: Duration,
	/// Lower-case phrases that mark a failure as a sign-in problem.
	pub vocabulary: Vec<String>,
}

impl RetryPolicy {
	pub fn with_attempts(&self, max_attempts: u32) -> Self {
		Self {
			max_attempts: max_attempts.max(1),
			..self.clone()
		}
	}

	/// Runs `attempt` until it succeeds, fails for a non-sign-in reason, or attempts run out.
	pub async fn run<T, F, Fut>(&self, clock: &dyn Clock, operation: &'static str, mut attempt: F) -> Result<T, Failure>
	where
		F: FnMut(u32) -> Fut,
		Fut: Future<Output = crate::Result<T>>,
	{
		let mut n = 0;
		loop {
			n += 1;
			let err = match attempt(n).await {
				Ok(value) => return Ok(value),
				Err(err) => err,
			};
			let class = classify(&err, &self.vocabulary);
			if class == ErrorClass::AuthSession && n < self.max_attempts {
				warn!(target = "nbd", operation, attempt = n, max = self.max_attempts, error = %err, "sign-in problem, retrying");
				clock.sleep(self.delay).await;
				continue;
			}
			error!(target = "nbd", operation, attempts = n, error = %err, "operation failed");
			return Err(Failure::new(operation, n, class, &err));
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
	/// Wording points at a lapsed or missing sign-in.
	AuthSession,
	Other,
}

/// Sorts an error by its message. Session errors are never sign-in problems.
pub fn classify(err: &DriverError, vocabulary: &[String]) -> ErrorClass {
	if matches!(err, DriverError::Session(_) | DriverError::InvalidInput(_)) {
		return ErrorClass::Other;
	}
	let message = err.to_string().to_lowercase();
	if vocabulary.iter().any(|phrase| !phrase.is_empty() && message.contains(&phrase.to_lowercase())) {
		ErrorClass::AuthSession
	} else {
		ErrorClass::Other
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
	LikelyAuth,
	Unknown,
}

/// What a caller sees when an operation gives up.
#[derive(Debug, Clone, Serialize)]
pub struct Failure {
	pub operation: &'static str,
	pub kind: FailureKind,
	pub code: ErrorCode,
	pub attempts: u32,
	pub message: String,
	pub remedy: String,
	/// Full error text, for logs.
	#[serde(skip)]
	pub detail: String,
}

impl Failure {
	fn new(operation: &'static str, attempts: u32, class: ErrorClass, err: &DriverError) -> Self {
		let (kind, code) = match class {
			ErrorClass::AuthSession => (FailureKind::LikelyAuth, ErrorCode::AuthSession),
			ErrorClass::Other => (FailureKind::Unknown, err.code()),
		};
		Self {
			operation,
			kind,
			code,
			attempts,
			message: err.user_message(),
			remedy: remedy(kind, code).to_string(),
			detail: err.to_string(),
		}
	}

	/// A failure for input rejected before any browser work.
	pub fn invalid_input(operation: &'static str, err: &DriverError) -> Self {
		Self::new(operation, 0, ErrorClass::Other, err)
	}
}

impl std::fmt::Display for Failure {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{} failed: {}. {}", self.operation, self.message, self.remedy)
	}
}

impl std::error::Error for Failure {}

fn remedy(kind: FailureKind, code: ErrorCode) -> &'static str {
	if kind == FailureKind::LikelyAuth {
		return "Likely a session or sign-in issue: open the profile in a normal browser window, sign in again, then retry.";
	}
	match code {
		ErrorCode::SessionUnavailable => "Check that Chrome is installed and that the profile directory exists and is readable.",
		ErrorCode::AffordanceNotFound => "The application's interface may have changed; update the affordance catalog.",
		ErrorCode::InvalidInput => "Correct the input and retry.",
		_ => "Unknown failure: check the configuration and network, then retry.",
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicU32, Ordering};

	use super::*;
	use crate::clock::ManualClock;
	use crate::config::DriverConfig;

	fn policy() -> RetryPolicy {
		DriverConfig::default().retry_policy()
	}

	fn auth_error() -> DriverError {
		DriverError::NavigationTimeout {
			target: "https://notebooklm.google.com/notebook/x".into(),
			landed_on: "https://accounts.google.com/ServiceLogin?continue=x".into(),
		}
	}

	#[test]
	fn sign_in_redirects_classify_as_auth() {
		assert_eq!(classify(&auth_error(), &policy().vocabulary), ErrorClass::AuthSession);
		assert_eq!(classify(&DriverError::DialogTimeout { ms: 1 }, &policy().vocabulary), ErrorClass::Other);
	}

	#[test]
	fn session_errors_are_never_retried_as_auth() {
		let err = DriverError::Session("unauthorized to open profile".into());
		assert_eq!(classify(&err, &policy().vocabulary), ErrorClass::Other);
	}

	#[tokio::test]
	async fn auth_failures_exhaust_attempts_with_fixed_delay() {
		let clock = ManualClock::new();
		let calls = AtomicU32::new(0);

		let failure = policy()
			.run(&clock, "ask", |_| async {
				calls.fetch_add(1, Ordering::SeqCst);
				Err::<(), _>(auth_error())
			})
			.await
			.unwrap_err();

		assert_eq!(calls.load(Ordering::SeqCst), 3);
		assert_eq!(clock.sleeps(), vec![Duration::from_millis(2_500); 2]);
		assert_eq!(failure.kind, FailureKind::LikelyAuth);
		assert_eq!(failure.code, ErrorCode::AuthSession);
		assert_eq!(failure.attempts, 3);
		assert!(failure.remedy.contains("sign in again"));
	}

	#[tokio::test]
	async fn other_failures_are_not_retried() {
		let clock = ManualClock::new();
		let calls = AtomicU32::new(0);

		let failure = policy()
			.run(&clock, "add_artifact", |_| async {
				calls.fetch_add(1, Ordering::SeqCst);
				Err::<(), _>(DriverError::AffordanceNotFound {
					affordance: "confirm".into(),
					description: "insert button".into(),
					url: "https://notebooklm.google.com/notebook/x".into(),
				})
			})
			.await
			.unwrap_err();

		assert_eq!(calls.load(Ordering::SeqCst), 1);
		assert!(clock.sleeps().is_empty());
		assert_eq!(failure.kind, FailureKind::Unknown);
		assert_eq!(failure.code, ErrorCode::AffordanceNotFound);
		assert!(!failure.message.contains("confirm"));
	}

	#[tokio::test]
	async fn recovery_on_a_later_attempt_succeeds() {
		let clock = ManualClock::new();
		let value = policy()
			.run(&clock, "ask", |n| async move { if n < 2 { Err(auth_error()) } else { Ok(n) } })
			.await
			.unwrap();
		assert_eq!(value, 2);
	}

	#[test]
	fn display_is_one_line_without_internals() {
		let failure = Failure::new("ask", 3, ErrorClass::AuthSession, &auth_error());
		let shown = failure.to_string();
		assert!(shown.starts_with("ask failed: "));
		assert!(!shown.contains('\n'));
		assert!(failure.detail.contains("accounts.google.com"));
	}
}
