//! Page-level protocol calls routed over an attached target session.

use std::sync::Arc;

use nbd_protocol::{DispatchKeyEvent, DispatchMouseEvent, EvaluateResult, KeyEventType, MouseButton, MouseEventType, NavigateResult};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::connection::Connection;
use crate::error::{Error, Result};

/// An attached page target.
#[derive(Clone)]
pub struct PageSession {
	connection: Arc<Connection>,
	target_id: String,
	session_id: String,
}

impl PageSession {
	pub fn new(connection: Arc<Connection>, target_id: String, session_id: String) -> Self {
		Self {
			connection,
			target_id,
			session_id,
		}
	}

	pub fn target_id(&self) -> &str {
		&self.target_id
	}

	async fn call(&self, method: &str, params: Value) -> Result<Value> {
		self.connection.send_to(Some(&self.session_id), method, params).await
	}

	pub(crate) async fn prepare(&self) -> Result<()> {
		self.call("Page.enable", json!({})).await?;
		self.call("Page.bringToFront", json!({})).await?;
		Ok(())
	}

	/// Starts a navigation. Does not wait for the new document to load.
	pub async fn navigate(&self, url: &str) -> Result<()> {
		let result: NavigateResult = serde_json::from_value(self.call("Page.navigate", json!({ "url": url })).await?)?;
		match result.error_text {
			Some(reason) => Err(Error::Navigation {
				url: url.to_string(),
				reason,
			}),
			None => Ok(()),
		}
	}

	/// Evaluates an expression in the page and returns its JSON value.
	///
	/// Promises are awaited. A thrown exception becomes [`Error::Script`].
	pub async fn evaluate(&self, expression: &str) -> Result<Value> {
		let raw = self
			.call(
				"Runtime.evaluate",
				json!({
					"expression": expression,
					"returnByValue": true,
					"awaitPromise": true,
					"userGesture": true
				}),
			)
			.await?;
		let result: EvaluateResult = serde_json::from_value(raw)?;
		if let Some(exception) = result.exception_details {
			return Err(Error::Script(exception.message()));
		}
		Ok(result.result.value.unwrap_or(Value::Null))
	}

	/// Evaluates an expression and deserializes its value.
	pub async fn evaluate_as<T: DeserializeOwned>(&self, expression: &str) -> Result<T> {
		Ok(serde_json::from_value(self.evaluate(expression).await?)?)
	}

	/// Dispatches a left click at viewport coordinates.
	pub async fn click_at(&self, x: f64, y: f64) -> Result<()> {
		for (kind, button, click_count) in [
			(MouseEventType::Moved, MouseButton::None, 0),
			(MouseEventType::Pressed, MouseButton::Left, 1),
			(MouseEventType::Released, MouseButton::Left, 1),
		] {
			let event = DispatchMouseEvent {
				kind,
				x,
				y,
				button,
				click_count,
			};
			self.call("Input.dispatchMouseEvent", serde_json::to_value(&event)?).await?;
		}
		Ok(())
	}

	/// Inserts text at the current focus as if typed or pasted.
	pub async fn insert_text(&self, text: &str) -> Result<()> {
		self.call("Input.insertText", json!({ "text": text })).await?;
		Ok(())
	}

	/// Presses and releases the Enter key.
	pub async fn press_enter(&self) -> Result<()> {
		for (kind, text) in [(KeyEventType::Down, Some("\r".to_string())), (KeyEventType::Up, None)] {
			let event = DispatchKeyEvent {
				kind,
				key: "Enter".into(),
				code: "Enter".into(),
				windows_virtual_key_code: 13,
				text,
			};
			self.call("Input.dispatchKeyEvent", serde_json::to_value(&event)?).await?;
		}
		Ok(())
	}
}
