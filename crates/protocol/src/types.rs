//! Payload types for the protocol methods the driver calls.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `/json/version` response subset served by the remote-debugging HTTP endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CdpVersionInfo {
	#[serde(rename = "webSocketDebuggerUrl")]
	pub web_socket_debugger_url: String,
	#[serde(rename = "Browser", default)]
	pub browser: Option<String>,
}

/// Target description returned by `Target.getTargets`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetInfo {
	pub target_id: String,
	#[serde(rename = "type")]
	pub kind: String,
	#[serde(default)]
	pub title: String,
	#[serde(default)]
	pub url: String,
	#[serde(default)]
	pub attached: bool,
}

impl TargetInfo {
	/// Returns true for top-level page targets.
	pub fn is_page(&self) -> bool {
		self.kind == "page"
	}
}

/// `Target.getTargets` result.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTargetsResult {
	pub target_infos: Vec<TargetInfo>,
}

/// `Target.createTarget` result.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTargetResult {
	pub target_id: String,
}

/// `Target.attachToTarget` result.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachToTargetResult {
	pub session_id: String,
}

/// `Page.navigate` result.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigateResult {
	pub frame_id: String,
	#[serde(default)]
	pub loader_id: Option<String>,
	/// Set when the navigation failed at the network level.
	#[serde(default)]
	pub error_text: Option<String>,
}

/// Mirror object referencing a JavaScript value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteObject {
	#[serde(rename = "type")]
	pub kind: String,
	#[serde(default)]
	pub subtype: Option<String>,
	/// Present when evaluated with `returnByValue`.
	#[serde(default)]
	pub value: Option<Value>,
	#[serde(default)]
	pub description: Option<String>,
}

/// Details about a script exception.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionDetails {
	pub text: String,
	#[serde(default)]
	pub line_number: i64,
	#[serde(default)]
	pub column_number: i64,
	#[serde(default)]
	pub exception: Option<RemoteObject>,
}

impl ExceptionDetails {
	/// Best human-readable description of the thrown value.
	pub fn message(&self) -> String {
		self.exception
			.as_ref()
			.and_then(|e| e.description.clone())
			.unwrap_or_else(|| self.text.clone())
	}
}

/// `Runtime.evaluate` result.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateResult {
	pub result: RemoteObject,
	#[serde(default)]
	pub exception_details: Option<ExceptionDetails>,
}

/// Mouse button for synthesized clicks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
	None,
	Left,
	Right,
	Middle,
}

/// `Input.dispatchMouseEvent` event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MouseEventType {
	#[serde(rename = "mouseMoved")]
	Moved,
	#[serde(rename = "mousePressed")]
	Pressed,
	#[serde(rename = "mouseReleased")]
	Released,
}

/// `Input.dispatchKeyEvent` event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyEventType {
	#[serde(rename = "keyDown")]
	Down,
	#[serde(rename = "keyUp")]
	Up,
	#[serde(rename = "char")]
	Char,
}

/// Parameters for `Input.dispatchMouseEvent`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchMouseEvent {
	#[serde(rename = "type")]
	pub kind: MouseEventType,
	pub x: f64,
	pub y: f64,
	pub button: MouseButton,
	pub click_count: u32,
}

/// Parameters for `Input.dispatchKeyEvent`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchKeyEvent {
	#[serde(rename = "type")]
	pub kind: KeyEventType,
	pub key: String,
	pub code: String,
	pub windows_virtual_key_code: u32,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub text: Option<String>,
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn version_info_reads_debugger_url() {
		let info: CdpVersionInfo = serde_json::from_value(json!({
			"Browser": "Chrome/126.0.6478.126",
			"Protocol-Version": "1.3",
			"webSocketDebuggerUrl": "ws://127.0.0.1:9222/devtools/browser/abc"
		}))
		.unwrap();
		assert_eq!(info.web_socket_debugger_url, "ws://127.0.0.1:9222/devtools/browser/abc");
		assert_eq!(info.browser.as_deref(), Some("Chrome/126.0.6478.126"));
	}

	#[test]
	fn mouse_event_uses_protocol_names() {
		let ev = DispatchMouseEvent {
			kind: MouseEventType::Pressed,
			x: 10.0,
			y: 20.5,
			button: MouseButton::Left,
			click_count: 1,
		};
		let value = serde_json::to_value(&ev).unwrap();
		assert_eq!(value["type"], "mousePressed");
		assert_eq!(value["button"], "left");
		assert_eq!(value["clickCount"], 1);
	}

	#[test]
	fn exception_message_prefers_description() {
		let details: ExceptionDetails = serde_json::from_value(json!({
			"text": "Uncaught",
			"exception": { "type": "object", "subtype": "error", "description": "TypeError: boom" }
		}))
		.unwrap();
		assert_eq!(details.message(), "TypeError: boom");
	}

	#[test]
	fn target_info_detects_pages() {
		let info: TargetInfo = serde_json::from_value(json!({
			"targetId": "T1",
			"type": "page",
			"title": "New Tab",
			"url": "chrome://newtab/",
			"attached": false
		}))
		.unwrap();
		assert!(info.is_page());
	}
}
