//! Envelope types for DevTools protocol messages.
//!
//! Every frame on the debugging socket is one of three shapes:
//!
//! 1. A [`Request`] we send, carrying a numeric `id`
//! 2. A [`Response`] correlated to that `id`, with either `result` or `error`
//! 3. An [`Event`] pushed by the browser, carrying a `method` and no `id`
//!
//! When a target is attached in flattened mode, requests and events addressed
//! to that target carry its `sessionId`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol request message sent to the browser.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
	/// Unique request ID for correlating responses.
	pub id: u64,
	/// Domain-qualified method name (e.g. `Runtime.evaluate`).
	pub method: String,
	/// Method parameters as a JSON object.
	#[serde(default, skip_serializing_if = "Value::is_null")]
	pub params: Value,
	/// Target session the request is routed to, when attached in flat mode.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub session_id: Option<String>,
}

/// Protocol response message from the browser.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
	/// Request ID this response correlates to.
	pub id: u64,
	/// Success result (mutually exclusive with error).
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub result: Option<Value>,
	/// Error result (mutually exclusive with result).
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<ErrorPayload>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub session_id: Option<String>,
}

/// Protocol error details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
	/// JSON-RPC style error code.
	pub code: i64,
	/// Error message.
	pub message: String,
	/// Optional extra detail supplied by the browser.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub data: Option<String>,
}

/// Protocol event message pushed by the browser.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
	/// Event method name (e.g. `Page.loadEventFired`).
	pub method: String,
	/// Event parameters.
	#[serde(default)]
	pub params: Value,
	/// Session the event originated from, for attached targets.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub session_id: Option<String>,
}

/// Discriminated union of inbound protocol messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
	/// Response message (has `id` field)
	Response(Response),
	/// Event message (no `id` field)
	Event(Event),
	/// Unknown message type (forward-compatible catch-all)
	Unknown(Value),
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn request_omits_absent_session_and_params() {
		let request = Request {
			id: 7,
			method: "Browser.close".into(),
			params: Value::Null,
			session_id: None,
		};
		let value = serde_json::to_value(&request).unwrap();
		assert_eq!(value, json!({ "id": 7, "method": "Browser.close" }));
	}

	#[test]
	fn request_serializes_session_id_in_camel_case() {
		let request = Request {
			id: 1,
			method: "Runtime.evaluate".into(),
			params: json!({ "expression": "1 + 1" }),
			session_id: Some("ABC".into()),
		};
		let value = serde_json::to_value(&request).unwrap();
		assert_eq!(value["sessionId"], "ABC");
		assert_eq!(value["params"]["expression"], "1 + 1");
	}

	#[test]
	fn response_with_error_parses_as_response() {
		let raw = json!({
			"id": 3,
			"error": { "code": -32000, "message": "Cannot find context with specified id" }
		});
		match serde_json::from_value::<Message>(raw).unwrap() {
			Message::Response(resp) => {
				assert_eq!(resp.id, 3);
				assert!(resp.result.is_none());
				assert_eq!(resp.error.unwrap().code, -32000);
			}
			other => panic!("expected response, got {other:?}"),
		}
	}

	#[test]
	fn event_without_id_parses_as_event() {
		let raw = json!({
			"method": "Target.detachedFromTarget",
			"params": { "sessionId": "S1" }
		});
		match serde_json::from_value::<Message>(raw).unwrap() {
			Message::Event(event) => assert_eq!(event.method, "Target.detachedFromTarget"),
			other => panic!("expected event, got {other:?}"),
		}
	}
}
