//! JSON-RPC connection layer for the DevTools protocol
//!
//! This module implements request/response correlation on top of the transport.
//! It handles:
//! - Generating unique request IDs
//! - Correlating responses with pending requests
//! - Distinguishing events from responses
//! - Broadcasting events to subscribers
//!
//! # Message Flow
//!
//! 1. Caller invokes [`Connection::send`] with method, params and optional session
//! 2. Connection generates a unique ID and parks a oneshot sender under it
//! 3. Request is serialized and queued on the transport
//! 4. The dispatch loop receives the response and completes the oneshot
//! 5. If the transport closes, every pending request fails with `ChannelClosed`

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

use nbd_protocol::{Event, Message, Request};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::error::{Error, Result};
use crate::transport::TransportParts;

/// Default deadline for a single protocol round trip.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

type Pending = oneshot::Sender<Result<Value>>;

/// Pending request callbacks keyed by request ID.
type CallbackMap = Arc<Mutex<HashMap<u64, (String, Pending)>>>;

/// RAII guard removing the callback when a request future is dropped early.
struct CancelGuard {
	id: u64,
	callbacks: CallbackMap,
	completed: bool,
}

impl Drop for CancelGuard {
	fn drop(&mut self) {
		if !self.completed && self.callbacks.lock().remove(&self.id).is_some() {
			tracing::debug!(id = self.id, "CancelGuard: removed orphaned callback");
		}
	}
}

/// Future returned by [`Connection::send`] with automatic cancellation cleanup.
struct ResponseFuture {
	rx: oneshot::Receiver<Result<Value>>,
	guard: CancelGuard,
}

impl Future for ResponseFuture {
	type Output = Result<Value>;

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		match Pin::new(&mut self.rx).poll(cx) {
			Poll::Ready(result) => {
				self.guard.completed = true;
				Poll::Ready(result.map_err(|_| Error::ChannelClosed).and_then(|r| r))
			}
			Poll::Pending => Poll::Pending,
		}
	}
}

/// DevTools protocol connection.
///
/// Uses sequential request IDs and oneshot channels for correlation.
pub struct Connection {
	last_id: AtomicU64,
	callbacks: CallbackMap,
	outbound_tx: mpsc::UnboundedSender<String>,
	events: broadcast::Sender<Event>,
	request_timeout: Duration,
}

impl Connection {
	/// Starts a connection over the given transport and spawns its dispatch loop.
	pub fn start(parts: TransportParts) -> Arc<Self> {
		let TransportParts { outbound, inbound } = parts;
		let (events, _) = broadcast::channel(256);
		let connection = Arc::new(Self {
			last_id: AtomicU64::new(1),
			callbacks: Arc::new(Mutex::new(HashMap::new())),
			outbound_tx: outbound,
			events,
			request_timeout: DEFAULT_REQUEST_TIMEOUT,
		});

		let dispatcher = Arc::clone(&connection);
		tokio::spawn(async move { dispatcher.run(inbound).await });
		connection
	}

	/// Subscribes to protocol events.
	pub fn subscribe(&self) -> broadcast::Receiver<Event> {
		self.events.subscribe()
	}

	/// Sends a browser-level request and awaits its result.
	pub async fn send(&self, method: &str, params: Value) -> Result<Value> {
		self.send_to(None, method, params).await
	}

	/// Sends a request routed to an attached target session.
	pub async fn send_to(&self, session_id: Option<&str>, method: &str, params: Value) -> Result<Value> {
		let id = self.last_id.fetch_add(1, Ordering::SeqCst);
		tracing::trace!(id, method, session = session_id.unwrap_or("-"), "Sending message");

		let (tx, rx) = oneshot::channel();
		self.callbacks.lock().insert(id, (method.to_string(), tx));
		let guard = CancelGuard {
			id,
			callbacks: Arc::clone(&self.callbacks),
			completed: false,
		};

		let request = Request {
			id,
			method: method.to_string(),
			params,
			session_id: session_id.map(str::to_string),
		};
		let frame = serde_json::to_string(&request)?;
		if self.outbound_tx.send(frame).is_err() {
			tracing::error!("Failed to queue message: outbound channel closed");
			return Err(Error::ChannelClosed);
		}

		match tokio::time::timeout(self.request_timeout, ResponseFuture { rx, guard }).await {
			Ok(result) => result,
			Err(_) => Err(Error::Timeout(format!("{method} did not respond within {}ms", self.request_timeout.as_millis()))),
		}
	}

	async fn run(self: Arc<Self>, mut inbound: mpsc::UnboundedReceiver<String>) {
		while let Some(frame) = inbound.recv().await {
			match serde_json::from_str::<Message>(&frame) {
				Ok(message) => self.dispatch(message),
				Err(e) => tracing::debug!("Failed to parse message: {}", e),
			}
		}

		let pending: Vec<_> = self.callbacks.lock().drain().collect();
		if !pending.is_empty() {
			tracing::debug!(count = pending.len(), "connection closed with pending requests");
		}
		for (_, (_, tx)) in pending {
			let _ = tx.send(Err(Error::ChannelClosed));
		}
	}

	fn dispatch(&self, message: Message) {
		match message {
			Message::Response(response) => {
				let Some((method, callback)) = self.callbacks.lock().remove(&response.id) else {
					tracing::debug!(id = response.id, "Response for unknown request (ignored)");
					return;
				};
				let result = match response.error {
					Some(err) => Err(Error::Remote {
						method,
						code: err.code,
						message: err.message,
					}),
					None => Ok(response.result.unwrap_or(Value::Null)),
				};
				let _ = callback.send(result);
			}
			Message::Event(event) => {
				tracing::trace!(method = %event.method, "event");
				let _ = self.events.send(event);
			}
			Message::Unknown(value) => {
				tracing::debug!("Unknown message type (ignored): {}", value);
			}
		}
	}
}
