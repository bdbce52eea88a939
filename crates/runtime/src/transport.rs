//! WebSocket transport for the DevTools protocol.
//!
//! The transport is reduced to a pair of channels carrying raw text frames so
//! the [`Connection`](crate::connection::Connection) can be driven by either a
//! real socket or an in-memory peer in tests.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, trace};

use crate::error::{Error, Result};

/// Channel halves handed to a connection.
pub struct TransportParts {
	/// Frames to be written to the peer.
	pub outbound: mpsc::UnboundedSender<String>,
	/// Frames read from the peer. Closes when the peer goes away.
	pub inbound: mpsc::UnboundedReceiver<String>,
}

/// The far side of an in-memory transport.
pub struct TransportPeer {
	/// Frames the connection wrote.
	pub sent: mpsc::UnboundedReceiver<String>,
	/// Inject frames as if the browser sent them.
	pub reply: mpsc::UnboundedSender<String>,
}

impl TransportParts {
	/// Creates a connected in-memory transport pair.
	pub fn in_memory() -> (Self, TransportPeer) {
		let (outbound, sent) = mpsc::unbounded_channel();
		let (reply, inbound) = mpsc::unbounded_channel();
		(Self { outbound, inbound }, TransportPeer { sent, reply })
	}
}

/// Connects to a DevTools WebSocket endpoint and spawns reader/writer tasks.
pub async fn connect_websocket(url: &str) -> Result<TransportParts> {
	let (stream, _response) = connect_async(url)
		.await
		.map_err(|e| Error::ConnectionFailed(format!("{url}: {e}")))?;
	debug!(target = "nbd", url, "devtools websocket connected");

	let (mut sink, mut source) = stream.split();
	let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<String>();
	let (inbound_tx, inbound) = mpsc::unbounded_channel::<String>();

	tokio::spawn(async move {
		while let Some(frame) = outbound_rx.recv().await {
			trace!(target = "nbd", len = frame.len(), "ws send");
			if let Err(e) = sink.send(WsMessage::Text(frame)).await {
				debug!(target = "nbd", error = %e, "websocket write failed");
				break;
			}
		}
		let _ = sink.close().await;
	});

	tokio::spawn(async move {
		while let Some(frame) = source.next().await {
			let text = match frame {
				Ok(WsMessage::Text(text)) => text,
				Ok(WsMessage::Binary(bytes)) => match String::from_utf8(bytes) {
					Ok(text) => text,
					Err(_) => continue,
				},
				Ok(WsMessage::Close(_)) => break,
				Ok(_) => continue,
				Err(e) => {
					debug!(target = "nbd", error = %e, "websocket read failed");
					break;
				}
			};
			if inbound_tx.send(text).is_err() {
				break;
			}
		}
	});

	Ok(TransportParts { outbound, inbound })
}
