//! A launched browser and its debugging connection.

use std::sync::Arc;
use std::time::Duration;

use nbd_protocol::{AttachToTargetResult, CreateTargetResult, GetTargetsResult, TargetInfo};
use serde_json::{Value, json};
use tracing::debug;

use crate::chrome::{self, ChromeProcess, LaunchOptions};
use crate::connection::Connection;
use crate::error::Result;
use crate::page::PageSession;
use crate::transport;

/// Grace period for the browser to flush its profile and exit after `Browser.close`.
const CLOSE_GRACE: Duration = Duration::from_secs(5);

/// Browser process plus a browser-level protocol connection.
///
/// Dropping a `Browser` without calling [`close`](Self::close) kills the
/// process, since the child is spawned with `kill_on_drop`.
pub struct Browser {
	process: ChromeProcess,
	connection: Arc<Connection>,
}

impl Browser {
	/// Launches a browser on the configured profile and connects to it.
	pub async fn launch(options: &LaunchOptions) -> Result<Self> {
		let process = chrome::launch(options).await?;
		let parts = transport::connect_websocket(process.ws_endpoint()).await?;
		let connection = Connection::start(parts);
		debug!(target = "nbd", product = ?process.product(), port = process.port(), "browser connected");
		Ok(Self { process, connection })
	}

	/// Attaches to the initial tab, creating one when none exists.
	pub async fn open_page(&self) -> Result<PageSession> {
		let targets: GetTargetsResult = serde_json::from_value(self.connection.send("Target.getTargets", json!({})).await?)?;

		let target_id = match targets.target_infos.into_iter().find(TargetInfo::is_page) {
			Some(target) => target.target_id,
			None => {
				let created: CreateTargetResult =
					serde_json::from_value(self.connection.send("Target.createTarget", json!({ "url": "about:blank" })).await?)?;
				created.target_id
			}
		};

		let attached: AttachToTargetResult = serde_json::from_value(
			self.connection
				.send("Target.attachToTarget", json!({ "targetId": target_id, "flatten": true }))
				.await?,
		)?;

		let page = PageSession::new(Arc::clone(&self.connection), target_id, attached.session_id);
		page.prepare().await?;
		Ok(page)
	}

	/// Closes the browser gracefully so the profile is flushed to disk.
	pub async fn close(self) -> Result<()> {
		if let Err(e) = self.connection.send("Browser.close", Value::Null).await {
			debug!(target = "nbd", error = %e, "Browser.close did not complete cleanly");
		}
		self.process.shutdown(CLOSE_GRACE).await
	}
}
