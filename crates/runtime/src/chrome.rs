//! Chromium process discovery, launch and profile-lock inspection.

use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use nbd_protocol::CdpVersionInfo;
use tokio::process::{Child, Command};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// File Chromium keeps in a user-data-dir while a process owns it.
pub const SINGLETON_LOCK: &str = "SingletonLock";

/// Launch parameters for a debuggable browser bound to one profile directory.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
	/// Explicit browser executable; discovered when `None`.
	pub executable: Option<PathBuf>,
	/// Profile (user-data-dir) the browser runs against.
	pub user_data_dir: PathBuf,
	/// Run without a visible window.
	pub headless: bool,
	/// Additional command-line switches.
	pub extra_args: Vec<String>,
	/// How long to wait for the debugging endpoint to come up.
	pub startup_timeout: Duration,
}

impl LaunchOptions {
	pub fn new(user_data_dir: impl Into<PathBuf>) -> Self {
		Self {
			executable: None,
			user_data_dir: user_data_dir.into(),
			headless: true,
			extra_args: Vec::new(),
			startup_timeout: Duration::from_secs(20),
		}
	}

	/// Command-line switches for a launch on `port`.
	pub fn args(&self, port: u16) -> Vec<String> {
		let mut args = vec![
			format!("--remote-debugging-port={port}"),
			format!("--user-data-dir={}", self.user_data_dir.display()),
			"--no-first-run".to_string(),
			"--no-default-browser-check".to_string(),
			"--disable-blink-features=AutomationControlled".to_string(),
		];
		if self.headless {
			args.push("--headless=new".to_string());
		}
		args.extend(self.extra_args.iter().cloned());
		args.push("about:blank".to_string());
		args
	}
}

/// A running browser process with a reachable debugging endpoint.
pub struct ChromeProcess {
	child: Child,
	port: u16,
	version: CdpVersionInfo,
	user_data_dir: PathBuf,
}

impl ChromeProcess {
	pub fn port(&self) -> u16 {
		self.port
	}

	pub fn ws_endpoint(&self) -> &str {
		&self.version.web_socket_debugger_url
	}

	pub fn product(&self) -> Option<&str> {
		self.version.browser.as_deref()
	}

	pub fn user_data_dir(&self) -> &Path {
		&self.user_data_dir
	}

	/// Waits for the process to exit, killing it after `grace`.
	pub async fn shutdown(mut self, grace: Duration) -> Result<()> {
		match tokio::time::timeout(grace, self.child.wait()).await {
			Ok(status) => {
				debug!(target = "nbd", status = ?status.ok(), "browser exited");
				Ok(())
			}
			Err(_) => {
				debug!(target = "nbd", "browser did not exit in time, killing");
				self.child.kill().await?;
				Ok(())
			}
		}
	}
}

/// Launches a browser with remote debugging on a fresh port.
///
/// Fails with [`Error::ProfileInUse`] when another live process owns the
/// profile, either detected up front or because the new process handed off
/// to the owner and exited.
pub async fn launch(options: &LaunchOptions) -> Result<ChromeProcess> {
	if let Some(holder) = profile_lock_holder(&options.user_data_dir) {
		return Err(Error::ProfileInUse {
			path: options.user_data_dir.clone(),
			holder,
		});
	}

	let executable = match &options.executable {
		Some(path) => path.clone(),
		None => find_chrome_executable().ok_or(Error::ExecutableNotFound)?,
	};
	let port = reserve_port()?;
	let args = options.args(port);

	info!(target = "nbd", executable = %executable.display(), port, profile = %options.user_data_dir.display(), headless = options.headless, "launching browser");

	let mut cmd = Command::new(&executable);
	cmd.args(&args).stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null()).kill_on_drop(true);

	let mut child = cmd
		.spawn()
		.map_err(|e| Error::LaunchFailed(format!("{}: {}", executable.display(), e)))?;

	let started = Instant::now();
	let mut last_error = "endpoint not reachable".to_string();
	while started.elapsed() < options.startup_timeout {
		tokio::time::sleep(Duration::from_millis(200)).await;

		if let Some(status) = child.try_wait()? {
			if let Some(holder) = profile_lock_holder(&options.user_data_dir) {
				return Err(Error::ProfileInUse {
					path: options.user_data_dir.clone(),
					holder,
				});
			}
			return Err(Error::LaunchFailed(format!(
				"browser exited before the debugging endpoint became available (status: {status})"
			)));
		}

		match fetch_cdp_endpoint(port).await {
			Ok(version) => {
				debug!(target = "nbd", browser = ?version.browser, "debugging endpoint ready");
				return Ok(ChromeProcess {
					child,
					port,
					version,
					user_data_dir: options.user_data_dir.clone(),
				});
			}
			Err(e) => last_error = e.to_string(),
		}
	}

	if let Err(e) = child.kill().await {
		debug!(target = "nbd", error = %e, "could not kill browser after failed startup");
	}
	Err(Error::LaunchFailed(format!(
		"debugging endpoint not available on port {port} after {}ms: {last_error}",
		options.startup_timeout.as_millis()
	)))
}

/// Resolves CDP version metadata from `/json/version` on `port`.
pub async fn fetch_cdp_endpoint(port: u16) -> Result<CdpVersionInfo> {
	let client = reqwest::Client::builder()
		.timeout(Duration::from_millis(400))
		.build()
		.map_err(|e| Error::ConnectionFailed(format!("Failed to create HTTP client: {e}")))?;
	let mut last_error = "no response".to_string();

	for url in [
		format!("http://127.0.0.1:{port}/json/version"),
		format!("http://localhost:{port}/json/version"),
	] {
		let response = match client.get(&url).send().await {
			Ok(r) => r,
			Err(e) => {
				last_error = e.to_string();
				continue;
			}
		};

		if !response.status().is_success() {
			last_error = format!("unexpected status {}", response.status());
			continue;
		}

		return response
			.json::<CdpVersionInfo>()
			.await
			.map_err(|e| Error::ConnectionFailed(format!("Failed to parse CDP response: {e}")));
	}

	Err(Error::ConnectionFailed(format!("port {port}: {last_error}")))
}

/// Returns a description of the live process holding `profile`, if any.
///
/// Chromium's lock is a symlink whose target is `<hostname>-<pid>`. A lock
/// naming a pid that no longer exists on this host is stale and ignored.
pub fn profile_lock_holder(profile: &Path) -> Option<String> {
	let lock = profile.join(SINGLETON_LOCK);
	let target = match std::fs::read_link(&lock) {
		Ok(target) => target.to_string_lossy().into_owned(),
		Err(_) if lock.exists() => return Some(SINGLETON_LOCK.to_string()),
		Err(_) => return None,
	};

	match lock_pid(&target) {
		Some(pid) if !pid_is_alive(pid) => {
			debug!(target = "nbd", lock = %target, "ignoring stale profile lock");
			None
		}
		_ => Some(target),
	}
}

fn lock_pid(target: &str) -> Option<u32> {
	target.rsplit_once('-').and_then(|(_, pid)| pid.parse().ok())
}

#[cfg(target_os = "linux")]
fn pid_is_alive(pid: u32) -> bool {
	Path::new("/proc").join(pid.to_string()).exists()
}

#[cfg(not(target_os = "linux"))]
fn pid_is_alive(_pid: u32) -> bool {
	true
}

/// Asks the OS for an unused local port.
pub fn reserve_port() -> Result<u16> {
	let listener = TcpListener::bind(("127.0.0.1", 0))?;
	Ok(listener.local_addr()?.port())
}

/// Finds a Chromium-family executable on this machine.
pub fn find_chrome_executable() -> Option<PathBuf> {
	if let Some(explicit) = std::env::var_os("NBD_CHROME") {
		let path = PathBuf::from(explicit);
		if path.exists() {
			return Some(path);
		}
	}

	for candidate in chrome_candidates() {
		if candidate.starts_with('/') || candidate.contains('\\') {
			if Path::new(&candidate).exists() {
				return Some(PathBuf::from(candidate));
			}
		} else if let Ok(path) = which::which(&candidate) {
			return Some(path);
		}
	}

	None
}

fn chrome_candidates() -> Vec<String> {
	let list: &[&str] = if cfg!(target_os = "macos") {
		&[
			"/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
			"/Applications/Chromium.app/Contents/MacOS/Chromium",
			"/Applications/Brave Browser.app/Contents/MacOS/Brave Browser",
		]
	} else if cfg!(target_os = "windows") {
		&[
			r"C:\Program Files\Google\Chrome\Application\chrome.exe",
			r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
			r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
			"chrome.exe",
			"msedge.exe",
		]
	} else {
		&[
			"google-chrome-stable",
			"google-chrome",
			"chromium-browser",
			"chromium",
			"brave-browser",
			"/usr/bin/google-chrome-stable",
			"/usr/bin/google-chrome",
			"/usr/bin/chromium-browser",
			"/usr/bin/chromium",
			"/snap/bin/chromium",
		]
	};
	list.iter().map(|s| s.to_string()).collect()
}
