//! Browser sessions bound to the signed-in profile.
//!
//! A browser cannot open a profile another browser already holds. When the
//! durable profile is busy (typically the user's own browser window), the
//! acquirer copies it into a temporary directory, skipping lock and scratch
//! files, and runs against the copy instead. The copy is deleted when the
//! session closes.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{DriverError, Result};
use crate::surface::{LaunchError, Launcher, Surface};

/// Where a session's profile lives.
#[derive(Debug)]
pub enum Workspace {
	Durable(PathBuf),
	/// A copy of the durable profile, removed on drop.
	Disposable { dir: TempDir, report: CloneReport },
}

impl Workspace {
	pub fn path(&self) -> &Path {
		match self {
			Workspace::Durable(path) => path,
			Workspace::Disposable { dir, .. } => dir.path(),
		}
	}

	pub fn is_temporary(&self) -> bool {
		matches!(self, Workspace::Disposable { .. })
	}
}

/// An open browser session. Close it with [`AutomationSession::close`].
///
/// Dropping an unclosed session still kills the browser and deletes a
/// temporary profile, but skips the graceful shutdown that flushes the
/// durable profile.
pub struct AutomationSession<S> {
	surface: S,
	identity: PathBuf,
	workspace: Workspace,
}

/// What remains after a session has closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedSession {
	pub workspace: PathBuf,
	pub was_temporary: bool,
}

impl<S: Surface> AutomationSession<S> {
	pub fn surface(&self) -> &S {
		&self.surface
	}

	/// The durable profile this session was derived from.
	pub fn identity(&self) -> &Path {
		&self.identity
	}

	pub fn workspace(&self) -> &Workspace {
		&self.workspace
	}

	pub fn clone_report(&self) -> Option<&CloneReport> {
		match &self.workspace {
			Workspace::Disposable { report, .. } => Some(report),
			Workspace::Durable(_) => None,
		}
	}

	/// Shuts the browser down, then removes a temporary workspace.
	pub async fn close(self) -> Result<ClosedSession> {
		let Self { surface, workspace, .. } = self;
		let closed = ClosedSession {
			workspace: workspace.path().to_path_buf(),
			was_temporary: workspace.is_temporary(),
		};
		let shutdown = surface.close().await;
		if let Workspace::Disposable { dir, .. } = workspace {
			let path = dir.path().to_path_buf();
			if let Err(e) = dir.close() {
				warn!(target = "nbd", path = %path.display(), error = %e, "could not remove temporary profile");
			} else {
				debug!(target = "nbd", path = %path.display(), "removed temporary profile");
			}
		}
		shutdown?;
		Ok(closed)
	}
}

/// Opens sessions on one durable profile.
pub struct SessionAcquirer<'a, L> {
	launcher: &'a L,
	identity: &'a Path,
}

impl<'a, L: Launcher> SessionAcquirer<'a, L> {
	pub fn new(launcher: &'a L, identity: &'a Path) -> Self {
		Self { launcher, identity }
	}

	/// Opens a session, falling back to a temporary copy when the profile is busy.
	///
	/// The flag is `true` when the session runs on a copy.
	pub async fn acquire(&self, headless: bool) -> Result<(AutomationSession<L::Surface>, bool)> {
		let holder = match self.launcher.launch(self.identity, headless).await {
			Ok(surface) => {
				debug!(target = "nbd", profile = %self.identity.display(), "session opened on durable profile");
				return Ok((
					AutomationSession {
						surface,
						identity: self.identity.to_path_buf(),
						workspace: Workspace::Durable(self.identity.to_path_buf()),
					},
					false,
				));
			}
			Err(LaunchError::InUse { holder }) => holder,
			Err(LaunchError::Failed(message)) => return Err(DriverError::Session(message)),
		};

		info!(target = "nbd", profile = %self.identity.display(), holder = %holder, "profile busy, running on a temporary copy");
		let dir = tempfile::Builder::new()
			.prefix("nbd-profile-")
			.tempdir()
			.map_err(|e| DriverError::Session(format!("could not create a temporary profile: {e}")))?;
		let report = clone_profile(self.identity, dir.path());
		for warning in &report.warnings {
			warn!(target = "nbd", path = %warning.path.display(), reason = %warning.message, "profile file not copied");
		}
		debug!(target = "nbd", copied = report.copied, skipped = report.skipped.len(), "profile cloned");

		match self.launcher.launch(dir.path(), headless).await {
			Ok(surface) => Ok((
				AutomationSession {
					surface,
					identity: self.identity.to_path_buf(),
					workspace: Workspace::Disposable { dir, report },
				},
				true,
			)),
			Err(e) => Err(DriverError::Session(format!("temporary copy of the profile could not be opened either: {e}"))),
		}
	}

	/// Runs `operation` in a fresh session and closes it on every path.
	///
	/// A close failure after a successful operation is logged, not returned.
	pub async fn with_session<T, F>(self, headless: bool, operation: F) -> Result<T>
	where
		F: AsyncFnOnce(&AutomationSession<L::Surface>) -> Result<T>,
	{
		let (session, _) = self.acquire(headless).await?;
		let outcome = operation(&session).await;
		if let Err(e) = session.close().await {
			warn!(target = "nbd", error = %e, "session did not close cleanly");
		}
		outcome
	}
}

/// Outcome of copying a profile. Warnings are files that could not be copied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloneReport {
	pub copied: usize,
	/// Lock and scratch entries left behind, relative to the source.
	pub skipped: Vec<PathBuf>,
	pub warnings: Vec<CloneWarning>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneWarning {
	pub path: PathBuf,
	pub message: String,
}

/// Whether a profile entry marks ownership or scratch state and must not be copied.
pub fn is_lock_marker(name: &OsStr) -> bool {
	let name = name.to_string_lossy();
	let lower = name.to_ascii_lowercase();
	name.starts_with("Singleton")
		|| name == "LOCK"
		|| name == "DevToolsActivePort"
		|| name.starts_with(".com.google.Chrome.")
		|| name.starts_with(".org.chromium.Chromium.")
		|| name.ends_with('~')
		|| lower == "lockfile"
		|| lower.ends_with(".lock")
		|| lower.ends_with(".tmp")
		|| lower.ends_with(".temp")
}

/// Copies `source` into `dest` file by file, skipping lock markers.
///
/// Never fails as a whole; unreadable entries become warnings.
pub fn clone_profile(source: &Path, dest: &Path) -> CloneReport {
	let mut report = CloneReport::default();
	let mut entries = WalkDir::new(source).min_depth(1).follow_links(false).into_iter();

	while let Some(entry) = entries.next() {
		let entry = match entry {
			Ok(entry) => entry,
			Err(e) => {
				report.warnings.push(CloneWarning {
					path: e.path().map(Path::to_path_buf).unwrap_or_else(|| source.to_path_buf()),
					message: e.to_string(),
				});
				continue;
			}
		};
		let Ok(relative) = entry.path().strip_prefix(source) else {
			continue;
		};
		let file_type = entry.file_type();

		if is_lock_marker(entry.file_name()) || file_type.is_symlink() {
			report.skipped.push(relative.to_path_buf());
			if file_type.is_dir() {
				entries.skip_current_dir();
			}
			continue;
		}

		let target = dest.join(relative);
		let copied = if file_type.is_dir() {
			std::fs::create_dir_all(&target)
		} else {
			target
				.parent()
				.map_or(Ok(()), std::fs::create_dir_all)
				.and_then(|()| std::fs::copy(entry.path(), &target).map(|_| ()))
		};
		match copied {
			Ok(()) if file_type.is_file() => report.copied += 1,
			Ok(()) => {}
			Err(e) => report.warnings.push(CloneWarning {
				path: relative.to_path_buf(),
				message: e.to_string(),
			}),
		}
	}
	report
}
