//! Effective configuration: file, then environment, then flags.

use std::path::PathBuf;

use nbd::DriverConfig;
use tracing::debug;

use crate::cli::Cli;
use crate::error::{CliError, Result};

/// Global flags that override the config file and environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
	pub config: Option<PathBuf>,
	pub profile_dir: Option<PathBuf>,
	pub headed: bool,
}

impl From<&Cli> for Overrides {
	fn from(cli: &Cli) -> Self {
		Self {
			config: cli.config.clone(),
			profile_dir: cli.profile_dir.clone(),
			headed: cli.headed,
		}
	}
}

impl Overrides {
	/// Where the config file is read from.
	pub fn config_path(&self) -> Result<PathBuf> {
		match &self.config {
			Some(path) => Ok(path.clone()),
			None => DriverConfig::default_path().ok_or_else(|| CliError::Config("no config directory on this platform".into())),
		}
	}

	pub fn resolve(&self) -> Result<DriverConfig> {
		self.resolve_with(|key| std::env::var(key).ok())
	}

	pub fn resolve_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Result<DriverConfig> {
		let path = self.config_path()?;
		let mut config = DriverConfig::load(&path).map_err(|e| CliError::Config(format!("{}: {e}", path.display())))?;
		config.apply_env_from(lookup);

		if let Some(dir) = &self.profile_dir {
			config.profile_dir = dir.clone();
		}
		if self.headed {
			config.headless = false;
		}
		debug!(target = "nbd", path = %path.display(), profile = %config.profile_dir.display(), headless = config.headless, "resolved config");
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use std::path::Path;

	use tempfile::TempDir;

	use super::*;

	fn overrides(dir: &Path) -> Overrides {
		Overrides {
			config: Some(dir.join("config.json")),
			..Overrides::default()
		}
	}

	#[test]
	fn missing_file_gives_defaults() {
		let temp = TempDir::new().unwrap();
		let config = overrides(temp.path()).resolve_with(|_| None).unwrap();
		assert_eq!(config, DriverConfig::default());
	}

	#[test]
	fn flags_beat_environment_beats_file() {
		let temp = TempDir::new().unwrap();
		std::fs::write(temp.path().join("config.json"), r#"{ "profileDir": "/from/file", "headless": true }"#).unwrap();

		let env = |key: &str| (key == "NBD_PROFILE_DIR").then(|| "/from/env".to_string());
		let from_env = overrides(temp.path()).resolve_with(env).unwrap();
		assert_eq!(from_env.profile_dir, PathBuf::from("/from/env"));

		let flags = Overrides {
			profile_dir: Some("/from/flag".into()),
			headed: true,
			..overrides(temp.path())
		};
		let config = flags.resolve_with(env).unwrap();
		assert_eq!(config.profile_dir, PathBuf::from("/from/flag"));
		assert!(!config.headless);
	}

	#[test]
	fn malformed_file_is_a_config_error() {
		let temp = TempDir::new().unwrap();
		std::fs::write(temp.path().join("config.json"), "{ not json").unwrap();
		let err = overrides(temp.path()).resolve_with(|_| None).unwrap_err();
		assert!(matches!(err, CliError::Config(_)));
	}
}
