use std::path::PathBuf;

use nbd::DriverConfig;
use serde::Serialize;

use crate::cli::ConfigAction;
use crate::error::Result;
use crate::output::{OutputFormat, TextOutput, print_success};
use crate::settings::Overrides;

#[derive(Debug, Serialize)]
pub struct ConfigData {
	pub path: PathBuf,
	pub exists: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub config: Option<DriverConfig>,
}

impl TextOutput for ConfigData {
	fn text(&self) -> String {
		match &self.config {
			Some(config) => serde_json::to_string_pretty(config).unwrap_or_default(),
			None => self.path.display().to_string(),
		}
	}
}

pub fn execute(action: ConfigAction, overrides: &Overrides, op: &str, format: OutputFormat) -> Result<()> {
	let path = overrides.config_path()?;
	let exists = path.exists();
	let config = match action {
		ConfigAction::Show => Some(overrides.resolve()?),
		ConfigAction::Path => None,
	};
	print_success(op, ConfigData { path, exists, config }, format);
	Ok(())
}
