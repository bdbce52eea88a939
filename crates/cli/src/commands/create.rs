use nbd::{ChromeLauncher, NotebookDriver};
use serde::Serialize;

use crate::error::Result;
use crate::output::{OutputFormat, TextOutput, print_success};

#[derive(Debug, Serialize)]
pub struct CreateData {
	pub repository: String,
	pub id: String,
}

impl TextOutput for CreateData {
	fn text(&self) -> String {
		self.repository.clone()
	}
}

pub async fn execute(driver: &NotebookDriver<ChromeLauncher>, op: &str, format: OutputFormat) -> Result<()> {
	let handle = driver.create_repository().await?;
	print_success(
		op,
		CreateData {
			repository: handle.url().to_string(),
			id: handle.id().to_string(),
		},
		format,
	);
	Ok(())
}
