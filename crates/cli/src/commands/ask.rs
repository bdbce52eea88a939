use nbd::{ChromeLauncher, NotebookDriver};
use serde::Serialize;

use crate::cli::AskArgs;
use crate::error::Result;
use crate::output::{OutputFormat, TextOutput, print_success};

#[derive(Debug, Serialize)]
pub struct AskData {
	pub repository: String,
	pub question: String,
	pub answer: String,
}

impl TextOutput for AskData {
	fn text(&self) -> String {
		self.answer.clone()
	}
}

pub async fn execute(driver: &NotebookDriver<ChromeLauncher>, args: AskArgs, op: &str, format: OutputFormat) -> Result<()> {
	let repository = super::repository(driver, &args.target)?;
	let question = args.question.join(" ");
	let answer = driver.ask(&question, &repository).await?;
	print_success(
		op,
		AskData {
			repository: repository.to_string(),
			question,
			answer,
		},
		format,
	);
	Ok(())
}
