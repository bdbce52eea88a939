mod add;
mod ask;
mod config;
mod create;

use nbd::{ChromeLauncher, NotebookDriver, RepositoryHandle};

use crate::cli::{Cli, Commands, RepositoryArg};
use crate::error::Result;
use crate::output::OutputFormat;
use crate::settings::Overrides;

pub async fn dispatch(cli: Cli) -> Result<()> {
	let format = cli.format;
	let overrides = Overrides::from(&cli);
	let op = cli.command.name();

	// config commands must work even when the config cannot build a driver
	if let Commands::Config(args) = &cli.command {
		return config::execute(args.action.clone(), &overrides, op, format);
	}

	let driver = NotebookDriver::from_config(overrides.resolve()?)?;

	match cli.command {
		Commands::Create => create::execute(&driver, op, format).await,
		Commands::AddText(args) => add::text(&driver, args, op, format).await,
		Commands::AddUrls(args) => add::urls(&driver, args, op, format).await,
		Commands::AddResearch(args) => add::research(&driver, args, op, format).await,
		Commands::AddSummary(args) => add::summary(&driver, args, op, format).await,
		Commands::Ask(args) => ask::execute(&driver, args, op, format).await,
		Commands::Config(_) => unreachable!("handled above"),
	}
}

/// Validates `--repository` before any browser work.
fn repository(driver: &NotebookDriver<ChromeLauncher>, target: &RepositoryArg) -> Result<RepositoryHandle> {
	Ok(driver.repository(&target.repository)?)
}
