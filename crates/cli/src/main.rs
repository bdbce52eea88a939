use clap::Parser;
use nbd_cli::{
	cli::Cli,
	commands,
	error::CliError,
	logging,
	output::{self, CommandResult, OutputFormat},
};

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	let format = cli.format;
	let op = cli.command.name();

	if let Err(err) = commands::dispatch(cli).await {
		handle_error(op, err, format);
		std::process::exit(1);
	}
}

fn handle_error(op: &'static str, err: CliError, format: OutputFormat) {
	let cmd_error = err.to_command_error();
	tracing::debug!(op, detail = %err.detail(), "command failed");

	output::print_error_stderr(&cmd_error);

	if format != OutputFormat::Text {
		let result: CommandResult<()> = CommandResult::failure(op, cmd_error);
		output::print_result(&result);
	}
}
