
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::output::OutputFormat;

/// Drive a browser-only notebook application from the command line.
#[derive(Parser, Debug)]
#[command(name = "nbd")]
#[command(about = "Create notebooks, add sources and ask questions through a signed-in browser profile")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Output format: json (default) or text
	#[arg(short = 'f', long, global = true, value_enum, default_value = "json")]
	pub format: OutputFormat,

	/// Config file (default: <config dir>/nbd/config.json)
	#[arg(long, global = true, value_name = "FILE")]
	pub config: Option<PathBuf>,

	/// Browser profile directory, overriding config and NBD_PROFILE_DIR
	#[arg(long, global = true, value_name = "DIR")]
	pub profile_dir: Option<PathBuf>,

	/// Show the browser window
	#[arg(long, global = true)]
	pub headed: bool,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Create a new notebook and print its URL.
	Create,
	/// Add pasted text as a source.
	AddText(AddTextArgs),
	/// Add web pages as sources. Search-result links are dropped.
	AddUrls(AddUrlsArgs),
	/// Add the links from a search collaborator's JSON output.
	AddResearch(SourceFileArgs),
	/// Add a codebase analysis summary as a pasted-text source.
	AddSummary(SourceFileArgs),
	/// Ask a question and print the answer once it stops streaming.
	Ask(AskArgs),
	/// Inspect configuration.
	Config(ConfigArgs),
}

impl Commands {
	/// Operation name used in output envelopes.
	pub fn name(&self) -> &'static str {
		match self {
			Commands::Create => "create",
			Commands::AddText(_) => "add-text",
			Commands::AddUrls(_) => "add-urls",
			Commands::AddResearch(_) => "add-research",
			Commands::AddSummary(_) => "add-summary",
			Commands::Ask(_) => "ask",
			Commands::Config(ConfigArgs { action: ConfigAction::Show }) => "config.show",
			Commands::Config(ConfigArgs { action: ConfigAction::Path }) => "config.path",
		}
	}
}

#[derive(Args, Debug, Clone)]
pub struct RepositoryArg {
	/// Notebook URL or id
	#[arg(short, long, value_name = "URL|ID")]
	pub repository: String,
}

#[derive(Args, Debug, Clone)]
pub struct AddTextArgs {
	#[command(flatten)]
	pub target: RepositoryArg,

	/// Title shown at the top of the source
	#[arg(short, long)]
	pub label: String,

	/// Read the body from a file ("-" for stdin)
	#[arg(long, value_name = "FILE", conflicts_with = "text", required_unless_present = "text")]
	pub file: Option<PathBuf>,

	/// Body text
	#[arg(long)]
	pub text: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct AddUrlsArgs {
	#[command(flatten)]
	pub target: RepositoryArg,

	/// Page URLs
	#[arg(required = true, value_name = "URL")]
	pub urls: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct SourceFileArgs {
	#[command(flatten)]
	pub target: RepositoryArg,

	/// JSON document produced by the collaborator
	#[arg(long, value_name = "FILE")]
	pub file: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct AskArgs {
	#[command(flatten)]
	pub target: RepositoryArg,

	/// Question; multiple words are joined with spaces
	#[arg(required = true, value_name = "QUESTION", num_args = 1..)]
	pub question: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
	#[command(subcommand)]
	pub action: ConfigAction,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
	/// Print the effective configuration.
	Show,
	/// Print where the config file is read from.
	Path,
}
