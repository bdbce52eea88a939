use std::io::Read;
use std::path::Path;

use anyhow::Context as _;
use nbd::{AnalysisSummary, ArtifactKind, ArtifactRequest, ChromeLauncher, NotebookDriver, SearchTopic};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::info;

use crate::cli::{AddTextArgs, AddUrlsArgs, SourceFileArgs};
use crate::error::{CliError, Result};
use crate::output::{OutputFormat, TextOutput, print_success};

type Driver = NotebookDriver<ChromeLauncher>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddData {
	pub repository: String,
	pub kind: ArtifactKind,
	/// False when filtering left nothing to add.
	pub added: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub label: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub urls: Option<Vec<String>>,
}

impl TextOutput for AddData {
	fn text(&self) -> String {
		match (&self.label, &self.urls) {
			(Some(label), _) => format!("added {label:?}"),
			(None, Some(urls)) if urls.is_empty() => "no URLs left after filtering".to_string(),
			(None, Some(urls)) => urls.join("\n"),
			(None, None) => String::new(),
		}
	}
}

pub async fn text(driver: &Driver, args: AddTextArgs, op: &str, format: OutputFormat) -> Result<()> {
	let repository = super::repository(driver, &args.target)?;
	let body = match (&args.text, &args.file) {
		(Some(text), _) => text.clone(),
		(None, Some(path)) => read_body(path)?,
		(None, None) => return Err(CliError::Input("either --text or --file is required".into())),
	};
	if body.trim().is_empty() {
		return Err(CliError::Input("source body is empty".into()));
	}
	add(driver, &repository, ArtifactRequest::pasted_text(args.label, body), op, format).await
}

pub async fn urls(driver: &Driver, args: AddUrlsArgs, op: &str, format: OutputFormat) -> Result<()> {
	let repository = super::repository(driver, &args.target)?;
	let request = ArtifactRequest::urls(&args.urls, &driver.config().url_filter());
	add(driver, &repository, request, op, format).await
}

pub async fn research(driver: &Driver, args: SourceFileArgs, op: &str, format: OutputFormat) -> Result<()> {
	let repository = super::repository(driver, &args.target)?;
	let topics: Vec<SearchTopic> = read_json(&args.file)?;
	info!(target = "nbd", topics = topics.len(), "loaded search results");
	let request = ArtifactRequest::from_search(&topics, &driver.config().url_filter());
	add(driver, &repository, request, op, format).await
}

pub async fn summary(driver: &Driver, args: SourceFileArgs, op: &str, format: OutputFormat) -> Result<()> {
	let repository = super::repository(driver, &args.target)?;
	let summary: AnalysisSummary = read_json(&args.file)?;
	add(driver, &repository, ArtifactRequest::from_analysis(&summary), op, format).await
}

async fn add(driver: &Driver, repository: &nbd::RepositoryHandle, request: ArtifactRequest, op: &str, format: OutputFormat) -> Result<()> {
	driver.add_artifact(&request, repository).await?;

	let (label, urls) = match &request {
		ArtifactRequest::PastedText { label, .. } => (Some(label.clone()), None),
		ArtifactRequest::UrlList(urls) => (None, Some(urls.iter().map(|u| u.to_string()).collect())),
	};
	print_success(
		op,
		AddData {
			repository: repository.to_string(),
			kind: request.kind(),
			added: !request.is_empty(),
			label,
			urls,
		},
		format,
	);
	Ok(())
}

fn read_body(path: &Path) -> Result<String> {
	if path == Path::new("-") {
		let mut body = String::new();
		std::io::stdin().read_to_string(&mut body).context("reading source body from stdin")?;
		return Ok(body);
	}
	Ok(std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
	let raw = read_body(path)?;
	Ok(serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?)
}
