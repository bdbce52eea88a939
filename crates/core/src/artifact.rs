//! Source requests and the collaborator payloads they are built from.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

/// The dialog option a request selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
	PastedText,
	UrlList,
}

/// A source to add to a notebook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactRequest {
	PastedText { label: String, body: String },
	/// Already filtered and de-duplicated.
	UrlList(Vec<Url>),
}

impl ArtifactRequest {
	pub fn pasted_text(label: impl Into<String>, body: impl Into<String>) -> Self {
		ArtifactRequest::PastedText {
			label: label.into(),
			body: body.into(),
		}
	}

	/// Builds a URL-list request, dropping unparsable, blocked and repeated links.
	pub fn urls<I, S>(urls: I, filter: &UrlFilter) -> Self
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let mut seen = HashSet::new();
		let mut kept = Vec::new();
		for raw in urls {
			let raw = raw.as_ref().trim();
			let url = match Url::parse(raw) {
				Ok(url) => url,
				Err(e) => {
					debug!(target = "nbd", url = raw, error = %e, "dropping unparsable url");
					continue;
				}
			};
			if !filter.allows(&url) {
				debug!(target = "nbd", url = %url, "dropping search-provider url");
				continue;
			}
			if seen.insert(url.as_str().to_string()) {
				kept.push(url);
			}
		}
		ArtifactRequest::UrlList(kept)
	}

	pub fn from_analysis(summary: &AnalysisSummary) -> Self {
		Self::pasted_text(format!("{} Codebase Summary", summary.project_name), summary.render())
	}

	pub fn from_search(topics: &[SearchTopic], filter: &UrlFilter) -> Self {
		Self::urls(topics.iter().flat_map(|t| t.results.iter().map(|r| r.url.as_str())), filter)
	}

	pub fn kind(&self) -> ArtifactKind {
		match self {
			ArtifactRequest::PastedText { .. } => ArtifactKind::PastedText,
			ArtifactRequest::UrlList(_) => ArtifactKind::UrlList,
		}
	}

	/// A URL list with nothing left to add.
	pub fn is_empty(&self) -> bool {
		matches!(self, ArtifactRequest::UrlList(urls) if urls.is_empty())
	}

	/// Text entered into the dialog's payload field.
	pub fn payload(&self) -> String {
		match self {
			ArtifactRequest::PastedText { label, body } => format!("# {label}\n\n{body}"),
			ArtifactRequest::UrlList(urls) => urls.iter().map(Url::as_str).collect::<Vec<_>>().join("\n"),
		}
	}

	/// Short description for logs.
	pub fn describe(&self) -> String {
		match self {
			ArtifactRequest::PastedText { label, body } => format!("pasted text {label:?} ({} chars)", body.chars().count()),
			ArtifactRequest::UrlList(urls) => format!("{} url(s)", urls.len()),
		}
	}
}

/// Rejects links to search-result and redirect pages, which make poor sources.
#[derive(Debug, Clone, Default)]
pub struct UrlFilter {
	blocked: Vec<(String, String)>,
}

impl UrlFilter {
	/// Patterns are `host` or `host/path-prefix`. A host also covers its subdomains.
	pub fn new<I: IntoIterator<Item = String>>(patterns: I) -> Self {
		let blocked = patterns
			.into_iter()
			.filter_map(|pattern| {
				let pattern = pattern.trim().trim_start_matches("https://").trim_start_matches("http://").to_ascii_lowercase();
				if pattern.is_empty() {
					return None;
				}
				Some(match pattern.split_once('/') {
					Some((host, path)) => (host.to_string(), format!("/{path}")),
					None => (pattern, String::new()),
				})
			})
			.collect();
		Self { blocked }
	}

	pub fn allows(&self, url: &Url) -> bool {
		if !matches!(url.scheme(), "http" | "https") {
			return false;
		}
		let Some(host) = url.host_str().map(str::to_ascii_lowercase) else {
			return false;
		};
		let path = url.path().to_ascii_lowercase();
		!self.blocked.iter().any(|(blocked_host, prefix)| {
			let host_hit = host == *blocked_host || host.ends_with(&format!(".{blocked_host}"));
			host_hit && path.starts_with(prefix.as_str())
		})
	}
}

/// Output of the codebase analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummary {
	pub project_name: String,
	pub summary_text: String,
	#[serde(default)]
	pub file_count: usize,
	#[serde(default)]
	pub tech_stack: Vec<String>,
	#[serde(default)]
	pub research_queries: Vec<String>,
}

impl AnalysisSummary {
	fn render(&self) -> String {
		let mut body = self.summary_text.trim().to_string();
		if !self.tech_stack.is_empty() {
			body.push_str("\n\n## Tech stack\n");
			for tech in &self.tech_stack {
				body.push_str(&format!("\n- {tech}"));
			}
		}
		body.push_str(&format!("\n\n## Files analyzed\n\n{}", self.file_count));
		if !self.research_queries.is_empty() {
			body.push_str("\n\n## Research questions\n");
			for query in &self.research_queries {
				body.push_str(&format!("\n- {query}"));
			}
		}
		body
	}
}

/// Results the search collaborator found for one topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchTopic {
	pub topic: String,
	#[serde(default)]
	pub results: Vec<SearchResult>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
	pub url: String,
	#[serde(default)]
	pub title: String,
	#[serde(default)]
	pub description: String,
}
