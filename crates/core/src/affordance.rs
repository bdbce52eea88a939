//! Named interface controls resolved by role and visible label.
//!
//! The catalog is data: a versioned JSON document compiled into the crate and
//! optionally overridden entry-by-entry from a file on disk. When the remote
//! application renames a button, the fix is a new label variant here, not a
//! code change.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DriverError, Result};

/// Affordance names the driver looks up.
pub mod names {
	pub const QUESTION_INPUT: &str = "question-input";
	pub const ADD_SOURCE: &str = "add-source";
	pub const KIND_PASTED_TEXT: &str = "kind-pasted-text";
	pub const KIND_WEBSITES: &str = "kind-websites";
	pub const PAYLOAD_FIELD: &str = "payload-field";
	pub const CONFIRM: &str = "confirm";
	pub const CREATE_REPOSITORY: &str = "create-repository";
	pub const THINKING_INDICATOR: &str = "thinking-indicator";
	pub const ANSWER_REGION: &str = "answer-region";
	pub const DIALOG_OVERLAY: &str = "dialog-overlay";

	pub const ALL: [&str; 10] = [
		QUESTION_INPUT,
		ADD_SOURCE,
		KIND_PASTED_TEXT,
		KIND_WEBSITES,
		PAYLOAD_FIELD,
		CONFIRM,
		CREATE_REPOSITORY,
		THINKING_INDICATOR,
		ANSWER_REGION,
		DIALOG_OVERLAY,
	];
}

const BUILTIN: &str = include_str!("affordances.json");

/// Semantic role of a control. Supplies candidate selectors when an entry
/// names none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
	Button,
	TextInput,
	Region,
	Status,
	Dialog,
}

impl Role {
	pub fn default_selectors(self) -> &'static [&'static str] {
		match self {
			Role::Button => &[
				"button",
				"[role='button']",
				"[role='tab']",
				"[role='option']",
				"[role='menuitem']",
				"mat-chip",
				"mat-chip-option",
				"a[href]",
			],
			Role::TextInput => &[
				"textarea",
				"input[type='text']",
				"input[type='url']",
				"input:not([type])",
				"[contenteditable='true']",
				"[role='textbox']",
			],
			Role::Region => &["[role='region']", "[role='article']", "article", "section"],
			Role::Status => &["[role='status']", "[aria-live]", "[aria-busy='true']"],
			Role::Dialog => &["mat-dialog-container", "[role='dialog']", "dialog[open]", ".cdk-overlay-pane"],
		}
	}
}

/// How label variants are compared with an element's normalized labels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchMode {
	#[default]
	Contains,
	Exact,
}

/// Which of several matching elements to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Pick {
	#[default]
	First,
	Last,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Affordance {
	#[serde(skip)]
	name: String,
	pub role: Role,
	/// Human wording used in failure messages.
	pub description: String,
	/// CSS candidates; the role's defaults when empty.
	#[serde(default)]
	pub selectors: Vec<String>,
	/// Visible-label variants in priority order. Empty matches any candidate.
	#[serde(default)]
	pub labels: Vec<String>,
	#[serde(default, rename = "match")]
	pub matching: MatchMode,
	#[serde(default)]
	pub pick: Pick,
	/// Restricts the search to descendants of visible elements matching this selector.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub scope: Option<String>,
}

impl Affordance {
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Selectors to search, falling back to the role's defaults.
	pub fn candidate_selectors(&self) -> Vec<String> {
		if self.selectors.is_empty() {
			self.role.default_selectors().iter().map(|s| s.to_string()).collect()
		} else {
			self.selectors.clone()
		}
	}

	/// Label variants lower-cased with whitespace collapsed, as matched in the page.
	pub fn normalized_labels(&self) -> Vec<String> {
		self.labels.iter().map(|label| normalize_label(label)).filter(|l| !l.is_empty()).collect()
	}

	/// Tests one element label against the variants.
	pub fn matches_label(&self, label: &str) -> bool {
		let label = normalize_label(label);
		let variants = self.normalized_labels();
		variants.is_empty()
			|| variants.iter().any(|v| match self.matching {
				MatchMode::Exact => label == *v,
				MatchMode::Contains => label.contains(v.as_str()),
			})
	}
}

pub fn normalize_label(raw: &str) -> String {
	raw.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CatalogDocument {
	version: u32,
	affordances: BTreeMap<String, Affordance>,
}

/// Versioned set of affordance definitions.
#[derive(Debug, Clone)]
pub struct AffordanceCatalog {
	version: u32,
	entries: BTreeMap<String, Affordance>,
}

impl AffordanceCatalog {
	/// The catalog compiled into this crate.
	pub fn builtin() -> Result<Self> {
		Self::parse(BUILTIN)
	}

	pub fn parse(json: &str) -> Result<Self> {
		let document: CatalogDocument = serde_json::from_str(json)?;
		let entries = document
			.affordances
			.into_iter()
			.map(|(name, mut affordance)| {
				affordance.name = name.clone();
				(name, affordance)
			})
			.collect();
		Ok(Self {
			version: document.version,
			entries,
		})
	}

	/// Loads an override file and layers it on top of the built-in catalog.
	pub fn with_overrides(path: &Path) -> Result<Self> {
		let raw = std::fs::read_to_string(path)?;
		let mut catalog = Self::builtin()?;
		catalog.merge(Self::parse(&raw)?);
		Ok(catalog)
	}

	/// Replaces entries by name. The higher version wins.
	pub fn merge(&mut self, other: AffordanceCatalog) {
		self.version = self.version.max(other.version);
		self.entries.extend(other.entries);
	}

	pub fn version(&self) -> u32 {
		self.version
	}

	pub fn get(&self, name: &str) -> Result<&Affordance> {
		self.entries
			.get(name)
			.ok_or_else(|| DriverError::Internal(format!("affordance catalog v{} has no entry named {name}", self.version)))
	}

	/// Names the driver needs that are missing from this catalog.
	pub fn missing(&self) -> Vec<&'static str> {
		names::ALL.into_iter().filter(|name| !self.entries.contains_key(*name)).collect()
	}

	pub fn iter(&self) -> impl Iterator<Item = &Affordance> {
		self.entries.values()
	}
}
