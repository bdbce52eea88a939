//! Scripted stand-ins for a browser, used by the component tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::affordance::{Affordance, AffordanceCatalog};
use crate::clock::ManualClock;
use crate::config::DriverConfig;
use crate::context::Context;
use crate::error::{DriverError, Result};
use crate::repository::{RepositoryHandle, RepositoryLayout};
use crate::surface::{ElementHandle, LaunchError, Launcher, Surface};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
	Goto(String),
	Click(String),
	Fill(String, String),
	PressEnter(String),
	Close,
}

/// A change to the fake page, applied after an interaction.
#[derive(Debug, Clone)]
pub enum Effect {
	Show(&'static str),
	Hide(&'static str),
	/// Successive visibility answers; the last one sticks.
	Visibility(&'static str, Vec<bool>),
	Count(&'static str, usize),
	/// Successive count answers; the last one sticks.
	Counts(&'static str, Vec<usize>),
	/// Handle id the affordance's element is located under. Defaults to its name.
	Element(&'static str, &'static str),
	/// Visible label of the affordance's element, checked against its variants.
	Label(&'static str, &'static str),
	/// Successive address-bar values; the last one sticks.
	Urls(Vec<String>),
}

#[derive(Default)]
struct FakeState {
	urls: VecDeque<String>,
	visible: HashMap<String, VecDeque<bool>>,
	counts: HashMap<String, VecDeque<usize>>,
	elements: HashMap<String, String>,
	labels: HashMap<String, String>,
	texts: HashMap<String, VecDeque<String>>,
	/// Per element id: which reads (1-based) fail, and with what message.
	text_failures: HashMap<String, Vec<(usize, String)>>,
	reads_by_element: HashMap<String, usize>,
	on_click: HashMap<String, Vec<Effect>>,
	on_goto: Vec<Effect>,
	on_enter: Vec<Effect>,
	redirect: Option<String>,
	calls: Vec<Call>,
	text_reads: usize,
	closed: bool,
}

impl FakeState {
	fn apply(&mut self, effects: &[Effect]) {
		for effect in effects {
			match effect {
				Effect::Show(name) => {
					self.visible.insert(name.to_string(), VecDeque::from([true]));
				}
				Effect::Hide(name) => {
					self.visible.insert(name.to_string(), VecDeque::from([false]));
				}
				Effect::Visibility(name, script) => {
					self.visible.insert(name.to_string(), script.iter().copied().collect());
				}
				Effect::Count(name, n) => {
					self.counts.insert(name.to_string(), VecDeque::from([*n]));
				}
				Effect::Counts(name, script) => {
					self.counts.insert(name.to_string(), script.iter().copied().collect());
				}
				Effect::Element(name, id) => {
					self.elements.insert(name.to_string(), id.to_string());
				}
				Effect::Label(name, label) => {
					self.labels.insert(name.to_string(), label.to_string());
				}
				Effect::Urls(urls) => self.urls = urls.iter().cloned().collect(),
			}
		}
	}

	fn is_visible(&mut self, name: &str) -> bool {
		match self.visible.get_mut(name) {
			Some(script) if script.len() > 1 => script.pop_front().unwrap_or(false),
			Some(script) => script.front().copied().unwrap_or(false),
			None => false,
		}
	}
}

fn sticky<T: Clone>(queue: &mut VecDeque<T>) -> Option<T> {
	if queue.len() > 1 { queue.pop_front() } else { queue.front().cloned() }
}

/// A page whose controls appear and disappear as scripted.
///
/// Clones share state, so a test keeps a handle to inspect after the driver
/// has consumed its copy.
#[derive(Clone, Default)]
pub struct FakeSurface {
	state: Arc<Mutex<FakeState>>,
}

impl FakeSurface {
	pub fn new() -> Self {
		let surface = Self::default();
		surface.lock().urls.push_back("about:blank".to_string());
		surface
	}

	fn lock(&self) -> MutexGuard<'_, FakeState> {
		self.state.lock().unwrap()
	}

	pub fn on_click(&self, name: &str, effects: Vec<Effect>) -> &Self {
		self.lock().on_click.insert(name.to_string(), effects);
		self
	}

	pub fn on_goto(&self, effects: Vec<Effect>) -> &Self {
		self.lock().on_goto = effects;
		self
	}

	pub fn on_enter(&self, effects: Vec<Effect>) -> &Self {
		self.lock().on_enter = effects;
		self
	}

	/// Every navigation lands on `url` instead of its target.
	pub fn redirect_to(&self, url: &str) -> &Self {
		self.lock().redirect = Some(url.to_string());
		self
	}

	pub fn script_text(&self, name: &str, reads: &[&str]) -> &Self {
		self.lock().texts.insert(name.to_string(), reads.iter().map(|s| s.to_string()).collect());
		self
	}

	/// Makes the `nth` text read of element `id` fail, as when the node is re-rendered mid-read.
	pub fn fail_text_read(&self, id: &str, nth: usize, message: &str) -> &Self {
		self.lock().text_failures.entry(id.to_string()).or_default().push((nth, message.to_string()));
		self
	}

	pub fn calls(&self) -> Vec<Call> {
		self.lock().calls.clone()
	}

	pub fn clicks(&self) -> Vec<String> {
		self.calls()
			.into_iter()
			.filter_map(|call| match call {
				Call::Click(name) => Some(name),
				_ => None,
			})
			.collect()
	}

	pub fn gotos(&self) -> usize {
		self.calls().iter().filter(|c| matches!(c, Call::Goto(_))).count()
	}

	pub fn text_reads(&self) -> usize {
		self.lock().text_reads
	}

	pub fn is_closed(&self) -> bool {
		self.lock().closed
	}
}

#[async_trait]
impl Surface for FakeSurface {
	async fn goto(&self, url: &str, _timeout: Duration) -> Result<()> {
		let mut state = self.lock();
		state.calls.push(Call::Goto(url.to_string()));
		let landed = state.redirect.clone().unwrap_or_else(|| url.to_string());
		state.urls = VecDeque::from([landed]);
		let effects = state.on_goto.clone();
		state.apply(&effects);
		Ok(())
	}

	async fn current_url(&self) -> Result<String> {
		Ok(sticky(&mut self.lock().urls).unwrap_or_default())
	}

	async fn locate(&self, affordance: &Affordance) -> Result<Option<ElementHandle>> {
		let name = affordance.name();
		let mut state = self.lock();
		if !state.is_visible(name) {
			return Ok(None);
		}
		let label = state.labels.get(name).cloned();
		if label.as_deref().is_some_and(|label| !affordance.matches_label(label)) {
			return Ok(None);
		}
		let id = state.elements.get(name).cloned().unwrap_or_else(|| name.to_string());
		Ok(Some(ElementHandle::new(id, label.unwrap_or_else(|| name.to_string()))))
	}

	async fn count(&self, affordance: &Affordance) -> Result<usize> {
		let mut state = self.lock();
		match state.counts.get_mut(affordance.name()) {
			Some(script) => Ok(sticky(script).unwrap_or_default()),
			None => Ok(usize::from(state.is_visible(affordance.name()))),
		}
	}

	async fn click(&self, element: &ElementHandle) -> Result<()> {
		let mut state = self.lock();
		state.calls.push(Call::Click(element.id().to_string()));
		let effects = state.on_click.get(element.id()).cloned().unwrap_or_default();
		state.apply(&effects);
		Ok(())
	}

	async fn fill(&self, element: &ElementHandle, text: &str) -> Result<()> {
		self.lock().calls.push(Call::Fill(element.id().to_string(), text.to_string()));
		Ok(())
	}

	async fn press_enter(&self, element: &ElementHandle) -> Result<()> {
		let mut state = self.lock();
		state.calls.push(Call::PressEnter(element.id().to_string()));
		let effects = state.on_enter.clone();
		state.apply(&effects);
		Ok(())
	}

	async fn text(&self, element: &ElementHandle) -> Result<String> {
		let mut state = self.lock();
		state.text_reads += 1;
		let id = element.id().to_string();
		let nth = {
			let reads = state.reads_by_element.entry(id.clone()).or_default();
			*reads += 1;
			*reads
		};
		if let Some((_, message)) = state.text_failures.get(&id).and_then(|f| f.iter().find(|(n, _)| *n == nth)) {
			return Err(DriverError::Surface(message.clone()));
		}
		match state.texts.get_mut(element.id()) {
			Some(reads) => Ok(sticky(reads).unwrap_or_default()),
			None => Err(DriverError::Surface(format!("no text scripted for {}", element.id()))),
		}
	}

	async fn close(self) -> Result<()> {
		let mut state = self.lock();
		state.calls.push(Call::Close);
		state.closed = true;
		Ok(())
	}
}

/// Hands out one shared [`FakeSurface`] and records every launch.
pub struct FakeLauncher {
	surface: FakeSurface,
	in_use: Mutex<HashSet<PathBuf>>,
	failure: Mutex<Option<String>>,
	launches: Mutex<Vec<PathBuf>>,
}

impl FakeLauncher {
	pub fn new(surface: FakeSurface) -> Self {
		Self {
			surface,
			in_use: Mutex::new(HashSet::new()),
			failure: Mutex::new(None),
			launches: Mutex::new(Vec::new()),
		}
	}

	pub fn mark_in_use(&self, profile: &Path) {
		self.in_use.lock().unwrap().insert(profile.to_path_buf());
	}

	pub fn fail_with(&self, message: &str) {
		*self.failure.lock().unwrap() = Some(message.to_string());
	}

	pub fn launches(&self) -> Vec<PathBuf> {
		self.launches.lock().unwrap().clone()
	}
}

#[async_trait]
impl Launcher for FakeLauncher {
	type Surface = FakeSurface;

	async fn launch(&self, profile: &Path, _headless: bool) -> std::result::Result<FakeSurface, LaunchError> {
		self.launches.lock().unwrap().push(profile.to_path_buf());
		if let Some(message) = self.failure.lock().unwrap().clone() {
			return Err(LaunchError::Failed(message));
		}
		if self.in_use.lock().unwrap().contains(profile) {
			return Err(LaunchError::InUse { holder: "fakehost-1".to_string() });
		}
		self.surface.lock().closed = false;
		Ok(self.surface.clone())
	}
}

/// Clock, config and catalog for driving one component directly.
pub struct Harness {
	pub clock: ManualClock,
	pub config: DriverConfig,
	pub catalog: AffordanceCatalog,
	pub layout: RepositoryLayout,
}

impl Harness {
	pub fn new() -> Self {
		Self::with_config(DriverConfig::default())
	}

	pub fn with_config(config: DriverConfig) -> Self {
		Self {
			clock: ManualClock::new(),
			layout: config.layout().unwrap(),
			catalog: AffordanceCatalog::builtin().unwrap(),
			config,
		}
	}

	pub fn ctx(&self) -> Context<'_> {
		Context {
			clock: &self.clock,
			config: &self.config,
			affordances: &self.catalog,
			layout: &self.layout,
		}
	}

	pub fn repository(&self, id: &str) -> RepositoryHandle {
		self.layout.parse_handle(id).unwrap()
	}
}
