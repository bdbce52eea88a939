//! [`Surface`] and [`Launcher`] backed by a real Chromium over DevTools.
//!
//! Elements are located by a script that walks the candidate selectors,
//! keeps visible elements whose normalized labels match a variant, and tags
//! the chosen element with a `data-nbd-handle` attribute. Later operations
//! address the element through that attribute.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use nbd_runtime::{Browser, LaunchOptions, PageSession};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::affordance::{Affordance, MatchMode, Pick};
use crate::error::{DriverError, Result};
use crate::surface::{ElementHandle, LaunchError, Launcher, Surface};

const LOAD_POLL: Duration = Duration::from_millis(100);

/// Launches Chromium processes with remote debugging.
#[derive(Debug, Clone)]
pub struct ChromeLauncher {
	executable: Option<PathBuf>,
	startup_timeout: Duration,
}

impl ChromeLauncher {
	pub fn new(executable: Option<PathBuf>, startup_timeout: Duration) -> Self {
		Self {
			executable,
			startup_timeout,
		}
	}
}

#[async_trait]
impl Launcher for ChromeLauncher {
	type Surface = CdpSurface;

	async fn launch(&self, profile: &Path, headless: bool) -> std::result::Result<CdpSurface, LaunchError> {
		let mut options = LaunchOptions::new(profile);
		options.executable = self.executable.clone();
		options.headless = headless;
		options.startup_timeout = self.startup_timeout;

		let browser = match Browser::launch(&options).await {
			Ok(browser) => browser,
			Err(nbd_runtime::Error::ProfileInUse { holder, .. }) => return Err(LaunchError::InUse { holder }),
			Err(e) => return Err(LaunchError::from_message(e.to_string())),
		};
		match browser.open_page().await {
			Ok(page) => Ok(CdpSurface { browser, page }),
			Err(e) => {
				let message = e.to_string();
				if let Err(close_err) = browser.close().await {
					debug!(target = "nbd", error = %close_err, "closing browser after failed attach");
				}
				Err(LaunchError::Failed(message))
			}
		}
	}
}

/// A page in a launched browser.
pub struct CdpSurface {
	browser: Browser,
	page: PageSession,
}

#[derive(Debug, Deserialize)]
struct Located {
	id: String,
	label: String,
}

#[derive(Debug, Deserialize)]
struct Point {
	x: f64,
	y: f64,
}

impl CdpSurface {
	pub fn page(&self) -> &PageSession {
		&self.page
	}

	fn stale(element: &ElementHandle) -> DriverError {
		DriverError::Surface(format!("element {} is no longer attached", element.label()))
	}
}

#[async_trait]
impl Surface for CdpSurface {
	async fn goto(&self, url: &str, timeout: Duration) -> Result<()> {
		// Marks the outgoing document so the load check cannot pass on it.
		if let Err(e) = self.page.evaluate("window.__nbdLeaving = true").await {
			debug!(target = "nbd", error = %e, "could not mark outgoing document");
		}
		self.page.navigate(url).await?;

		let deadline = Instant::now() + timeout;
		loop {
			match self
				.page
				.evaluate_as::<bool>("!window.__nbdLeaving && document.readyState !== 'loading'")
				.await
			{
				Ok(true) => return Ok(()),
				Ok(false) => {}
				Err(e) => debug!(target = "nbd", error = %e, "document not ready yet"),
			}
			if Instant::now() >= deadline {
				let landed_on = self.current_url().await.unwrap_or_default();
				return Err(DriverError::NavigationTimeout {
					target: url.to_string(),
					landed_on,
				});
			}
			tokio::time::sleep(LOAD_POLL).await;
		}
	}

	async fn current_url(&self) -> Result<String> {
		Ok(self.page.evaluate_as::<String>("location.href").await?)
	}

	async fn locate(&self, affordance: &Affordance) -> Result<Option<ElementHandle>> {
		let located: Option<Located> = self.page.evaluate_as(&locator_script(affordance, "locate")).await?;
		Ok(located.map(|l| ElementHandle::new(l.id, l.label)))
	}

	async fn count(&self, affordance: &Affordance) -> Result<usize> {
		Ok(self.page.evaluate_as(&locator_script(affordance, "count")).await?)
	}

	async fn click(&self, element: &ElementHandle) -> Result<()> {
		let script = element_script(
			element,
			"el.scrollIntoView({ block: 'center', inline: 'center' }); const r = el.getBoundingClientRect(); return { x: r.left + r.width / 2, y: r.top + r.height / 2 };",
		);
		let point: Option<Point> = self.page.evaluate_as(&script).await?;
		let point = point.ok_or_else(|| Self::stale(element))?;
		self.page.click_at(point.x, point.y).await?;
		Ok(())
	}

	async fn fill(&self, element: &ElementHandle, text: &str) -> Result<()> {
		let script = element_script(
			element,
			"el.focus(); \
			 if (typeof el.select === 'function') { el.select(); } \
			 else { const range = document.createRange(); range.selectNodeContents(el); const sel = window.getSelection(); sel.removeAllRanges(); sel.addRange(range); } \
			 return true;",
		);
		let focused: Option<bool> = self.page.evaluate_as(&script).await?;
		if focused.is_none() {
			return Err(Self::stale(element));
		}
		if text.is_empty() {
			self.page.evaluate("document.execCommand('delete')").await?;
		} else {
			self.page.insert_text(text).await?;
		}
		Ok(())
	}

	async fn press_enter(&self, element: &ElementHandle) -> Result<()> {
		let focused: Option<bool> = self.page.evaluate_as(&element_script(element, "el.focus(); return true;")).await?;
		if focused.is_none() {
			return Err(Self::stale(element));
		}
		self.page.press_enter().await?;
		Ok(())
	}

	async fn text(&self, element: &ElementHandle) -> Result<String> {
		let text: Option<String> = self
			.page
			.evaluate_as(&element_script(element, "return el.innerText || el.textContent || '';"))
			.await?;
		text.ok_or_else(|| Self::stale(element))
	}

	async fn close(self) -> Result<()> {
		self.browser.close().await?;
		Ok(())
	}
}

/// Script resolving `affordance`; `mode` is `"locate"` or `"count"`.
fn locator_script(affordance: &Affordance, mode: &str) -> String {
	let query = json!({
		"selectors": affordance.candidate_selectors(),
		"variants": affordance.normalized_labels(),
		"exact": affordance.matching == MatchMode::Exact,
		"last": affordance.pick == Pick::Last,
		"scope": affordance.scope,
		"mode": mode,
	});
	format!("({LOCATOR_JS})({query})")
}

const LOCATOR_JS: &str = r#"(query) => {
	const norm = (s) => (s || '').replace(/\s+/g, ' ').trim().toLowerCase();
	const visible = (el) => {
		if (!el.isConnected) return false;
		const style = getComputedStyle(el);
		if (style.visibility === 'hidden' || style.display === 'none' || Number(style.opacity) === 0) return false;
		const rect = el.getBoundingClientRect();
		return rect.width > 0 && rect.height > 0;
	};
	const labels = (el) => [el.innerText, el.getAttribute('aria-label'), el.getAttribute('placeholder'), el.getAttribute('title'), el.getAttribute('mattooltip')]
		.map(norm)
		.filter((s) => s.length > 0);
	const hits = (el, v) => labels(el).some((l) => (query.exact ? l === v : l.includes(v)));

	const roots = query.scope ? Array.from(document.querySelectorAll(query.scope)).filter(visible) : [document];
	const seen = new Set();
	const found = [];
	for (const root of roots) {
		for (const sel of query.selectors) {
			let list;
			try { list = root.querySelectorAll(sel); } catch (_) { continue; }
			for (const el of list) {
				if (!seen.has(el) && visible(el)) { seen.add(el); found.push(el); }
			}
		}
	}
	found.sort((a, b) => (a === b ? 0 : a.compareDocumentPosition(b) & Node.DOCUMENT_POSITION_FOLLOWING ? -1 : 1));

	let matched = found;
	if (query.variants.length > 0) {
		matched = [];
		for (const v of query.variants) {
			matched = found.filter((el) => hits(el, v));
			if (matched.length > 0) break;
		}
	}
	if (query.mode === 'count') return matched.length;
	if (matched.length === 0) return null;

	const el = query.last ? matched[matched.length - 1] : matched[0];
	let id = el.getAttribute('data-nbd-handle');
	if (!id) {
		window.__nbdSeq = (window.__nbdSeq || 0) + 1;
		id = 'h' + window.__nbdSeq;
		el.setAttribute('data-nbd-handle', id);
	}
	return { id, label: labels(el)[0] || '' };
}"#;

/// Wraps `body` so it runs with `el` bound to the handle's element, yielding `null` when detached.
fn element_script(element: &ElementHandle, body: &str) -> String {
	let selector = format!("[data-nbd-handle=\"{}\"]", element.id().replace(['"', '\\'], ""));
	format!(
		"(() => {{ const el = document.querySelector({}); if (!el) return null; {body} }})()",
		json!(selector)
	)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::affordance::{AffordanceCatalog, names};

	#[test]
	fn locator_script_embeds_normalized_variants() {
		let catalog = AffordanceCatalog::builtin().unwrap();
		let script = locator_script(catalog.get(names::CONFIRM).unwrap(), "locate");
		assert!(script.contains(r#""variants":["insert","add","submit"]"#));
		assert!(script.contains(r#""exact":true"#));
		assert!(script.contains(r#""mode":"locate""#));
	}

	#[test]
	fn answer_locator_picks_last_match() {
		let catalog = AffordanceCatalog::builtin().unwrap();
		let script = locator_script(catalog.get(names::ANSWER_REGION).unwrap(), "count");
		assert!(script.contains(r#""last":true"#));
		assert!(script.contains(r#""mode":"count""#));
	}

	#[test]
	fn element_script_quotes_handle_selector() {
		let script = element_script(&ElementHandle::new("h7", "insert"), "return 1;");
		assert!(script.contains(r#"document.querySelector("[data-nbd-handle=\"h7\"]")"#));
		assert!(script.ends_with("return 1; })()"));
	}
}
