//! Asking a question and waiting for the streamed answer to settle.

use tracing::{debug, info};

use crate::affordance::{Affordance, names};
use crate::context::Context;
use crate::error::{DriverError, Result};
use crate::navigator::{self, Target};
use crate::repository::RepositoryHandle;
use crate::surface::Surface;

/// Decides when a streamed answer has stopped changing.
///
/// Counts the current run of identical non-empty reads. A differing read
/// starts a new run; an empty read clears everything.
#[derive(Debug, Clone)]
pub struct Stabilizer {
	threshold: u32,
	last: Option<String>,
	run: u32,
}

impl Stabilizer {
	pub fn new(threshold: u32) -> Self {
		Self {
			threshold: threshold.max(1),
			last: None,
			run: 0,
		}
	}

	/// Feeds one read. Returns the final text once it has been seen `threshold` times in a row.
	pub fn observe(&mut self, text: &str) -> Option<String> {
		let text = text.trim();
		if text.is_empty() {
			self.last = None;
			self.run = 0;
			return None;
		}
		if self.last.as_deref() == Some(text) {
			self.run += 1;
		} else {
			self.last = Some(text.to_string());
			self.run = 1;
		}
		(self.run >= self.threshold).then(|| text.to_string())
	}

	pub fn run_length(&self) -> u32 {
		self.run
	}

	/// Characters in the latest non-empty read.
	pub fn received(&self) -> usize {
		self.last.as_deref().map_or(0, |t| t.chars().count())
	}
}

/// Asks `question` in `repository` and returns the settled answer.
///
/// Only an answer beyond the pre-submit count, on an element other than the
/// previous turn's last answer, is read. Reads that fail while the answer
/// re-renders are skipped until the response deadline.
pub(crate) async fn ask<S: Surface>(ctx: &Context<'_>, surface: &S, repository: &RepositoryHandle, question: &str) -> Result<String> {
	navigator::open(ctx, surface, &Target::Repository(repository.clone())).await?;

	let timeouts = &ctx.config.timeouts;
	let answers = ctx.affordance(names::ANSWER_REGION)?;
	let baseline = settled_count(ctx, surface, answers).await?;
	let previous = surface.locate(answers).await?.map(|element| element.id().to_string());

	let input = ctx.require(surface, names::QUESTION_INPUT).await?;
	surface.fill(&input, question).await?;
	surface.press_enter(&input).await?;
	let deadline = ctx.clock.now() + timeouts.response();
	debug!(target = "nbd", baseline, previous = previous.as_deref().unwrap_or("-"), "question submitted");

	wait_out_thinking(ctx, surface, baseline).await?;

	let mut stabilizer = Stabilizer::new(ctx.config.stable_reads);
	loop {
		if ctx.clock.now() >= deadline {
			return Err(DriverError::ResponseTimeout {
				ms: timeouts.response_ms,
				received: stabilizer.received(),
			});
		}
		match read_newest(surface, answers, baseline, previous.as_deref()).await {
			Ok(Some(text)) => {
				if let Some(answer) = stabilizer.observe(&text) {
					info!(target = "nbd", repository = %repository, chars = answer.chars().count(), "answer settled");
					return Ok(answer);
				}
				debug!(target = "nbd", run = stabilizer.run_length(), chars = text.len(), "answer still streaming");
			}
			Ok(None) => {}
			// a lost read neither extends nor breaks the current run
			Err(e) => debug!(target = "nbd", error = %e, "answer read failed, polling again"),
		}
		ctx.clock.sleep(timeouts.poll()).await;
	}
}

/// Text of the newest answer, if one has appeared since submitting.
async fn read_newest<S: Surface>(surface: &S, answers: &Affordance, baseline: usize, previous: Option<&str>) -> Result<Option<String>> {
	if surface.count(answers).await? <= baseline {
		return Ok(None);
	}
	let Some(element) = surface.locate(answers).await? else {
		return Ok(None);
	};
	if previous == Some(element.id()) {
		debug!(target = "nbd", "last answer is still the previous turn");
		return Ok(None);
	}
	Ok(Some(surface.text(&element).await?))
}

/// Answer count once it has held still for `stable_reads` polls.
///
/// Chat history can keep rendering after the page reports ready. Bounded by
/// one UI step; the latest count is used if it never settles.
async fn settled_count<S: Surface>(ctx: &Context<'_>, surface: &S, answers: &Affordance) -> Result<usize> {
	let deadline = ctx.clock.now() + ctx.config.timeouts.step();
	let mut last = surface.count(answers).await?;
	let mut steady = 1;
	while steady < ctx.config.stable_reads && ctx.clock.now() < deadline {
		ctx.clock.sleep(ctx.config.timeouts.poll()).await;
		let count = surface.count(answers).await?;
		if count == last {
			steady += 1;
		} else {
			debug!(target = "nbd", from = last, to = count, "answer history still rendering");
			last = count;
			steady = 1;
		}
	}
	Ok(last)
}

/// Waits for the thinking indicator to come and go.
///
/// An indicator that never shows within the grace period is fine: fast
/// answers skip it. One that never leaves is left to the answer deadline.
/// Lookup failures here count as "no indicator".
async fn wait_out_thinking<S: Surface>(ctx: &Context<'_>, surface: &S, baseline: usize) -> Result<()> {
	let timeouts = &ctx.config.timeouts;
	let indicator = ctx.affordance(names::THINKING_INDICATOR)?;
	let answers = ctx.affordance(names::ANSWER_REGION)?;

	let grace = ctx.clock.now() + timeouts.thinking_grace();
	loop {
		if matches!(surface.locate(indicator).await, Ok(Some(_))) {
			break;
		}
		if surface.count(answers).await.is_ok_and(|n| n > baseline) || ctx.clock.now() >= grace {
			debug!(target = "nbd", "no thinking indicator");
			return Ok(());
		}
		ctx.clock.sleep(timeouts.poll()).await;
	}

	match ctx.wait_gone(surface, &[indicator], timeouts.thinking()).await {
		Ok(true) => {}
		Ok(false) => debug!(target = "nbd", "thinking indicator still showing, reading the answer anyway"),
		Err(e) => debug!(target = "nbd", error = %e, "thinking indicator check failed"),
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use proptest::prelude::*;

	use super::*;
	use crate::config::DriverConfig;
	use crate::testing::{Call, Effect, FakeSurface, Harness};

	/// Notebook page where submitting produces one new answer with scripted reads.
	fn chat(reads: &[&str], thinking: Vec<bool>) -> FakeSurface {
		let surface = FakeSurface::new();
		surface
			.on_goto(vec![Effect::Show(names::QUESTION_INPUT), Effect::Count(names::ANSWER_REGION, 2)])
			.on_enter(vec![
				Effect::Visibility(names::THINKING_INDICATOR, thinking),
				Effect::Count(names::ANSWER_REGION, 3),
				Effect::Show(names::ANSWER_REGION),
			])
			.script_text(names::ANSWER_REGION, reads);
		surface
	}

	#[test]
	fn three_identical_reads_settle() {
		let mut s = Stabilizer::new(3);
		assert_eq!(s.observe("Fin"), None);
		assert_eq!(s.observe("Final ans"), None);
		assert_eq!(s.observe("Final answer"), None);
		assert_eq!(s.observe("Final answer"), None);
		assert_eq!(s.observe("Final answer"), Some("Final answer".to_string()));
	}

	#[test]
	fn empty_read_breaks_a_run() {
		let mut s = Stabilizer::new(3);
		s.observe("x");
		s.observe("x");
		assert_eq!(s.observe("  "), None);
		assert_eq!(s.run_length(), 0);
		assert_eq!(s.observe("x"), None);
		assert_eq!(s.observe("x"), None);
		assert_eq!(s.observe("x"), Some("x".to_string()));
	}

	fn settles_at(reads: &[String], threshold: usize) -> Option<usize> {
		(threshold - 1..reads.len()).find(|&i| {
			let window = &reads[i + 1 - threshold..=i];
			!window[0].trim().is_empty() && window.iter().all(|r| r.trim() == window[0].trim())
		})
	}

	proptest! {
		#[test]
		fn settles_exactly_at_first_stable_window(reads in prop::collection::vec(prop::sample::select(vec!["", " ", "a", "ab", "abc"]), 0..40)) {
			let reads: Vec<String> = reads.into_iter().map(String::from).collect();
			let mut stabilizer = Stabilizer::new(3);
			let got = reads.iter().position(|r| stabilizer.observe(r).is_some());
			prop_assert_eq!(got, settles_at(&reads, 3));
		}

		#[test]
		fn changing_text_never_settles(len in 1usize..30) {
			let mut stabilizer = Stabilizer::new(3);
			for i in 0..len {
				prop_assert!(stabilizer.observe(&"x".repeat(i + 1)).is_none());
			}
		}
	}

	#[tokio::test]
	async fn streamed_answer_settles_after_three_identical_reads() {
		let hx = Harness::new();
		let surface = chat(&["Fin", "Final ans", "Final answer", "Final answer", "Final answer"], vec![true, true, false]);

		let answer = ask(&hx.ctx(), &surface, &hx.repository("nb1"), "What is X?").await.unwrap();

		assert_eq!(answer, "Final answer");
		assert_eq!(surface.text_reads(), 5);
		assert!(surface.calls().contains(&Call::Fill(names::QUESTION_INPUT.into(), "What is X?".into())));
		assert!(surface.calls().contains(&Call::PressEnter(names::QUESTION_INPUT.into())));
	}

	#[tokio::test]
	async fn missing_thinking_indicator_is_tolerated() {
		let hx = Harness::new();
		let surface = chat(&["42"], vec![false]);

		let answer = ask(&hx.ctx(), &surface, &hx.repository("nb1"), "Answer?").await.unwrap();
		assert_eq!(answer, "42");
	}

	#[tokio::test]
	async fn previous_answers_are_not_reread() {
		let mut config = DriverConfig::default();
		config.timeouts.response_ms = 10_000;
		let hx = Harness::with_config(config);
		let surface = FakeSurface::new();
		surface
			.on_goto(vec![Effect::Show(names::QUESTION_INPUT), Effect::Count(names::ANSWER_REGION, 1), Effect::Show(names::ANSWER_REGION)])
			.script_text(names::ANSWER_REGION, &["old answer"]);
		let err = ask(&hx.ctx(), &surface, &hx.repository("nb1"), "Again?").await.unwrap_err();

		assert!(matches!(err, DriverError::ResponseTimeout { received: 0, .. }));
		assert_eq!(surface.text_reads(), 0);
	}

	#[tokio::test]
	async fn rerendered_answer_read_is_skipped() {
		let hx = Harness::new();
		let surface = chat(&["Partial", "Final answer"], vec![false]);
		surface.fail_text_read(names::ANSWER_REGION, 2, "element answer-region is no longer attached");

		let answer = ask(&hx.ctx(), &surface, &hx.repository("nb1"), "What changed?").await.unwrap();

		assert_eq!(answer, "Final answer");
		assert_eq!(surface.text_reads(), 5);
	}

	/// A page showing one earlier turn under handle `old-turn`.
	fn notebook_with_history(counts: Vec<usize>) -> FakeSurface {
		let surface = FakeSurface::new();
		surface
			.on_goto(vec![
				Effect::Show(names::QUESTION_INPUT),
				Effect::Counts(names::ANSWER_REGION, counts),
				Effect::Show(names::ANSWER_REGION),
				Effect::Element(names::ANSWER_REGION, "old-turn"),
			])
			.script_text("old-turn", &["answer from yesterday"]);
		surface
	}

	fn short_response() -> Harness {
		let mut config = DriverConfig::default();
		config.timeouts.response_ms = 10_000;
		Harness::with_config(config)
	}

	#[tokio::test]
	async fn late_rendering_history_is_not_taken_for_the_answer() {
		let hx = short_response();
		let surface = notebook_with_history(vec![0, 0, 1]);

		let err = ask(&hx.ctx(), &surface, &hx.repository("nb1"), "new question").await.unwrap_err();

		assert!(matches!(err, DriverError::ResponseTimeout { received: 0, .. }), "got {err:?}");
		assert_eq!(surface.text_reads(), 0);
	}

	#[tokio::test]
	async fn growing_count_alone_does_not_reread_the_last_turn() {
		let hx = short_response();
		let surface = notebook_with_history(vec![1]);
		surface.on_enter(vec![Effect::Count(names::ANSWER_REGION, 2)]);

		let err = ask(&hx.ctx(), &surface, &hx.repository("nb1"), "new question").await.unwrap_err();
		assert!(matches!(err, DriverError::ResponseTimeout { .. }));
		assert_eq!(surface.text_reads(), 0);

		surface
			.on_enter(vec![Effect::Count(names::ANSWER_REGION, 2), Effect::Element(names::ANSWER_REGION, "new-turn")])
			.script_text("new-turn", &["fresh answer"]);
		let answer = ask(&hx.ctx(), &surface, &hx.repository("nb1"), "new question").await.unwrap();
		assert_eq!(answer, "fresh answer");
	}

	#[tokio::test]
	async fn ever_changing_answer_times_out() {
		let hx = Harness::new();
		let reads: Vec<String> = (1..=200).map(|i| "token ".repeat(i)).collect();
		let reads: Vec<&str> = reads.iter().map(String::as_str).collect();
		let surface = chat(&reads, vec![false]);

		match ask(&hx.ctx(), &surface, &hx.repository("nb1"), "Stream forever?").await {
			Err(DriverError::ResponseTimeout { ms, received }) => {
				assert_eq!(ms, 120_000);
				assert!(received > 0);
			}
			other => panic!("expected response timeout, got {other:?}"),
		}
	}
}
