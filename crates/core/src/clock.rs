//! Time source for every wait and delay the driver performs.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

#[async_trait]
pub trait Clock: Send + Sync {
	fn now(&self) -> Instant;

	async fn sleep(&self, duration: Duration);
}

/// Wall-clock time backed by the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
	fn now(&self) -> Instant {
		Instant::now()
	}

	async fn sleep(&self, duration: Duration) {
		tokio::time::sleep(duration).await;
	}
}

/// Virtual time. Sleeping advances the clock immediately and is recorded.
#[derive(Debug)]
pub struct ManualClock {
	origin: Instant,
	state: Mutex<ManualState>,
}

#[derive(Debug, Default)]
struct ManualState {
	elapsed: Duration,
	sleeps: Vec<Duration>,
}

impl ManualClock {
	pub fn new() -> Self {
		Self {
			origin: Instant::now(),
			state: Mutex::new(ManualState::default()),
		}
	}

	/// Virtual time elapsed since construction.
	pub fn elapsed(&self) -> Duration {
		self.lock().elapsed
	}

	/// Every sleep requested so far, in order.
	pub fn sleeps(&self) -> Vec<Duration> {
		self.lock().sleeps.clone()
	}

	pub fn advance(&self, by: Duration) {
		self.lock().elapsed += by;
	}

	fn lock(&self) -> std::sync::MutexGuard<'_, ManualState> {
		self.state.lock().unwrap_or_else(|e| e.into_inner())
	}
}

impl Default for ManualClock {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl Clock for ManualClock {
	fn now(&self) -> Instant {
		self.origin + self.lock().elapsed
	}

	async fn sleep(&self, duration: Duration) {
		{
			let mut state = self.lock();
			state.elapsed += duration;
			state.sleeps.push(duration);
		}
		tokio::task::yield_now().await;
	}
}
