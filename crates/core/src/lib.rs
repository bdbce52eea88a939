//! nbd - drives a browser-only notebook application the way a person would
//!
//! The remote application exposes no API, so every operation opens a browser
//! session against a signed-in profile, walks the interface through a small
//! state machine and releases the session again:
//!
//! - [`NotebookDriver::create_repository`] creates a new notebook
//! - [`NotebookDriver::add_artifact`] adds a pasted-text or website source
//! - [`NotebookDriver::ask`] asks a question and waits for the streamed answer
//!   to stop changing
//!
//! # Layers
//!
//! ```text
//! NotebookDriver ── retry ── session ── navigator / dialog / creator / query
//!                                 │
//!                              Surface  (CdpSurface over nbd-runtime, or a fake)
//! ```
//!
//! Interface controls are never addressed by position. Each one is an
//! [`Affordance`] in a versioned [`AffordanceCatalog`]: a role plus the visible
//! label variants it has shipped with.

pub mod affordance;
pub mod artifact;
pub mod cdp;
pub mod clock;
pub mod config;
mod context;
pub mod creator;
pub mod dialog;
pub mod driver;
pub mod error;
pub mod navigator;
pub mod query;
pub mod repository;
pub mod retry;
pub mod session;
pub mod surface;

#[cfg(test)]
pub(crate) mod testing;

pub use affordance::{Affordance, AffordanceCatalog, Pick, Role};
pub use artifact::{AnalysisSummary, ArtifactKind, ArtifactRequest, SearchResult, SearchTopic, UrlFilter};
pub use cdp::{CdpSurface, ChromeLauncher};
pub use clock::{Clock, ManualClock, TokioClock};
pub use config::DriverConfig;
pub use driver::NotebookDriver;
pub use error::{DriverError, ErrorCode, Result};
pub use repository::{RepositoryHandle, RepositoryLayout, UrlShape};
pub use retry::{Failure, FailureKind, RetryPolicy};
pub use session::{AutomationSession, CloneReport, SessionAcquirer};
pub use surface::{ElementHandle, LaunchError, Launcher, Surface};
