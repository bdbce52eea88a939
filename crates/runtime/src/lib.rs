//! nbd runtime - browser process lifecycle and DevTools connection
//!
//! This crate provides the low-level infrastructure the notebook driver uses
//! to operate a real Chromium browser:
//!
//! - **Chrome**: Locating the executable, launching it against a profile
//!   directory, and detecting when another process owns that profile
//! - **Transport**: WebSocket frames bridged onto channels
//! - **Connection**: JSON-RPC request/response correlation and event broadcast
//! - **Browser / Page**: Target attachment and the handful of page-level
//!   protocol calls (navigate, evaluate, input) the driver needs
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  nbd-core   │  Surface implementation, affordance lookup
//! └──────┬──────┘
//!        │ PageSession
//! ┌──────▼──────┐
//! │ nbd-runtime │  This crate
//! │  ┌────────┐ │
//! │  │ Conn   │ │  JSON-RPC correlation
//! │  └────────┘ │
//! │  ┌────────┐ │
//! │  │ Trans  │ │  WebSocket transport
//! │  └────────┘ │
//! │  ┌────────┐ │
//! │  │ Chrome │ │  Process management
//! │  └────────┘ │
//! └─────────────┘
//! ```

pub mod browser;
pub mod chrome;
pub mod connection;
pub mod error;
pub mod page;
pub mod transport;

pub use browser::Browser;
pub use chrome::{ChromeProcess, LaunchOptions, find_chrome_executable, profile_lock_holder};
pub use connection::Connection;
pub use error::{Error, Result};
pub use page::PageSession;
pub use transport::TransportParts;
