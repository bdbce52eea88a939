//! Wire types for the Chrome DevTools Protocol.
//!
//! This crate contains the serde-serializable types exchanged with a Chromium
//! browser over its remote-debugging WebSocket. Only the small subset of the
//! protocol that the notebook driver touches is modelled here.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! - **Pure data**: No behavior beyond serialization/deserialization
//! - **1:1 with protocol**: Field names match the DevTools protocol schema
//! - **Stable**: Changes only when the wire protocol changes
//!
//! Connection management and request correlation live in `nbd-runtime`.

pub mod message;
pub mod types;

pub use message::*;
pub use types::*;
