//! HTTP remote-store client for the Unibox engine
//!
//! Implements the engine's remote boundary traits over the Unibox
//! backend API: message listing and flag persistence, per-mailbox sync
//! triggering, the change feed, and the pipeline/campaign context
//! calls.

pub mod client;
pub mod error;
mod notify;
pub mod types;

pub use client::InboxClient;
pub use error::{ApiError, ApiResult};
