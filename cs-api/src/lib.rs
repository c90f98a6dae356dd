//! chatstack API - HTTP probes against the running stack.
//!
//! The stack's HTTP surfaces belong to the third-party containers; this
//! crate only asks them "are you answering yet?". It provides a probe
//! client with per-request timeouts and a readiness poller with capped
//! exponential backoff.

pub mod client;
pub mod readiness;

// Re-export key types
pub use client::{ProbeClient, ProbeOutcome};
pub use readiness::{BackoffConfig, EndpointReport};
