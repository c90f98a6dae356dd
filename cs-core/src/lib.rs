//! chatstack core - foundation types shared by every other crate.
//!
//! This crate provides:
//! - Stack configuration (images, ports, volume names, file locations)
//! - The unified error type and its exit-code mapping
//! - Structured logging with tracing
//! - Platform directory lookup
//! - Well-known constants (environment keys, default credentials)

pub mod config;
pub mod error;
pub mod logging;
pub mod platform;
pub mod constants;

// Re-export commonly used items at the crate root
pub use config::StackConfig;
pub use error::{CsResult, StackError};
pub use logging::init_logging;
pub use platform::Platform;
