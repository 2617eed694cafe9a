//! Gitdrop Telemetry - Logging and request correlation for gitdrop.
//!
//! This crate provides:
//! - Logging setup in pretty, compact, JSON, or full format
//! - Output to stdout, stderr, or a rolling file
//! - Request context spans that tie an upload's log lines together
//!
//! # Example
//!
//! ```rust,no_run
//! use gitdrop_telemetry::{LogConfig, LogFormat, RequestContext, RequestGuard, setup_logging};
//!
//! # fn main() -> Result<(), gitdrop_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Compact)
//!     .with_directive("gitdrop_upload=debug");
//! setup_logging(&config)?;
//!
//! let _guard = RequestGuard::new(RequestContext::new("cli").with_operation("upload"));
//! tracing::info!("Uploading");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod context;
mod error;
mod logging;

pub use context::{RequestContext, RequestGuard};
pub use error::{TelemetryError, TelemetryResult};
pub use logging::{FileLogConfig, FileRotation, LogConfig, LogFormat, LogTarget, setup_logging};
