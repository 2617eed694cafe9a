//! Commonly used types.
//!
//! `use gitdrop_telemetry::prelude::*;` brings in everything needed to set
//! up logging and open request spans.

pub use crate::{TelemetryError, TelemetryResult};

pub use crate::{LogConfig, LogFormat, LogTarget, setup_logging};

pub use crate::{RequestContext, RequestGuard};
