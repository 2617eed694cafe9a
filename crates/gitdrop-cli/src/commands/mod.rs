//! CLI commands.

pub(crate) mod config;
pub(crate) mod provider;
pub(crate) mod upload;
