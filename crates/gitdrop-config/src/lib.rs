#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
//! Layered configuration for gitdrop.
//!
//! # Usage
//!
//! ```rust,no_run
//! use gitdrop_config::Config;
//!
//! let resolved = Config::load(None).unwrap();
//! println!("default branch: {}", resolved.config.upload.default_branch);
//! ```
//!
//! # Configuration Precedence
//!
//! From highest to lowest priority:
//!
//! 1. **Explicit file** (`--config <file>`)
//! 2. **User** (`~/.gitdrop/config.toml`)
//! 3. **System** (`/etc/gitdrop/config.toml`)
//! 4. **Environment variables** (`GITDROP_*`), fallback only
//! 5. **Embedded defaults** (`defaults.toml` compiled into the binary)
//!
//! This crate does not depend on the other gitdrop crates. The CLI converts
//! sections into upload and logging settings.

/// `GITDROP_*` environment fallbacks.
pub mod env;
/// Configuration error types.
pub mod error;
/// File discovery and layered loading.
pub mod loader;
/// Layered merging with source tracking.
pub mod merge;
/// Resolved configuration display.
pub mod show;
/// Configuration struct definitions.
pub mod types;
/// Range and enum checks on merged configuration.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigPaths;
pub use merge::{ConfigLayer, FieldSources};
pub use show::{ResolvedConfig, ShowFormat};
pub use types::*;

impl Config {
    /// Load with the full precedence chain, adding `explicit` as the
    /// highest-precedence file.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the home directory is unknown, a config
    /// file is malformed, or the result fails validation.
    pub fn load(explicit: Option<&std::path::Path>) -> ConfigResult<ResolvedConfig> {
        loader::load(&ConfigPaths::standard(explicit)?)
    }

    /// Load a single file over the built-in defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read or parsed, or
    /// fails validation.
    pub fn load_file(path: &std::path::Path) -> ConfigResult<Self> {
        loader::load_file(path)
    }
}
