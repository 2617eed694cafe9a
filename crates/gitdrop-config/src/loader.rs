//! Config file discovery and layered loading.
//!
//! 1. Parse embedded `defaults.toml`
//! 2. Merge `/etc/gitdrop/config.toml` (system)
//! 3. Merge `~/.gitdrop/config.toml` (user)
//! 4. Merge the `--config` file, which must exist when given
//! 5. Apply `GITDROP_*` fallbacks to fields no file set
//! 6. Deserialize and validate

use std::collections::HashMap;
use std::hash::BuildHasher;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::env::{apply_env_fallbacks, collect_env_vars};
use crate::error::{ConfigError, ConfigResult};
use crate::merge::{ConfigLayer, FieldSources, deep_merge_tracking, record_leaves};
use crate::show::ResolvedConfig;
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
pub(crate) const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Maximum allowed config file size (1 MiB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// System-wide config location.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/gitdrop/config.toml";

/// Files consulted by [`load`], lowest precedence first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    /// System-wide file.
    pub system: PathBuf,
    /// Per-user file.
    pub user: PathBuf,
    /// File named on the command line.
    pub explicit: Option<PathBuf>,
}

impl ConfigPaths {
    /// Standard locations for the current user.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoHomeDir`] if the home directory is unknown.
    pub fn standard(explicit: Option<&Path>) -> ConfigResult<Self> {
        let home = directories::BaseDirs::new()
            .map(|d| d.home_dir().to_path_buf())
            .ok_or(ConfigError::NoHomeDir)?;
        Ok(Self::with_home(&home, explicit))
    }

    /// Standard locations relative to `home`.
    #[must_use]
    pub fn with_home(home: &Path, explicit: Option<&Path>) -> Self {
        Self {
            system: PathBuf::from(SYSTEM_CONFIG_PATH),
            user: home.join(".gitdrop").join("config.toml"),
            explicit: explicit.map(Path::to_path_buf),
        }
    }

    /// Every file with the layer it feeds, lowest precedence first.
    #[must_use]
    pub fn layers(&self) -> Vec<(ConfigLayer, &Path)> {
        let mut layers = vec![
            (ConfigLayer::System, self.system.as_path()),
            (ConfigLayer::User, self.user.as_path()),
        ];
        if let Some(explicit) = &self.explicit {
            layers.push((ConfigLayer::Explicit, explicit.as_path()));
        }
        layers
    }
}

/// Load configuration from `paths` and the process environment.
///
/// # Errors
///
/// Returns a [`ConfigError`] if a file is unreadable, oversized, or
/// malformed, if the explicit file is missing, or if the merged
/// configuration fails validation.
pub fn load(paths: &ConfigPaths) -> ConfigResult<ResolvedConfig> {
    load_with_env(paths, &collect_env_vars())
}

/// Like [`load`], reading environment fallbacks from `env_vars`.
///
/// # Errors
///
/// See [`load`].
pub fn load_with_env<S: BuildHasher>(
    paths: &ConfigPaths,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<ResolvedConfig> {
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;

    let mut field_sources = FieldSources::new();
    let mut loaded_files = Vec::new();
    record_leaves(&merged, "", &ConfigLayer::Defaults, &mut field_sources);

    for (layer, path) in paths.layers() {
        let overlay = match try_load_file(path)? {
            Some(overlay) => overlay,
            None if layer == ConfigLayer::Explicit => {
                return Err(ConfigError::ReadError {
                    path: path.display().to_string(),
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                });
            },
            None => continue,
        };
        deep_merge_tracking(&mut merged, &overlay, "", &layer, &mut field_sources);
        loaded_files.push(path.display().to_string());
        info!(path = %path.display(), %layer, "loaded config");
    }

    let env_count = apply_env_fallbacks(&mut merged, &mut field_sources, env_vars);
    if env_count > 0 {
        debug!(count = env_count, "applied environment variable fallbacks");
    }

    let config: Config =
        merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError {
                path: "<merged config>".to_owned(),
                source: e,
            })?;

    validate::validate(&config)?;

    Ok(ResolvedConfig {
        config,
        field_sources,
        loaded_files,
    })
}

/// Load a single file over the built-in defaults, without layering or
/// environment fallbacks.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read or parsed, or fails
/// validation.
pub fn load_file(path: &Path) -> ConfigResult<Config> {
    let content = read_bounded(path)?;
    let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;
    validate::validate(&config)?;
    Ok(config)
}

/// Read and parse `path`, or `None` if it does not exist.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let content = match read_bounded(path) {
        Ok(c) => c,
        Err(ConfigError::ReadError { source, .. })
            if source.kind() == std::io::ErrorKind::NotFound =>
        {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => return Err(e),
    };

    let value: toml::Value = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(Some(value))
}

/// Read a file, rejecting anything over [`MAX_CONFIG_FILE_SIZE`].
///
/// The size is checked after a single read so the file cannot grow between
/// a stat and the read.
fn read_bounded(path: &Path) -> ConfigResult<String> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    if content.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {MAX_CONFIG_FILE_SIZE} byte limit",
                content.len()
            ),
        });
    }
    Ok(content)
}
