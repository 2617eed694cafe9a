//! Configuration types.
//!
//! These mirror the settings of the upload and telemetry crates without
//! depending on them; the CLI converts between the two. Every struct
//! implements [`Default`] with the same values as `defaults.toml`, so a bare
//! `[section]` header produces a working configuration.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Request defaults and limits.
    pub upload: UploadSection,
    /// Git subprocess settings.
    pub git: GitSection,
    /// Zip expansion limits.
    pub archive: ArchiveSection,
    /// Log level, format, and per-crate directives.
    pub logging: LoggingSection,
}

// ---------------------------------------------------------------------------
// UploadSection
// ---------------------------------------------------------------------------

/// Defaults applied to uploads that leave fields blank, and request limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadSection {
    /// Branch used when a request names none.
    pub default_branch: String,
    /// Commit message used when a request supplies none.
    pub commit_message: String,
    /// Author name used when a request supplies none.
    pub author_name: String,
    /// Author email used when a request supplies none.
    pub author_email: String,
    /// Maximum number of files per request.
    pub max_files: usize,
    /// Maximum size of a single uploaded file.
    pub max_file_size_bytes: u64,
}

impl Default for UploadSection {
    fn default() -> Self {
        Self {
            default_branch: "main".to_owned(),
            commit_message: "Files uploaded via web interface".to_owned(),
            author_name: "Git Uploader".to_owned(),
            author_email: "uploader@example.com".to_owned(),
            max_files: 10,
            max_file_size_bytes: 52_428_800,
        }
    }
}

// ---------------------------------------------------------------------------
// GitSection
// ---------------------------------------------------------------------------

/// How git is invoked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitSection {
    /// Path or name of the git executable.
    pub binary: String,
    /// Seconds allowed for clone and push. `0` disables the limit.
    pub network_timeout_secs: u64,
    /// Directory for workspaces and SSH key material. System temp dir if unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_dir: Option<String>,
}

impl Default for GitSection {
    fn default() -> Self {
        Self {
            binary: "git".to_owned(),
            network_timeout_secs: 300,
            temp_dir: None,
        }
    }
}

// ---------------------------------------------------------------------------
// ArchiveSection
// ---------------------------------------------------------------------------

/// Limits applied to each uploaded zip archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveSection {
    /// Maximum number of entries.
    pub max_entries: usize,
    /// Maximum total uncompressed size.
    pub max_extracted_bytes: u64,
}

impl Default for ArchiveSection {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            max_extracted_bytes: 500_000_000,
        }
    }
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Base level: trace, debug, info, warn, or error.
    pub level: String,
    /// Line format: pretty, compact, json, or full.
    pub format: String,
    /// Per-crate overrides such as `gitdrop_upload=debug`.
    pub directives: Vec<String>,
    /// Write rolling daily log files here instead of stderr.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
            directory: None,
        }
    }
}
