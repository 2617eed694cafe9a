//! Bridge from `gitdrop_config::Config` to upload and logging settings.

use std::path::PathBuf;
use std::time::Duration;

use gitdrop_config::Config;
use gitdrop_telemetry::{FileRotation, LogConfig, LogFormat};
use gitdrop_upload::{ArchiveLimits, Author, GitSettings, UploadDefaults};

/// Convert config to [`LogConfig`].
pub(crate) fn to_log_config(cfg: &Config) -> LogConfig {
    let format = match cfg.logging.format.as_str() {
        "pretty" => LogFormat::Pretty,
        "json" => LogFormat::Json,
        "full" => LogFormat::Full,
        _ => LogFormat::Compact,
    };

    let mut log_config = LogConfig::new(&cfg.logging.level).with_format(format);
    if let Some(dir) = &cfg.logging.directory {
        log_config = log_config.with_file_logging(dir, FileRotation::Daily);
    }
    for directive in &cfg.logging.directives {
        log_config = log_config.with_directive(directive);
    }

    log_config
}

/// Convert config to [`GitSettings`]. A zero timeout disables the limit.
pub(crate) fn to_git_settings(cfg: &Config) -> GitSettings {
    let secs = cfg.git.network_timeout_secs;
    GitSettings {
        binary: PathBuf::from(&cfg.git.binary),
        network_timeout: (secs > 0).then(|| Duration::from_secs(secs)),
        temp_root: cfg.git.temp_dir.as_ref().map(PathBuf::from),
    }
}

/// Convert config to [`ArchiveLimits`].
pub(crate) fn to_archive_limits(cfg: &Config) -> ArchiveLimits {
    ArchiveLimits {
        max_entries: cfg.archive.max_entries,
        max_extracted_bytes: cfg.archive.max_extracted_bytes,
    }
}

/// Convert config to [`UploadDefaults`].
pub(crate) fn to_upload_defaults(cfg: &Config) -> UploadDefaults {
    let u = &cfg.upload;
    UploadDefaults {
        branch: u.default_branch.clone(),
        commit_message: u.commit_message.clone(),
        author: Author {
            name: u.author_name.clone(),
            email: u.author_email.clone(),
        },
        max_files: u.max_files,
        max_file_size_bytes: u.max_file_size_bytes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gitdrop_telemetry::LogTarget;

    #[test]
    fn defaults_match_domain_defaults() {
        let cfg = Config::default();
        assert_eq!(to_upload_defaults(&cfg), UploadDefaults::default());
        assert_eq!(to_archive_limits(&cfg), ArchiveLimits::default());

        let git = to_git_settings(&cfg);
        let expected = GitSettings::default();
        assert_eq!(git.binary, expected.binary);
        assert_eq!(git.network_timeout, expected.network_timeout);
        assert!(git.temp_root.is_none());
    }

    #[test]
    fn zero_timeout_disables_limit() {
        let mut cfg = Config::default();
        cfg.git.network_timeout_secs = 0;
        cfg.git.temp_dir = Some("/srv/gitdrop".into());
        let git = to_git_settings(&cfg);
        assert!(git.network_timeout.is_none());
        assert_eq!(git.temp_root, Some(PathBuf::from("/srv/gitdrop")));
    }

    #[test]
    fn logging_section_maps_to_log_config() {
        let mut cfg = Config::default();
        cfg.logging.level = "debug".into();
        cfg.logging.format = "json".into();
        cfg.logging.directives = vec!["gitdrop_upload=trace".into()];
        cfg.logging.directory = Some("/var/log/gitdrop".into());

        let log = to_log_config(&cfg);
        assert_eq!(log.level, "debug");
        assert_eq!(log.format, LogFormat::Json);
        assert_eq!(log.directives, vec!["gitdrop_upload=trace"]);
        assert_eq!(log.target, LogTarget::File(PathBuf::from("/var/log/gitdrop")));
    }
}
