//! Post-merge validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Accepted values of `logging.level`.
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Accepted values of `logging.format`.
pub const LOG_FORMATS: &[&str] = &["pretty", "compact", "json", "full"];

/// Validate a merged configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_upload(config)?;
    validate_git(config)?;
    validate_archive(config)?;
    validate_logging(config)?;
    Ok(())
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_owned(),
        message: message.into(),
    }
}

fn require_non_blank(field: &str, value: &str) -> ConfigResult<()> {
    if value.trim().is_empty() {
        return Err(invalid(field, "must not be empty"));
    }
    Ok(())
}

fn validate_upload(config: &Config) -> ConfigResult<()> {
    let u = &config.upload;

    require_non_blank("upload.default_branch", &u.default_branch)?;
    require_non_blank("upload.author_name", &u.author_name)?;
    require_non_blank("upload.author_email", &u.author_email)?;

    if u.max_files == 0 {
        return Err(invalid("upload.max_files", "must be at least 1"));
    }
    if u.max_file_size_bytes == 0 {
        return Err(invalid("upload.max_file_size_bytes", "must be at least 1"));
    }
    Ok(())
}

fn validate_git(config: &Config) -> ConfigResult<()> {
    require_non_blank("git.binary", &config.git.binary)?;
    if let Some(dir) = &config.git.temp_dir {
        require_non_blank("git.temp_dir", dir)?;
    }
    Ok(())
}

fn validate_archive(config: &Config) -> ConfigResult<()> {
    if config.archive.max_entries == 0 {
        return Err(invalid("archive.max_entries", "must be at least 1"));
    }
    if config.archive.max_extracted_bytes == 0 {
        return Err(invalid("archive.max_extracted_bytes", "must be at least 1"));
    }
    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let l = &config.logging;

    if !LOG_LEVELS.contains(&l.level.as_str()) {
        return Err(invalid(
            "logging.level",
            format!(
                "unsupported log level '{}'; expected one of: {}",
                l.level,
                LOG_LEVELS.join(", ")
            ),
        ));
    }

    if !LOG_FORMATS.contains(&l.format.as_str()) {
        return Err(invalid(
            "logging.format",
            format!(
                "unsupported log format '{}'; expected one of: {}",
                l.format,
                LOG_FORMATS.join(", ")
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(result: ConfigResult<()>) -> String {
        match result {
            Err(ConfigError::ValidationError { field, .. }) => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn defaults_are_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn blank_strings_rejected() {
        let mut config = Config::default();
        config.upload.author_email = "  ".into();
        assert_eq!(field_of(validate(&config)), "upload.author_email");

        let mut config = Config::default();
        config.git.binary = String::new();
        assert_eq!(field_of(validate(&config)), "git.binary");

        let mut config = Config::default();
        config.git.temp_dir = Some(String::new());
        assert_eq!(field_of(validate(&config)), "git.temp_dir");
    }

    #[test]
    fn zero_limits_rejected() {
        let mut config = Config::default();
        config.upload.max_files = 0;
        assert_eq!(field_of(validate(&config)), "upload.max_files");

        let mut config = Config::default();
        config.upload.max_file_size_bytes = 0;
        assert_eq!(field_of(validate(&config)), "upload.max_file_size_bytes");

        let mut config = Config::default();
        config.archive.max_entries = 0;
        assert_eq!(field_of(validate(&config)), "archive.max_entries");
    }

    #[test]
    fn unknown_logging_values_rejected() {
        let mut config = Config::default();
        config.logging.level = "verbose".into();
        assert_eq!(field_of(validate(&config)), "logging.level");

        let mut config = Config::default();
        config.logging.format = "xml".into();
        assert_eq!(field_of(validate(&config)), "logging.format");
    }
}
