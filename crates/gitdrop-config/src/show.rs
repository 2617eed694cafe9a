//! Source-annotated display for `gitdrop config show`.

use std::fmt::{self, Write as _};

use crate::merge::FieldSources;
use crate::types::Config;

/// A merged configuration and where each value came from.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The final configuration.
    pub config: Config,
    /// Dotted field path to the layer that set it.
    pub field_sources: FieldSources,
    /// Files that were loaded, lowest precedence first.
    pub loaded_files: Vec<String>,
}

/// Output format for `config show`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowFormat {
    /// TOML with a trailing comment naming each value's layer.
    Toml,
    /// Plain JSON.
    Json,
}

impl ResolvedConfig {
    /// Render the configuration, or one `section` of it.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or `section` does not exist.
    pub fn show(&self, format: ShowFormat, section: Option<&str>) -> Result<String, fmt::Error> {
        let value = self.section_value(section)?;
        match format {
            ShowFormat::Toml => self.show_toml(&value, section),
            ShowFormat::Json => serde_json::to_string_pretty(&value).map_err(|_| fmt::Error),
        }
    }

    fn section_value(&self, section: Option<&str>) -> Result<toml::Value, fmt::Error> {
        let value = toml::Value::try_from(&self.config).map_err(|_| fmt::Error)?;
        match section {
            Some(name) => value.get(name).cloned().ok_or(fmt::Error),
            None => Ok(value),
        }
    }

    fn show_toml(&self, value: &toml::Value, section: Option<&str>) -> Result<String, fmt::Error> {
        let body = toml::to_string_pretty(value).map_err(|_| fmt::Error)?;

        let mut output = String::new();
        output.push_str("# Resolved gitdrop configuration\n");
        output.push_str("# Source annotations: [defaults] [system] [user] [file] [env]\n");
        if !self.loaded_files.is_empty() {
            output.push_str("#\n# Loaded files (lowest precedence first):\n");
            for (i, path) in self.loaded_files.iter().enumerate() {
                writeln!(output, "#   {}. {path}", i.saturating_add(1))?;
            }
        }
        output.push('\n');

        let mut table = section.unwrap_or_default().to_owned();
        for line in body.lines() {
            let trimmed = line.trim();
            if let Some(header) = trimmed.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
                table = match section {
                    Some(s) => format!("{s}.{header}"),
                    None => header.to_owned(),
                };
            }
            match self.annotation(trimmed, &table) {
                Some(layer) => writeln!(output, "{line}  # [{layer}]")?,
                None => writeln!(output, "{line}")?,
            }
        }
        Ok(output)
    }

    fn annotation(&self, line: &str, table: &str) -> Option<String> {
        if line.is_empty() || line.starts_with('#') || line.starts_with('[') {
            return None;
        }
        let key = line.split('=').next()?.trim();
        let path = if table.is_empty() {
            key.to_owned()
        } else {
            format!("{table}.{key}")
        };
        self.field_sources.get(&path).map(ToString::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::ConfigLayer;

    fn resolved() -> ResolvedConfig {
        let mut field_sources = FieldSources::new();
        field_sources.insert("upload.max_files".into(), ConfigLayer::User);
        field_sources.insert("git.binary".into(), ConfigLayer::Environment);
        ResolvedConfig {
            config: Config::default(),
            field_sources,
            loaded_files: vec!["/home/u/.gitdrop/config.toml".into()],
        }
    }

    #[test]
    fn toml_is_annotated_per_section() {
        let output = resolved().show(ShowFormat::Toml, None).unwrap();
        assert!(output.starts_with("# Resolved gitdrop configuration"));
        assert!(output.contains("1. /home/u/.gitdrop/config.toml"));
        assert!(output.contains("max_files = 10  # [user]"));
        assert!(output.contains("binary = \"git\"  # [env]"));
    }

    #[test]
    fn single_section() {
        let output = resolved().show(ShowFormat::Toml, Some("upload")).unwrap();
        assert!(output.contains("max_files = 10  # [user]"));
        assert!(!output.contains("binary"));
    }

    #[test]
    fn json_is_valid() {
        let output = resolved().show(ShowFormat::Json, None).unwrap();
        let json: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(json["upload"]["max_files"], 10);
        assert!(json["git"].get("temp_dir").is_none());
    }

    #[test]
    fn unknown_section_is_error() {
        assert!(resolved().show(ShowFormat::Json, Some("nope")).is_err());
    }
}
