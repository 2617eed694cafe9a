//! `GITDROP_*` environment variable fallbacks.
//!
//! Environment variables fill fields that no config file set. A value from
//! any file layer wins over the environment; only embedded defaults yield.

use std::collections::HashMap;
use std::hash::BuildHasher;

use tracing::debug;

use crate::merge::{ConfigLayer, FieldSources};

struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
    kind: ValueKind,
}

#[derive(Clone, Copy)]
enum ValueKind {
    String,
    Integer,
}

const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "GITDROP_LOG_LEVEL",
        field_path: "logging.level",
        kind: ValueKind::String,
    },
    EnvMapping {
        var_name: "GITDROP_LOG_FORMAT",
        field_path: "logging.format",
        kind: ValueKind::String,
    },
    EnvMapping {
        var_name: "GITDROP_DEFAULT_BRANCH",
        field_path: "upload.default_branch",
        kind: ValueKind::String,
    },
    EnvMapping {
        var_name: "GITDROP_AUTHOR_NAME",
        field_path: "upload.author_name",
        kind: ValueKind::String,
    },
    EnvMapping {
        var_name: "GITDROP_AUTHOR_EMAIL",
        field_path: "upload.author_email",
        kind: ValueKind::String,
    },
    EnvMapping {
        var_name: "GITDROP_GIT_BINARY",
        field_path: "git.binary",
        kind: ValueKind::String,
    },
    EnvMapping {
        var_name: "GITDROP_NETWORK_TIMEOUT_SECS",
        field_path: "git.network_timeout_secs",
        kind: ValueKind::Integer,
    },
];

/// Names of all recognized environment variables.
pub fn env_var_names() -> impl Iterator<Item = &'static str> {
    ENV_MAPPINGS.iter().map(|m| m.var_name)
}

/// Apply environment fallbacks to fields no config file set.
///
/// Returns the number of variables applied. A value that does not parse as
/// the field's type is inserted as a string and rejected later when the
/// merged tree is deserialized.
pub fn apply_env_fallbacks<S: BuildHasher>(
    merged: &mut toml::Value,
    sources: &mut FieldSources,
    env_vars: &HashMap<String, String, S>,
) -> usize {
    let mut count: usize = 0;

    for mapping in ENV_MAPPINGS {
        let set_by_file = sources
            .get(mapping.field_path)
            .is_some_and(|layer| *layer != ConfigLayer::Defaults);
        if set_by_file {
            continue;
        }
        let Some(raw) = env_vars.get(mapping.var_name) else {
            continue;
        };

        debug!(
            var = mapping.var_name,
            field = mapping.field_path,
            "applying env var fallback"
        );
        set_field(merged, mapping.field_path, coerce(mapping.kind, raw));
        sources.insert(mapping.field_path.to_owned(), ConfigLayer::Environment);
        count = count.saturating_add(1);
    }

    count
}

fn coerce(kind: ValueKind, raw: &str) -> toml::Value {
    match kind {
        ValueKind::Integer => raw
            .trim()
            .parse::<i64>()
            .map_or_else(|_| toml::Value::String(raw.to_owned()), toml::Value::Integer),
        ValueKind::String => toml::Value::String(raw.to_owned()),
    }
}

/// Set a dotted path, creating intermediate tables.
fn set_field(root: &mut toml::Value, path: &str, value: toml::Value) {
    let mut segments: Vec<&str> = path.split('.').collect();
    let Some(leaf) = segments.pop() else {
        return;
    };

    let mut current = root;
    for segment in segments {
        let Some(table) = current.as_table_mut() else {
            return;
        };
        current = table
            .entry(segment)
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }

    if let Some(table) = current.as_table_mut() {
        table.insert(leaf.to_owned(), value);
    }
}

/// Snapshot of the process environment.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::record_leaves;

    fn make_env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    fn defaults() -> (toml::Value, FieldSources) {
        let val: toml::Value =
            toml::from_str("[logging]\nlevel = \"info\"\n[git]\nnetwork_timeout_secs = 300\n")
                .unwrap();
        let mut sources = FieldSources::new();
        record_leaves(&val, "", &ConfigLayer::Defaults, &mut sources);
        (val, sources)
    }

    #[test]
    fn env_overrides_defaults() {
        let (mut val, mut sources) = defaults();
        let env = make_env(&[("GITDROP_LOG_LEVEL", "debug")]);

        let count = apply_env_fallbacks(&mut val, &mut sources, &env);

        assert_eq!(count, 1);
        assert_eq!(val["logging"]["level"].as_str(), Some("debug"));
        assert_eq!(
            sources.get("logging.level"),
            Some(&ConfigLayer::Environment)
        );
    }

    #[test]
    fn file_values_win_over_env() {
        let (mut val, mut sources) = defaults();
        sources.insert("logging.level".into(), ConfigLayer::User);
        let env = make_env(&[("GITDROP_LOG_LEVEL", "trace")]);

        assert_eq!(apply_env_fallbacks(&mut val, &mut sources, &env), 0);
        assert_eq!(val["logging"]["level"].as_str(), Some("info"));
    }

    #[test]
    fn integers_are_coerced() {
        let (mut val, mut sources) = defaults();
        let env = make_env(&[("GITDROP_NETWORK_TIMEOUT_SECS", " 60 ")]);
        apply_env_fallbacks(&mut val, &mut sources, &env);
        assert_eq!(val["git"]["network_timeout_secs"].as_integer(), Some(60));
    }

    #[test]
    fn missing_sections_are_created() {
        let (mut val, mut sources) = defaults();
        let env = make_env(&[("GITDROP_AUTHOR_NAME", "Release Bot")]);
        apply_env_fallbacks(&mut val, &mut sources, &env);
        assert_eq!(val["upload"]["author_name"].as_str(), Some("Release Bot"));
    }

    #[test]
    fn unrelated_vars_are_ignored() {
        let (mut val, mut sources) = defaults();
        let env = make_env(&[("GITDROP_TOKEN", "secret"), ("HOME", "/root")]);
        assert_eq!(apply_env_fallbacks(&mut val, &mut sources, &env), 0);
    }

    #[test]
    fn names_are_listed() {
        assert!(env_var_names().any(|n| n == "GITDROP_GIT_BINARY"));
    }
}
