//! Layered merging of raw TOML trees.
//!
//! Merging happens on [`toml::Value`] rather than deserialized structs, so a
//! key absent from an upper layer never resets the value below it.

use std::collections::BTreeMap;
use std::fmt;

/// Which layer a value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigLayer {
    /// Compiled-in `defaults.toml`.
    Defaults,
    /// `/etc/gitdrop/config.toml`.
    System,
    /// `~/.gitdrop/config.toml`.
    User,
    /// File passed with `--config`.
    Explicit,
    /// `GITDROP_*` environment variable.
    Environment,
}

impl fmt::Display for ConfigLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Defaults => write!(f, "defaults"),
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Explicit => write!(f, "file"),
            Self::Environment => write!(f, "env"),
        }
    }
}

/// Dotted field path to the layer that last set it.
pub type FieldSources = BTreeMap<String, ConfigLayer>;

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_owned()
    } else {
        format!("{prefix}.{key}")
    }
}

/// Deep-merge `overlay` into `base`, recording `layer` as the source of
/// every leaf the overlay sets.
///
/// Tables merge per key. Scalars and arrays replace.
pub fn deep_merge_tracking(
    base: &mut toml::Value,
    overlay: &toml::Value,
    prefix: &str,
    layer: &ConfigLayer,
    sources: &mut FieldSources,
) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let path = join(prefix, key);
                match base_table.get_mut(key) {
                    Some(base_val) if overlay_val.is_table() => {
                        deep_merge_tracking(base_val, overlay_val, &path, layer, sources);
                    },
                    Some(base_val) => {
                        *base_val = overlay_val.clone();
                        sources.insert(path, layer.clone());
                    },
                    None => {
                        base_table.insert(key.clone(), overlay_val.clone());
                        record_leaves(overlay_val, &path, layer, sources);
                    },
                }
            }
        },
        (base, overlay) => {
            *base = overlay.clone();
            record_leaves(overlay, prefix, layer, sources);
        },
    }
}

/// Record every leaf under `val` as set by `layer`.
pub fn record_leaves(
    val: &toml::Value,
    prefix: &str,
    layer: &ConfigLayer,
    sources: &mut FieldSources,
) {
    if let toml::Value::Table(table) = val {
        for (key, child) in table {
            record_leaves(child, &join(prefix, key), layer, sources);
        }
    } else {
        sources.insert(prefix.to_owned(), layer.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> toml::Value {
        toml::from_str(s).unwrap()
    }

    #[test]
    fn absent_keys_do_not_reset_base() {
        let mut base = parse("[upload]\ndefault_branch = \"main\"\nmax_files = 10\n");
        let mut sources = FieldSources::new();
        record_leaves(&base, "", &ConfigLayer::Defaults, &mut sources);

        deep_merge_tracking(
            &mut base,
            &parse("[upload]\nmax_files = 3\n"),
            "",
            &ConfigLayer::User,
            &mut sources,
        );

        assert_eq!(base["upload"]["default_branch"].as_str(), Some("main"));
        assert_eq!(base["upload"]["max_files"].as_integer(), Some(3));
        assert_eq!(
            sources.get("upload.default_branch"),
            Some(&ConfigLayer::Defaults)
        );
        assert_eq!(sources.get("upload.max_files"), Some(&ConfigLayer::User));
    }

    #[test]
    fn new_tables_record_all_leaves() {
        let mut base = parse("[upload]\nmax_files = 10\n");
        let mut sources = FieldSources::new();
        deep_merge_tracking(
            &mut base,
            &parse("[git]\ntemp_dir = \"/srv/tmp\"\nbinary = \"/usr/bin/git\"\n"),
            "",
            &ConfigLayer::System,
            &mut sources,
        );
        assert_eq!(base["git"]["temp_dir"].as_str(), Some("/srv/tmp"));
        assert_eq!(sources.get("git.temp_dir"), Some(&ConfigLayer::System));
        assert_eq!(sources.get("git.binary"), Some(&ConfigLayer::System));
    }

    #[test]
    fn arrays_replace() {
        let mut base = parse("[logging]\ndirectives = [\"a=debug\", \"b=debug\"]\n");
        let mut sources = FieldSources::new();
        deep_merge_tracking(
            &mut base,
            &parse("[logging]\ndirectives = [\"c=trace\"]\n"),
            "",
            &ConfigLayer::Explicit,
            &mut sources,
        );
        let directives = base["logging"]["directives"].as_array().unwrap();
        assert_eq!(directives.len(), 1);
        assert_eq!(
            sources.get("logging.directives"),
            Some(&ConfigLayer::Explicit)
        );
    }

    #[test]
    fn later_layers_win() {
        let mut base = parse("[git]\nnetwork_timeout_secs = 300\n");
        let mut sources = FieldSources::new();
        for (layer, secs) in [
            (ConfigLayer::System, 100),
            (ConfigLayer::User, 50),
            (ConfigLayer::Explicit, 10),
        ] {
            deep_merge_tracking(
                &mut base,
                &parse(&format!("[git]\nnetwork_timeout_secs = {secs}\n")),
                "",
                &layer,
                &mut sources,
            );
        }
        assert_eq!(base["git"]["network_timeout_secs"].as_integer(), Some(10));
        assert_eq!(
            sources.get("git.network_timeout_secs"),
            Some(&ConfigLayer::Explicit)
        );
    }
}
