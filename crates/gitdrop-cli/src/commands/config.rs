//! CLI handlers for the `gitdrop config` subcommand.

use std::path::Path;

use anyhow::Result;
use gitdrop_config::{ConfigPaths, ResolvedConfig, ShowFormat};

use crate::theme::Theme;

/// Show the resolved configuration with source annotations.
pub(crate) fn show_config(
    resolved: &ResolvedConfig,
    format: &str,
    section: Option<&str>,
) -> Result<()> {
    let show_format = match format {
        "json" => ShowFormat::Json,
        _ => ShowFormat::Toml,
    };

    let output = resolved.show(show_format, section).map_err(|_| match section {
        Some(s) => anyhow::anyhow!("unknown config section '{s}'"),
        None => anyhow::anyhow!("failed to format config"),
    })?;

    println!("{output}");
    Ok(())
}

/// Show every config file that is checked and the environment fallbacks.
pub(crate) fn show_paths(explicit: Option<&Path>) -> Result<()> {
    let paths = ConfigPaths::standard(explicit)?;

    println!(
        "{}\n",
        Theme::header("Configuration files checked (lowest precedence first):")
    );
    for (i, (layer, path)) in paths.layers().into_iter().enumerate() {
        let status = if path.exists() { "found" } else { "not found" };
        println!(
            "  {}. {}  {}",
            i.saturating_add(1),
            path.display(),
            Theme::dimmed(&format!("[{layer}, {status}]"))
        );
    }

    println!(
        "\n{}\n",
        Theme::header("Environment variable fallbacks (used when no file sets the field):")
    );
    for name in gitdrop_config::env::env_var_names() {
        println!("  {name}");
    }
    Ok(())
}
