//! `gitdrop upload`.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use gitdrop_config::Config;
use gitdrop_telemetry::{RequestContext, RequestGuard};
use gitdrop_upload::{ErrorResponse, InputFile, Provider, UploadForm, UploadOutcome, Uploader};
use tracing::Instrument;

use crate::config_bridge;
use crate::theme::Theme;

/// Arguments for `gitdrop upload`.
#[derive(Args)]
pub(crate) struct UploadArgs {
    /// Repository URL (HTTPS or SSH)
    #[arg(short, long)]
    repo: String,

    /// Target branch; created from the default branch if missing
    #[arg(short, long)]
    branch: Option<String>,

    /// Authentication method: token, basic, or ssh
    #[arg(long = "auth", default_value = "token")]
    auth_method: String,

    /// Access token for token auth
    #[arg(long, env = "GITDROP_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Username for basic auth
    #[arg(short, long)]
    username: Option<String>,

    /// Password for basic auth
    #[arg(long, env = "GITDROP_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Private key file for ssh auth
    #[arg(long)]
    ssh_key: Option<PathBuf>,

    /// Commit message
    #[arg(short, long)]
    message: Option<String>,

    /// Commit author name
    #[arg(long)]
    author_name: Option<String>,

    /// Commit author email
    #[arg(long)]
    author_email: Option<String>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Files to upload; each is committed under its file name
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

/// Run an upload and report the outcome.
pub(crate) async fn run(args: UploadArgs, config: &Config) -> Result<ExitCode> {
    let files = read_files(&args.files).await?;
    let ssh_key = match &args.ssh_key {
        Some(path) => Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read SSH key {}", path.display()))?,
        ),
        None => None,
    };

    let json = args.json;
    let provider = Provider::detect(&args.repo);
    let form = UploadForm {
        repo_url: Some(args.repo),
        branch: args.branch,
        auth_method: Some(args.auth_method),
        auth_token: args.token,
        ssh_key,
        username: args.username,
        password: args.password,
        commit_message: args.message,
        author_name: args.author_name,
        author_email: args.author_email,
    };

    let guard = RequestGuard::new(
        RequestContext::new("cli")
            .with_operation("upload")
            .with_metadata("provider", provider.as_str()),
    );

    let defaults = config_bridge::to_upload_defaults(config);
    let result = match form.into_request(files, &defaults) {
        Ok(request) => {
            let uploader = Uploader::new(
                config_bridge::to_git_settings(config),
                config_bridge::to_archive_limits(config),
            );
            uploader.upload(request).instrument(guard.span()).await
        },
        Err(e) => Err(ErrorResponse::from(e)),
    };
    drop(guard);

    match result {
        Ok(outcome) => {
            print_outcome(&outcome, json)?;
            Ok(ExitCode::SUCCESS)
        },
        Err(response) => {
            print_failure(&response, json)?;
            Ok(exit_code_for(&response))
        },
    }
}

async fn read_files(paths: &[PathBuf]) -> Result<Vec<InputFile>> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let name = file_name(path)?;
        let content = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        files.push(InputFile::new(name, content));
    }
    Ok(files)
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_owned)
        .with_context(|| format!("{} has no usable file name", path.display()))
}

fn exit_code_for(response: &ErrorResponse) -> ExitCode {
    if response.is_caller_error() {
        ExitCode::from(2)
    } else {
        ExitCode::FAILURE
    }
}

fn print_outcome(outcome: &UploadOutcome, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
        return Ok(());
    }
    println!("{}", Theme::success(&outcome.message));
    println!("{}", Theme::field("branch", &outcome.branch));
    println!("{}", Theme::field("provider", outcome.provider.as_str()));
    println!(
        "{}",
        Theme::field("files", &outcome.files_processed.to_string())
    );
    println!("{}", Theme::field("commit", &outcome.commit_id));
    println!("{}", Theme::field("message", &outcome.commit_message));
    Ok(())
}

fn print_failure(response: &ErrorResponse, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(response)?);
        return Ok(());
    }
    eprintln!("{}", Theme::error(&format!("{}: {}", response.error, response.message)));
    if response.details != response.message {
        eprintln!("{}", Theme::dimmed(&response.details));
    }
    if let Some(hint) = &response.hint {
        eprintln!("{}", Theme::info(hint));
    }
    Ok(())
}
