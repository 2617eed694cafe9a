//! Hardened `git` subprocess runner.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::credentials::AuthContext;

/// Per-invocation overrides that keep git from consulting helpers, prompts,
/// hooks, or guessed identities.
const HARDENING: [&str; 8] = [
    "-c",
    "credential.helper=",
    "-c",
    "core.askpass=",
    "-c",
    "user.useConfigOnly=true",
    "-c",
    "core.hooksPath=/dev/null",
];

/// `GIT_SSH_COMMAND` for operations without an SSH identity.
const BATCH_SSH: &str = "ssh -o BatchMode=yes";

/// How git is invoked for every workspace operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitSettings {
    /// The `git` executable, resolved through `PATH` if relative.
    pub binary: PathBuf,
    /// Upper bound on clone and push. `None` waits indefinitely.
    pub network_timeout: Option<Duration>,
    /// Parent for workspace and key directories. `None` uses the system
    /// temporary directory.
    pub temp_root: Option<PathBuf>,
}

impl Default for GitSettings {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("git"),
            network_timeout: Some(Duration::from_secs(300)),
            temp_root: None,
        }
    }
}

/// Successful git invocation.
#[derive(Debug)]
pub(crate) struct GitOutput {
    pub(crate) stdout: String,
}

/// A failed git invocation with credentials already redacted.
#[derive(Debug)]
pub(crate) struct GitFailure {
    pub(crate) detail: String,
}

impl GitSettings {
    /// Run `git <args>` in `dir` with a scrubbed environment.
    ///
    /// `auth` supplies the SSH command and redaction for steps that talk to
    /// the remote. `network` applies the configured timeout; local steps run
    /// unbounded.
    pub(crate) async fn run<I, S>(
        &self,
        dir: &Path,
        args: I,
        auth: Option<&AuthContext>,
        network: bool,
    ) -> Result<GitOutput, GitFailure>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new(&self.binary);

        // Nothing inherited may inject commands (GIT_PROXY_COMMAND,
        // GIT_EXTERNAL_DIFF, GIT_ASKPASS, SSH_ASKPASS, ...).
        cmd.env_clear();
        for key in ["PATH", "HOME", "TMPDIR"] {
            if let Some(value) = std::env::var_os(key) {
                cmd.env(key, value);
            }
        }
        cmd.env("LC_ALL", "C");
        cmd.env("GIT_CONFIG_NOSYSTEM", "1");
        cmd.env("GIT_CONFIG_GLOBAL", "/dev/null");
        cmd.env("GIT_TERMINAL_PROMPT", "0");
        cmd.env(
            "GIT_SSH_COMMAND",
            auth.and_then(AuthContext::ssh_command)
                .unwrap_or_else(|| BATCH_SSH.to_owned()),
        );

        cmd.current_dir(dir);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);
        cmd.args(HARDENING);

        let args: Vec<_> = args.into_iter().collect();
        let name = args
            .first()
            .map_or_else(String::new, |a| a.as_ref().to_string_lossy().into_owned());
        cmd.args(&args);

        let output = match self.network_timeout.filter(|_| network) {
            Some(limit) => match tokio::time::timeout(limit, cmd.output()).await {
                Ok(result) => result,
                Err(_) => {
                    return Err(GitFailure {
                        detail: format!("git {name} timed out after {}s", limit.as_secs()),
                    });
                },
            },
            None => cmd.output().await,
        }
        .map_err(|e| GitFailure {
            detail: format!("failed to run {}: {e}", self.binary.display()),
        })?;

        if output.status.success() {
            return Ok(GitOutput {
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            });
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let detail = if stderr.trim().is_empty() {
            format!("git {name} exited with {}", output.status)
        } else {
            auth.map_or_else(|| stderr.trim().to_owned(), |a| a.redact(stderr.trim()))
        };
        tracing::debug!(command = %name, %detail, "git command failed");
        Err(GitFailure { detail })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let out = GitSettings::default()
            .run(dir.path(), ["--version"], None, false)
            .await
            .unwrap();
        assert!(out.stdout.starts_with("git version"));
    }

    #[tokio::test]
    async fn failure_is_redacted() {
        let dir = tempfile::tempdir().unwrap();
        let auth = AuthContext::resolve(
            "https://example.invalid/org/repo.git",
            &crate::credentials::Credentials::token("sekrit"),
            crate::provider::Provider::Generic,
            None,
        )
        .unwrap();
        // git echoes the rejected name, URL and all.
        let err = GitSettings::default()
            .run(
                dir.path(),
                ["check-ref-format", "--branch", auth.remote_url()],
                Some(&auth),
                false,
            )
            .await
            .unwrap_err();
        assert!(!err.detail.contains("sekrit"), "{}", err.detail);
    }

    #[tokio::test]
    async fn missing_binary_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let settings = GitSettings {
            binary: PathBuf::from("/nonexistent/git"),
            ..GitSettings::default()
        };
        let err = settings
            .run(dir.path(), ["status"], None, false)
            .await
            .unwrap_err();
        assert!(err.detail.contains("failed to run"));
    }
}
