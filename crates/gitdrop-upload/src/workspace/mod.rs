//! Repository workspace.
//!
//! One [`Workspace`] owns a temporary directory for the lifetime of a single
//! upload and walks it through a fixed sequence of git steps:
//!
//! ```text
//! Created -> Cloned -> BranchReady -> FilesWritten -> Staged -> Committed -> Pushed
//! ```
//!
//! Any failed step moves the workspace to `Failed`; later steps then refuse
//! to run. The directory is removed by [`Workspace::close`], or on drop.

mod git;
#[cfg(test)]
mod tests;

use std::fmt;
use std::path::{Component, Path, PathBuf};

use tempfile::TempDir;

use crate::archive::MaterializedFile;
use crate::credentials::AuthContext;
use crate::error::{UploadError, UploadResult};
use crate::request::Author;

pub use self::git::GitSettings;
use self::git::GitFailure;

/// Directory inside the workspace that holds the clone.
const CLONE_DIR: &str = "repo";

/// Where the workspace is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceState {
    /// Temporary directory exists, nothing cloned yet.
    Created,
    /// A clone exists.
    Cloned,
    /// The requested branch is checked out and identity is configured.
    BranchReady,
    /// Files have been written into the working tree.
    FilesWritten,
    /// Changes are staged and non-empty.
    Staged,
    /// A commit exists on the branch.
    Committed,
    /// The commit has been pushed.
    Pushed,
    /// A step failed; no further steps will run.
    Failed,
}

impl fmt::Display for WorkspaceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Which branch the clone ended up on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloneOutcome {
    /// The requested branch existed and was cloned directly.
    Existing,
    /// The requested branch was missing; it was created from the default branch.
    CreatedFromDefault,
}

/// Counts parsed from `git status --porcelain` after staging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusSummary {
    /// New paths.
    pub added: usize,
    /// Changed paths.
    pub modified: usize,
    /// Removed paths.
    pub deleted: usize,
    /// Renamed or copied paths.
    pub renamed: usize,
}

impl StatusSummary {
    /// Parse porcelain v1 output.
    #[must_use]
    pub fn parse(porcelain: &str) -> Self {
        let mut summary = Self::default();
        for line in porcelain.lines() {
            let mut codes = line.chars();
            let (Some(index), Some(tree)) = (codes.next(), codes.next()) else {
                continue;
            };
            let code = if index == ' ' { tree } else { index };
            let slot = match code {
                'A' | '?' => &mut summary.added,
                'M' | 'T' | 'U' => &mut summary.modified,
                'D' => &mut summary.deleted,
                'R' | 'C' => &mut summary.renamed,
                _ => continue,
            };
            *slot = slot.saturating_add(1);
        }
        summary
    }

    /// Total number of changed paths.
    #[must_use]
    pub fn total(&self) -> usize {
        self.added
            .saturating_add(self.modified)
            .saturating_add(self.deleted)
            .saturating_add(self.renamed)
    }

    /// Whether nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// An exclusively owned clone for one upload.
pub struct Workspace {
    dir: TempDir,
    repo: PathBuf,
    settings: GitSettings,
    state: WorkspaceState,
}

impl fmt::Debug for Workspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workspace")
            .field("repo", &self.repo)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Workspace {
    /// Create an empty workspace directory.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::Io`] if the directory cannot be created.
    pub fn create(settings: &GitSettings) -> UploadResult<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("gitdrop-ws-");
        let dir = match &settings.temp_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }?;
        let repo = dir.path().join(CLONE_DIR);
        tracing::debug!(dir = %dir.path().display(), "Workspace created");
        Ok(Self {
            dir,
            repo,
            settings: settings.clone(),
            state: WorkspaceState::Created,
        })
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> WorkspaceState {
        self.state
    }

    /// Root of the working tree.
    #[must_use]
    pub fn repo_path(&self) -> &Path {
        &self.repo
    }

    fn expect(&self, expected: WorkspaceState) -> UploadResult<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(UploadError::InvalidState {
                expected: expected.to_string(),
                actual: self.state.to_string(),
            })
        }
    }

    fn advance<T>(&mut self, result: UploadResult<T>, next: WorkspaceState) -> UploadResult<T> {
        self.state = if result.is_ok() {
            next
        } else {
            WorkspaceState::Failed
        };
        result
    }

    async fn git_local(&self, args: &[&str]) -> UploadResult<String> {
        self.settings
            .run(&self.repo, args, None, false)
            .await
            .map(|out| out.stdout)
            .map_err(|GitFailure { detail }| UploadError::Git {
                command: args.first().copied().unwrap_or_default().to_owned(),
                detail,
            })
    }

    /// Shallow-clone `branch`, falling back to the default branch when the
    /// remote does not have it, then check out `branch`.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::Clone`] if cloning fails for any reason other
    /// than a missing branch, or if the fallback clone also fails.
    pub async fn clone_branch(
        &mut self,
        auth: &AuthContext,
        branch: &str,
    ) -> UploadResult<CloneOutcome> {
        self.expect(WorkspaceState::Created)?;
        let cloned = self.clone_inner(auth, branch).await;
        let outcome = self.advance(cloned, WorkspaceState::Cloned)?;

        let checkout = match outcome {
            CloneOutcome::Existing => Ok(()),
            CloneOutcome::CreatedFromDefault => self.create_branch(branch).await,
        };
        self.advance(checkout, WorkspaceState::BranchReady)?;
        tracing::info!(branch, outcome = ?outcome, "Branch ready");
        Ok(outcome)
    }

    async fn clone_inner(&self, auth: &AuthContext, branch: &str) -> UploadResult<CloneOutcome> {
        let url = auth.remote_url();
        let first = self
            .settings
            .run(
                self.dir.path(),
                [
                    "clone",
                    "--depth=1",
                    "--single-branch",
                    "--branch",
                    branch,
                    "--",
                    url,
                    CLONE_DIR,
                ],
                Some(auth),
                true,
            )
            .await;
        let detail = match first {
            Ok(_) => return Ok(CloneOutcome::Existing),
            Err(GitFailure { detail }) => detail,
        };
        if !is_missing_branch(&detail) {
            return Err(UploadError::Clone(detail));
        }

        tracing::info!(branch, "Branch not found on remote, cloning default branch");
        if tokio::fs::try_exists(&self.repo).await.unwrap_or(false) {
            tokio::fs::remove_dir_all(&self.repo).await?;
        }
        self.settings
            .run(
                self.dir.path(),
                ["clone", "--depth=1", "--", url, CLONE_DIR],
                Some(auth),
                true,
            )
            .await
            .map_err(|GitFailure { detail }| UploadError::Clone(detail))?;
        Ok(CloneOutcome::CreatedFromDefault)
    }

    async fn create_branch(&self, branch: &str) -> UploadResult<()> {
        let born = self
            .settings
            .run(&self.repo, ["rev-parse", "--verify", "-q", "HEAD"], None, false)
            .await
            .is_ok();
        if born {
            self.git_local(&["checkout", "-b", branch]).await?;
        } else {
            // An empty remote has no commit to branch from.
            let head = format!("refs/heads/{branch}");
            self.git_local(&["symbolic-ref", "HEAD", head.as_str()]).await?;
        }
        Ok(())
    }

    /// Set the commit identity and, for URL-based auth, the credentialed
    /// remote.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::Git`] if `git config` or `git remote` fails.
    pub async fn configure(&mut self, author: &Author, auth: &AuthContext) -> UploadResult<()> {
        self.expect(WorkspaceState::BranchReady)?;
        let result = self.configure_inner(author, auth).await;
        self.advance(result, WorkspaceState::BranchReady)
    }

    async fn configure_inner(&self, author: &Author, auth: &AuthContext) -> UploadResult<()> {
        self.git_local(&["config", "user.name", author.name.as_str()]).await?;
        self.git_local(&["config", "user.email", author.email.as_str()]).await?;
        if !auth.is_ssh() {
            self.set_remote(auth).await?;
        }
        Ok(())
    }

    async fn set_remote(&self, auth: &AuthContext) -> UploadResult<()> {
        self.settings
            .run(
                &self.repo,
                ["remote", "set-url", "origin", auth.remote_url()],
                Some(auth),
                false,
            )
            .await
            .map(drop)
            .map_err(|GitFailure { detail }| UploadError::Git {
                command: "remote".into(),
                detail,
            })
    }

    /// Write `files` into the working tree.
    ///
    /// Paths that are empty, hidden, absolute, contain `..` or a `.git`
    /// component, or would land outside the tree through a symlink are
    /// skipped with a warning. Returns how many files were written.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::FileProcessing`] if a file cannot be written.
    pub async fn write_files(&mut self, files: &[MaterializedFile]) -> UploadResult<usize> {
        self.expect(WorkspaceState::BranchReady)?;
        let result = self.write_inner(files).await;
        self.advance(result, WorkspaceState::FilesWritten)
    }

    async fn write_inner(&self, files: &[MaterializedFile]) -> UploadResult<usize> {
        let root = tokio::fs::canonicalize(&self.repo).await?;
        let mut written = 0usize;
        for file in files {
            let Some(relative) = safe_relative_path(&file.path) else {
                tracing::warn!(path = %file.path, "Skipping unsafe path");
                continue;
            };
            if !write_within(&root, &relative, &file.content)
                .await
                .map_err(|e| UploadError::file(&file.path, e))?
            {
                tracing::warn!(path = %file.path, "Skipping path that escapes the repository");
                continue;
            }
            written = written.saturating_add(1);
        }
        tracing::debug!(written, total = files.len(), "Files materialized");
        Ok(written)
    }

    /// Stage everything and summarize the change set.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::NoChanges`] if nothing changed, or
    /// [`UploadError::Git`] if staging fails.
    pub async fn stage(&mut self) -> UploadResult<StatusSummary> {
        self.expect(WorkspaceState::FilesWritten)?;
        let result = self.stage_inner().await;
        self.advance(result, WorkspaceState::Staged)
    }

    async fn stage_inner(&self) -> UploadResult<StatusSummary> {
        self.git_local(&["add", "-A"]).await?;
        let porcelain = self.git_local(&["status", "--porcelain"]).await?;
        let summary = StatusSummary::parse(&porcelain);
        if summary.is_empty() {
            return Err(UploadError::NoChanges);
        }
        tracing::info!(
            added = summary.added,
            modified = summary.modified,
            deleted = summary.deleted,
            renamed = summary.renamed,
            "Changes staged"
        );
        Ok(summary)
    }

    /// Commit staged changes and return the new commit id.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::Git`] if the commit fails.
    pub async fn commit(&mut self, message: &str) -> UploadResult<String> {
        self.expect(WorkspaceState::Staged)?;
        let result = self.commit_inner(message).await;
        self.advance(result, WorkspaceState::Committed)
    }

    async fn commit_inner(&self, message: &str) -> UploadResult<String> {
        self.git_local(&["commit", "--no-verify", "--no-gpg-sign", "-m", message])
            .await?;
        let id = self.git_local(&["rev-parse", "HEAD"]).await?;
        Ok(id.trim().to_owned())
    }

    /// Push the commit to `branch` on origin, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::Push`] if the remote rejects the push or cannot
    /// be reached.
    pub async fn push(&mut self, auth: &AuthContext, branch: &str) -> UploadResult<()> {
        self.expect(WorkspaceState::Committed)?;
        let result = self.push_inner(auth, branch).await;
        self.advance(result, WorkspaceState::Pushed)
    }

    async fn push_inner(&self, auth: &AuthContext, branch: &str) -> UploadResult<()> {
        if !auth.is_ssh() {
            let current = self
                .settings
                .run(
                    &self.repo,
                    ["remote", "get-url", "--push", "origin"],
                    Some(auth),
                    false,
                )
                .await
                .map(|out| out.stdout.trim().to_owned())
                .unwrap_or_default();
            if current != auth.remote_url() {
                tracing::warn!("Push URL changed since clone, restoring it");
                self.set_remote(auth).await?;
            }
        }

        let refspec = format!("HEAD:refs/heads/{branch}");
        self.settings
            .run(
                &self.repo,
                ["push", "--set-upstream", "origin", refspec.as_str()],
                Some(auth),
                true,
            )
            .await
            .map_err(|GitFailure { detail }| UploadError::Push(detail))?;
        tracing::info!(branch, "Pushed");
        Ok(())
    }

    /// Remove the workspace directory.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::Cleanup`] if the directory cannot be removed.
    pub fn close(self) -> UploadResult<()> {
        let path = self.dir.path().display().to_string();
        self.dir
            .close()
            .map_err(|e| UploadError::Cleanup(format!("failed to remove {path}: {e}")))
    }
}

/// Whether clone stderr says the requested branch does not exist remotely.
fn is_missing_branch(stderr: &str) -> bool {
    let lower = stderr.to_ascii_lowercase();
    (lower.contains("remote branch") && lower.contains("not found"))
        || lower.contains("could not find remote branch")
        || lower.contains("couldn't find remote ref")
}

/// Lexically validate an upload path and convert it to a relative path.
///
/// Returns `None` for paths that are empty, hidden, absolute, or that contain
/// `..` or `.git` components.
fn safe_relative_path(raw: &str) -> Option<PathBuf> {
    let normalized = raw.replace('\\', "/");
    if normalized.trim().is_empty() || normalized.starts_with('.') || normalized.contains(".git/")
    {
        return None;
    }
    let path = Path::new(&normalized);
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) if part.eq_ignore_ascii_case(".git") => return None,
            Component::Normal(part) => out.push(part),
            Component::CurDir => {},
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    (!out.as_os_str().is_empty()).then_some(out)
}

/// Write `content` at `root/relative` unless an existing symlink would carry
/// the write outside `root`. Returns `Ok(false)` when skipped.
async fn write_within(root: &Path, relative: &Path, content: &[u8]) -> std::io::Result<bool> {
    // Refuse to traverse symlinks that already exist in the clone.
    let mut current = root.to_path_buf();
    for component in relative.components() {
        current.push(component);
        match tokio::fs::symlink_metadata(&current).await {
            Ok(meta) if meta.file_type().is_symlink() => return Ok(false),
            Ok(_) => {},
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => break,
            Err(e) => return Err(e),
        }
    }

    let target = root.join(relative);
    let Some(parent) = target.parent() else {
        return Ok(false);
    };
    tokio::fs::create_dir_all(parent).await?;
    let canonical_parent = tokio::fs::canonicalize(parent).await?;
    if !canonical_parent.starts_with(root) {
        return Ok(false);
    }
    if tokio::fs::metadata(&target).await.is_ok_and(|m| m.is_dir()) {
        return Err(std::io::Error::other("destination is a directory"));
    }
    tokio::fs::write(&target, content).await?;
    Ok(true)
}
