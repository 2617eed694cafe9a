//! Upload orchestration.

use tracing::Instrument;

use crate::archive::{self, ArchiveLimits, MaterializedFile};
use crate::credentials::AuthContext;
use crate::error::UploadResult;
use crate::provider::Provider;
use crate::request::{Author, DEFAULT_COMMIT_MESSAGE, UploadRequest};
use crate::response::{ErrorResponse, SUCCESS_MESSAGE, UploadOutcome};
use crate::workspace::{GitSettings, Workspace};

/// Runs uploads. Holds only settings, so one instance can serve many
/// concurrent uploads; each gets its own workspace and key material.
#[derive(Debug, Clone, Default)]
pub struct Uploader {
    settings: GitSettings,
    limits: ArchiveLimits,
}

impl Uploader {
    /// Create an uploader.
    #[must_use]
    pub fn new(settings: GitSettings, limits: ArchiveLimits) -> Self {
        Self { settings, limits }
    }

    /// Git invocation settings.
    #[must_use]
    pub fn settings(&self) -> &GitSettings {
        &self.settings
    }

    /// Validate, resolve credentials, and push `request`'s files.
    ///
    /// Temporary directories and key material are removed before this
    /// returns, whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns a classified [`ErrorResponse`] on any failure.
    pub async fn upload(&self, request: UploadRequest) -> Result<UploadOutcome, ErrorResponse> {
        self.run(request, None).await
    }

    /// Like [`Uploader::upload`] but with an already resolved authentication
    /// context, for remotes that need no credential rewriting.
    ///
    /// # Errors
    ///
    /// Returns a classified [`ErrorResponse`] on any failure.
    pub async fn upload_with_auth(
        &self,
        request: UploadRequest,
        auth: AuthContext,
    ) -> Result<UploadOutcome, ErrorResponse> {
        self.run(request, Some(auth)).await
    }

    async fn run(
        &self,
        request: UploadRequest,
        auth: Option<AuthContext>,
    ) -> Result<UploadOutcome, ErrorResponse> {
        let provider = Provider::detect(&request.repo_url);
        let span = tracing::info_span!(
            "upload",
            %provider,
            branch = %request.branch,
            method = %request.credentials.method(),
        );
        async move {
            match self.try_upload(request, provider, auth).await {
                Ok(outcome) => {
                    tracing::info!(
                        files = outcome.files_processed,
                        commit = %outcome.commit_id,
                        "Upload complete"
                    );
                    Ok(outcome)
                },
                Err(err) => {
                    let response = ErrorResponse::from_error(&err);
                    if response.is_caller_error() {
                        tracing::warn!(error = %response.error, details = %response.details, "Upload rejected");
                    } else {
                        tracing::error!(error = %response.error, details = %response.details, "Upload failed");
                    }
                    Err(response)
                },
            }
        }
        .instrument(span)
        .await
    }

    async fn try_upload(
        &self,
        request: UploadRequest,
        provider: Provider,
        auth: Option<AuthContext>,
    ) -> UploadResult<UploadOutcome> {
        request.validate()?;
        let UploadRequest {
            repo_url,
            branch,
            author,
            commit_message,
            credentials,
            files,
        } = request;

        let files = archive::expand(files, &self.limits)?;
        let files_processed = files.len();
        let commit_message = if commit_message.trim().is_empty() {
            DEFAULT_COMMIT_MESSAGE.to_owned()
        } else {
            commit_message
        };

        let auth = match auth {
            Some(auth) => auth,
            None => AuthContext::resolve(
                &repo_url,
                &credentials,
                provider,
                self.settings.temp_root.as_deref(),
            )?,
        };
        drop(credentials);

        let pushed = self
            .push_files(&branch, &author, &commit_message, &auth, &files)
            .await;
        if let Err(e) = auth.close() {
            tracing::warn!(error = %e, "Failed to remove SSH key material");
        }
        let commit_id = pushed?;

        Ok(UploadOutcome {
            success: true,
            message: SUCCESS_MESSAGE.to_owned(),
            files_processed,
            branch,
            provider,
            commit_message,
            commit_id,
        })
    }

    /// Clone, write `files`, commit, and push to `branch` in a fresh
    /// workspace, returning the new commit id. The workspace is removed
    /// before returning.
    ///
    /// # Errors
    ///
    /// Returns the first failing step's error.
    pub async fn push_files(
        &self,
        branch: &str,
        author: &Author,
        message: &str,
        auth: &AuthContext,
        files: &[MaterializedFile],
    ) -> UploadResult<String> {
        let mut workspace = Workspace::create(&self.settings)?;
        let result = drive(&mut workspace, branch, author, message, auth, files).await;
        if let Err(e) = workspace.close() {
            tracing::warn!(error = %e, "Failed to remove workspace");
        }
        result
    }
}

async fn drive(
    workspace: &mut Workspace,
    branch: &str,
    author: &Author,
    message: &str,
    auth: &AuthContext,
    files: &[MaterializedFile],
) -> UploadResult<String> {
    workspace.clone_branch(auth, branch).await?;
    workspace.configure(author, auth).await?;
    let written = workspace.write_files(files).await?;
    tracing::debug!(written, "Files written");
    workspace.stage().await?;
    let commit_id = workspace.commit(message).await?;
    workspace.push(auth, branch).await?;
    Ok(commit_id)
}
