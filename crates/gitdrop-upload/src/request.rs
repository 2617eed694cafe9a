//! Inbound upload contract.

use serde::Deserialize;

use crate::credentials::{AuthMethod, Credentials};
use crate::error::{UploadError, UploadResult};

/// Branch used when the caller does not name one.
pub const DEFAULT_BRANCH: &str = "main";
/// Commit message used when the caller does not supply one.
pub const DEFAULT_COMMIT_MESSAGE: &str = "Files uploaded via web interface";
/// Author name used when the caller does not supply one.
pub const DEFAULT_AUTHOR_NAME: &str = "Git Uploader";
/// Author email used when the caller does not supply one.
pub const DEFAULT_AUTHOR_EMAIL: &str = "uploader@example.com";

const MAX_BRANCH_LEN: usize = 256;

/// One uploaded file.
#[derive(Clone, PartialEq, Eq)]
pub struct InputFile {
    /// Original file name. May contain `/` separators.
    pub name: String,
    /// Raw bytes.
    pub content: Vec<u8>,
    /// Declared media type, if the transport supplied one.
    pub media_type: Option<String>,
}

impl std::fmt::Debug for InputFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputFile")
            .field("name", &self.name)
            .field("bytes", &self.content.len())
            .field("media_type", &self.media_type)
            .finish()
    }
}

impl InputFile {
    /// A file without a declared media type.
    #[must_use]
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            media_type: None,
        }
    }

    /// Attach a declared media type.
    #[must_use]
    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    /// Whether this file should be expanded as a zip archive.
    #[must_use]
    pub fn is_zip(&self) -> bool {
        let declared = self.media_type.as_deref().is_some_and(|m| {
            m.eq_ignore_ascii_case("application/zip")
                || m.eq_ignore_ascii_case("application/x-zip-compressed")
        });
        declared
            || std::path::Path::new(&self.name)
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
    }
}

/// Commit author identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    /// `user.name`
    pub name: String,
    /// `user.email`
    pub email: String,
}

impl Default for Author {
    fn default() -> Self {
        Self {
            name: DEFAULT_AUTHOR_NAME.to_owned(),
            email: DEFAULT_AUTHOR_EMAIL.to_owned(),
        }
    }
}

/// A fully specified upload.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Repository URL (HTTPS, `ssh://`, or `git@host:path`).
    pub repo_url: String,
    /// Target branch. Created from the default branch if missing remotely.
    pub branch: String,
    /// Commit author.
    pub author: Author,
    /// Commit message.
    pub commit_message: String,
    /// Authentication payload.
    pub credentials: Credentials,
    /// Files to commit, in upload order.
    pub files: Vec<InputFile>,
}

impl UploadRequest {
    /// Check every precondition that can be checked without I/O.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::Validation`] describing the first problem found.
    pub fn validate(&self) -> UploadResult<()> {
        if self.repo_url.trim().is_empty() {
            return Err(UploadError::Validation("repository URL is required".into()));
        }
        validate_branch(&self.branch)?;
        if self.author.name.trim().is_empty() {
            return Err(UploadError::Validation("author name must not be blank".into()));
        }
        if self.author.email.trim().is_empty() {
            return Err(UploadError::Validation(
                "author email must not be blank".into(),
            ));
        }
        if self.files.is_empty() {
            return Err(UploadError::Validation(
                "at least one file is required".into(),
            ));
        }
        if self.files.iter().any(|f| f.name.trim().is_empty()) {
            return Err(UploadError::Validation(
                "uploaded files must have a name".into(),
            ));
        }
        self.credentials.ensure_present()
    }
}

/// Validate a branch name before it is handed to git.
///
/// Accepts 1-256 characters from `[A-Za-z0-9._/-]` and rejects names git
/// would refuse or could read as an option.
///
/// # Errors
///
/// Returns [`UploadError::Validation`] if the name is unusable.
pub fn validate_branch(branch: &str) -> UploadResult<()> {
    if branch.is_empty() || branch.len() > MAX_BRANCH_LEN {
        return Err(UploadError::Validation(format!(
            "branch name must be 1-{MAX_BRANCH_LEN} characters"
        )));
    }
    let is_valid = branch
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'/'));
    if !is_valid {
        return Err(UploadError::Validation(format!(
            "branch name contains invalid characters: '{branch}'"
        )));
    }
    if branch.starts_with(['-', '.', '/'])
        || branch.ends_with(['.', '/'])
        || branch.ends_with(".lock")
        || branch.contains("..")
        || branch.contains("//")
    {
        return Err(UploadError::Validation(format!(
            "branch name has invalid format: '{branch}'"
        )));
    }
    Ok(())
}

/// Deployment defaults and limits applied to inbound forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadDefaults {
    /// Branch used when the form leaves it blank.
    pub branch: String,
    /// Commit message used when the form leaves it blank.
    pub commit_message: String,
    /// Author used when the form leaves name or email blank.
    pub author: Author,
    /// Maximum number of files per upload.
    pub max_files: usize,
    /// Maximum size of any single uploaded file.
    pub max_file_size_bytes: u64,
}

impl Default for UploadDefaults {
    fn default() -> Self {
        Self {
            branch: DEFAULT_BRANCH.to_owned(),
            commit_message: DEFAULT_COMMIT_MESSAGE.to_owned(),
            author: Author::default(),
            max_files: 10,
            max_file_size_bytes: 52_428_800,
        }
    }
}

/// Form fields as submitted by the request layer.
///
/// Blank strings are treated the same as absent fields.
#[derive(Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UploadForm {
    /// Repository URL.
    pub repo_url: Option<String>,
    /// Target branch.
    pub branch: Option<String>,
    /// `token`, `basic`, or `ssh`.
    pub auth_method: Option<String>,
    /// Token for `token` auth.
    pub auth_token: Option<String>,
    /// Private key for `ssh` auth.
    pub ssh_key: Option<String>,
    /// Username for `basic` auth.
    pub username: Option<String>,
    /// Password for `basic` auth.
    pub password: Option<String>,
    /// Commit message.
    pub commit_message: Option<String>,
    /// Commit author name.
    pub author_name: Option<String>,
    /// Commit author email.
    pub author_email: Option<String>,
}

impl std::fmt::Debug for UploadForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadForm")
            .field("repo_url", &self.repo_url)
            .field("branch", &self.branch)
            .field("auth_method", &self.auth_method)
            .field("username", &self.username)
            .field("commit_message", &self.commit_message)
            .field("author_name", &self.author_name)
            .field("author_email", &self.author_email)
            .finish_non_exhaustive()
    }
}

fn filled(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn required(value: Option<String>, field: &str, method: AuthMethod) -> UploadResult<String> {
    filled(value).ok_or_else(|| {
        UploadError::Validation(format!("{field} is required for {method} authentication"))
    })
}

impl UploadForm {
    /// Apply defaults and limits, and turn the form into a request.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::Validation`] for missing fields or exceeded
    /// limits, and [`UploadError::UnsupportedAuthMethod`] for an unknown
    /// auth method.
    pub fn into_request(
        self,
        files: Vec<InputFile>,
        defaults: &UploadDefaults,
    ) -> UploadResult<UploadRequest> {
        let repo_url = filled(self.repo_url)
            .ok_or_else(|| UploadError::Validation("repository URL is required".into()))?;
        if files.is_empty() {
            return Err(UploadError::Validation(
                "at least one file is required".into(),
            ));
        }
        if files.len() > defaults.max_files {
            return Err(UploadError::Validation(format!(
                "too many files: {} (maximum {})",
                files.len(),
                defaults.max_files
            )));
        }
        if let Some(big) = files.iter().find(|f| {
            u64::try_from(f.content.len()).unwrap_or(u64::MAX) > defaults.max_file_size_bytes
        }) {
            return Err(UploadError::Validation(format!(
                "file '{}' exceeds the maximum size of {} bytes",
                big.name, defaults.max_file_size_bytes
            )));
        }

        let method: AuthMethod = filled(self.auth_method)
            .ok_or_else(|| UploadError::Validation("authentication method is required".into()))?
            .parse()?;
        let credentials = match method {
            AuthMethod::Token => {
                Credentials::token(required(self.auth_token, "access token", method)?)
            },
            AuthMethod::Basic => Credentials::basic(
                required(self.username, "username", method)?,
                required(self.password, "password", method)?,
            ),
            AuthMethod::Ssh => {
                Credentials::ssh_key(required(self.ssh_key, "SSH private key", method)?)
            },
        };

        let request = UploadRequest {
            repo_url: repo_url.trim().to_owned(),
            branch: filled(self.branch).map_or_else(|| defaults.branch.clone(), |b| b.trim().to_owned()),
            author: Author {
                name: filled(self.author_name).unwrap_or_else(|| defaults.author.name.clone()),
                email: filled(self.author_email).unwrap_or_else(|| defaults.author.email.clone()),
            },
            commit_message: filled(self.commit_message)
                .unwrap_or_else(|| defaults.commit_message.clone()),
            credentials,
            files,
        };
        request.validate()?;
        Ok(request)
    }
}
