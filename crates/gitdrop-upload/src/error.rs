//! Upload error types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Errors from upload operations.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// A required field is missing, blank, or malformed. Raised before any I/O.
    #[error("{0}")]
    Validation(String),

    /// The requested authentication method is not one of token, basic or ssh.
    #[error("unsupported authentication method: {0}")]
    UnsupportedAuthMethod(String),

    /// Writing the SSH key or client configuration failed.
    #[error("failed to configure SSH authentication: {0}")]
    AuthSetup(String),

    /// Cloning the repository failed.
    #[error("clone failed: {0}")]
    Clone(String),

    /// Staging produced an empty diff.
    #[error("no changes detected - files may already exist with the same content")]
    NoChanges,

    /// The remote rejected the push or could not be reached.
    #[error("push failed: {0}")]
    Push(String),

    /// An input file or archive could not be processed or written.
    #[error("failed to process file {file}: {message}")]
    FileProcessing {
        /// Name of the offending file.
        file: String,
        /// What went wrong.
        message: String,
    },

    /// A local git step (config, checkout, add, status, commit) failed.
    #[error("git {command} failed: {detail}")]
    Git {
        /// The git subcommand that failed.
        command: String,
        /// Redacted stderr or spawn error.
        detail: String,
    },

    /// A workspace step was invoked out of order.
    #[error("workspace is in state {actual}, expected {expected}")]
    InvalidState {
        /// State the step requires.
        expected: String,
        /// State the workspace is actually in.
        actual: String,
    },

    /// Removing temporary state failed. Logged only, never returned from an upload.
    #[error("cleanup failed: {0}")]
    Cleanup(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for upload operations.
pub type UploadResult<T> = Result<T, UploadError>;

/// Failure taxonomy surfaced to callers as the short `error` code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Missing or mismatched required fields.
    #[serde(rename = "ValidationError")]
    Validation,
    /// Unrecognized authentication method.
    #[serde(rename = "UnsupportedAuthMethodError")]
    UnsupportedAuthMethod,
    /// SSH key or config could not be prepared.
    #[serde(rename = "AuthSetupError")]
    AuthSetup,
    /// Both clone attempts failed, or the first failed for a reason other
    /// than a missing branch.
    #[serde(rename = "CloneError")]
    Clone,
    /// Nothing to commit.
    #[serde(rename = "NoChangesError")]
    NoChanges,
    /// Push rejected, authentication failure at push time, or a network
    /// condition during clone or push.
    #[serde(rename = "PushError")]
    Push,
    /// Malformed archive or unwritable input file.
    #[serde(rename = "FileProcessingError")]
    FileProcessing,
    /// A local git step failed.
    #[serde(rename = "GitError")]
    Git,
    /// Temporary state could not be removed.
    #[serde(rename = "CleanupError")]
    Cleanup,
    /// Anything else (I/O, state machine misuse).
    #[serde(rename = "InternalError")]
    Internal,
}

impl ErrorCategory {
    /// The short code sent to callers.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Validation => "ValidationError",
            Self::UnsupportedAuthMethod => "UnsupportedAuthMethodError",
            Self::AuthSetup => "AuthSetupError",
            Self::Clone => "CloneError",
            Self::NoChanges => "NoChangesError",
            Self::Push => "PushError",
            Self::FileProcessing => "FileProcessingError",
            Self::Git => "GitError",
            Self::Cleanup => "CleanupError",
            Self::Internal => "InternalError",
        }
    }

    /// Whether the caller can fix the failure by changing the request.
    #[must_use]
    pub fn is_caller_error(self) -> bool {
        matches!(
            self,
            Self::Validation | Self::UnsupportedAuthMethod | Self::NoChanges | Self::FileProcessing
        )
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl UploadError {
    /// Category of this failure.
    ///
    /// A clone that failed on a network condition or timeout is reported as
    /// [`ErrorCategory::Push`], which covers transport failures on both
    /// network steps.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) => ErrorCategory::Validation,
            Self::UnsupportedAuthMethod(_) => ErrorCategory::UnsupportedAuthMethod,
            Self::AuthSetup(_) => ErrorCategory::AuthSetup,
            Self::Clone(detail) if is_network_failure(detail) => ErrorCategory::Push,
            Self::Clone(_) => ErrorCategory::Clone,
            Self::NoChanges => ErrorCategory::NoChanges,
            Self::Push(_) => ErrorCategory::Push,
            Self::FileProcessing { .. } => ErrorCategory::FileProcessing,
            Self::Git { .. } => ErrorCategory::Git,
            Self::Cleanup(_) => ErrorCategory::Cleanup,
            Self::InvalidState { .. } | Self::Io(_) => ErrorCategory::Internal,
        }
    }

    /// Shorthand for a [`UploadError::FileProcessing`] error.
    pub(crate) fn file(file: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::FileProcessing {
            file: file.into(),
            message: message.to_string(),
        }
    }
}

/// Git and runner phrases that mean the remote could not be reached.
pub(crate) const NETWORK_PHRASES: &[&str] = &[
    "could not resolve host",
    "connection timed out",
    "connection timeout",
    "operation timed out",
    "timed out after",
    "connection refused",
    "connection reset",
    "failed to connect",
    "network is unreachable",
];

/// Lowercased failure text with URLs and `user@host:path` remotes removed,
/// so repository names cannot match diagnostic phrases.
pub(crate) fn diagnostic_text(text: &str) -> String {
    text.split(' ')
        .map(|token| {
            if token.contains("://") || token.contains('@') {
                ""
            } else {
                token
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase()
}

/// Whether raw failure text describes a network or timeout condition.
pub(crate) fn is_network_failure(text: &str) -> bool {
    let lower = diagnostic_text(text);
    NETWORK_PHRASES.iter().any(|phrase| lower.contains(phrase))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_taxonomy() {
        assert_eq!(
            UploadError::Validation("x".into()).category().code(),
            "ValidationError"
        );
        assert_eq!(UploadError::NoChanges.category().code(), "NoChangesError");
        assert_eq!(
            UploadError::file("a.zip", "bad").category().code(),
            "FileProcessingError"
        );
        assert_eq!(
            UploadError::AuthSetup("disk full".into()).category(),
            ErrorCategory::AuthSetup
        );
    }

    #[test]
    fn clone_network_failure_is_push_category() {
        let err = UploadError::Clone(
            "fatal: unable to access 'https://example.com/r.git/': Could not resolve host".into(),
        );
        assert_eq!(err.category(), ErrorCategory::Push);

        let err = UploadError::Clone("git clone timed out after 300s".into());
        assert_eq!(err.category(), ErrorCategory::Push);

        let err = UploadError::Clone("fatal: repository not found".into());
        assert_eq!(err.category(), ErrorCategory::Clone);
    }

    #[test]
    fn repository_names_do_not_look_like_network_failures() {
        for url in [
            "https://git.example.com/acme/network-tools.git/",
            "https://git.example.com/timeout-labs/app.git/",
            "git@git.example.com:acme/connection-refused.git",
        ] {
            let err = UploadError::Clone(format!("fatal: repository '{url}' not found"));
            assert_eq!(err.category(), ErrorCategory::Clone, "{url}");
        }
    }

    #[test]
    fn caller_errors() {
        assert!(ErrorCategory::NoChanges.is_caller_error());
        assert!(ErrorCategory::Validation.is_caller_error());
        assert!(!ErrorCategory::Push.is_caller_error());
        assert!(!ErrorCategory::Internal.is_caller_error());
    }

    #[test]
    fn category_serializes_as_code() {
        let json = serde_json::to_string(&ErrorCategory::UnsupportedAuthMethod).unwrap();
        assert_eq!(json, "\"UnsupportedAuthMethodError\"");
    }
}
