//! Outbound upload contract.

use serde::Serialize;

use crate::error::{ErrorCategory, NETWORK_PHRASES, UploadError, diagnostic_text};
use crate::provider::Provider;

/// Message returned with every successful upload.
pub const SUCCESS_MESSAGE: &str = "Files uploaded successfully";

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadOutcome {
    /// Always `true`.
    pub success: bool,
    /// Human-readable summary.
    pub message: String,
    /// Number of entries after archive expansion.
    pub files_processed: usize,
    /// Branch the commit was pushed to.
    pub branch: String,
    /// Provider inferred from the repository URL.
    pub provider: Provider,
    /// Message of the pushed commit.
    pub commit_message: String,
    /// Id of the pushed commit.
    pub commit_id: String,
}

/// Classified failure handed back to the request layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    /// Short error code such as `PushError`.
    pub error: String,
    /// User-facing explanation.
    pub message: String,
    /// Raw, credential-redacted diagnostic for operators.
    pub details: String,
    /// What the user can do about it, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(skip)]
    category: ErrorCategory,
}

/// Well-known git failure phrases and what to tell the user about them.
/// Checked in order; the first match wins.
const TRANSPORT_PATTERNS: &[(&[&str], &str, &str)] = &[
    (
        &["authentication failed", "denied"],
        "Authentication failed - please check your credentials",
        "Verify your access token has the correct permissions or your SSH key is valid",
    ),
    (
        &["repository not found", "does not appear to be a git repository"],
        "Repository not found or access denied",
        "Check the repository URL and ensure you have access to it",
    ),
    (
        NETWORK_PHRASES,
        "Network error occurred",
        "Please check your internet connection and try again",
    ),
    (
        &["remote rejected", "[rejected]"],
        "Push was rejected by remote",
        "This might happen if the branch is protected or you lack push permissions",
    ),
];

impl ErrorResponse {
    /// Classify an upload failure.
    ///
    /// Clone, push, and other git failures are matched against known git
    /// phrases to produce a friendlier message; `details` always keeps the
    /// original text.
    #[must_use]
    pub fn from_error(err: &UploadError) -> Self {
        let category = err.category();
        let details = err.to_string();

        let transport = matches!(
            err,
            UploadError::Clone(_) | UploadError::Push(_) | UploadError::Git { .. }
        );
        let matched = transport
            .then(|| {
                let lower = diagnostic_text(&details);
                TRANSPORT_PATTERNS
                    .iter()
                    .find(|(needles, _, _)| needles.iter().any(|n| lower.contains(n)))
            })
            .flatten();

        let (message, hint) = match matched {
            Some((_, message, hint)) => ((*message).to_owned(), Some((*hint).to_owned())),
            None => (default_message(err), default_hint(category)),
        };

        Self {
            error: category.code().to_owned(),
            message,
            details,
            hint,
            category,
        }
    }

    /// Category the failure was classified into.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        self.category
    }

    /// Whether the caller can fix this by changing the request.
    #[must_use]
    pub fn is_caller_error(&self) -> bool {
        self.category.is_caller_error()
    }
}

impl From<UploadError> for ErrorResponse {
    fn from(err: UploadError) -> Self {
        Self::from_error(&err)
    }
}

impl std::fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

fn default_message(err: &UploadError) -> String {
    match err {
        UploadError::Validation(_)
        | UploadError::UnsupportedAuthMethod(_)
        | UploadError::FileProcessing { .. }
        | UploadError::NoChanges => err.to_string(),
        UploadError::AuthSetup(_) => "Failed to configure SSH authentication".into(),
        UploadError::Clone(_) => "Failed to clone repository".into(),
        UploadError::Push(_) => "Failed to push changes".into(),
        UploadError::Git { command, .. } => format!("git {command} failed"),
        UploadError::Cleanup(_) | UploadError::InvalidState { .. } | UploadError::Io(_) => {
            "Upload failed".into()
        },
    }
}

fn default_hint(category: ErrorCategory) -> Option<String> {
    let hint = match category {
        ErrorCategory::NoChanges => {
            "The uploaded files are identical to what is already on the branch"
        },
        ErrorCategory::UnsupportedAuthMethod => "Use one of: token, basic, ssh",
        ErrorCategory::AuthSetup => "Check that the SSH private key is complete and valid",
        _ => return None,
    };
    Some(hint.to_owned())
}
