//! Commit uploaded files to a remote git repository.
//!
//! The caller hands over a repository URL, a branch, an author, credentials,
//! and a set of files (zip archives are expanded). [`Uploader`] clones the
//! branch into a throwaway workspace, writes the files, commits, pushes, and
//! removes every temporary directory and key it created.
//!
//! - [`Provider`]: Hosting provider inferred from the repository URL
//! - [`AuthContext`]: Credential-embedded HTTPS URL or ephemeral SSH identity
//! - [`archive::expand`]: Flattens uploads and zip archives into file entries
//! - [`Workspace`]: Clone/branch/write/stage/commit/push state machine
//! - [`Uploader`]: Validates, orchestrates, and classifies failures
//!
//! # Credentials
//!
//! Token and basic credentials are percent-encoded into the clone URL using
//! each provider's convention. SSH keys are written to an owner-only
//! temporary directory and handed to git through a per-subprocess
//! `GIT_SSH_COMMAND`, so concurrent uploads never share key material.
//! Git's own output is scrubbed of credentials before it reaches an error or
//! log line.
//!
//! # Errors
//!
//! Failures surface as an [`ErrorResponse`] with a short code from
//! [`ErrorCategory`], a user-facing message, and the raw diagnostic.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod archive;
pub mod credentials;
pub mod error;
pub mod provider;
pub mod request;
pub mod response;
pub mod uploader;
pub mod workspace;

pub use archive::{ArchiveLimits, MaterializedFile};
pub use credentials::{AuthContext, AuthMethod, Credentials};
pub use error::{ErrorCategory, UploadError, UploadResult};
pub use provider::Provider;
pub use request::{Author, InputFile, UploadDefaults, UploadForm, UploadRequest, validate_branch};
pub use response::{ErrorResponse, UploadOutcome};
pub use uploader::Uploader;
pub use workspace::{CloneOutcome, GitSettings, StatusSummary, Workspace, WorkspaceState};
