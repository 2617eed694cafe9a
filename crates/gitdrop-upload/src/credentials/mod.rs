//! Credential formatting.
//!
//! Turns a repository URL plus credentials into something the `git` client
//! can use without prompting:
//!
//! - **Token** and **Basic**: an HTTPS clone URL with the credentials
//!   percent-encoded into its authority, following each provider's
//!   convention (see [`Provider::token_userinfo`]).
//! - **SSH**: an [`SshIdentity`] holding the key and a client configuration,
//!   plus an SSH connection URL. The identity is handed to each git
//!   subprocess through its own environment, never through process-global
//!   state, so concurrent SSH uploads cannot see each other's keys.

mod ssh;
mod url;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::{UploadError, UploadResult};
use crate::provider::Provider;

/// Userinfo shorter than this is only redacted where it precedes `@`.
const MIN_BARE_REDACT_LEN: usize = 8;

pub use self::ssh::SshIdentity;
pub use self::url::{
    encode_component, has_embedded_credentials, normalize_to_https, ssh_url, with_userinfo,
};

/// Supported authentication methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    /// Personal access token.
    Token,
    /// Username and password (or app password).
    Basic,
    /// SSH private key.
    Ssh,
}

impl AuthMethod {
    /// Lowercase identifier.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Token => "token",
            Self::Basic => "basic",
            Self::Ssh => "ssh",
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMethod {
    type Err = UploadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "token" => Ok(Self::Token),
            "basic" => Ok(Self::Basic),
            "ssh" => Ok(Self::Ssh),
            other => Err(UploadError::UnsupportedAuthMethod(format!(
                "'{other}'. Supported methods: token, basic, ssh"
            ))),
        }
    }
}

/// Credentials for one upload. The variant fixes the [`AuthMethod`].
///
/// Secret material is zeroed when dropped and never printed by `Debug`.
#[derive(Clone)]
pub enum Credentials {
    /// Personal access token.
    Token(Zeroizing<String>),
    /// Username and password.
    Basic {
        /// Account name.
        username: String,
        /// Password or app password.
        password: Zeroizing<String>,
    },
    /// SSH private key in OpenSSH or PEM format.
    Ssh(Zeroizing<String>),
}

impl Credentials {
    /// Token credentials.
    #[must_use]
    pub fn token(token: impl Into<String>) -> Self {
        Self::Token(Zeroizing::new(token.into()))
    }

    /// Username/password credentials.
    #[must_use]
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: Zeroizing::new(password.into()),
        }
    }

    /// SSH private key credentials.
    #[must_use]
    pub fn ssh_key(private_key: impl Into<String>) -> Self {
        Self::Ssh(Zeroizing::new(private_key.into()))
    }

    /// The method these credentials authenticate with.
    #[must_use]
    pub fn method(&self) -> AuthMethod {
        match self {
            Self::Token(_) => AuthMethod::Token,
            Self::Basic { .. } => AuthMethod::Basic,
            Self::Ssh(_) => AuthMethod::Ssh,
        }
    }

    /// Fail unless every credential field is non-blank.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::Validation`] naming the blank field.
    pub fn ensure_present(&self) -> UploadResult<()> {
        let blank = match self {
            Self::Token(token) if token.trim().is_empty() => Some("access token"),
            Self::Basic { username, .. } if username.trim().is_empty() => Some("username"),
            Self::Basic { password, .. } if password.trim().is_empty() => Some("password"),
            Self::Ssh(key) if key.trim().is_empty() => Some("SSH private key"),
            _ => None,
        };
        match blank {
            Some(field) => Err(UploadError::Validation(format!(
                "{field} is required for {} authentication",
                self.method()
            ))),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token(_) => f.debug_tuple("Token").field(&"***").finish(),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"***")
                .finish(),
            Self::Ssh(_) => f.debug_tuple("Ssh").field(&"***").finish(),
        }
    }
}

/// Resolved authentication for one upload.
///
/// Created per operation and destroyed with [`AuthContext::close`].
pub enum AuthContext {
    /// HTTPS (or local) remote whose URL carries any credentials itself.
    Url {
        /// URL used for clone and push.
        clone_url: Zeroizing<String>,
        /// The same URL with credentials removed, for messages.
        display_url: String,
        /// Percent-encoded userinfo embedded in `clone_url`, if any.
        userinfo: Option<Zeroizing<String>>,
    },
    /// SSH remote authenticated by an ephemeral identity.
    Ssh {
        /// `git@host:path` or `ssh://` connection URL.
        remote_url: String,
        /// Key material and client config.
        identity: SshIdentity,
    },
}

impl fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url {
                display_url,
                userinfo,
                ..
            } => f
                .debug_struct("Url")
                .field("display_url", display_url)
                .field("has_credentials", &userinfo.is_some())
                .finish(),
            Self::Ssh {
                remote_url,
                identity,
            } => f
                .debug_struct("Ssh")
                .field("remote_url", remote_url)
                .field("identity", identity)
                .finish(),
        }
    }
}

impl AuthContext {
    /// Build the authentication context for `repo_url`.
    ///
    /// `temp_root` is where SSH key directories are created; `None` uses the
    /// system temporary directory.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::AuthSetup`] if SSH key material cannot be
    /// written.
    pub fn resolve(
        repo_url: &str,
        credentials: &Credentials,
        provider: Provider,
        temp_root: Option<&Path>,
    ) -> UploadResult<Self> {
        match credentials {
            Credentials::Token(token) => {
                let userinfo = provider.token_userinfo(&encode_component(token));
                Ok(Self::with_credentials(repo_url, userinfo))
            },
            Credentials::Basic { username, password } => {
                let userinfo = format!(
                    "{}:{}",
                    encode_component(username),
                    encode_component(password)
                );
                Ok(Self::with_credentials(repo_url, userinfo))
            },
            Credentials::Ssh(key) => {
                let identity = SshIdentity::create(key, temp_root)?;
                Ok(Self::Ssh {
                    remote_url: ssh_url(repo_url),
                    identity,
                })
            },
        }
    }

    /// An unauthenticated context that uses `remote_url` verbatim.
    ///
    /// Useful for public repositories and local `file://` remotes.
    #[must_use]
    pub fn anonymous(remote_url: impl Into<String>) -> Self {
        let url: String = remote_url.into();
        Self::Url {
            display_url: url.clone(),
            clone_url: Zeroizing::new(url),
            userinfo: None,
        }
    }

    fn with_credentials(repo_url: &str, userinfo: String) -> Self {
        let display_url = normalize_to_https(repo_url);
        let clone_url = with_userinfo(&display_url, &userinfo);
        Self::Url {
            clone_url: Zeroizing::new(clone_url),
            display_url,
            userinfo: Some(Zeroizing::new(userinfo)),
        }
    }

    /// URL handed to `git clone`.
    #[must_use]
    pub fn remote_url(&self) -> &str {
        match self {
            Self::Url { clone_url, .. } => clone_url,
            Self::Ssh { remote_url, .. } => remote_url,
        }
    }

    /// Whether this context authenticates over SSH.
    #[must_use]
    pub fn is_ssh(&self) -> bool {
        matches!(self, Self::Ssh { .. })
    }

    /// `GIT_SSH_COMMAND` for subprocesses of this operation, if SSH is used.
    #[must_use]
    pub fn ssh_command(&self) -> Option<String> {
        match self {
            Self::Ssh { identity, .. } => Some(identity.ssh_command()),
            Self::Url { .. } => None,
        }
    }

    /// Remove credentials from text produced by git before it is stored in
    /// an error or written to a log.
    #[must_use]
    pub fn redact(&self, text: &str) -> String {
        match self {
            Self::Url {
                clone_url,
                display_url,
                userinfo,
            } => {
                let mut out = text.replace(clone_url.as_str(), display_url);
                if let Some(info) = userinfo
                    && !info.is_empty()
                {
                    out = out.replace(&format!("{}@", info.as_str()), "***@");
                    // Short values also occur in ordinary git output.
                    if info.len() >= MIN_BARE_REDACT_LEN {
                        out = out.replace(info.as_str(), "***");
                    }
                }
                out
            },
            Self::Ssh { .. } => text.to_owned(),
        }
    }

    /// Destroy key material created for this context.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::Cleanup`] if the SSH key directory cannot be
    /// removed.
    pub fn close(self) -> UploadResult<()> {
        match self {
            Self::Ssh { identity, .. } => identity.close(),
            Self::Url { .. } => Ok(()),
        }
    }
}
