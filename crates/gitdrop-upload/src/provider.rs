//! Hosting provider detection from a repository URL.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Hosting service that owns a repository, inferred from the URL hostname.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// github.com
    GitHub,
    /// gitlab.com and self-hosted `gitlab.*` hosts.
    GitLab,
    /// bitbucket.org and self-hosted `bitbucket.*` hosts.
    Bitbucket,
    /// Azure DevOps (`dev.azure.com`, `*.visualstudio.com`).
    Azure,
    /// codeberg.org
    Codeberg,
    /// Anything else.
    Generic,
}

/// Hostname fragments per provider, in match priority order.
const HOST_MARKERS: &[(Provider, &[&str])] = &[
    (Provider::GitHub, &["github.com"]),
    (Provider::GitLab, &["gitlab.com", "gitlab."]),
    (Provider::Bitbucket, &["bitbucket.org", "bitbucket."]),
    (Provider::Azure, &["azure.com", "visualstudio.com"]),
    (Provider::Codeberg, &["codeberg.org"]),
];

impl Provider {
    /// Every provider with a well-known SSH host.
    pub const KNOWN: [Self; 5] = [
        Self::GitHub,
        Self::GitLab,
        Self::Bitbucket,
        Self::Azure,
        Self::Codeberg,
    ];

    /// Classify a repository URL. Never fails; unknown hosts are [`Provider::Generic`].
    ///
    /// Accepts HTTPS URLs, `ssh://` URLs, and SCP-style `git@host:path`.
    /// When the URL cannot be parsed the raw string is searched for the same
    /// host fragments in the same priority order.
    #[must_use]
    pub fn detect(repo_url: &str) -> Self {
        let trimmed = repo_url.trim();
        let parseable = match trimmed
            .strip_prefix("git@")
            .and_then(|rest| rest.split_once(':'))
        {
            Some((host, path)) => format!("https://{host}/{path}"),
            None => trimmed.to_owned(),
        };

        match url::Url::parse(&parseable)
            .ok()
            .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
        {
            Some(host) => Self::from_fragment(&host),
            None => Self::from_fragment(&trimmed.to_ascii_lowercase()),
        }
    }

    fn from_fragment(haystack: &str) -> Self {
        HOST_MARKERS
            .iter()
            .find(|(_, markers)| markers.iter().any(|m| haystack.contains(m)))
            .map_or(Self::Generic, |(provider, _)| *provider)
    }

    /// Lowercase identifier used in results and logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GitHub => "github",
            Self::GitLab => "gitlab",
            Self::Bitbucket => "bitbucket",
            Self::Azure => "azure",
            Self::Codeberg => "codeberg",
            Self::Generic => "generic",
        }
    }

    /// The provider's public SSH endpoint, if it has a fixed one.
    #[must_use]
    pub fn ssh_host(self) -> Option<&'static str> {
        match self {
            Self::GitHub => Some("github.com"),
            Self::GitLab => Some("gitlab.com"),
            Self::Bitbucket => Some("bitbucket.org"),
            Self::Azure => Some("ssh.dev.azure.com"),
            Self::Codeberg => Some("codeberg.org"),
            Self::Generic => None,
        }
    }

    /// Userinfo to embed in an HTTPS URL for token authentication.
    ///
    /// `token` must already be percent-encoded.
    #[must_use]
    pub fn token_userinfo(self, token: &str) -> String {
        match self {
            Self::GitLab => format!("oauth2:{token}"),
            Self::Bitbucket => format!("x-token-auth:{token}"),
            Self::Azure => format!(":{token}"),
            Self::GitHub | Self::Codeberg | Self::Generic => token.to_owned(),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_known_hosts() {
        assert_eq!(
            Provider::detect("https://github.com/org/repo.git"),
            Provider::GitHub
        );
        assert_eq!(
            Provider::detect("git@gitlab.com:group/repo.git"),
            Provider::GitLab
        );
        assert_eq!(
            Provider::detect("https://dev.azure.com/org/project/_git/repo"),
            Provider::Azure
        );
        assert_eq!(
            Provider::detect("https://org.visualstudio.com/project/_git/repo"),
            Provider::Azure
        );
        assert_eq!(
            Provider::detect("https://bitbucket.org/team/repo.git"),
            Provider::Bitbucket
        );
        assert_eq!(
            Provider::detect("https://codeberg.org/user/repo"),
            Provider::Codeberg
        );
    }

    #[test]
    fn detects_self_hosted_instances() {
        assert_eq!(
            Provider::detect("https://gitlab.example.org/team/repo.git"),
            Provider::GitLab
        );
        assert_eq!(
            Provider::detect("git@bitbucket.corp.local:team/repo.git"),
            Provider::Bitbucket
        );
    }

    #[test]
    fn unknown_host_is_generic() {
        assert_eq!(
            Provider::detect("https://git.example.com/team/repo.git"),
            Provider::Generic
        );
        assert_eq!(Provider::detect(""), Provider::Generic);
    }

    #[test]
    fn hostname_is_case_insensitive() {
        assert_eq!(
            Provider::detect("https://GitHub.com/Org/Repo.git"),
            Provider::GitHub
        );
    }

    #[test]
    fn unparseable_input_falls_back_to_substring_search() {
        assert_eq!(Provider::detect("not a url but github.com"), Provider::GitHub);
        assert_eq!(Provider::detect("codeberg.org/user/repo"), Provider::Codeberg);
    }

    #[test]
    fn path_does_not_influence_parsed_urls() {
        assert_eq!(
            Provider::detect("https://git.example.com/mirrors/github.com/repo.git"),
            Provider::Generic
        );
    }

    #[test]
    fn token_userinfo_per_provider() {
        assert_eq!(Provider::GitHub.token_userinfo("t"), "t");
        assert_eq!(Provider::GitLab.token_userinfo("t"), "oauth2:t");
        assert_eq!(Provider::Bitbucket.token_userinfo("t"), "x-token-auth:t");
        assert_eq!(Provider::Azure.token_userinfo("t"), ":t");
        assert_eq!(Provider::Generic.token_userinfo("t"), "t");
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Provider::GitHub).unwrap(),
            "\"github\""
        );
    }
}
