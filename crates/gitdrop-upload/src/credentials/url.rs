//! Repository URL rewriting for authenticated access.

/// Rewrite a repository URL as `https://host/path.git` with no userinfo.
///
/// Accepts SCP-style `git@host:path`, `ssh://user@host[:port]/path` and
/// `http(s)://[userinfo@]host/path`. The result is idempotent under
/// re-normalization.
#[must_use]
pub fn normalize_to_https(repo_url: &str) -> String {
    let trimmed = repo_url.trim();

    let (host, path) = if let Some(rest) = trimmed.strip_prefix("git@")
        && let Some((host, path)) = rest.split_once(':')
        && !rest.contains("://")
    {
        (host.to_owned(), path)
    } else {
        let (scheme, rest) = trimmed.split_once("://").unwrap_or(("https", trimmed));
        let (authority, path) = rest.split_once('/').unwrap_or((rest, ""));
        // Userinfo ends at the last '@' of the authority.
        let host = authority.rsplit_once('@').map_or(authority, |(_, h)| h);
        let host = if scheme.eq_ignore_ascii_case("ssh") {
            // SSH ports mean nothing over HTTPS.
            host.split_once(':').map_or(host, |(h, _)| h)
        } else {
            host
        };
        (host.to_owned(), path)
    };

    let path = path.trim_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    format!("https://{host}/{path}.git")
}

/// Insert `userinfo@` into the authority of an `https://` URL.
#[must_use]
pub fn with_userinfo(https_url: &str, userinfo: &str) -> String {
    match https_url.strip_prefix("https://") {
        Some(rest) => format!("https://{userinfo}@{rest}"),
        None => https_url.to_owned(),
    }
}

/// Percent-encode a credential component the way browsers'
/// `encodeURIComponent` does for the characters that matter in userinfo.
#[must_use]
pub fn encode_component(raw: &str) -> String {
    urlencoding::encode(raw).into_owned()
}

/// Produce the SSH connection URL for a repository.
///
/// SSH-form input (`git@…` or `ssh://…`) is returned unchanged. HTTPS input
/// becomes `git@<host>:<path>.git`. Unparseable input is returned unchanged.
#[must_use]
pub fn ssh_url(repo_url: &str) -> String {
    let trimmed = repo_url.trim();
    if trimmed.starts_with("git@") || trimmed.starts_with("ssh://") {
        return trimmed.to_owned();
    }

    let Ok(parsed) = url::Url::parse(trimmed) else {
        tracing::warn!("could not convert repository URL to SSH form, using it as given");
        return trimmed.to_owned();
    };
    let Some(host) = parsed.host_str() else {
        tracing::warn!("repository URL has no host, using it as given");
        return trimmed.to_owned();
    };

    let path = parsed.path().trim_start_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    format!("git@{host}:{path}.git")
}

/// Whether a URL carries credentials in its authority.
///
/// SCP-style `git@host:path` URLs name an SSH login user, not a credential.
#[must_use]
pub fn has_embedded_credentials(remote_url: &str) -> bool {
    if remote_url.starts_with("git@") {
        return false;
    }
    url::Url::parse(remote_url)
        .is_ok_and(|u| !u.username().is_empty() || u.password().is_some())
}
