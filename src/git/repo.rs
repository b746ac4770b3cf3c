//! Repository handles: open, root, revision resolution, identity, remote URLs.
//!
//! Grounded on `kodegen_tools_git`'s `RepoHandle` (a cheap-to-clone wrapper
//! around `gix::Repository`) and its `introspection`/`remote` modules for
//! URL parsing and config reads.

use std::path::{Path, PathBuf};

use gix::bstr::ByteSlice;

use super::error::{GitError, GitResult};

/// Strong-typed repository handle with cheap cloning.
///
/// Wraps a single `gix::Repository`. Cloning shares the underlying object
/// database and ref store but clears thread-local buffers, so each clone
/// can be moved to a different thread (e.g. into `spawn_blocking`).
#[derive(Debug, Clone)]
pub struct Repo {
    inner: gix::Repository,
    bare: bool,
}

/// Options controlling how a repository is opened.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenOpts {
    pub bare: bool,
}

impl Repo {
    /// Open a repository at `path`. Fails with `NotARepository` if `path`
    /// is not within a Git working tree, or declares `bare` but the
    /// repository found there isn't bare (or vice versa).
    pub fn open(path: impl AsRef<Path>, opts: OpenOpts) -> GitResult<Self> {
        let path = path.as_ref();
        let inner = gix::open(path).map_err(|_| GitError::NotARepository(path.to_path_buf()))?;

        if inner.is_bare() != opts.bare {
            return Err(GitError::NotARepository(path.to_path_buf()));
        }

        Ok(Self {
            inner,
            bare: opts.bare,
        })
    }

    /// Initialize a bare repository at `path` and open a handle to it.
    /// Used by the registry cache the first time it mirrors a registry URL.
    pub fn init_bare(path: impl AsRef<Path>) -> GitResult<Self> {
        let path = path.as_ref();
        let inner = gix::init_bare(path)?;
        Ok(Self { inner, bare: true })
    }

    /// Clone `url` into a fresh bare mirror at `path`.
    pub fn clone_bare(url: &str, path: impl AsRef<Path>) -> GitResult<Self> {
        let path = path.as_ref();
        let mut prepare = gix::prepare_clone_bare(url, path)?;
        let (repo, _outcome) = prepare
            .fetch_only(gix::progress::Discard, &gix::interrupt::IS_INTERRUPTED)
            .map_err(|e| GitError::NetworkError(e.to_string()))?;
        Ok(Self {
            inner: repo,
            bare: true,
        })
    }

    #[inline]
    pub fn raw(&self) -> &gix::Repository {
        &self.inner
    }

    #[inline]
    pub fn is_bare(&self) -> bool {
        self.bare
    }

    /// Absolute path to the working-tree root (non-bare) or the bare
    /// directory itself.
    pub fn root(&self) -> PathBuf {
        if self.bare {
            self.inner.path().to_path_buf()
        } else {
            self.inner
                .workdir()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| self.inner.path().to_path_buf())
        }
    }

    /// Resolve a revision expression (`HEAD`, `HEAD^{tree}`, a hash
    /// prefix, a branch name) to a full object hash.
    pub fn rev_hash(&self, rev: &str) -> GitResult<String> {
        let spec = self
            .inner
            .rev_parse_single(rev.as_bytes().as_bstr())
            .map_err(|_| GitError::UnknownRevision(rev.to_string()))?;
        Ok(spec.detach().to_string())
    }

    /// Like `rev_hash`, but never fails: returns `false` for anything that
    /// doesn't resolve.
    pub fn rev_exists(&self, rev: &str) -> bool {
        self.inner.rev_parse_single(rev.as_bytes().as_bstr()).is_ok()
    }

    /// Read `(name, email)` from the repository's effective Git config.
    pub fn get_user(&self) -> GitResult<(String, String)> {
        let config = self.inner.config_snapshot();
        let name = config
            .string("user.name")
            .map(|v| v.to_string())
            .ok_or(GitError::UnknownIdentity)?;
        let email = config
            .string("user.email")
            .map(|v| v.to_string())
            .ok_or(GitError::UnknownIdentity)?;
        Ok((name, email))
    }

    /// Read the URL configured for remote `name` (defaults are the
    /// caller's responsibility; this looks up `remote.<name>.url` only).
    pub fn get_remote_url(&self, name: &str) -> GitResult<String> {
        let remote = self
            .inner
            .find_remote(name)
            .map_err(|e| GitError::Gix(Box::new(e)))?;
        let url = remote
            .url(gix::remote::Direction::Push)
            .or_else(|| remote.url(gix::remote::Direction::Fetch))
            .ok_or_else(|| GitError::GitCommand(format!("remote '{name}' has no url")))?;
        Ok(url.to_bstring().to_string())
    }
}

/// Canonicalize a remote URL per §3: strip a trailing `.git`, and rewrite
/// `user@host:path` SCP-like syntax to `https://host/path`.
pub fn normalize_remote_url(url: &str) -> String {
    let url = url.trim();

    let rewritten = if let Some(rest) = url.strip_prefix("ssh://") {
        // ssh://git@host/path -> host/path
        rest.split_once('@')
            .map(|(_, hostpath)| hostpath.to_string())
            .unwrap_or_else(|| rest.to_string())
    } else if let Some(at_pos) = url.find('@') {
        // git@host:path (SCP-like) -> host/path, but only when it's not
        // already an http(s):// URL containing an '@' in userinfo.
        if url.starts_with("http://") || url.starts_with("https://") {
            strip_http_scheme(url)
        } else {
            let (_, rest) = url.split_at(at_pos + 1);
            rest.replacen(':', "/", 1)
        }
    } else {
        strip_http_scheme(url)
    };

    let trimmed = rewritten
        .trim_end_matches('/')
        .strip_suffix(".git")
        .unwrap_or(&rewritten)
        .trim_end_matches('/');

    format!("https://{trimmed}")
}

fn strip_http_scheme(url: &str) -> String {
    url.strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_scp_like_url() {
        assert_eq!(
            normalize_remote_url("git@github.com:acme/payments.git"),
            "https://github.com/acme/payments"
        );
    }

    #[test]
    fn normalizes_https_url_with_git_suffix() {
        assert_eq!(
            normalize_remote_url("https://github.com/acme/payments.git"),
            "https://github.com/acme/payments"
        );
    }

    #[test]
    fn normalizes_https_url_without_suffix() {
        assert_eq!(
            normalize_remote_url("https://github.com/acme/payments"),
            "https://github.com/acme/payments"
        );
    }

    #[test]
    fn normalizes_ssh_scheme_url() {
        assert_eq!(
            normalize_remote_url("ssh://git@github.com/acme/payments.git"),
            "https://github.com/acme/payments"
        );
    }

    #[test]
    fn trims_trailing_slash() {
        assert_eq!(
            normalize_remote_url("https://github.com/acme/payments/"),
            "https://github.com/acme/payments"
        );
    }
}
