//! GitHub repository URL parsing.

use fetcher_core::{Error, Result};
use url::Url;

/// Owner and name of a GitHub repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoPath {
    /// Account or organisation owning the repository
    pub owner: String,
    /// Repository name
    pub repo: String,
}

impl std::fmt::Display for RepoPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// Parse a repository URL into its owner and name.
///
/// Accepts `https://github.com/owner/repo` with an optional `.git` suffix or
/// trailing slash, and `git@github.com:owner/repo[.git]`.
pub fn parse_github_remote(repo_url: &str) -> Result<RepoPath> {
    let path = if let Some(rest) = repo_url.strip_prefix("git@") {
        let (_, path) = rest
            .split_once(':')
            .ok_or_else(|| Error::parse(repo_url, "SSH remote is missing ':'"))?;
        path.to_string()
    } else {
        let url = Url::parse(repo_url).map_err(|e| Error::parse(repo_url, e.to_string()))?;
        if !matches!(url.scheme(), "https" | "http") {
            return Err(Error::parse(repo_url, "expected an https URL"));
        }
        url.path().to_string()
    };

    let path = path.trim_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);

    match path.split('/').collect::<Vec<_>>().as_slice() {
        [owner, repo] if !owner.is_empty() && !repo.is_empty() => Ok(RepoPath {
            owner: (*owner).to_string(),
            repo: (*repo).to_string(),
        }),
        _ => Err(Error::parse(repo_url, "expected <owner>/<repo>")),
    }
}
