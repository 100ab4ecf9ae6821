//! Provider-specific repository references.
//!
//! A reference is parsed once, at the boundary, into a tagged [`RepoRef`].
//! Everything downstream matches on the variant instead of re-splitting
//! strings.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use super::ProviderKind;

/// Allowed characters in a GitHub owner or repository name.
static GITHUB_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._-]+$").expect("valid regex"));

/// Allowed characters in one GitLab namespace/project path segment.
static GITLAB_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._-]+$").expect("valid regex"));

/// Errors from parsing a repository reference.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepoRefError {
    #[error("invalid repository format '{0}', expected 'owner/repo'")]
    GitHubFormat(String),

    #[error("invalid GitLab project '{0}', expected a numeric id or 'namespace/project' path")]
    GitLabFormat(String),
}

/// A GitLab project, addressed either by numeric id or by full path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitLabProject {
    Id(u64),
    Path(String),
}

/// A repository on a hosting provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoRef {
    GitHub { owner: String, name: String },
    GitLab(GitLabProject),
}

impl RepoRef {
    /// Parse an operator-supplied reference for the given provider.
    pub fn parse(provider: ProviderKind, raw: &str) -> Result<Self, RepoRefError> {
        let raw = raw.trim();
        match provider {
            ProviderKind::GitHub => parse_github(raw),
            ProviderKind::GitLab => parse_gitlab(raw),
        }
    }

    /// The provider this reference belongs to.
    pub fn provider(&self) -> ProviderKind {
        match self {
            RepoRef::GitHub { .. } => ProviderKind::GitHub,
            RepoRef::GitLab(_) => ProviderKind::GitLab,
        }
    }

    /// Last path component, used as the repository name on creation.
    pub fn short_name(&self) -> String {
        match self {
            RepoRef::GitHub { name, .. } => name.clone(),
            RepoRef::GitLab(GitLabProject::Path(path)) => path
                .rsplit('/')
                .next()
                .unwrap_or(path.as_str())
                .to_string(),
            RepoRef::GitLab(GitLabProject::Id(id)) => id.to_string(),
        }
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepoRef::GitHub { owner, name } => write!(f, "{owner}/{name}"),
            RepoRef::GitLab(GitLabProject::Id(id)) => write!(f, "project #{id}"),
            RepoRef::GitLab(GitLabProject::Path(path)) => write!(f, "{path}"),
        }
    }
}

fn parse_github(raw: &str) -> Result<RepoRef, RepoRefError> {
    let Some((owner, name)) = raw.split_once('/') else {
        return Err(RepoRefError::GitHubFormat(raw.to_string()));
    };
    let name = name.strip_suffix(".git").unwrap_or(name);
    if !GITHUB_SEGMENT.is_match(owner) || !GITHUB_SEGMENT.is_match(name) {
        return Err(RepoRefError::GitHubFormat(raw.to_string()));
    }
    Ok(RepoRef::GitHub {
        owner: owner.to_string(),
        name: name.to_string(),
    })
}

fn parse_gitlab(raw: &str) -> Result<RepoRef, RepoRefError> {
    if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
        return raw
            .parse::<u64>()
            .map(|id| RepoRef::GitLab(GitLabProject::Id(id)))
            .map_err(|_| RepoRefError::GitLabFormat(raw.to_string()));
    }

    let path = raw.trim_matches('/');
    let segments: Vec<&str> = path.split('/').collect();
    if segments.len() < 2 || !segments.iter().all(|s| GITLAB_SEGMENT.is_match(s)) {
        return Err(RepoRefError::GitLabFormat(raw.to_string()));
    }
    Ok(RepoRef::GitLab(GitLabProject::Path(path.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn github_owner_repo() {
        let r = RepoRef::parse(ProviderKind::GitHub, "acme/widgets").unwrap();
        assert_eq!(
            r,
            RepoRef::GitHub {
                owner: "acme".into(),
                name: "widgets".into()
            }
        );
        assert_eq!(r.to_string(), "acme/widgets");
        assert_eq!(r.provider(), ProviderKind::GitHub);
    }

    #[test]
    fn github_many_valid_refs_round_trip_owner_and_name() {
        for (owner, name) in [
            ("a", "b"),
            ("The-Mines", "Rune"),
            ("org_1", "repo.name"),
            ("x", "y-z_0.9"),
        ] {
            let raw = format!("{owner}/{name}");
            match RepoRef::parse(ProviderKind::GitHub, &raw).unwrap() {
                RepoRef::GitHub { owner: o, name: n } => {
                    assert_eq!(o, owner);
                    assert_eq!(n, name);
                }
                other => panic!("unexpected variant: {other:?}"),
            }
        }
    }

    #[test]
    fn github_strips_git_suffix() {
        let r = RepoRef::parse(ProviderKind::GitHub, "acme/widgets.git").unwrap();
        assert_eq!(r.short_name(), "widgets");
    }

    #[test]
    fn github_without_separator_fails() {
        let err = RepoRef::parse(ProviderKind::GitHub, "widgets").unwrap_err();
        assert_eq!(err, RepoRefError::GitHubFormat("widgets".into()));
        assert!(err.to_string().contains("owner/repo"));
    }

    #[test]
    fn github_rejects_extra_or_empty_segments() {
        for raw in ["acme/widgets/extra", "/widgets", "acme/", "", "a b/c"] {
            assert!(
                RepoRef::parse(ProviderKind::GitHub, raw).is_err(),
                "should reject {raw:?}"
            );
        }
    }

    #[test]
    fn gitlab_numeric_id() {
        let r = RepoRef::parse(ProviderKind::GitLab, "12345").unwrap();
        assert_eq!(r, RepoRef::GitLab(GitLabProject::Id(12345)));
        assert_eq!(r.to_string(), "project #12345");
    }

    #[test]
    fn gitlab_nested_path() {
        let r = RepoRef::parse(ProviderKind::GitLab, "group/sub/project").unwrap();
        assert_eq!(
            r,
            RepoRef::GitLab(GitLabProject::Path("group/sub/project".into()))
        );
        assert_eq!(r.short_name(), "project");
    }

    #[test]
    fn gitlab_rejects_bare_name() {
        assert!(RepoRef::parse(ProviderKind::GitLab, "project").is_err());
        assert!(RepoRef::parse(ProviderKind::GitLab, "").is_err());
        assert!(RepoRef::parse(ProviderKind::GitLab, "group//project").is_err());
    }
}
