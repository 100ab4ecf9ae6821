//! Hosting-provider clients.
//!
//! [`VcsClient`] is the seam between the orchestrator and a provider's REST
//! API. Each implementation performs one request per operation; nothing is
//! retried, and provider rejections (bad token, duplicate key, existing
//! repository) surface as typed errors.

pub mod github;
pub mod gitlab;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Identity, KeyRef, ProviderKind, RepoRef};

pub use github::GitHubClient;
pub use gitlab::GitLabClient;
pub use crate::http::HttpFailure;

/// Credential check failures.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("{provider} rejected the access token (HTTP {status}): {body}")]
    Rejected {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("{provider} authentication request failed: {source}")]
    Request {
        provider: &'static str,
        source: HttpFailure,
    },
}

/// A repository reference of one provider handed to another provider's client.
#[derive(Error, Debug)]
#[error("{repo} is not a {provider} repository")]
pub struct ProviderMismatch {
    pub provider: ProviderKind,
    pub repo: String,
}

/// Deploy-key registration failures.
#[derive(Error, Debug)]
pub enum RegistrationError {
    #[error("deploy key already registered on {repo}: {message}")]
    Duplicate { repo: String, message: String },

    #[error("failed to resolve project {project}: {source}")]
    ProjectLookup { project: String, source: HttpFailure },

    #[error("failed to add deploy key to {repo}: {source}")]
    Request { repo: String, source: HttpFailure },

    #[error(transparent)]
    ProviderMismatch(#[from] ProviderMismatch),
}

/// Repository creation failures.
#[derive(Error, Debug)]
pub enum CreationError {
    #[error("repository {0} already exists")]
    AlreadyExists(String),

    #[error("failed to create repository {name}: {source}")]
    Request { name: String, source: HttpFailure },

    #[error(transparent)]
    ProviderMismatch(#[from] ProviderMismatch),
}

/// Operations rune needs from a hosting provider.
#[async_trait]
pub trait VcsClient: Send + Sync {
    /// Which provider this client talks to.
    fn provider(&self) -> ProviderKind;

    /// Resolve the token to an account, failing fast on bad credentials.
    async fn authenticate(&self) -> Result<Identity, AuthError>;

    /// Register `public_key` as a deploy key on `repo`.
    async fn add_deploy_key(
        &self,
        repo: &RepoRef,
        title: &str,
        public_key: &str,
        read_only: bool,
    ) -> Result<KeyRef, RegistrationError>;

    /// Create the repository `repo` refers to, owned by `owner_login` or its
    /// namespace. Returns the reference of the created repository.
    async fn create_repository(
        &self,
        repo: &RepoRef,
        owner_login: &str,
        description: &str,
        private: bool,
    ) -> Result<RepoRef, CreationError>;

    /// SSH clone URL of `repo`, used by the pipeline wire-up step.
    async fn clone_url(&self, repo: &RepoRef) -> Result<String, RegistrationError>;
}

/// Construct the client for `provider`.
pub fn client_for(
    provider: ProviderKind,
    base_url: &str,
    token: &str,
) -> Result<Box<dyn VcsClient>, HttpFailure> {
    Ok(match provider {
        ProviderKind::GitHub => Box::new(GitHubClient::new(base_url, token)?),
        ProviderKind::GitLab => Box::new(GitLabClient::new(base_url, token)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_for_selects_provider() {
        let gh = client_for(ProviderKind::GitHub, "https://api.github.com", "t").unwrap();
        assert_eq!(gh.provider(), ProviderKind::GitHub);
        let gl = client_for(ProviderKind::GitLab, "https://gitlab.com/api/v4", "t").unwrap();
        assert_eq!(gl.provider(), ProviderKind::GitLab);
    }

    #[test]
    fn auth_error_mentions_provider_and_status() {
        let err = AuthError::Rejected {
            provider: "GitHub",
            status: 401,
            body: "Bad credentials".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("GitHub"));
        assert!(msg.contains("401"));
        assert!(msg.contains("Bad credentials"));
    }
}
