//! GitHub REST API client.
//!
//! Authenticates with a personal access token (`Authorization: Bearer`) and
//! uses the `/user`, `/repos/{owner}/{repo}/keys`, `/user/repos`, and
//! `/orgs/{org}/repos` endpoints.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{AuthError, CreationError, HttpFailure, ProviderMismatch, RegistrationError, VcsClient};
use crate::constants::GITHUB_API_VERSION;
use crate::http::ApiClient;
use crate::models::{Identity, KeyRef, ProviderKind, RepoRef};

#[derive(Debug, Deserialize)]
struct User {
    login: String,
}

#[derive(Debug, Deserialize)]
struct DeployKey {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct Owner {
    login: String,
}

#[derive(Debug, Deserialize)]
struct Repository {
    name: String,
    owner: Owner,
}

/// GitHub (or GitHub Enterprise) client.
pub struct GitHubClient {
    api: ApiClient,
}

impl GitHubClient {
    pub fn new(base_url: &str, token: &str) -> Result<Self, HttpFailure> {
        let auth = format!("Bearer {token}");
        let api = ApiClient::new(
            base_url,
            &[
                ("authorization", auth.as_str()),
                ("accept", "application/vnd.github+json"),
                ("x-github-api-version", GITHUB_API_VERSION),
            ],
        )?;
        Ok(Self { api })
    }

    fn owner_and_name(repo: &RepoRef) -> Result<(&str, &str), ProviderMismatch> {
        match repo {
            RepoRef::GitHub { owner, name } => Ok((owner, name)),
            RepoRef::GitLab(_) => Err(ProviderMismatch {
                provider: ProviderKind::GitHub,
                repo: repo.to_string(),
            }),
        }
    }

    /// Web host derived from the API base URL (`api.github.com` → `github.com`,
    /// `ghe.example.com/api/v3` → `ghe.example.com`).
    fn web_host(&self) -> String {
        let without_scheme = self
            .api
            .base_url()
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(self.api.base_url());
        let host = without_scheme.split('/').next().unwrap_or(without_scheme);
        host.strip_prefix("api.").unwrap_or(host).to_string()
    }
}

#[async_trait]
impl VcsClient for GitHubClient {
    fn provider(&self) -> ProviderKind {
        ProviderKind::GitHub
    }

    async fn authenticate(&self) -> Result<Identity, AuthError> {
        let user: User = self.api.get("/user").await.map_err(|e| match e {
            HttpFailure::Status { status, body } if status == 401 || status == 403 => {
                AuthError::Rejected {
                    provider: "GitHub",
                    status,
                    body,
                }
            }
            other => AuthError::Request {
                provider: "GitHub",
                source: other,
            },
        })?;
        tracing::info!(login = %user.login, "authenticated with GitHub");
        Ok(Identity {
            provider: ProviderKind::GitHub,
            login: user.login,
        })
    }

    async fn add_deploy_key(
        &self,
        repo: &RepoRef,
        title: &str,
        public_key: &str,
        read_only: bool,
    ) -> Result<KeyRef, RegistrationError> {
        let (owner, name) = Self::owner_and_name(repo)?;
        let body = json!({
            "title": title,
            "key": public_key,
            "read_only": read_only,
        });

        let key: DeployKey = self
            .api
            .post(&format!("/repos/{owner}/{name}/keys"), &body)
            .await
            .map_err(|e| match e {
                HttpFailure::Status { status: 422, body } if body.contains("already in use") => {
                    RegistrationError::Duplicate {
                        repo: repo.to_string(),
                        message: body,
                    }
                }
                other => RegistrationError::Request {
                    repo: repo.to_string(),
                    source: other,
                },
            })?;

        tracing::info!(repo = %repo, key_id = key.id, read_only, "registered GitHub deploy key");
        Ok(KeyRef { id: key.id })
    }

    async fn create_repository(
        &self,
        repo: &RepoRef,
        owner_login: &str,
        description: &str,
        private: bool,
    ) -> Result<RepoRef, CreationError> {
        let (owner, name) = Self::owner_and_name(repo)?;
        let path = if owner.eq_ignore_ascii_case(owner_login) {
            "/user/repos".to_string()
        } else {
            format!("/orgs/{owner}/repos")
        };
        let body = json!({
            "name": name,
            "description": description,
            "private": private,
        });

        let created: Repository = self.api.post(&path, &body).await.map_err(|e| match e {
            HttpFailure::Status { status: 422, body } if body.contains("already exists") => {
                CreationError::AlreadyExists(repo.to_string())
            }
            other => CreationError::Request {
                name: repo.to_string(),
                source: other,
            },
        })?;

        tracing::info!(repo = %repo, private, "created GitHub repository");
        Ok(RepoRef::GitHub {
            owner: created.owner.login,
            name: created.name,
        })
    }

    async fn clone_url(&self, repo: &RepoRef) -> Result<String, RegistrationError> {
        let (owner, name) = Self::owner_and_name(repo)?;
        Ok(format!("git@{}:{owner}/{name}.git", self.web_host()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GitLabProject;

    #[test]
    fn web_host_for_public_github() {
        let client = GitHubClient::new("https://api.github.com", "t").unwrap();
        assert_eq!(client.web_host(), "github.com");
    }

    #[test]
    fn web_host_for_enterprise() {
        let client = GitHubClient::new("https://ghe.example.com/api/v3", "t").unwrap();
        assert_eq!(client.web_host(), "ghe.example.com");
    }

    #[tokio::test]
    async fn clone_url_is_ssh_form() {
        let client = GitHubClient::new("https://api.github.com", "t").unwrap();
        let repo = RepoRef::GitHub {
            owner: "acme".into(),
            name: "widgets".into(),
        };
        assert_eq!(
            client.clone_url(&repo).await.unwrap(),
            "git@github.com:acme/widgets.git"
        );
    }

    #[tokio::test]
    async fn gitlab_reference_is_rejected() {
        let client = GitHubClient::new("https://api.github.com", "t").unwrap();
        let repo = RepoRef::GitLab(GitLabProject::Id(42));

        let err = client.add_deploy_key(&repo, "k", "ssh-rsa AAAA", true).await.unwrap_err();
        assert!(matches!(err, RegistrationError::ProviderMismatch(_)));

        let err = client.create_repository(&repo, "octocat", "", true).await.unwrap_err();
        assert!(matches!(err, CreationError::ProviderMismatch(_)));
    }
}
