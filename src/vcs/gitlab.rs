//! GitLab REST API (v4) client.
//!
//! Authenticates with a personal or project access token sent as
//! `PRIVATE-TOKEN`. Project paths are resolved to numeric ids with
//! `GET /projects/:path` before deploy keys are added.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{AuthError, CreationError, HttpFailure, ProviderMismatch, RegistrationError, VcsClient};
use crate::http::ApiClient;
use crate::models::{GitLabProject, Identity, KeyRef, ProviderKind, RepoRef};

#[derive(Debug, Deserialize)]
struct User {
    username: String,
}

#[derive(Debug, Deserialize)]
struct Project {
    id: u64,
    #[serde(default)]
    ssh_url_to_repo: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Namespace {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct DeployKey {
    id: u64,
}

/// GitLab.com or self-managed GitLab client.
pub struct GitLabClient {
    api: ApiClient,
}

impl GitLabClient {
    pub fn new(base_url: &str, token: &str) -> Result<Self, HttpFailure> {
        let api = ApiClient::new(base_url, &[("private-token", token)])?;
        Ok(Self { api })
    }

    fn project_of(repo: &RepoRef) -> Result<&GitLabProject, ProviderMismatch> {
        match repo {
            RepoRef::GitLab(project) => Ok(project),
            RepoRef::GitHub { .. } => Err(ProviderMismatch {
                provider: ProviderKind::GitLab,
                repo: repo.to_string(),
            }),
        }
    }

    async fn fetch_project(&self, project: &GitLabProject) -> Result<Project, HttpFailure> {
        self.api
            .get(&format!("/projects/{}", project_segment(project)))
            .await
    }

    /// Numeric id of a project, looking it up when only the path is known.
    async fn resolve_id(&self, repo: &RepoRef) -> Result<u64, RegistrationError> {
        match Self::project_of(repo)? {
            GitLabProject::Id(id) => Ok(*id),
            project @ GitLabProject::Path(_) => {
                let resolved = self.fetch_project(project).await.map_err(|e| {
                    RegistrationError::ProjectLookup {
                        project: repo.to_string(),
                        source: e,
                    }
                })?;
                tracing::debug!(project = %repo, id = resolved.id, "resolved GitLab project path");
                Ok(resolved.id)
            }
        }
    }
}

/// URL path segment for a project: the id, or the path with `/` encoded.
fn project_segment(project: &GitLabProject) -> String {
    match project {
        GitLabProject::Id(id) => id.to_string(),
        GitLabProject::Path(path) => path.replace('/', "%2F"),
    }
}

#[async_trait]
impl VcsClient for GitLabClient {
    fn provider(&self) -> ProviderKind {
        ProviderKind::GitLab
    }

    async fn authenticate(&self) -> Result<Identity, AuthError> {
        let user: User = self.api.get("/user").await.map_err(|e| match e {
            HttpFailure::Status { status, body } if status == 401 || status == 403 => {
                AuthError::Rejected {
                    provider: "GitLab",
                    status,
                    body,
                }
            }
            other => AuthError::Request {
                provider: "GitLab",
                source: other,
            },
        })?;
        tracing::info!(username = %user.username, "authenticated with GitLab");
        Ok(Identity {
            provider: ProviderKind::GitLab,
            login: user.username,
        })
    }

    async fn add_deploy_key(
        &self,
        repo: &RepoRef,
        title: &str,
        public_key: &str,
        read_only: bool,
    ) -> Result<KeyRef, RegistrationError> {
        let id = self.resolve_id(repo).await?;
        let body = json!({
            "title": title,
            "key": public_key,
            "can_push": !read_only,
        });

        let key: DeployKey = self
            .api
            .post(&format!("/projects/{id}/deploy_keys"), &body)
            .await
            .map_err(|e| match e {
                HttpFailure::Status { status: 400, body } if body.contains("has already been taken") => {
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

        tracing::info!(repo = %repo, key_id = key.id, read_only, "registered GitLab deploy key");
        Ok(KeyRef { id: key.id })
    }

    async fn create_repository(
        &self,
        repo: &RepoRef,
        owner_login: &str,
        description: &str,
        private: bool,
    ) -> Result<RepoRef, CreationError> {
        let name = repo.short_name();
        let mut body = json!({
            "name": name,
            "path": name,
            "description": description,
            "visibility": if private { "private" } else { "public" },
        });

        // Projects outside the user's personal namespace need the group id.
        if let GitLabProject::Path(path) = Self::project_of(repo)? {
            if let Some((namespace, _)) = path.rsplit_once('/') {
                if namespace != owner_login {
                    let ns: Namespace = self
                        .api
                        .get(&format!("/namespaces/{}", namespace.replace('/', "%2F")))
                        .await
                        .map_err(|e| CreationError::Request {
                            name: repo.to_string(),
                            source: e,
                        })?;
                    body["namespace_id"] = json!(ns.id);
                }
            }
        }

        let created: Project = self.api.post("/projects", &body).await.map_err(|e| match e {
            HttpFailure::Status { status: 400, body } if body.contains("has already been taken") => {
                CreationError::AlreadyExists(repo.to_string())
            }
            other => CreationError::Request {
                name: repo.to_string(),
                source: other,
            },
        })?;

        tracing::info!(repo = %repo, id = created.id, private, "created GitLab project");
        Ok(RepoRef::GitLab(GitLabProject::Id(created.id)))
    }

    async fn clone_url(&self, repo: &RepoRef) -> Result<String, RegistrationError> {
        let project = self
            .fetch_project(Self::project_of(repo)?)
            .await
            .map_err(|e| RegistrationError::ProjectLookup {
                project: repo.to_string(),
                source: e,
            })?;
        project.ssh_url_to_repo.ok_or_else(|| RegistrationError::ProjectLookup {
            project: repo.to_string(),
            source: HttpFailure::Decode("project has no ssh_url_to_repo".to_string()),
        })
    }
}
