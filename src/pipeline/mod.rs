//! Event-listener registration.
//!
//! Tells a pipeline service to watch the repository for pushes, using the
//! secret created earlier in the run for checkout credentials.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::http::{ApiClient, HttpFailure};
use crate::models::PipelineTarget;

#[derive(Error, Debug)]
pub enum WireUpError {
    #[error("pipeline service rejected listener for cluster {cluster} (HTTP {status}): {body}")]
    Rejected {
        cluster: String,
        status: u16,
        body: String,
    },

    #[error("failed to reach pipeline service: {0}")]
    Request(HttpFailure),
}

/// Secret the listener should mount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecretReference {
    pub name: String,
    pub namespace: String,
}

#[derive(Serialize)]
struct ListenerRequest<'a> {
    cluster: &'a str,
    repository: &'a str,
    events: [&'static str; 1],
    secret: &'a SecretReference,
}

/// Registers a repository with a pipeline trigger service.
#[async_trait]
pub trait PipelineWirer: Send + Sync {
    async fn configure(&self, cluster: &str, clone_url: &str, secret: &SecretReference) -> Result<(), WireUpError>;
}

/// Posts listener definitions to `<endpoint>/clusters/<cluster>/listeners`.
pub struct EventListenerClient {
    api: ApiClient,
    token: Option<String>,
}

impl EventListenerClient {
    pub fn new(endpoint: &str, token: Option<String>) -> Result<Self, HttpFailure> {
        Ok(Self {
            api: ApiClient::new(endpoint, &[])?,
            token,
        })
    }

    pub fn for_target(target: &PipelineTarget) -> Result<Self, HttpFailure> {
        Self::new(&target.endpoint, target.token.clone())
    }
}

#[async_trait]
impl PipelineWirer for EventListenerClient {
    async fn configure(&self, cluster: &str, clone_url: &str, secret: &SecretReference) -> Result<(), WireUpError> {
        let body = ListenerRequest {
            cluster,
            repository: clone_url,
            events: ["push"],
            secret,
        };
        self.api
            .post_unit(&format!("/clusters/{cluster}/listeners"), &body, self.token.as_deref())
            .await
            .map_err(|e| match e {
                HttpFailure::Status { status, body } => WireUpError::Rejected {
                    cluster: cluster.to_string(),
                    status,
                    body,
                },
                other => WireUpError::Request(other),
            })?;
        tracing::info!(cluster, repository = clone_url, "registered pipeline listener");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn secret() -> SecretReference {
        SecretReference {
            name: "rune-keys".into(),
            namespace: "default".into(),
        }
    }

    #[tokio::test]
    async fn posts_listener_with_bearer_token() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/clusters/prod/listeners")
                .header("authorization", "Bearer hook-token")
                .json_body(json!({
                    "cluster": "prod",
                    "repository": "git@github.com:acme/widgets.git",
                    "events": ["push"],
                    "secret": { "name": "rune-keys", "namespace": "default" }
                }));
            then.status(201);
        });

        let client = EventListenerClient::new(&server.base_url(), Some("hook-token".into())).unwrap();
        client
            .configure("prod", "git@github.com:acme/widgets.git", &secret())
            .await
            .unwrap();
        mock.assert();
    }

    #[tokio::test]
    async fn non_success_is_rejected() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/clusters/prod/listeners");
            then.status(403).body("forbidden");
        });

        let client = EventListenerClient::new(&server.base_url(), None).unwrap();
        let err = client.configure("prod", "git@x:y/z.git", &secret()).await.unwrap_err();
        match err {
            WireUpError::Rejected { status, body, .. } => {
                assert_eq!(status, 403);
                assert_eq!(body, "forbidden");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
