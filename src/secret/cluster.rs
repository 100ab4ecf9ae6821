//! Kubernetes API sink.

use std::path::PathBuf;

use async_trait::async_trait;
use k8s_openapi::ByteString;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, ObjectMeta, PostParams};
use kube::config::{KubeConfigOptions, Kubeconfig};

use super::{PersistError, SecretRecord, SecretSink};

enum ClientSource {
    /// Load credentials from this kubeconfig on first use.
    Kubeconfig(PathBuf),
    Ready(kube::Client),
}

/// Creates the secret through the cluster API. Never updates an existing one.
pub struct KubeSecretStore {
    source: ClientSource,
}

impl KubeSecretStore {
    pub fn from_kubeconfig(path: impl Into<PathBuf>) -> Self {
        Self {
            source: ClientSource::Kubeconfig(path.into()),
        }
    }

    /// Use an already configured client.
    pub fn with_client(client: kube::Client) -> Self {
        Self {
            source: ClientSource::Ready(client),
        }
    }

    async fn client(&self) -> Result<kube::Client, PersistError> {
        let path = match &self.source {
            ClientSource::Ready(client) => return Ok(client.clone()),
            ClientSource::Kubeconfig(path) => path,
        };
        let kubeconfig_error = |reason: String| PersistError::Kubeconfig {
            path: path.clone(),
            reason,
        };

        let kubeconfig = Kubeconfig::read_from(path).map_err(|e| kubeconfig_error(e.to_string()))?;
        let config = kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .map_err(|e| kubeconfig_error(e.to_string()))?;
        tracing::debug!(cluster = %config.cluster_url, "loaded kubeconfig");
        kube::Client::try_from(config).map_err(|e| kubeconfig_error(e.to_string()))
    }
}

/// The API object for `record`.
pub fn to_secret(record: &SecretRecord) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(record.name.clone()),
            namespace: Some(record.namespace.clone()),
            ..ObjectMeta::default()
        },
        type_: Some("Opaque".to_string()),
        data: Some(
            record
                .data
                .iter()
                .map(|(field, bytes)| (field.clone(), ByteString(bytes.clone())))
                .collect(),
        ),
        ..Secret::default()
    }
}

#[async_trait]
impl SecretSink for KubeSecretStore {
    async fn persist(&self, record: &SecretRecord) -> Result<(), PersistError> {
        let client = self.client().await?;
        let secrets: Api<Secret> = Api::namespaced(client, &record.namespace);

        match secrets.create(&PostParams::default(), &to_secret(record)).await {
            Ok(_) => {
                tracing::info!(
                    name = %record.name,
                    namespace = %record.namespace,
                    "created secret in cluster"
                );
                Ok(())
            }
            Err(kube::Error::Api(response)) if response.code == 409 => Err(PersistError::AlreadyExists {
                name: record.name.clone(),
                namespace: record.namespace.clone(),
            }),
            Err(e) => Err(PersistError::Cluster {
                name: record.name.clone(),
                reason: e.to_string(),
            }),
        }
    }

    fn describe(&self) -> String {
        match &self.source {
            ClientSource::Kubeconfig(path) => format!("cluster (kubeconfig {})", path.display()),
            ClientSource::Ready(_) => "cluster".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn record() -> SecretRecord {
        SecretRecord {
            name: "rune-keys".into(),
            namespace: "ci".into(),
            data: BTreeMap::from([("id_rsa".to_string(), b"PRIVATE".to_vec())]),
        }
    }

    #[test]
    fn secret_object_carries_record() {
        let secret = to_secret(&record());
        assert_eq!(secret.metadata.name.as_deref(), Some("rune-keys"));
        assert_eq!(secret.metadata.namespace.as_deref(), Some("ci"));
        assert_eq!(secret.type_.as_deref(), Some("Opaque"));
        assert_eq!(secret.data.unwrap()["id_rsa"], ByteString(b"PRIVATE".to_vec()));
    }

    #[tokio::test]
    async fn missing_kubeconfig_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = KubeSecretStore::from_kubeconfig(dir.path().join("nope"));
        let err = store.persist(&record()).await.unwrap_err();
        assert!(matches!(err, PersistError::Kubeconfig { .. }));
    }
}
