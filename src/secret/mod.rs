//! Packaging key material as a Kubernetes `Secret` and putting it somewhere.
//!
//! A [`SecretRecord`] is written through exactly one [`SecretSink`]: a
//! manifest file ([`FileSink`]) or a live cluster ([`KubeSecretStore`]).
//! Sinks only ever create. An existing secret is an error, never updated.

pub mod cluster;
pub mod file;
pub mod manifest;

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Destination, KeyMaterial};

pub use cluster::KubeSecretStore;
pub use file::FileSink;

/// Persistence failures.
#[derive(Error, Debug)]
pub enum PersistError {
    #[error("failed to render secret manifest: {0}")]
    Serialize(String),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("secret {name} already exists in namespace {namespace}")]
    AlreadyExists { name: String, namespace: String },

    #[error("failed to load kubeconfig {path}: {reason}")]
    Kubeconfig { path: PathBuf, reason: String },

    #[error("cluster rejected secret {name}: {reason}")]
    Cluster { name: String, reason: String },
}

/// Named key payloads bound for one namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretRecord {
    pub name: String,
    pub namespace: String,
    pub data: BTreeMap<String, Vec<u8>>,
}

impl SecretRecord {
    /// Collect every key pair into named fields, skipping empty payloads.
    pub fn from_material(name: &str, namespace: &str, material: &KeyMaterial) -> Self {
        let mut data = BTreeMap::new();
        for pair in material.pairs() {
            let (private_field, public_field) = pair.field_names();
            for (field, value) in [(private_field, pair.private.as_str()), (public_field, pair.public.as_str())] {
                if !value.is_empty() {
                    data.insert(field, value.as_bytes().to_vec());
                }
            }
        }
        Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
            data,
        }
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }
}

/// A place a secret record can be created.
#[async_trait]
pub trait SecretSink: Send + Sync {
    /// Create the secret. Fails if it already exists.
    async fn persist(&self, record: &SecretRecord) -> Result<(), PersistError>;

    /// Human-readable location, e.g. `file ./rune-secret.yaml`.
    fn describe(&self) -> String;
}

/// Construct the sink for the selected destination.
pub fn sink_for(destination: &Destination) -> Box<dyn SecretSink> {
    match destination {
        Destination::File(path) => Box::new(FileSink::new(path.clone())),
        Destination::Cluster(kubeconfig) => Box::new(KubeSecretStore::from_kubeconfig(kubeconfig.clone())),
    }
}
