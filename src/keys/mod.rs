//! Key generation.
//!
//! A [`KeyBackend`] produces the signing pair. [`ssh::generate_transport_key`]
//! produces the separate SSH pair that becomes the deploy key.

pub mod gpg;
pub mod listing;
pub mod native;
pub mod process;
pub mod ssh;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{KeyBackendKind, KeyHolder, KeyPair, ProvisioningRequest};

pub use gpg::GpgBackend;
pub use native::NativeBackend;
pub use process::{CommandOutput, CommandRunner, Invocation, TokioCommandRunner};

/// Key generation failures. None leave a partial key pair behind.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("gpg {step} failed: {stderr}")]
    CommandFailed { step: &'static str, stderr: String },

    #[error("no generated key found for {0}")]
    KeyNotFound(String),

    #[error("several newest keys match {email}: {}", candidates.join(", "))]
    AmbiguousKey { email: String, candidates: Vec<String> },

    #[error("gpg {0} produced no output")]
    EmptyExport(&'static str),

    #[error("SSH key generation failed: {0}")]
    Ssh(#[from] ssh_key::Error),

    #[error("key generation task failed: {0}")]
    Task(String),

    #[error("no OpenSSH public key available for the deploy key")]
    NoDeployableKey,

    #[error("failed to create temporary key home: {0}")]
    TempDir(#[source] std::io::Error),
}

/// Something that can mint a signing key pair for a holder.
#[async_trait]
pub trait KeyBackend: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Generate a new pair. `expiry_days == 0` means no expiry.
    async fn generate(
        &self,
        holder: &KeyHolder,
        key_length: u32,
        expiry_days: u32,
    ) -> Result<KeyPair, GenerationError>;
}

/// Construct the backend selected in `request`.
pub fn backend_for(request: &ProvisioningRequest) -> Box<dyn KeyBackend> {
    match request.backend {
        KeyBackendKind::Gpg => Box::new(GpgBackend::new(&request.gpg_program)),
        KeyBackendKind::Native => Box::new(NativeBackend::new(request.ssh_algorithm)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn request(backend: KeyBackendKind) -> ProvisioningRequest {
        let mut config = Config::default();
        config.vcs.token = Some("t".into());
        config.vcs.repo = Some("acme/widgets".into());
        config.keys.backend = backend;
        ProvisioningRequest::from_config(&config).unwrap()
    }

    #[test]
    fn backend_matches_request() {
        assert_eq!(backend_for(&request(KeyBackendKind::Gpg)).name(), "gpg");
        assert_eq!(backend_for(&request(KeyBackendKind::Native)).name(), "native");
    }

    #[test]
    fn ambiguous_error_lists_candidates() {
        let err = GenerationError::AmbiguousKey {
            email: "a@b.c".into(),
            candidates: vec!["AAAA".into(), "BBBB".into()],
        };
        assert_eq!(err.to_string(), "several newest keys match a@b.c: AAAA, BBBB");
    }
}
