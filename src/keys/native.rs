//! Key backend that needs no external programs.

use async_trait::async_trait;

use super::{GenerationError, KeyBackend, ssh};
use crate::models::{KeyHolder, KeyPair, TransportAlgorithm};

/// Generates the signing pair as an OpenSSH key with `ssh-key`.
///
/// OpenSSH keys carry no expiry, so `expiry_days` is only logged.
#[derive(Debug, Clone, Copy)]
pub struct NativeBackend {
    algorithm: TransportAlgorithm,
}

impl NativeBackend {
    pub fn new(algorithm: TransportAlgorithm) -> Self {
        Self { algorithm }
    }
}

#[async_trait]
impl KeyBackend for NativeBackend {
    fn name(&self) -> &'static str {
        "native"
    }

    async fn generate(
        &self,
        holder: &KeyHolder,
        key_length: u32,
        expiry_days: u32,
    ) -> Result<KeyPair, GenerationError> {
        if expiry_days > 0 {
            tracing::warn!(expiry_days, "native keys do not expire; ignoring expiry");
        }
        ssh::generate_off_thread(self.algorithm, key_length, holder.user_id()).await
    }
}
