//! Shared types used across all modules.
//!
//! This module defines the provisioning request, key material, repository
//! references, and the small enums the CLI and config both speak. Other
//! modules import from here rather than reaching into each other's internals.

pub mod key;
pub mod repo;
pub mod request;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

pub use key::{KeyFormat, KeyHolder, KeyMaterial, KeyPair};
pub use repo::{GitLabProject, RepoRef, RepoRefError};
pub use request::{Destination, PipelineTarget, ProvisioningRequest, RepoCreation};

/// Supported version-control hosting providers.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ProviderKind {
    #[default]
    #[value(name = "github")]
    #[serde(rename = "github")]
    #[strum(serialize = "github")]
    GitHub,
    #[value(name = "gitlab")]
    #[serde(rename = "gitlab")]
    #[strum(serialize = "gitlab")]
    GitLab,
}

impl ProviderKind {
    /// Provider-specific environment variable consulted for the access token
    /// when `RUNE_VCS_TOKEN` is not set.
    pub fn token_env_var(self) -> &'static str {
        match self {
            ProviderKind::GitHub => "GITHUB_TOKEN",
            ProviderKind::GitLab => "GITLAB_TOKEN",
        }
    }

    /// Default REST API base URL.
    pub fn default_api_url(self) -> &'static str {
        match self {
            ProviderKind::GitHub => crate::constants::GITHUB_API_URL,
            ProviderKind::GitLab => crate::constants::GITLAB_API_URL,
        }
    }

    /// Human-readable product name.
    pub fn label(self) -> &'static str {
        match self {
            ProviderKind::GitHub => "GitHub",
            ProviderKind::GitLab => "GitLab",
        }
    }
}

/// Which facility produces the signing key pair.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum KeyBackendKind {
    /// Shell out to an external `gpg` executable.
    #[default]
    Gpg,
    /// Generate an OpenSSH key pair in-process.
    Native,
}

/// Algorithm of the SSH transport key.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TransportAlgorithm {
    #[default]
    Rsa,
    Ed25519,
}

impl TransportAlgorithm {
    /// Secret field name holding the private half (`<name>.pub` holds the public half).
    pub fn field_name(self) -> &'static str {
        match self {
            TransportAlgorithm::Rsa => "id_rsa",
            TransportAlgorithm::Ed25519 => "id_ed25519",
        }
    }
}

/// The account a provider token resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub provider: ProviderKind,
    pub login: String,
}

/// Provider-assigned identifier of a registered deploy key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyRef {
    pub id: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_kind_display_and_parse() {
        assert_eq!(ProviderKind::GitHub.to_string(), "github");
        assert_eq!(ProviderKind::GitLab.to_string(), "gitlab");
        assert_eq!("GitLab".parse::<ProviderKind>().unwrap(), ProviderKind::GitLab);
        assert!("bitbucket".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn provider_kind_serde_lowercase() {
        let json = serde_json::to_string(&ProviderKind::GitLab).unwrap();
        assert_eq!(json, "\"gitlab\"");
        let parsed: ProviderKind = serde_json::from_str("\"github\"").unwrap();
        assert_eq!(parsed, ProviderKind::GitHub);
    }

    #[test]
    fn defaults_are_first_variants() {
        assert_eq!(ProviderKind::default(), ProviderKind::GitHub);
        assert_eq!(KeyBackendKind::default(), KeyBackendKind::Gpg);
        assert_eq!(TransportAlgorithm::default(), TransportAlgorithm::Rsa);
    }

    #[test]
    fn token_env_vars() {
        assert_eq!(ProviderKind::GitHub.token_env_var(), "GITHUB_TOKEN");
        assert_eq!(ProviderKind::GitLab.token_env_var(), "GITLAB_TOKEN");
    }

    #[test]
    fn transport_field_names() {
        assert_eq!(TransportAlgorithm::Rsa.field_name(), "id_rsa");
        assert_eq!(TransportAlgorithm::Ed25519.field_name(), "id_ed25519");
    }
}
