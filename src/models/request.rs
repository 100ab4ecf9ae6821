//! The validated, immutable input of one bootstrap run.

use std::fmt;
use std::path::PathBuf;

use crate::config::{Config, ConfigError};
use crate::constants;

use super::{KeyBackendKind, KeyHolder, ProviderKind, RepoRef, TransportAlgorithm};

/// Accepted signing key sizes for the gpg backend.
const GPG_KEY_LENGTHS: std::ops::RangeInclusive<u32> = 1024..=4096;

/// Smallest RSA modulus accepted for an SSH key.
const MIN_SSH_RSA_BITS: u32 = 2048;

/// Where the secret record ends up. Exactly one per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Serialize a manifest to this path.
    File(PathBuf),
    /// Submit to the cluster described by this kubeconfig.
    Cluster(PathBuf),
}

impl Destination {
    /// Select the destination, file first.
    ///
    /// An explicit output file always wins. Without one, a kubeconfig selects
    /// the cluster. With neither, the default manifest path is used and the
    /// second tuple element is `true`.
    pub fn resolve(output_file: Option<PathBuf>, kube_config: Option<PathBuf>) -> (Self, bool) {
        match (output_file, kube_config) {
            (Some(path), _) => (Destination::File(path), false),
            (None, Some(kubeconfig)) => (Destination::Cluster(kubeconfig), false),
            (None, None) => (
                Destination::File(PathBuf::from(constants::DEFAULT_OUTPUT_FILE)),
                true,
            ),
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::File(path) => write!(f, "file {}", path.display()),
            Destination::Cluster(kubeconfig) => {
                write!(f, "cluster (kubeconfig {})", kubeconfig.display())
            }
        }
    }
}

/// Parameters for creating the repository before registering the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoCreation {
    pub description: String,
    pub private: bool,
}

/// Event-listener target for the optional wire-up step.
#[derive(Clone, PartialEq, Eq)]
pub struct PipelineTarget {
    pub cluster: String,
    pub endpoint: String,
    pub token: Option<String>,
}

impl fmt::Debug for PipelineTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineTarget")
            .field("cluster", &self.cluster)
            .field("endpoint", &self.endpoint)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Everything one bootstrap run needs, validated up front.
#[derive(Clone)]
pub struct ProvisioningRequest {
    pub provider: ProviderKind,
    pub token: String,
    pub repo: RepoRef,
    pub api_base_url: String,
    pub holder: KeyHolder,
    pub key_length: u32,
    pub expiry_days: u32,
    pub backend: KeyBackendKind,
    pub gpg_program: String,
    /// Algorithm of every OpenSSH key the run produces.
    pub ssh_algorithm: TransportAlgorithm,
    /// `None` when no separate SSH transport key is generated.
    pub transport: Option<TransportAlgorithm>,
    pub secret_name: String,
    pub namespace: String,
    pub destination: Destination,
    /// Set when the default manifest path was substituted.
    pub default_destination: bool,
    pub deploy_key_title: String,
    pub read_only: bool,
    pub create_repo: Option<RepoCreation>,
    pub pipeline: Option<PipelineTarget>,
}

impl fmt::Debug for ProvisioningRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvisioningRequest")
            .field("provider", &self.provider)
            .field("token", &"[REDACTED]")
            .field("repo", &self.repo)
            .field("api_base_url", &self.api_base_url)
            .field("holder", &self.holder)
            .field("key_length", &self.key_length)
            .field("expiry_days", &self.expiry_days)
            .field("backend", &self.backend)
            .field("ssh_algorithm", &self.ssh_algorithm)
            .field("transport", &self.transport)
            .field("secret_name", &self.secret_name)
            .field("namespace", &self.namespace)
            .field("destination", &self.destination)
            .field("deploy_key_title", &self.deploy_key_title)
            .field("read_only", &self.read_only)
            .field("create_repo", &self.create_repo)
            .field("pipeline", &self.pipeline)
            .finish()
    }
}

impl ProvisioningRequest {
    /// Validate a fully layered config into a request.
    ///
    /// Performs no I/O: a malformed request is rejected before any network
    /// call or key generation happens.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let provider = config.vcs.provider;

        let token = config
            .vcs
            .token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::MissingOption("vcs-token"))?
            .to_string();

        let raw_repo = config
            .vcs
            .repo
            .as_deref()
            .filter(|r| !r.trim().is_empty())
            .ok_or(ConfigError::MissingOption("vcs-repo"))?;
        let repo = RepoRef::parse(provider, raw_repo)?;

        let holder = KeyHolder {
            name: single_line(&config.keys.name, "gpg-name")?,
            email: single_line(&config.keys.email, "gpg-email")?,
        };
        if !holder.email.contains('@') {
            return Err(ConfigError::InvalidValue {
                option: "gpg-email",
                reason: format!("'{}' is not an email address", holder.email),
            });
        }

        let key_length = config.keys.length;
        let backend = config.keys.backend;
        if backend == KeyBackendKind::Gpg && !GPG_KEY_LENGTHS.contains(&key_length) {
            return Err(ConfigError::InvalidValue {
                option: "key-length",
                reason: format!(
                    "{key_length} is outside {}..={}",
                    GPG_KEY_LENGTHS.start(),
                    GPG_KEY_LENGTHS.end()
                ),
            });
        }

        // The native backend's signing pair is already an OpenSSH key, so a
        // separate transport pair would duplicate it.
        let transport = match (backend, config.keys.transport) {
            (KeyBackendKind::Gpg, true) => Some(config.keys.transport_algorithm),
            (KeyBackendKind::Gpg, false) => {
                return Err(ConfigError::Conflict(
                    "the gpg backend produces no SSH key; a transport key is required \
                     for the deploy key (drop --no-transport-key or use --key-backend native)"
                        .to_string(),
                ));
            }
            (KeyBackendKind::Native, _) => None,
        };

        let ssh_algorithm = transport.unwrap_or(config.keys.transport_algorithm);
        if ssh_algorithm == TransportAlgorithm::Rsa && key_length < MIN_SSH_RSA_BITS {
            return Err(ConfigError::InvalidValue {
                option: "key-length",
                reason: format!("RSA SSH keys need at least {MIN_SSH_RSA_BITS} bits"),
            });
        }

        let (destination, default_destination) = Destination::resolve(
            config.kubernetes.output_file.clone(),
            config.kubernetes.config.clone(),
        );

        let create_repo = config.repository.create.then(|| RepoCreation {
            description: config.repository.description.clone(),
            private: config.repository.private,
        });
        if create_repo.is_some() && matches!(repo, RepoRef::GitLab(super::GitLabProject::Id(_))) {
            return Err(ConfigError::Conflict(
                "--create-repo needs a GitLab project path, not a numeric id".to_string(),
            ));
        }

        let pipeline = match config.pipeline.cluster.as_deref().map(str::trim) {
            Some(cluster) if !cluster.is_empty() => {
                let endpoint = config
                    .pipeline
                    .endpoint
                    .as_deref()
                    .map(str::trim)
                    .filter(|e| !e.is_empty())
                    .ok_or(ConfigError::MissingOption("pipeline-endpoint"))?;
                Some(PipelineTarget {
                    cluster: cluster.to_string(),
                    endpoint: endpoint.trim_end_matches('/').to_string(),
                    token: config.pipeline.token.clone(),
                })
            }
            _ => None,
        };

        Ok(Self {
            provider,
            token,
            repo,
            api_base_url: config
                .vcs
                .base_url
                .clone()
                .unwrap_or_else(|| provider.default_api_url().to_string())
                .trim_end_matches('/')
                .to_string(),
            holder,
            key_length,
            expiry_days: config.keys.expiry_days,
            backend,
            gpg_program: config.keys.gpg_program.clone(),
            ssh_algorithm,
            transport,
            secret_name: non_blank(&config.kubernetes.secret_name, "secret-name")?,
            namespace: non_blank(&config.kubernetes.namespace, "kube-namespace")?,
            destination,
            default_destination,
            deploy_key_title: non_blank(&config.vcs.deploy_key_title, "deploy-key-title")?,
            read_only: config.vcs.read_only,
            create_repo,
            pipeline,
        })
    }
}

fn non_blank(value: &str, option: &'static str) -> Result<String, ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ConfigError::MissingOption(option))
    } else {
        Ok(trimmed.to_string())
    }
}

/// Holder fields end up as lines of a gpg parameter script.
fn single_line(value: &str, option: &'static str) -> Result<String, ConfigError> {
    let value = non_blank(value, option)?;
    if value.chars().any(char::is_control) {
        return Err(ConfigError::InvalidValue {
            option,
            reason: "control characters are not allowed".to_string(),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GitLabProject;
    use pretty_assertions::assert_eq;

    fn github_config(repo: &str) -> Config {
        let mut config = Config::default();
        config.vcs.token = Some("ghp_test".into());
        config.vcs.repo = Some(repo.into());
        config
    }

    #[test]
    fn defaults_for_acme_widgets() {
        let request = ProvisioningRequest::from_config(&github_config("acme/widgets")).unwrap();
        assert_eq!(request.provider, ProviderKind::GitHub);
        assert_eq!(
            request.repo,
            RepoRef::GitHub {
                owner: "acme".into(),
                name: "widgets".into()
            }
        );
        assert_eq!(request.api_base_url, "https://api.github.com");
        assert_eq!(request.key_length, 4096);
        assert_eq!(request.expiry_days, 0);
        assert_eq!(request.namespace, "default");
        assert_eq!(request.secret_name, "rune-keys");
        assert_eq!(
            request.destination,
            Destination::File(PathBuf::from("./rune-secret.yaml"))
        );
        assert!(request.default_destination);
        assert_eq!(request.deploy_key_title, "Rune Deploy Key");
        assert!(request.read_only);
        assert_eq!(request.transport, Some(TransportAlgorithm::Rsa));
        assert!(request.create_repo.is_none());
        assert!(request.pipeline.is_none());
    }

    #[test]
    fn repo_without_slash_is_config_error() {
        let err = ProvisioningRequest::from_config(&github_config("widgets")).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRepoRef(_)));
    }

    #[test]
    fn missing_token_is_config_error() {
        let mut config = github_config("acme/widgets");
        config.vcs.token = Some("   ".into());
        let err = ProvisioningRequest::from_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::MissingOption("vcs-token")));
    }

    #[test]
    fn missing_repo_is_config_error() {
        let mut config = github_config("acme/widgets");
        config.vcs.repo = None;
        let err = ProvisioningRequest::from_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::MissingOption("vcs-repo")));
    }

    #[test]
    fn destination_is_file_first() {
        let out = Some(PathBuf::from("out.yaml"));
        let kube = Some(PathBuf::from("/home/me/.kube/config"));

        assert_eq!(
            Destination::resolve(out.clone(), kube.clone()),
            (Destination::File(PathBuf::from("out.yaml")), false)
        );
        assert_eq!(
            Destination::resolve(None, kube),
            (
                Destination::Cluster(PathBuf::from("/home/me/.kube/config")),
                false
            )
        );
        assert_eq!(
            Destination::resolve(out, None),
            (Destination::File(PathBuf::from("out.yaml")), false)
        );
        assert_eq!(
            Destination::resolve(None, None),
            (Destination::File(PathBuf::from("./rune-secret.yaml")), true)
        );
    }

    #[test]
    fn gpg_key_length_bounds() {
        let mut config = github_config("acme/widgets");
        config.keys.length = 8192;
        let err = ProvisioningRequest::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("key-length"));
    }

    #[test]
    fn small_rsa_transport_rejected() {
        let mut config = github_config("acme/widgets");
        config.keys.length = 1024;
        let err = ProvisioningRequest::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("2048"));
    }

    #[test]
    fn small_key_ok_with_ed25519_transport() {
        let mut config = github_config("acme/widgets");
        config.keys.length = 1024;
        config.keys.transport_algorithm = TransportAlgorithm::Ed25519;
        let request = ProvisioningRequest::from_config(&config).unwrap();
        assert_eq!(request.transport, Some(TransportAlgorithm::Ed25519));
    }

    #[test]
    fn gpg_without_transport_conflicts() {
        let mut config = github_config("acme/widgets");
        config.keys.transport = false;
        let err = ProvisioningRequest::from_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::Conflict(_)));
    }

    #[test]
    fn native_backend_skips_transport() {
        let mut config = github_config("acme/widgets");
        config.keys.backend = KeyBackendKind::Native;
        let request = ProvisioningRequest::from_config(&config).unwrap();
        assert!(request.transport.is_none());
        assert_eq!(request.ssh_algorithm, TransportAlgorithm::Rsa);
    }

    #[test]
    fn gitlab_path_and_base_url_trimmed() {
        let mut config = Config::default();
        config.vcs.provider = ProviderKind::GitLab;
        config.vcs.token = Some("glpat".into());
        config.vcs.repo = Some("group/project".into());
        config.vcs.base_url = Some("https://gitlab.internal/api/v4/".into());
        let request = ProvisioningRequest::from_config(&config).unwrap();
        assert_eq!(
            request.repo,
            RepoRef::GitLab(GitLabProject::Path("group/project".into()))
        );
        assert_eq!(request.api_base_url, "https://gitlab.internal/api/v4");
    }

    #[test]
    fn create_repo_rejects_gitlab_numeric_id() {
        let mut config = Config::default();
        config.vcs.provider = ProviderKind::GitLab;
        config.vcs.token = Some("glpat".into());
        config.vcs.repo = Some("42".into());
        config.repository.create = true;
        let err = ProvisioningRequest::from_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::Conflict(_)));
    }

    #[test]
    fn pipeline_requires_endpoint() {
        let mut config = github_config("acme/widgets");
        config.pipeline.cluster = Some("prod".into());
        let err = ProvisioningRequest::from_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::MissingOption("pipeline-endpoint")));

        config.pipeline.endpoint = Some("https://hooks.example.com/".into());
        let request = ProvisioningRequest::from_config(&config).unwrap();
        let target = request.pipeline.unwrap();
        assert_eq!(target.cluster, "prod");
        assert_eq!(target.endpoint, "https://hooks.example.com");
    }

    #[test]
    fn invalid_email_rejected() {
        let mut config = github_config("acme/widgets");
        config.keys.email = "not-an-email".into();
        let err = ProvisioningRequest::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("gpg-email"));
    }

    #[test]
    fn holder_fields_must_be_single_line() {
        let mut config = github_config("acme/widgets");
        config.keys.name = "Rune Bot\n%no-protection\nKey-Type: DSA".into();
        let err = ProvisioningRequest::from_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { option: "gpg-name", .. }));

        let mut config = github_config("acme/widgets");
        config.keys.email = "bot@example.com\r\n%commit".into();
        let err = ProvisioningRequest::from_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { option: "gpg-email", .. }));
    }

    #[test]
    fn debug_redacts_token() {
        let request = ProvisioningRequest::from_config(&github_config("acme/widgets")).unwrap();
        let rendered = format!("{request:?}");
        assert!(!rendered.contains("ghp_test"));
    }
}
