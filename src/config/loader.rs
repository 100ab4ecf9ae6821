//! Config struct and loading logic.
//!
//! Priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables
//! 3. `.rune.toml` in the working directory (or an explicit `--config` file)
//! 4. `~/.config/rune/config.toml` (global defaults)
//! 5. Built-in defaults

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::constants;
use crate::env::Env;
use crate::models::{KeyBackendKind, ProviderKind, RepoRefError, TransportAlgorithm};

/// Errors during config loading and request validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ParseFile {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("missing required option: --{0}")]
    MissingOption(&'static str),

    #[error(transparent)]
    InvalidRepoRef(#[from] RepoRefError),

    #[error("invalid value for --{option}: {reason}")]
    InvalidValue {
        option: &'static str,
        reason: String,
    },

    #[error("conflicting options: {0}")]
    Conflict(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub vcs: VcsConfig,
    pub keys: KeysConfig,
    pub kubernetes: KubernetesConfig,
    pub repository: RepositoryConfig,
    pub pipeline: PipelineConfig,
}

/// Hosting provider configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VcsConfig {
    pub provider: ProviderKind,
    pub token: Option<String>,
    pub repo: Option<String>,
    pub base_url: Option<String>,
    pub deploy_key_title: String,
    pub read_only: bool,
}

impl std::fmt::Debug for VcsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VcsConfig")
            .field("provider", &self.provider)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("repo", &self.repo)
            .field("base_url", &self.base_url)
            .field("deploy_key_title", &self.deploy_key_title)
            .field("read_only", &self.read_only)
            .finish()
    }
}

impl Default for VcsConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            token: None,
            repo: None,
            base_url: None,
            deploy_key_title: constants::DEFAULT_DEPLOY_KEY_TITLE.to_string(),
            read_only: true,
        }
    }
}

/// Key generation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeysConfig {
    pub name: String,
    pub email: String,
    pub length: u32,
    pub expiry_days: u32,
    pub backend: KeyBackendKind,
    pub gpg_program: String,
    pub transport: bool,
    pub transport_algorithm: TransportAlgorithm,
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            name: constants::DEFAULT_KEY_NAME.to_string(),
            email: constants::DEFAULT_KEY_EMAIL.to_string(),
            length: constants::DEFAULT_KEY_LENGTH,
            expiry_days: 0,
            backend: KeyBackendKind::default(),
            gpg_program: constants::DEFAULT_GPG_PROGRAM.to_string(),
            transport: true,
            transport_algorithm: TransportAlgorithm::default(),
        }
    }
}

/// Secret destination configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KubernetesConfig {
    /// Path to a kubeconfig; selects cluster submission when no output file is set.
    pub config: Option<PathBuf>,
    pub namespace: String,
    pub secret_name: String,
    pub output_file: Option<PathBuf>,
}

impl Default for KubernetesConfig {
    fn default() -> Self {
        Self {
            config: None,
            namespace: constants::DEFAULT_NAMESPACE.to_string(),
            secret_name: constants::DEFAULT_SECRET_NAME.to_string(),
            output_file: None,
        }
    }
}

/// Optional repository creation before key registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    pub create: bool,
    pub description: String,
    pub private: bool,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            create: false,
            description: String::new(),
            private: true,
        }
    }
}

/// Optional event-listener wiring.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub cluster: Option<String>,
    pub endpoint: Option<String>,
    pub token: Option<String>,
}

impl std::fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("cluster", &self.cluster)
            .field("endpoint", &self.endpoint)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Config {
    /// Load configuration with proper layering.
    ///
    /// Reads the global config, then either `explicit` (when given, it must
    /// exist) or `.rune.toml` under `work_dir`, then applies environment
    /// variable overrides.
    pub fn load(work_dir: Option<&Path>, explicit: Option<&Path>, env: &Env) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        // Layer 4: global config
        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                let global = Self::load_file(&global_path)?;
                config.merge(global);
            }
        }

        // Layer 3: explicit file or working-directory config
        if let Some(path) = explicit {
            let local = Self::load_file(path)?;
            config.merge(local);
        } else if let Some(dir) = work_dir {
            let local_path = dir.join(constants::CONFIG_FILENAME);
            if local_path.exists() {
                let local = Self::load_file(&local_path)?;
                config.merge(local);
            }
        }

        // Layer 2: environment variables
        config.apply_env_vars(env);

        Ok(config)
    }

    /// Load a config layer from a specific file.
    fn load_file(path: &Path) -> Result<ConfigLayer, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::ParseFile {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the global config file path.
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(constants::CONFIG_DIR).join("config.toml"))
    }

    /// Apply a config file layer; every key the file sets wins, even when it
    /// restores a built-in default.
    fn merge(&mut self, layer: ConfigLayer) {
        let ConfigLayer {
            vcs,
            keys,
            kubernetes,
            repository,
            pipeline,
        } = layer;

        overlay(&mut self.vcs.provider, vcs.provider);
        overlay(&mut self.vcs.token, vcs.token.map(Some));
        overlay(&mut self.vcs.repo, vcs.repo.map(Some));
        overlay(&mut self.vcs.base_url, vcs.base_url.map(Some));
        overlay(&mut self.vcs.deploy_key_title, vcs.deploy_key_title);
        overlay(&mut self.vcs.read_only, vcs.read_only);

        overlay(&mut self.keys.name, keys.name);
        overlay(&mut self.keys.email, keys.email);
        overlay(&mut self.keys.length, keys.length);
        overlay(&mut self.keys.expiry_days, keys.expiry_days);
        overlay(&mut self.keys.backend, keys.backend);
        overlay(&mut self.keys.gpg_program, keys.gpg_program);
        overlay(&mut self.keys.transport, keys.transport);
        overlay(&mut self.keys.transport_algorithm, keys.transport_algorithm);

        overlay(&mut self.kubernetes.config, kubernetes.config.map(Some));
        overlay(&mut self.kubernetes.namespace, kubernetes.namespace);
        overlay(&mut self.kubernetes.secret_name, kubernetes.secret_name);
        overlay(&mut self.kubernetes.output_file, kubernetes.output_file.map(Some));

        overlay(&mut self.repository.create, repository.create);
        overlay(&mut self.repository.description, repository.description);
        overlay(&mut self.repository.private, repository.private);

        overlay(&mut self.pipeline.cluster, pipeline.cluster.map(Some));
        overlay(&mut self.pipeline.endpoint, pipeline.endpoint.map(Some));
        overlay(&mut self.pipeline.token, pipeline.token.map(Some));
    }

    /// Apply environment variable overrides.
    fn apply_env_vars(&mut self, env: &Env) {
        // Only the provider-neutral variable here; see `resolve_provider_token`.
        if let Some(val) = env.non_empty(constants::ENV_VCS_TOKEN) {
            self.vcs.token = Some(val);
        }

        if let Some(val) = env.non_empty(constants::ENV_VCS_BASE_URL) {
            self.vcs.base_url = Some(val);
        }
        if let Some(val) = env.non_empty(constants::ENV_KEY_BACKEND) {
            match val.parse::<KeyBackendKind>() {
                Ok(backend) => self.keys.backend = backend,
                Err(_) => tracing::warn!(
                    "ignoring invalid {} value: {val}",
                    constants::ENV_KEY_BACKEND
                ),
            }
        }
        if let Some(val) = env.non_empty(constants::ENV_GPG_PROGRAM) {
            self.keys.gpg_program = val;
        }
        if let Some(val) = env.non_empty(constants::ENV_KUBE_NAMESPACE) {
            self.kubernetes.namespace = val;
        }
        if let Some(val) = env.non_empty(constants::ENV_PIPELINE_ENDPOINT) {
            self.pipeline.endpoint = Some(val);
        }
        if let Some(val) = env.non_empty(constants::ENV_PIPELINE_TOKEN) {
            self.pipeline.token = Some(val);
        }
    }

    /// Fall back to the provider's own token variable (`GITHUB_TOKEN` or
    /// `GITLAB_TOKEN`) when no explicit token was given.
    ///
    /// Call once the provider is final, i.e. after CLI flags were applied.
    pub fn resolve_provider_token(&mut self, env: &Env) {
        if self.vcs.token.is_none() {
            self.vcs.token = env.non_empty(self.vcs.provider.token_env_var());
        }
    }
}

fn overlay<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

/// One config file as written: `None` for every key it leaves out.
#[derive(Default, Deserialize)]
#[serde(default)]
struct ConfigLayer {
    vcs: VcsLayer,
    keys: KeysLayer,
    kubernetes: KubernetesLayer,
    repository: RepositoryLayer,
    pipeline: PipelineLayer,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct VcsLayer {
    provider: Option<ProviderKind>,
    token: Option<String>,
    repo: Option<String>,
    base_url: Option<String>,
    deploy_key_title: Option<String>,
    read_only: Option<bool>,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct KeysLayer {
    name: Option<String>,
    email: Option<String>,
    length: Option<u32>,
    expiry_days: Option<u32>,
    backend: Option<KeyBackendKind>,
    gpg_program: Option<String>,
    transport: Option<bool>,
    transport_algorithm: Option<TransportAlgorithm>,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct KubernetesLayer {
    config: Option<PathBuf>,
    namespace: Option<String>,
    secret_name: Option<String>,
    output_file: Option<PathBuf>,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct RepositoryLayer {
    create: Option<bool>,
    description: Option<String>,
    private: Option<bool>,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct PipelineLayer {
    cluster: Option<String>,
    endpoint: Option<String>,
    token: Option<String>,
}
