//! Clap argument types and their mapping onto the layered config.

use clap::{ArgAction, Parser};
use std::path::PathBuf;

use rune::config::Config;
use rune::models::{KeyBackendKind, ProviderKind, TransportAlgorithm};

/// Bootstrap deploy keys and Kubernetes secrets for CI/CD pipelines.
#[derive(Parser, Debug)]
#[command(name = "rune", version = rune::constants::VERSION)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). `RUST_LOG` wins.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Generate keys, store them as a secret, and register a deploy key.
    Bootstrap(Box<BootstrapArgs>),

    /// Print version and build information.
    Version,
}

/// Arguments for the `bootstrap` subcommand.
///
/// Every option is optional here; defaults come from the config layers and
/// required values are checked when the request is built.
#[derive(Parser, Debug, Default)]
pub struct BootstrapArgs {
    // --- Provider ---
    /// Hosting provider.
    #[arg(long, value_enum)]
    pub vcs_type: Option<ProviderKind>,

    /// Access token (default: $RUNE_VCS_TOKEN, then $GITHUB_TOKEN or $GITLAB_TOKEN).
    #[arg(long)]
    pub vcs_token: Option<String>,

    /// Repository: `owner/repo` on GitHub, project id or `group/project` on GitLab.
    #[arg(long)]
    pub vcs_repo: Option<String>,

    /// API base URL for GitHub Enterprise or self-managed GitLab.
    #[arg(long)]
    pub vcs_base_url: Option<String>,

    // --- Keys ---
    /// Name written into the signing key.
    #[arg(long)]
    pub gpg_name: Option<String>,

    /// Email written into the signing key.
    #[arg(long)]
    pub gpg_email: Option<String>,

    /// RSA key length in bits [default: 4096].
    #[arg(long)]
    pub key_length: Option<u32>,

    /// Days until the signing key expires, 0 for never [default: 0].
    #[arg(long)]
    pub gpg_expiry_days: Option<u32>,

    /// Signing key backend [default: gpg].
    #[arg(long, value_enum)]
    pub key_backend: Option<KeyBackendKind>,

    /// Algorithm of the SSH key used as the deploy key [default: rsa].
    #[arg(long, value_enum)]
    pub transport_algorithm: Option<TransportAlgorithm>,

    /// Do not generate a separate SSH transport key (native backend only).
    #[arg(long, default_value_t = false)]
    pub no_transport_key: bool,

    // --- Destination ---
    /// Create the secret in the cluster described by this kubeconfig.
    #[arg(long)]
    pub kube_config: Option<PathBuf>,

    /// Namespace of the secret [default: default].
    #[arg(long)]
    pub kube_namespace: Option<String>,

    /// Name of the secret [default: rune-keys].
    #[arg(long)]
    pub secret_name: Option<String>,

    /// Write the secret manifest to this file (takes precedence over --kube-config).
    #[arg(long)]
    pub output_file: Option<PathBuf>,

    // --- Deploy key ---
    /// Title of the deploy key [default: Rune Deploy Key].
    #[arg(long)]
    pub deploy_key_title: Option<String>,

    /// Grant the deploy key write access.
    #[arg(long, default_value_t = false)]
    pub read_write: bool,

    // --- Repository creation ---
    /// Create the repository before registering the deploy key.
    #[arg(long, default_value_t = false)]
    pub create_repo: bool,

    /// Description of the created repository.
    #[arg(long, requires = "create_repo")]
    pub repo_description: Option<String>,

    /// Make the created repository public.
    #[arg(long, default_value_t = false, requires = "create_repo")]
    pub public: bool,

    // --- Pipeline ---
    /// Register a push listener for this cluster.
    #[arg(long)]
    pub pipeline_cluster: Option<String>,

    /// Base URL of the pipeline listener service.
    #[arg(long, requires = "pipeline_cluster")]
    pub pipeline_endpoint: Option<String>,

    // --- Config ---
    /// Config file to use instead of ./.rune.toml.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl BootstrapArgs {
    /// Overlay the flags that were given onto `config`.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(provider) = self.vcs_type {
            config.vcs.provider = provider;
        }
        if let Some(ref token) = self.vcs_token {
            config.vcs.token = Some(token.clone());
        }
        if let Some(ref repo) = self.vcs_repo {
            config.vcs.repo = Some(repo.clone());
        }
        if let Some(ref url) = self.vcs_base_url {
            config.vcs.base_url = Some(url.clone());
        }
        if let Some(ref title) = self.deploy_key_title {
            config.vcs.deploy_key_title = title.clone();
        }
        if self.read_write {
            config.vcs.read_only = false;
        }

        if let Some(ref name) = self.gpg_name {
            config.keys.name = name.clone();
        }
        if let Some(ref email) = self.gpg_email {
            config.keys.email = email.clone();
        }
        if let Some(length) = self.key_length {
            config.keys.length = length;
        }
        if let Some(days) = self.gpg_expiry_days {
            config.keys.expiry_days = days;
        }
        if let Some(backend) = self.key_backend {
            config.keys.backend = backend;
        }
        if let Some(algorithm) = self.transport_algorithm {
            config.keys.transport_algorithm = algorithm;
        }
        if self.no_transport_key {
            config.keys.transport = false;
        }

        if let Some(ref path) = self.kube_config {
            config.kubernetes.config = Some(path.clone());
        }
        if let Some(ref namespace) = self.kube_namespace {
            config.kubernetes.namespace = namespace.clone();
        }
        if let Some(ref name) = self.secret_name {
            config.kubernetes.secret_name = name.clone();
        }
        if let Some(ref path) = self.output_file {
            config.kubernetes.output_file = Some(path.clone());
        }

        if self.create_repo {
            config.repository.create = true;
        }
        if let Some(ref description) = self.repo_description {
            config.repository.description = description.clone();
        }
        if self.public {
            config.repository.private = false;
        }

        if let Some(ref cluster) = self.pipeline_cluster {
            config.pipeline.cluster = Some(cluster.clone());
        }
        if let Some(ref endpoint) = self.pipeline_endpoint {
            config.pipeline.endpoint = Some(endpoint.clone());
        }
    }
}
