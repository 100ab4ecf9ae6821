//! App-wide constants.
//!
//! Centralises the tool name, built-in defaults, config paths, environment
//! variable names, and API endpoints so no literal is repeated at call sites.

/// Display name of the tool (lowercase).
pub const APP_NAME: &str = "rune";

/// Crate version, baked in at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Compilation target triple (set by `build.rs`).
pub const TARGET: &str = env!("TARGET");

/// User-Agent sent with every outbound API request.
pub const USER_AGENT: &str = concat!("rune/", env!("CARGO_PKG_VERSION"));

/// Local config filename (e.g. `.rune.toml` in the working directory).
pub const CONFIG_FILENAME: &str = ".rune.toml";

/// Directory name under `~/.config/` for global config.
pub const CONFIG_DIR: &str = "rune";

// ── Built-in defaults ───────────────────────────────────────────────

/// Key holder name written into generated keys.
pub const DEFAULT_KEY_NAME: &str = "Rune Bot";

/// Key holder email written into generated keys.
pub const DEFAULT_KEY_EMAIL: &str = "rune-bot@example.com";

/// RSA modulus size for both the signing and the transport key.
pub const DEFAULT_KEY_LENGTH: u32 = 4096;

/// Kubernetes namespace for the generated secret.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Name of the generated Kubernetes secret.
pub const DEFAULT_SECRET_NAME: &str = "rune-keys";

/// Manifest path used when neither an output file nor a kubeconfig is given.
pub const DEFAULT_OUTPUT_FILE: &str = "./rune-secret.yaml";

/// Title of the deploy key registered on the repository.
pub const DEFAULT_DEPLOY_KEY_TITLE: &str = "Rune Deploy Key";

/// Executable used by the gpg key backend.
pub const DEFAULT_GPG_PROGRAM: &str = "gpg";

/// Used to stop the `gpg-agent` of a temporary keyring.
pub const GPGCONF_PROGRAM: &str = "gpgconf";

// ── Provider endpoints ──────────────────────────────────────────────

pub const GITHUB_API_URL: &str = "https://api.github.com";
pub const GITLAB_API_URL: &str = "https://gitlab.com/api/v4";

/// GitHub REST API version header value.
pub const GITHUB_API_VERSION: &str = "2022-11-28";

// ── Environment variable names ──────────────────────────────────────

pub const ENV_VCS_TOKEN: &str = "RUNE_VCS_TOKEN";
pub const ENV_VCS_BASE_URL: &str = "RUNE_VCS_BASE_URL";
pub const ENV_KEY_BACKEND: &str = "RUNE_KEY_BACKEND";
pub const ENV_GPG_PROGRAM: &str = "RUNE_GPG_PROGRAM";
pub const ENV_KUBE_NAMESPACE: &str = "RUNE_KUBE_NAMESPACE";
pub const ENV_PIPELINE_ENDPOINT: &str = "RUNE_PIPELINE_ENDPOINT";
pub const ENV_PIPELINE_TOKEN: &str = "RUNE_PIPELINE_TOKEN";
