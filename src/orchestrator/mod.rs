//! Bootstrap orchestrator: one linear pass through the provisioning steps.
//!
//! ```text
//! Idle → Authenticated → [RepositoryCreated] → KeysGenerated
//!      → SecretPersisted → DeployKeyRegistered → [PipelineWired] → Done
//! ```
//!
//! Every step is awaited before the next one starts, and the first failure
//! ends the run. Nothing already done is undone: a secret persisted before a
//! failed deploy-key registration stays where it was written.

use std::fmt;

use thiserror::Error;

use crate::keys::{self, GenerationError, KeyBackend};
use crate::models::{Identity, KeyMaterial, KeyRef, ProvisioningRequest, RepoRef};
use crate::pipeline::{PipelineWirer, SecretReference, WireUpError};
use crate::secret::{PersistError, SecretRecord, SecretSink};
use crate::vcs::{AuthError, CreationError, RegistrationError, VcsClient};

/// Where a run has got to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Authenticated,
    RepositoryCreated,
    KeysGenerated,
    SecretPersisted,
    DeployKeyRegistered,
    PipelineWired,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Idle => "idle",
            Stage::Authenticated => "authenticated",
            Stage::RepositoryCreated => "repository created",
            Stage::KeysGenerated => "keys generated",
            Stage::SecretPersisted => "secret persisted",
            Stage::DeployKeyRegistered => "deploy key registered",
            Stage::PipelineWired => "pipeline wired",
            Stage::Done => "done",
        })
    }
}

/// One unit of work in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Authenticate,
    CreateRepository,
    GenerateKeys,
    PersistSecret,
    RegisterDeployKey,
    WirePipeline,
}

impl Step {
    pub fn label(self) -> &'static str {
        match self {
            Step::Authenticate => "authenticate",
            Step::CreateRepository => "create repository",
            Step::GenerateKeys => "generate keys",
            Step::PersistSecret => "persist secret",
            Step::RegisterDeployKey => "register deploy key",
            Step::WirePipeline => "wire pipeline",
        }
    }

    /// Stage entered when this step succeeds.
    fn reaches(self) -> Stage {
        match self {
            Step::Authenticate => Stage::Authenticated,
            Step::CreateRepository => Stage::RepositoryCreated,
            Step::GenerateKeys => Stage::KeysGenerated,
            Step::PersistSecret => Stage::SecretPersisted,
            Step::RegisterDeployKey => Stage::DeployKeyRegistered,
            Step::WirePipeline => Stage::PipelineWired,
        }
    }
}

/// The failure of whichever step stopped the run.
#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Creation(#[from] CreationError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Persist(#[from] PersistError),

    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error(transparent)]
    WireUp(#[from] WireUpError),
}

/// A failed run, naming the numbered step that failed.
#[derive(Error, Debug)]
#[error("step {step}/{total_steps} ({}) failed", .failed.label())]
pub struct BootstrapFailure {
    pub step: usize,
    pub total_steps: usize,
    pub failed: Step,
    /// Last stage completed before the failure.
    pub stage_reached: Stage,
    #[source]
    pub error: BootstrapError,
}

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct BootstrapReport {
    pub identity: Identity,
    pub repo: RepoRef,
    pub repository_created: bool,
    pub deploy_key: KeyRef,
    pub destination: String,
    pub secret_fields: Vec<String>,
    pub pipeline_wired: bool,
}

/// Step counter and stage for one run.
struct Progress {
    steps: Vec<Step>,
    index: usize,
    stage: Stage,
}

impl Progress {
    fn new(steps: Vec<Step>) -> Self {
        Self {
            steps,
            index: 0,
            stage: Stage::Idle,
        }
    }

    fn current(&self) -> Step {
        self.steps[self.index]
    }

    fn begin(&self) {
        tracing::info!(
            step = self.index + 1,
            total = self.steps.len(),
            "starting {}",
            self.current().label()
        );
    }

    fn complete(&mut self) {
        let next = self.current().reaches();
        tracing::info!(from = %self.stage, to = %next, "stage transition");
        self.stage = next;
        self.index += 1;
    }

    fn fail(&self, error: impl Into<BootstrapError>) -> BootstrapFailure {
        let failure = BootstrapFailure {
            step: self.index + 1,
            total_steps: self.steps.len(),
            failed: self.current(),
            stage_reached: self.stage,
            error: error.into(),
        };
        tracing::error!(stage = %self.stage, "{failure}: {}", failure.error);
        failure
    }
}

/// Sequences the provisioning steps over the injected capabilities.
pub struct Bootstrapper<'a> {
    vcs: &'a dyn VcsClient,
    keys: &'a dyn KeyBackend,
    sink: &'a dyn SecretSink,
    wirer: Option<&'a dyn PipelineWirer>,
}

impl<'a> Bootstrapper<'a> {
    pub fn new(vcs: &'a dyn VcsClient, keys: &'a dyn KeyBackend, sink: &'a dyn SecretSink) -> Self {
        Self {
            vcs,
            keys,
            sink,
            wirer: None,
        }
    }

    pub fn with_wirer(mut self, wirer: &'a dyn PipelineWirer) -> Self {
        self.wirer = Some(wirer);
        self
    }

    /// Steps a run of `request` will take, in order.
    pub fn plan(&self, request: &ProvisioningRequest) -> Vec<Step> {
        let mut steps = vec![Step::Authenticate];
        if request.create_repo.is_some() {
            steps.push(Step::CreateRepository);
        }
        steps.extend([Step::GenerateKeys, Step::PersistSecret, Step::RegisterDeployKey]);
        if request.pipeline.is_some() && self.wirer.is_some() {
            steps.push(Step::WirePipeline);
        }
        steps
    }

    pub async fn run(&self, request: &ProvisioningRequest) -> Result<BootstrapReport, BootstrapFailure> {
        let mut progress = Progress::new(self.plan(request));
        if request.pipeline.is_some() && self.wirer.is_none() {
            tracing::warn!("pipeline target configured without a wirer; skipping wire-up");
        }

        progress.begin();
        let identity = self.vcs.authenticate().await.map_err(|e| progress.fail(e))?;
        progress.complete();

        let mut repo = request.repo.clone();
        if let Some(creation) = &request.create_repo {
            progress.begin();
            repo = self
                .vcs
                .create_repository(&repo, &identity.login, &creation.description, creation.private)
                .await
                .map_err(|e| progress.fail(e))?;
            progress.complete();
        }

        progress.begin();
        let material = self.generate(request).await.map_err(|e| progress.fail(e))?;
        let deploy_key = material
            .deploy_public_key()
            .ok_or_else(|| progress.fail(GenerationError::NoDeployableKey))?;
        progress.complete();

        progress.begin();
        let record = SecretRecord::from_material(&request.secret_name, &request.namespace, &material);
        self.sink.persist(&record).await.map_err(|e| progress.fail(e))?;
        progress.complete();

        progress.begin();
        let key_ref = self
            .vcs
            .add_deploy_key(&repo, &request.deploy_key_title, deploy_key, request.read_only)
            .await
            .map_err(|e| progress.fail(e))?;
        progress.complete();

        let mut pipeline_wired = false;
        if let (Some(target), Some(wirer)) = (&request.pipeline, self.wirer) {
            progress.begin();
            let clone_url = self.vcs.clone_url(&repo).await.map_err(|e| progress.fail(e))?;
            let secret = SecretReference {
                name: record.name.clone(),
                namespace: record.namespace.clone(),
            };
            wirer
                .configure(&target.cluster, &clone_url, &secret)
                .await
                .map_err(|e| progress.fail(e))?;
            progress.complete();
            pipeline_wired = true;
        }

        tracing::info!(from = %progress.stage, to = %Stage::Done, "stage transition");
        Ok(BootstrapReport {
            identity,
            repo,
            repository_created: request.create_repo.is_some(),
            deploy_key: key_ref,
            destination: self.sink.describe(),
            secret_fields: record.field_names().map(str::to_string).collect(),
            pipeline_wired,
        })
    }

    async fn generate(&self, request: &ProvisioningRequest) -> Result<KeyMaterial, GenerationError> {
        tracing::debug!(backend = self.keys.name(), length = request.key_length, "generating signing key");
        let signing = self
            .keys
            .generate(&request.holder, request.key_length, request.expiry_days)
            .await?;

        let transport = match request.transport {
            Some(algorithm) => {
                let pair =
                    keys::ssh::generate_off_thread(algorithm, request.key_length, request.holder.email.clone())
                        .await?;
                tracing::info!(%algorithm, "generated SSH transport key");
                Some(pair)
            }
            None => None,
        };

        Ok(KeyMaterial { signing, transport })
    }
}
