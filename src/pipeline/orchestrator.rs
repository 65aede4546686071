//! Vote check pipeline: composes the pipeline stages behind the host hook.
//!
//! Flow for an admitted message:
//! 1. Extract the candidate id from the quoted release check command
//! 2. Resolve and probe the staging repository → `Warn` if unreachable
//! 3. Run the release check script and classify its output
//! 4. Mirror staged artifacts into the output tree
//! 5. Render the display body
//!
//! Only step 1 can fail the run; every later failure is logged and folded
//! into a degraded `PipelineResult`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::bootstrap;
use crate::config::{Patterns, VoteCheckConfig};
use crate::error::{Error, PipelineError};
use crate::hook::{Hook, HookParams};
use crate::pipeline::admission;
use crate::pipeline::artifacts;
use crate::pipeline::classify::classify;
use crate::pipeline::extract::extract_candidate;
use crate::pipeline::invoker::{ScriptInvoker, VerificationInvoker};
use crate::pipeline::probe::{HttpProbe, Reachability, RepositoryProbe, resolve_url};
use crate::pipeline::render::{BodyRenderer, renderer_for};
use crate::pipeline::types::{
    ArtifactSet, CandidateId, IncomingMessage, PipelineResult, VerificationStatus,
};

/// Release vote validation pipeline.
pub struct VoteCheckPipeline {
    config: VoteCheckConfig,
    patterns: Patterns,
    /// Absolute `output_dir`, the root attachment paths are relative to.
    output_root: PathBuf,
    http: reqwest::Client,
    probe: Arc<dyn RepositoryProbe>,
    invoker: Arc<dyn VerificationInvoker>,
    renderer: Box<dyn BodyRenderer>,
}

impl VoteCheckPipeline {
    /// Build the pipeline with its HTTP probe and script invoker.
    pub fn new(config: VoteCheckConfig) -> Result<Self, Error> {
        let patterns = Patterns::from_config(&config)?;
        let output_root = std::path::absolute(&config.output_dir)?;
        let probe = HttpProbe::new(config.probe_timeout)?;
        let invoker = ScriptInvoker::new(&config);
        let renderer = renderer_for(&config).map_err(PipelineError::from)?;

        Ok(Self {
            http: probe.client().clone(),
            probe: Arc::new(probe),
            invoker: Arc::new(invoker),
            renderer,
            config,
            patterns,
            output_root,
        })
    }

    /// Replace the repository probe.
    pub fn with_probe(mut self, probe: Arc<dyn RepositoryProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// Replace the verification invoker.
    pub fn with_invoker(mut self, invoker: Arc<dyn VerificationInvoker>) -> Self {
        self.invoker = invoker;
        self
    }

    pub fn config(&self) -> &VoteCheckConfig {
        &self.config
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Admission stage: pure, repeatable.
    pub fn should_process(&self, message: &IncomingMessage) -> bool {
        admission::admit(&self.patterns.command, message)
    }

    /// Processing stage for an admitted message.
    ///
    /// Fails only when the message carries no valid candidate id.
    pub async fn process(&self, message: &IncomingMessage) -> Result<PipelineResult, PipelineError> {
        let span = info_span!("vote_check", run_id = %Uuid::new_v4());
        self.run(message).instrument(span).await
    }

    async fn run(&self, message: &IncomingMessage) -> Result<PipelineResult, PipelineError> {
        let id = extract_candidate(&self.patterns.command, &message.full_body)?;
        debug!(candidate = %id, "Found candidate id");

        let reachability = match resolve_url(
            self.config.url_strategy,
            &self.config,
            &self.patterns,
            &id,
            &message.full_body,
        ) {
            Ok(url) => self.probe.probe(&url).await,
            Err(e) => {
                warn!(candidate = %id, error = %e, "No repository to check");
                Reachability::Unreachable {
                    diagnostic: e.to_string(),
                }
            }
        };

        if let Reachability::Unreachable { diagnostic } = reachability {
            return Ok(self.finish(
                message,
                id,
                VerificationStatus::Warn,
                diagnostic,
                ArtifactSet::default(),
            ));
        }

        let invocation = self.invoker.verify(&id).await;
        let status = classify(&invocation);
        debug!(candidate = %id, %status, "Verification classified");

        let artifacts = self.collect_artifacts(&id).await;
        Ok(self.finish(message, id, status, invocation.output, artifacts))
    }

    /// Copy staged artifacts, keeping whatever was copied before a failure.
    async fn collect_artifacts(&self, id: &CandidateId) -> ArtifactSet {
        debug!(candidate = %id, "Copying validation output");
        let source = self.config.staging_path(id);
        let target = self.config.artifact_target(id);

        match artifacts::collect(source, target).await {
            Ok(set) => set,
            Err(e) => {
                error!(candidate = %id, error = %e, copied = e.collected.len(), "Artifact copy failed");
                ArtifactSet::new(e.collected)
            }
        }
    }

    fn finish(
        &self,
        message: &IncomingMessage,
        id: CandidateId,
        status: VerificationStatus,
        raw_output: String,
        artifacts: ArtifactSet,
    ) -> PipelineResult {
        let rendered_body = self.renderer.render(message, status, &raw_output);
        info!(
            candidate = %id,
            %status,
            artifacts = artifacts.len(),
            "Vote check complete"
        );

        PipelineResult {
            candidate: Some(id),
            status,
            reason: status.reason().to_string(),
            raw_output,
            artifacts,
            rendered_body: Some(rendered_body),
            processed_at: Utc::now(),
        }
    }
}

#[async_trait]
impl Hook for VoteCheckPipeline {
    async fn on_init(&self) {
        if !self.config.import_keys {
            return;
        }
        if let Err(e) =
            bootstrap::import_keys(&self.http, &self.config.keys_url, self.config.verify_timeout)
                .await
        {
            warn!(error = %e, "Signing key import failed");
        }
    }

    fn on_admission_check(&self, message: &IncomingMessage) -> bool {
        self.should_process(message)
    }

    async fn on_before_process(&self, message: &IncomingMessage, params: &mut HookParams) {
        match self.process(message).await {
            Ok(result) => result.write_params(params, &self.output_root),
            Err(e) => error!(subject = %message.subject, error = %e, "Vote check failed"),
        }
    }
}
