//! The generation state machine.
//!
//! Runs a pending job end to end: claim checks, catalog resolution,
//! premium and rate gates, atomic credit deduction, provider dispatch,
//! result mirroring, and terminal status writes. Every failure after
//! the deduction triggers a compensating refund before the job is
//! marked failed; the caller always sees the proximate failure, never
//! the refund's outcome.

use std::sync::Arc;

use artio_core::catalog::{find_model, DEFAULT_MODEL};
use artio_core::error::CoreError;
use artio_core::generation::{validate_request, OutputFormat, DEFAULT_ASPECT_RATIO};
use artio_core::types::{JobId, UserId};
use artio_providers::{ImageProvider, ProviderImage, ProviderRequest, TaskSink};
use artio_store::ledger::refund_with_retry;
use async_trait::async_trait;
use artio_store::{
    AuthGateway, CreditLedger, DeductOutcome, JobStatus, JobStore, JobUpdate, MirrorSource,
    RateDecision, RateLimiter, ResultMirror,
};

use crate::config::GenerationSettings;

/// Appended to the stored error message when a refund exhausted all
/// attempts, so operators can find jobs needing ledger reconciliation.
pub const REFUND_FAILED_MARKER: &str = "[REFUND_FAILED: manual intervention required]";

/// Writes the upstream task handle to the job row the moment the
/// asynchronous provider accepts the task, so the handle survives a
/// crash during the poll phase.
struct PersistTaskId<'a> {
    jobs: &'a dyn JobStore,
    job_id: JobId,
}

#[async_trait]
impl TaskSink for PersistTaskId<'_> {
    async fn task_accepted(&self, task_id: &str) {
        let update = JobUpdate {
            provider_task_id: Some(Some(task_id.to_string())),
            ..Default::default()
        };
        // Generation can still succeed without this write; the
        // terminal update records the handle again.
        if let Err(e) = self.jobs.update(self.job_id, update).await {
            tracing::warn!(job_id = %self.job_id, error = %e, "Failed to record provider task id");
        }
    }
}

/// Validated, defaulted inputs for one orchestrator run.
#[derive(Debug, Clone)]
pub struct GenerateParams {
    pub job_id: JobId,
    pub prompt: String,
    pub model: Option<String>,
    pub aspect_ratio: Option<String>,
    pub image_count: Option<u32>,
    pub output_format: Option<String>,
    pub image_inputs: Vec<String>,
}

/// Drives one generation job from `pending` to a terminal state.
pub struct Orchestrator {
    jobs: Arc<dyn JobStore>,
    ledger: Arc<dyn CreditLedger>,
    auth: Arc<dyn AuthGateway>,
    limiter: Arc<dyn RateLimiter>,
    provider: Arc<dyn ImageProvider>,
    mirror: ResultMirror,
    settings: GenerationSettings,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        jobs: Arc<dyn JobStore>,
        ledger: Arc<dyn CreditLedger>,
        auth: Arc<dyn AuthGateway>,
        limiter: Arc<dyn RateLimiter>,
        provider: Arc<dyn ImageProvider>,
        mirror: ResultMirror,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            jobs,
            ledger,
            auth,
            limiter,
            provider,
            mirror,
            settings,
        }
    }

    /// Execute the full flow for `params.job_id` on behalf of `user_id`.
    ///
    /// Returns the durable storage paths of the mirrored results.
    pub async fn execute(
        &self,
        user_id: UserId,
        params: GenerateParams,
    ) -> Result<Vec<String>, CoreError> {
        let job_id = params.job_id;

        // Claim checks come before anything that costs the user money.
        let job = self
            .jobs
            .fetch(job_id)
            .await
            .map_err(|e| CoreError::Internal(format!("Job lookup failed: {e}")))?
            .ok_or(CoreError::NotFound {
                entity: "Job",
                id: job_id,
            })?;

        if job.user_id != user_id {
            return Err(CoreError::Forbidden(
                "Job does not belong to the authenticated user".into(),
            ));
        }

        if job.status != JobStatus::Pending {
            let status = match job.status {
                JobStatus::Pending => "pending",
                JobStatus::Processing => "processing",
                JobStatus::Completed => "completed",
                JobStatus::Failed => "failed",
            };
            return Err(CoreError::Conflict(format!(
                "Job is not pending (status: {status})"
            )));
        }

        let image_count = params
            .image_count
            .unwrap_or(artio_core::generation::MIN_IMAGE_COUNT);
        validate_request(&params.prompt, image_count)?;

        let model_id = params.model.as_deref().unwrap_or(DEFAULT_MODEL);
        let model = find_model(model_id)
            .ok_or_else(|| CoreError::Validation(format!("Unknown model: {model_id}")))?;

        // Premium gate, checked before the deduction so a non-premium
        // user is never charged for a premium model.
        if model.premium {
            let premium = self
                .auth
                .is_premium(user_id)
                .await
                .map_err(|e| CoreError::Internal(format!("Premium lookup failed: {e}")))?;
            if !premium {
                return Err(CoreError::PremiumRequired {
                    model: model.id.to_string(),
                });
            }
        }

        match self.limiter.check(user_id).await {
            Ok(RateDecision::Allowed) => {}
            Ok(RateDecision::Limited { retry_after_secs }) => {
                return Err(CoreError::RateLimited { retry_after_secs });
            }
            // Fail closed: an unreachable limiter rejects the request
            // rather than letting an unmetered burst through.
            Err(e) => return Err(CoreError::RateLimiterUnavailable(e.to_string())),
        }

        let cost = model.credit_cost;
        match self
            .ledger
            .deduct(user_id, cost, job_id)
            .await
            .map_err(|e| CoreError::Ledger(e.to_string()))?
        {
            DeductOutcome::Deducted => {
                tracing::info!(%job_id, cost, model = model.id, "Credits deducted");
            }
            DeductOutcome::InsufficientCredits => {
                return Err(CoreError::InsufficientCredits {
                    required: cost,
                    model: model.id.to_string(),
                });
            }
        }

        // From here on, any failure must refund before surfacing.
        if let Err(e) = self.jobs.update(job_id, JobUpdate::processing()).await {
            let cause = CoreError::Internal(format!("Failed to mark job processing: {e}"));
            return Err(self.fail_job(user_id, job_id, cost, None, cause).await);
        }

        let image_inputs = self.resolve_image_inputs(params.image_inputs).await;

        let request = ProviderRequest {
            model: *model,
            prompt: params.prompt,
            aspect_ratio: params
                .aspect_ratio
                .unwrap_or_else(|| DEFAULT_ASPECT_RATIO.to_string()),
            image_count,
            image_inputs,
        };

        let task_sink = PersistTaskId {
            jobs: self.jobs.as_ref(),
            job_id,
        };
        let reply = match self.provider.generate(&request, &task_sink).await {
            Ok(reply) => reply,
            Err(dispatch) => {
                let cause = CoreError::Provider(dispatch.error.to_string());
                return Err(self
                    .fail_job(user_id, job_id, cost, dispatch.task_id, cause)
                    .await);
            }
        };

        let format = OutputFormat::parse(params.output_format.as_deref());
        let sources: Vec<MirrorSource> = reply
            .output
            .images
            .into_iter()
            .map(|image| match image {
                ProviderImage::Url(url) => MirrorSource::Url(url),
                ProviderImage::Inline(bytes) => MirrorSource::Bytes(bytes),
            })
            .collect();

        let paths = match self.mirror.mirror(user_id, job_id, sources, format).await {
            Ok(paths) => paths,
            Err(e) => {
                let cause = CoreError::Storage(format!("Failed to store results: {e}"));
                return Err(self
                    .fail_job(user_id, job_id, cost, reply.task_id, cause)
                    .await);
            }
        };

        let mut update = JobUpdate::completed(paths.clone());
        if let Some(task_id) = reply.task_id.clone() {
            update.provider_task_id = Some(Some(task_id));
        }
        if let Err(e) = self.jobs.update(job_id, update).await {
            let cause = CoreError::Internal(format!("Failed to finalize job: {e}"));
            return Err(self
                .fail_job(user_id, job_id, cost, reply.task_id, cause)
                .await);
        }

        tracing::info!(%job_id, results = paths.len(), "Generation completed");
        Ok(paths)
    }

    /// Exchange storage-relative image inputs for provider-visible
    /// URLs. Absolute URLs pass through untouched; a failed signing
    /// falls back to the public URL rather than aborting the job.
    async fn resolve_image_inputs(&self, inputs: Vec<String>) -> Vec<String> {
        let mut resolved = Vec::with_capacity(inputs.len());
        for input in inputs {
            if input.starts_with("http://") || input.starts_with("https://") {
                resolved.push(input);
                continue;
            }

            let store = self.mirror.store();
            match store
                .signed_url(&input, self.settings.signed_url_ttl_secs)
                .await
            {
                Ok(url) => resolved.push(url),
                Err(e) => {
                    tracing::warn!(path = %input, error = %e, "Signing image input failed, using public URL");
                    resolved.push(store.public_url(&input));
                }
            }
        }
        resolved
    }

    /// Common post-deduction failure path: compensating refund with
    /// retries, then the terminal `failed` write. Returns the proximate
    /// `cause` unchanged so the handler reports what actually broke.
    async fn fail_job(
        &self,
        user_id: UserId,
        job_id: JobId,
        cost: u32,
        task_id: Option<String>,
        cause: CoreError,
    ) -> CoreError {
        tracing::error!(%job_id, error = %cause, "Generation failed after deduction");

        let refund = refund_with_retry(
            self.ledger.as_ref(),
            user_id,
            cost,
            job_id,
            self.settings.refund_max_attempts,
        )
        .await;

        let mut message = cause.to_string();
        if !refund.success {
            message = format!("{message} {REFUND_FAILED_MARKER}");
        }

        let mut update = JobUpdate::failed(message);
        if let Some(task_id) = task_id {
            update.provider_task_id = Some(Some(task_id));
        }

        // A failed terminal write leaves the row in `processing`; the
        // refund already happened, so only log it.
        if let Err(e) = self.jobs.update(job_id, update).await {
            tracing::error!(%job_id, error = %e, "Failed to mark job failed");
        }

        cause
    }
}
