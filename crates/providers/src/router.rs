//! Provider dispatch: one trait, three adapters, a closed route enum.

use artio_core::catalog::ProviderRoute;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::gemini::GeminiAdapter;
use crate::imagen::ImagenAdapter;
use crate::kie::KieAdapter;
use crate::types::{ProviderError, ProviderOutput, ProviderRequest};

/// Successful dispatch result.
#[derive(Debug)]
pub struct ProviderReply {
    /// External task handle, present for the asynchronous provider.
    pub task_id: Option<String>,
    pub output: ProviderOutput,
}

/// Failed dispatch. Carries the task handle when the task was accepted
/// upstream before failing, so operators can chase it.
#[derive(Debug)]
pub struct DispatchError {
    pub task_id: Option<String>,
    pub error: ProviderError,
}

impl From<ProviderError> for DispatchError {
    fn from(error: ProviderError) -> Self {
        Self {
            task_id: None,
            error,
        }
    }
}

/// Receives the upstream task handle as soon as the asynchronous
/// provider accepts a task, before polling begins. Callers persist it
/// here so a crash mid-poll cannot orphan a live upstream task.
#[async_trait]
pub trait TaskSink: Send + Sync {
    async fn task_accepted(&self, task_id: &str);
}

/// Sink for callers with nothing to record.
pub struct NoopTaskSink;

#[async_trait]
impl TaskSink for NoopTaskSink {
    async fn task_accepted(&self, _task_id: &str) {}
}

/// The seam the orchestrator generates through. Mocked in tests; the
/// one production implementation is [`ProviderRouter`].
#[async_trait]
pub trait ImageProvider: Send + Sync {
    async fn generate(
        &self,
        request: &ProviderRequest,
        tasks: &dyn TaskSink,
    ) -> Result<ProviderReply, DispatchError>;
}

/// Routes a request to the adapter for its model's provider family.
pub struct ProviderRouter {
    kie: KieAdapter,
    gemini: GeminiAdapter,
    imagen: ImagenAdapter,
    /// Cancelled on process shutdown to stop in-flight poll loops.
    cancel: CancellationToken,
}

impl ProviderRouter {
    pub fn new(
        kie: KieAdapter,
        gemini: GeminiAdapter,
        imagen: ImagenAdapter,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            kie,
            gemini,
            imagen,
            cancel,
        }
    }
}

#[async_trait]
impl ImageProvider for ProviderRouter {
    async fn generate(
        &self,
        request: &ProviderRequest,
        tasks: &dyn TaskSink,
    ) -> Result<ProviderReply, DispatchError> {
        match request.model.route {
            ProviderRoute::Kie(family) => {
                let task_id = self.kie.create_task(request, family).await?;
                tracing::info!(
                    model = request.model.id,
                    task_id = %task_id,
                    "Provider task created"
                );
                // Hand the task handle out before polling starts.
                tasks.task_accepted(&task_id).await;

                match self.kie.poll_task(&task_id, &self.cancel).await {
                    Ok(urls) => Ok(ProviderReply {
                        task_id: Some(task_id),
                        output: ProviderOutput {
                            images: urls.into_iter().map(crate::types::ProviderImage::Url).collect(),
                        },
                    }),
                    Err(error) => Err(DispatchError {
                        task_id: Some(task_id),
                        error,
                    }),
                }
            }
            ProviderRoute::Gemini => Ok(ProviderReply {
                task_id: None,
                output: self.gemini.generate(request).await?,
            }),
            ProviderRoute::ImagenNative => Ok(ProviderReply {
                task_id: None,
                output: self.imagen.generate(request).await?,
            }),
        }
    }
}
