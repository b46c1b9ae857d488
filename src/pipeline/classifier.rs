use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{debug, error, info_span, Instrument};
use uuid::Uuid;

use crate::config::SecdocConfig;
use crate::error::ClassifyError;
use crate::progress::{LoggingHandler, ProgressEvent, ProgressHandler};
use crate::stream::{ClassificationStream, StreamEvent, TokenSink};

use super::context::PipelineContext;
use super::orchestrator::PipelineOrchestrator;
use super::state::{ClassificationOutcome, ClassificationRequest, ClassificationState};

const STREAM_BUFFER: usize = 64;

/// Entry point: classifies documents in blocking or streaming mode.
///
/// Cheap to clone; clones share the lexicon, prompts and model client.
#[derive(Clone)]
pub struct Classifier {
    context: Arc<PipelineContext>,
    orchestrator: Arc<PipelineOrchestrator>,
    progress: Arc<dyn ProgressHandler>,
}

impl Classifier {
    pub fn new(context: PipelineContext) -> Self {
        Self::with_progress(context, Arc::new(LoggingHandler))
    }

    pub fn with_progress(context: PipelineContext, progress: Arc<dyn ProgressHandler>) -> Self {
        Self {
            context: Arc::new(context),
            orchestrator: Arc::new(PipelineOrchestrator::new(progress.clone())),
            progress,
        }
    }

    /// Validates the configuration and loads every resource it names
    pub fn from_config(config: &SecdocConfig) -> Result<Self, ClassifyError> {
        config.validate()?;

        let context = PipelineContext::new(
            config.create_client(),
            Arc::new(config.load_lexicon()?),
            Arc::new(config.load_prompts()?),
            config.policy.clone(),
        )
        .with_max_tokens(config.max_tokens);

        Ok(Self::new(context))
    }

    pub fn context(&self) -> &PipelineContext {
        &self.context
    }

    /// Runs the workflow and returns the full terminal state
    pub async fn run(
        &self,
        request: ClassificationRequest,
    ) -> Result<ClassificationState, ClassifyError> {
        self.run_with(request, None).await
    }

    /// Blocking mode
    pub async fn classify(
        &self,
        request: ClassificationRequest,
    ) -> Result<ClassificationOutcome, ClassifyError> {
        Ok(self.run(request).await?.outcome())
    }

    /// Streaming mode: sends `token` events, then exactly one `done` or `error` event.
    ///
    /// If the receiver is dropped the run stops at the next fragment with
    /// [`ClassifyError::Cancelled`] and no terminal event is sent.
    pub async fn classify_streaming(
        &self,
        request: ClassificationRequest,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<ClassificationOutcome, ClassifyError> {
        let sink = TokenSink::new(tx);
        let result = self
            .run_with(request, Some(&sink))
            .await
            .map(|state| state.outcome());

        let terminal = match &result {
            Ok(outcome) => StreamEvent::Done {
                result: outcome.clone(),
            },
            Err(ClassifyError::Cancelled) => return result,
            Err(e) => StreamEvent::Error {
                message: e.to_string(),
            },
        };

        if sink.send(terminal).await.is_err() {
            debug!("Listener gone before terminal event");
        }
        result
    }

    /// Streaming mode on a background task; dropping the stream cancels the run
    pub fn stream(&self, request: ClassificationRequest) -> ClassificationStream {
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let classifier = self.clone();
        let task = tokio::spawn(async move {
            let _ = classifier.classify_streaming(request, tx).await;
        });
        ClassificationStream::new(rx, task)
    }

    async fn run_with(
        &self,
        request: ClassificationRequest,
        tokens: Option<&TokenSink>,
    ) -> Result<ClassificationState, ClassifyError> {
        let run_id = Uuid::new_v4().to_string();
        let span = info_span!("classify", run_id = %run_id);

        async move {
            let start = Instant::now();

            if let Err(e) = request.validate() {
                self.progress.on_progress(&ProgressEvent::Failed {
                    error: e.to_string(),
                });
                return Err(e);
            }

            self.progress.on_progress(&ProgressEvent::RunStarted {
                run_id: run_id.clone(),
                title: request.doc_title.clone(),
                content_chars: request.doc_content.chars().count(),
            });

            let state = ClassificationState::new(request);
            match self.orchestrator.execute(&self.context, state, tokens).await {
                Ok(state) => {
                    self.progress.on_progress(&ProgressEvent::Completed {
                        is_sensitive: state.is_sensitive(),
                        confidence: state.confidence(),
                        status: state.decision(),
                        total_time: start.elapsed(),
                    });
                    Ok(state)
                }
                Err(e) => {
                    if !matches!(e, ClassifyError::Cancelled) {
                        error!(error = %e, "Classification failed");
                    }
                    self.progress.on_progress(&ProgressEvent::Failed {
                        error: e.to_string(),
                    });
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }
}

impl std::fmt::Debug for Classifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Classifier")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}
