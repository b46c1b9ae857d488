use crate::error::ClassifyError;
use crate::llm::{ChatMessage, LLMRequest};
use crate::pipeline::context::PipelineContext;
use crate::pipeline::state::Stage;
use crate::stream::TokenSink;
use futures_util::StreamExt;
use std::time::Instant;
use tracing::{debug, warn};

/// `[system, user]` request at temperature 0
pub fn build_request(context: &PipelineContext, system: String, user: String) -> LLMRequest {
    LLMRequest::new(vec![ChatMessage::system(system), ChatMessage::user(user)])
        .with_temperature(0.0)
        .with_max_tokens(context.max_tokens)
}

pub async fn chat_with_logging(
    context: &PipelineContext,
    stage: Stage,
    request: LLMRequest,
) -> Result<String, ClassifyError> {
    let start = Instant::now();

    let response = context.llm_client.chat(request).await.map_err(|e| {
        warn!(stage = %stage, error = %e, "LLM call failed");
        ClassifyError::CapabilityUnavailable(e)
    })?;

    debug!(
        stage = %stage,
        latency_ms = start.elapsed().as_millis() as u64,
        chars = response.content.chars().count(),
        "LLM response received"
    );

    Ok(response.content)
}

/// Forwards every fragment to `sink` as it arrives and returns the concatenated text
pub async fn stream_with_logging(
    context: &PipelineContext,
    stage: Stage,
    request: LLMRequest,
    sink: &TokenSink,
) -> Result<String, ClassifyError> {
    let start = Instant::now();

    let mut fragments = context.llm_client.chat_stream(request).await.map_err(|e| {
        warn!(stage = %stage, error = %e, "LLM stream failed to start");
        ClassifyError::CapabilityUnavailable(e)
    })?;

    let mut buffer = String::new();
    let mut count = 0usize;

    while let Some(fragment) = fragments.next().await {
        let fragment = fragment.map_err(|e| {
            warn!(stage = %stage, fragments = count, error = %e, "LLM stream broke off");
            ClassifyError::CapabilityUnavailable(e)
        })?;
        if fragment.is_empty() {
            continue;
        }

        count += 1;
        buffer.push_str(&fragment);
        // dropping `fragments` on cancellation also aborts the request
        sink.token(fragment).await?;
    }

    debug!(
        stage = %stage,
        latency_ms = start.elapsed().as_millis() as u64,
        fragments = count,
        "LLM stream complete"
    );

    Ok(buffer)
}
