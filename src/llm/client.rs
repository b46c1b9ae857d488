use super::error::BackendError;
use super::types::{LLMRequest, LLMResponse};
use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};

/// Incremental text fragments produced by a streaming chat call
pub type TokenStream = BoxStream<'static, Result<String, BackendError>>;

#[async_trait]
pub trait LLMClient: Send + Sync {
    async fn chat(&self, request: LLMRequest) -> Result<LLMResponse, BackendError>;

    /// Streams the response as text fragments.
    ///
    /// Backends without native streaming deliver the whole reply as one fragment.
    async fn chat_stream(&self, request: LLMRequest) -> Result<TokenStream, BackendError> {
        let response = self.chat(request).await?;
        Ok(stream::once(async move { Ok(response.content) }).boxed())
    }

    fn name(&self) -> &str;

    fn model_info(&self) -> Option<String> {
        None
    }
}
