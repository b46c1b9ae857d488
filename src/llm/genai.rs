//! GenAI-based LLM client implementation
//!
//! Wraps the `genai` crate so any OpenAI-compatible or hosted provider can serve the
//! classification stages. Endpoint and credential are always supplied by the caller;
//! nothing is read from the environment here.

use super::client::{LLMClient, TokenStream};
use super::error::BackendError;
use super::types::{ChatMessage, LLMRequest, LLMResponse, MessageRole};
use async_trait::async_trait;
use futures_util::StreamExt;
use genai::adapter::AdapterKind;
use genai::chat::{
    ChatMessage as GenAIChatMessage, ChatOptions, ChatRequest as GenAIChatRequest,
    ChatStreamEvent,
};
use genai::resolver::{AuthData, Endpoint, ServiceTargetResolver};
use genai::{Client, ModelIden, ServiceTarget};
use std::time::Duration;
use tracing::{debug, error};

/// GenAI-based LLM client
pub struct GenAIClient {
    client: Client,
    model: String,
    provider: AdapterKind,
    timeout: Duration,
}

impl GenAIClient {
    /// Creates a new GenAI client
    ///
    /// # Arguments
    ///
    /// * `provider` - Adapter used to talk to the endpoint (OpenAI for OpenAI-compatible gateways)
    /// * `model` - Model identifier as understood by the endpoint
    /// * `base_url` - Endpoint override; `None` uses the provider default
    /// * `api_key` - Credential; `None` leaves authentication to the provider default
    /// * `timeout` - Bound on each request and on each streamed fragment
    pub fn new(
        provider: AdapterKind,
        model: String,
        base_url: Option<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Self {
        let base_url = base_url.map(normalize_base_url);

        if let Some(url) = &base_url {
            debug!("Using custom endpoint for {}: {}", provider.as_str(), url);
        }

        let model_clone = model.clone();
        let resolver = ServiceTargetResolver::from_resolver_fn(
            move |service_target: ServiceTarget| -> Result<ServiceTarget, genai::resolver::Error> {
                let ServiceTarget {
                    mut endpoint,
                    mut auth,
                    ..
                } = service_target;

                if let Some(url) = &base_url {
                    endpoint = Endpoint::from_owned(url.clone());
                }
                if let Some(key) = &api_key {
                    auth = AuthData::from_single(key.clone());
                }

                Ok(ServiceTarget {
                    endpoint,
                    auth,
                    model: ModelIden::new(provider, &model_clone),
                })
            },
        );

        let client = Client::builder()
            .with_service_target_resolver(resolver)
            .build();

        debug!(
            "Creating GenAI client: provider={}, model={}",
            provider.as_str(),
            model,
        );

        Self {
            client,
            model,
            provider,
            timeout,
        }
    }

    fn convert_message(&self, msg: &ChatMessage) -> GenAIChatMessage {
        match msg.role {
            MessageRole::System => GenAIChatMessage::system(&msg.content),
            MessageRole::User => GenAIChatMessage::user(&msg.content),
            MessageRole::Assistant => GenAIChatMessage::assistant(&msg.content),
        }
    }

    fn build_request(&self, request: &LLMRequest) -> (GenAIChatRequest, ChatOptions) {
        let messages: Vec<GenAIChatMessage> = request
            .messages
            .iter()
            .map(|m| self.convert_message(m))
            .collect();

        let mut options = ChatOptions::default();
        if let Some(temp) = request.temperature {
            options = options.with_temperature(temp as f64);
        }
        if let Some(max_tokens) = request.max_tokens {
            options = options.with_max_tokens(max_tokens);
        }

        (GenAIChatRequest::new(messages), options)
    }

    fn api_error(&self, e: impl std::fmt::Display) -> BackendError {
        error!("{} API error: {}", self.provider.as_str(), e);
        BackendError::ApiError {
            message: format!("{} request failed: {}", self.provider.as_str(), e),
            status_code: None,
        }
    }

    fn timeout_error(&self) -> BackendError {
        error!(
            "{} request timed out after {}s",
            self.provider.as_str(),
            self.timeout.as_secs()
        );
        BackendError::TimeoutError {
            seconds: self.timeout.as_secs(),
        }
    }
}

/// genai joins paths onto the endpoint, so it must end with a slash
fn normalize_base_url(url: String) -> String {
    if url.ends_with('/') {
        url
    } else {
        format!("{}/", url)
    }
}

#[async_trait]
impl LLMClient for GenAIClient {
    async fn chat(&self, request: LLMRequest) -> Result<LLMResponse, BackendError> {
        let start = std::time::Instant::now();
        let (genai_request, options) = self.build_request(&request);

        let response = match tokio::time::timeout(
            self.timeout,
            self.client
                .exec_chat(&self.model, genai_request, Some(&options)),
        )
        .await
        {
            Ok(Ok(resp)) => resp,
            Ok(Err(e)) => return Err(self.api_error(e)),
            Err(_) => return Err(self.timeout_error()),
        };

        let content = response.first_text().unwrap_or_default().to_string();

        Ok(LLMResponse::text(content, start.elapsed()))
    }

    async fn chat_stream(&self, request: LLMRequest) -> Result<TokenStream, BackendError> {
        let (genai_request, options) = self.build_request(&request);

        let response = match tokio::time::timeout(
            self.timeout,
            self.client
                .exec_chat_stream(&self.model, genai_request, Some(&options)),
        )
        .await
        {
            Ok(Ok(resp)) => resp,
            Ok(Err(e)) => return Err(self.api_error(e)),
            Err(_) => return Err(self.timeout_error()),
        };

        let seconds = self.timeout.as_secs();
        let fragments = response.stream.filter_map(|event| async move {
            match event {
                Ok(ChatStreamEvent::Chunk(chunk)) => Some(Ok(chunk.content)),
                Ok(_) => None,
                Err(e) => Some(Err(BackendError::StreamInterrupted {
                    message: e.to_string(),
                })),
            }
        });

        let bounded = tokio_stream::StreamExt::timeout(fragments, self.timeout).map(
            move |item| match item {
                Ok(fragment) => fragment,
                Err(_) => Err(BackendError::TimeoutError { seconds }),
            },
        );

        Ok(bounded.boxed())
    }

    fn name(&self) -> &str {
        self.provider.as_str()
    }

    fn model_info(&self) -> Option<String> {
        Some(self.model.clone())
    }
}

impl std::fmt::Debug for GenAIClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenAIClient")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}
