use super::client::{LLMClient, TokenStream};
use super::error::BackendError;
use super::types::{LLMRequest, LLMResponse};
use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// Scripted client that replays queued responses in order and records every request.
pub struct MockLLMClient {
    responses: Mutex<VecDeque<MockResponse>>,
    requests: Mutex<Vec<LLMRequest>>,
    name: String,
}

#[derive(Debug, Clone)]
pub struct MockResponse {
    pub content: String,
    /// Fragments delivered by `chat_stream`; `None` streams `content` whole
    pub chunks: Option<Vec<String>>,
    /// Failure returned instead of a response
    pub error: Option<BackendError>,
    /// Failure injected into the stream after all `chunks` were delivered
    pub stream_error: Option<BackendError>,
}

impl MockResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            chunks: None,
            error: None,
            stream_error: None,
        }
    }

    pub fn chunks<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let chunks: Vec<String> = chunks.into_iter().map(Into::into).collect();
        Self {
            content: chunks.concat(),
            chunks: Some(chunks),
            error: None,
            stream_error: None,
        }
    }

    pub fn error(error: BackendError) -> Self {
        Self {
            content: String::new(),
            chunks: None,
            error: Some(error),
            stream_error: None,
        }
    }

    /// Streams `chunks` and then fails with `error`
    pub fn interrupted<I, S>(chunks: I, error: BackendError) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut response = Self::chunks(chunks);
        response.stream_error = Some(error);
        response
    }
}

impl MockLLMClient {
    pub fn new() -> Self {
        Self::with_name("MockLLM")
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            name: name.into(),
        }
    }

    pub fn add_response(&self, response: MockResponse) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn add_responses(&self, responses: impl IntoIterator<Item = MockResponse>) {
        let mut queue = self.responses.lock().unwrap();
        for response in responses {
            queue.push_back(response);
        }
    }

    pub fn remaining_responses(&self) -> usize {
        self.responses.lock().unwrap().len()
    }

    /// Number of chat or chat_stream calls received so far
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Snapshot of every request received, in call order
    pub fn requests(&self) -> Vec<LLMRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next_response(&self, request: LLMRequest) -> Result<MockResponse, BackendError> {
        self.requests.lock().unwrap().push(request);

        let response = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| BackendError::Other {
                message: "MockLLMClient: No more responses in queue".to_string(),
            })?;

        match response.error {
            Some(error) => Err(error),
            None => Ok(response),
        }
    }
}

impl Default for MockLLMClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn chat(&self, request: LLMRequest) -> Result<LLMResponse, BackendError> {
        let response = self.next_response(request)?;
        Ok(LLMResponse::text(response.content, Duration::from_millis(10)))
    }

    async fn chat_stream(&self, request: LLMRequest) -> Result<TokenStream, BackendError> {
        let response = self.next_response(request)?;

        let mut items: Vec<Result<String, BackendError>> = response
            .chunks
            .unwrap_or_else(|| vec![response.content])
            .into_iter()
            .map(Ok)
            .collect();
        if let Some(error) = response.stream_error {
            items.push(Err(error));
        }

        Ok(stream::iter(items).boxed())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn model_info(&self) -> Option<String> {
        Some("mock-model".to_string())
    }
}

impl std::fmt::Debug for MockLLMClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockLLMClient")
            .field("name", &self.name)
            .field("remaining_responses", &self.remaining_responses())
            .field("calls", &self.call_count())
            .finish()
    }
}
