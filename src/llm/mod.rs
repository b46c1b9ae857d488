//! LLM client abstraction layer
//!
//! This module provides a trait-based abstraction for the language-model capability,
//! allowing the GenAI backend and the scripted mock to be used interchangeably.

mod client;
mod error;
mod genai;
mod mock;
mod types;

pub use client::{LLMClient, TokenStream};
pub use error::BackendError;
pub use self::genai::GenAIClient;
pub use mock::{MockLLMClient, MockResponse};
pub use types::{ChatMessage, LLMRequest, LLMResponse, MessageRole};
