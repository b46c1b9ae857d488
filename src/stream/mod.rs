//! Streaming adapter
//!
//! A streaming run produces zero or more `token` events followed by exactly one terminal
//! event, `done` or `error`. Each event is framed as a Server-Sent-Events message:
//!
//! ```text
//! data: {"type":"token","content":"{\"is_sens"}
//!
//! data: {"type":"done","result":{"is_sensitive":true,"confidence":95,...}}
//!
//! ```

use crate::error::ClassifyError;
use crate::pipeline::ClassificationOutcome;
use futures_util::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    /// A fragment of the decision text, forwarded as soon as it arrives
    Token { content: String },
    Done { result: ClassificationOutcome },
    Error { message: String },
}

impl StreamEvent {
    pub fn token(content: impl Into<String>) -> Self {
        StreamEvent::Token {
            content: content.into(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamEvent::Token { .. })
    }

    pub fn to_json(&self) -> String {
        match serde_json::to_string(self) {
            Ok(json) => json,
            Err(e) => serde_json::json!({"type": "error", "message": e.to_string()}).to_string(),
        }
    }

    /// `data: <json>\n\n`
    pub fn to_sse_frame(&self) -> String {
        format!("data: {}\n\n", self.to_json())
    }

    /// Parses one SSE frame; comments, blank frames and non-`data:` lines yield `None`
    pub fn from_sse_frame(frame: &str) -> Option<Self> {
        let payload: String = frame
            .lines()
            .filter_map(|line| line.strip_prefix("data:"))
            .map(|rest| rest.strip_prefix(' ').unwrap_or(rest))
            .collect::<Vec<_>>()
            .join("\n");

        if payload.trim().is_empty() {
            return None;
        }
        serde_json::from_str(&payload).ok()
    }
}

/// Concatenation of every `token` event's content
pub fn collect_tokens<'a>(events: impl IntoIterator<Item = &'a StreamEvent>) -> String {
    events
        .into_iter()
        .filter_map(|event| match event {
            StreamEvent::Token { content } => Some(content.as_str()),
            _ => None,
        })
        .collect()
}

/// Sending half handed to the pipeline during a streaming run
#[derive(Debug, Clone)]
pub struct TokenSink {
    tx: mpsc::Sender<StreamEvent>,
}

impl TokenSink {
    pub fn new(tx: mpsc::Sender<StreamEvent>) -> Self {
        Self { tx }
    }

    /// Fails with [`ClassifyError::Cancelled`] once the listener has gone away
    pub async fn token(&self, content: impl Into<String>) -> Result<(), ClassifyError> {
        self.send(StreamEvent::token(content)).await
    }

    pub async fn send(&self, event: StreamEvent) -> Result<(), ClassifyError> {
        self.tx.send(event).await.map_err(|_| ClassifyError::Cancelled)
    }
}

/// Event stream of one background classification run.
///
/// Dropping it aborts the run, including any in-flight model stream.
pub struct ClassificationStream {
    events: ReceiverStream<StreamEvent>,
    task: JoinHandle<()>,
}

impl ClassificationStream {
    pub(crate) fn new(rx: mpsc::Receiver<StreamEvent>, task: JoinHandle<()>) -> Self {
        Self {
            events: ReceiverStream::new(rx),
            task,
        }
    }
}

impl Stream for ClassificationStream {
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.events).poll_next(cx)
    }
}

impl Drop for ClassificationStream {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl std::fmt::Debug for ClassificationStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassificationStream")
            .field("finished", &self.task.is_finished())
            .finish()
    }
}
