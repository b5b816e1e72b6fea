//! Client for OpenAI-compatible chat completion APIs.
//!
//! Streaming responses arrive as server-sent events: `data: {json}` lines
//! separated by blank lines, ending with `data: [DONE]`.

use std::collections::VecDeque;

use async_trait::async_trait;
use filechat_format::Message;
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};

use crate::{CompletionError, CompletionResult, CompletionSettings, CompletionSource, TokenStream};

/// Base URL used when none is configured.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

/// One server-sent event of interest.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SseEvent {
    Data(String),
    Done,
}

/// Splits a byte stream into SSE `data:` events.
///
/// Bytes are buffered until a full line is available, so chunk boundaries may
/// fall anywhere, including inside a multi-byte character.
#[derive(Debug, Default)]
struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(event) = parse_line(&String::from_utf8_lossy(&line)) {
                events.push(event);
            }
        }
        events
    }

    /// Flush a final line that had no trailing newline.
    fn finish(&mut self) -> Option<SseEvent> {
        let line = std::mem::take(&mut self.buffer);
        parse_line(&String::from_utf8_lossy(&line))
    }
}

fn parse_line(line: &str) -> Option<SseEvent> {
    let data = line
        .trim_end_matches(['\n', '\r'])
        .strip_prefix("data:")?
        .trim_start();
    if data == "[DONE]" {
        Some(SseEvent::Done)
    } else {
        Some(SseEvent::Data(data.to_string()))
    }
}

/// The text carried by one stream chunk, if any.
fn chunk_token(data: &str) -> CompletionResult<Option<String>> {
    let chunk: StreamChunk =
        serde_json::from_str(data).map_err(|e| CompletionError::Decode {
            message: format!("invalid stream chunk: {data}"),
            source: e,
        })?;
    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|content| !content.is_empty()))
}

struct StreamState<S> {
    bytes: S,
    decoder: SseDecoder,
    pending: VecDeque<CompletionResult<String>>,
    finished: bool,
}

impl<S> StreamState<S> {
    /// Queue the tokens of decoded events. Returns false once the stream is over.
    fn accept(&mut self, events: impl IntoIterator<Item = SseEvent>) -> bool {
        for event in events {
            match event {
                SseEvent::Done => return false,
                SseEvent::Data(data) => match chunk_token(&data) {
                    Ok(Some(token)) => self.pending.push_back(Ok(token)),
                    Ok(None) => {}
                    Err(err) => {
                        self.pending.push_back(Err(err));
                        return false;
                    }
                },
            }
        }
        true
    }
}

/// Turn a raw SSE byte stream into a stream of tokens.
fn token_stream<S, B, E>(bytes: S) -> TokenStream
where
    S: Stream<Item = Result<B, E>> + Send + Unpin + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<CompletionError> + Send + 'static,
{
    let state = StreamState {
        bytes,
        decoder: SseDecoder::default(),
        pending: VecDeque::new(),
        finished: false,
    };

    Box::pin(futures_util::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }

            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    let events = state.decoder.push(chunk.as_ref());
                    state.finished = !state.accept(events);
                }
                Some(Err(err)) => {
                    state.finished = true;
                    return Some((Err(err.into()), state));
                }
                None => {
                    let trailing = state.decoder.finish();
                    state.accept(trailing);
                    state.finished = true;
                }
            }
        }
    }))
}

/// Completion source backed by an OpenAI-compatible HTTP API.
#[derive(Debug, Clone, Default)]
pub struct OpenAiClient {
    http: reqwest::Client,
}

impl OpenAiClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured HTTP client (proxies, timeouts, ...).
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    fn endpoint(settings: &CompletionSettings) -> String {
        let base = settings.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        format!("{}/chat/completions", base.trim_end_matches('/'))
    }

    async fn send(
        &self,
        messages: &[Message],
        settings: &CompletionSettings,
        stream: bool,
    ) -> CompletionResult<reqwest::Response> {
        let body = build_request(messages, settings, stream)?;
        let url = Self::endpoint(settings);
        tracing::debug!(%url, model = body.model, messages = messages.len(), stream, "Sending completion request");

        let mut request = self.http.post(&url).json(&body);
        if let Some(key) = &settings.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

fn build_request<'a>(
    messages: &'a [Message],
    settings: &'a CompletionSettings,
    stream: bool,
) -> CompletionResult<ChatRequest<'a>> {
    let model = settings
        .model
        .as_deref()
        .ok_or(CompletionError::MissingModel)?;
    Ok(ChatRequest {
        model,
        messages: messages
            .iter()
            .map(|m| WireMessage {
                role: m.role.as_str(),
                content: &m.content,
            })
            .collect(),
        temperature: settings.temperature,
        max_tokens: settings.max_tokens,
        stream,
    })
}

#[async_trait]
impl CompletionSource for OpenAiClient {
    async fn stream(
        &self,
        messages: &[Message],
        settings: &CompletionSettings,
    ) -> CompletionResult<TokenStream> {
        let response = self.send(messages, settings, true).await?;
        Ok(token_stream(Box::pin(response.bytes_stream())))
    }

    async fn complete(
        &self,
        messages: &[Message],
        settings: &CompletionSettings,
    ) -> CompletionResult<Message> {
        let text = self.send(messages, settings, false).await?.text().await?;
        response_message(&text)
    }
}

/// The assistant message in a non-streamed response body.
fn response_message(text: &str) -> CompletionResult<Message> {
    let response: ChatResponse =
        serde_json::from_str(text).map_err(|e| CompletionError::Decode {
            message: "invalid completion response".to_string(),
            source: e,
        })?;
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or(CompletionError::EmptyResponse)?;
    Ok(Message::assistant(content))
}
