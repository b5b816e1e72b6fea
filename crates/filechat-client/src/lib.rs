//! # filechat-client
//!
//! Chat completion sources for filechat transcripts.
//!
//! This crate provides:
//! - [`CompletionSource`], the seam between a transcript and a model
//! - [`OpenAiClient`] for OpenAI-compatible HTTP APIs, with SSE streaming
//! - [`RetryPolicy`] for bounded retries of failed requests
//! - [`consume_stream`] to drive a token stream through a [`StreamObserver`]
//!
//! ## Example
//!
//! ```rust,no_run
//! use filechat_client::{CompletionSettings, CompletionSource, OpenAiClient};
//! use filechat_format::Message;
//!
//! # async fn run() -> filechat_client::CompletionResult<()> {
//! let settings = CompletionSettings {
//!     model: Some("gpt-4o-mini".to_string()),
//!     ..CompletionSettings::default()
//! };
//! let reply = OpenAiClient::new()
//!     .complete(&[Message::user("Hello!")], &settings)
//!     .await?;
//! println!("{}", reply.content);
//! # Ok(())
//! # }
//! ```

mod error;
pub mod openai;
mod retry;
mod settings;
mod stream;

use std::pin::Pin;

use async_trait::async_trait;
use filechat_format::Message;
use futures_util::Stream;

pub use error::*;
pub use openai::OpenAiClient;
pub use retry::{retry_async, RetryPolicy};
pub use settings::*;
pub use stream::{consume_stream, Collector, StreamObserver};

/// Tokens of a streamed reply, in order.
pub type TokenStream = Pin<Box<dyn Stream<Item = CompletionResult<String>> + Send>>;

/// Something that can answer a conversation.
#[async_trait]
pub trait CompletionSource: Send + Sync {
    /// Start a streamed completion.
    async fn stream(
        &self,
        messages: &[Message],
        settings: &CompletionSettings,
    ) -> CompletionResult<TokenStream>;

    /// Request a full reply at once.
    async fn complete(
        &self,
        messages: &[Message],
        settings: &CompletionSettings,
    ) -> CompletionResult<Message> {
        let stream = self.stream(messages, settings).await?;
        let content = consume_stream(stream, &mut Collector).await?;
        if content.is_empty() {
            return Err(CompletionError::EmptyResponse);
        }
        Ok(Message::assistant(content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Streams fixed tokens and relies on the default `complete`.
    struct StubSource {
        tokens: Vec<&'static str>,
    }

    #[async_trait]
    impl CompletionSource for StubSource {
        async fn stream(
            &self,
            _messages: &[Message],
            _settings: &CompletionSettings,
        ) -> CompletionResult<TokenStream> {
            let items: Vec<CompletionResult<String>> =
                self.tokens.iter().map(|t| Ok(t.to_string())).collect();
            Ok(Box::pin(futures_util::stream::iter(items)))
        }
    }

    #[tokio::test]
    async fn test_complete_collects_stream() {
        let source = StubSource {
            tokens: vec!["Hel", "lo", "!"],
        };
        let reply = source
            .complete(&[Message::user("hi")], &CompletionSettings::default())
            .await
            .unwrap();
        assert_eq!(reply, Message::assistant("Hello!"));
    }

    #[tokio::test]
    async fn test_complete_empty_stream() {
        let source = StubSource { tokens: vec![] };
        let result = source
            .complete(&[Message::user("hi")], &CompletionSettings::default())
            .await;
        assert!(matches!(result, Err(CompletionError::EmptyResponse)));
    }
}
