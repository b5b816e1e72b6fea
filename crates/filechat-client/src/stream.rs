//! Driving a token stream through start/token/end callbacks.

use futures_util::StreamExt;

use crate::{CompletionError, CompletionResult, ObserverError, TokenStream};

/// Callbacks invoked while a completion streams.
pub trait StreamObserver: Send {
    /// Called once, just before the first token is delivered.
    fn on_start(&mut self) -> Result<(), ObserverError> {
        Ok(())
    }

    /// Called for every token.
    fn on_token(&mut self, token: &str) -> Result<(), ObserverError>;

    /// Called exactly once when the stream is over, whether it finished,
    /// broke off, or never produced a token.
    fn on_end(&mut self) -> Result<(), ObserverError> {
        Ok(())
    }
}

/// Consume a token stream, notifying `observer`, and return the full reply.
///
/// A transport error in the middle of the stream ends it early: the error is
/// logged and whatever arrived so far is returned. Observer errors stop the
/// stream and are returned after `on_end` has run.
pub async fn consume_stream(
    mut stream: TokenStream,
    observer: &mut dyn StreamObserver,
) -> CompletionResult<String> {
    let mut reply = String::new();
    let mut started = false;
    let mut failure: Option<ObserverError> = None;

    while let Some(item) = stream.next().await {
        let token = match item {
            Ok(token) => token,
            Err(err) => {
                tracing::warn!(error = %err, "Completion stream ended early");
                break;
            }
        };

        if !started {
            started = true;
            if let Err(err) = observer.on_start() {
                failure = Some(err);
                break;
            }
        }
        if let Err(err) = observer.on_token(&token) {
            failure = Some(err);
            break;
        }
        reply.push_str(&token);
    }

    let ended = observer.on_end();
    match failure {
        Some(err) => Err(CompletionError::Observer(err)),
        None => {
            ended.map_err(CompletionError::Observer)?;
            Ok(reply)
        }
    }
}

/// Collects tokens without side effects.
#[derive(Debug, Default)]
pub struct Collector;

impl StreamObserver for Collector {
    fn on_token(&mut self, _token: &str) -> Result<(), ObserverError> {
        Ok(())
    }
}
