//! Chat command - Send the transcript for completion and write the reply back.

use anyhow::{Context, Result};
use colored::Colorize;
use filechat_client::{
    consume_stream, CompletionSettings, CompletionSource, ObserverError, OpenAiClient, RetryPolicy,
    StreamObserver,
};
use filechat_format::{Message, Role, TranscriptFile};
use std::io::{self, Write};
use std::path::Path;

use crate::config::AppConfig;

/// Roles that trailing cleanup may remove.
const REPLACEABLE_ROLES: [Role; 2] = [Role::User, Role::Assistant];

/// How the reply is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub print_response: bool,
    pub stream_for_file: bool,
}

pub async fn run(path: &Path, config: &AppConfig) -> Result<()> {
    let file = TranscriptFile::new(path);
    let client = OpenAiClient::new();
    let mut stdout = io::stdout();

    run_session(
        &file,
        &client,
        &config.completion_settings(),
        config.session_options(),
        confirm,
        &mut stdout,
    )
    .await?;
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    Ok(dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()?)
}

/// Run one turn of the conversation in `file` and return the reply text.
pub async fn run_session<S, C, W>(
    file: &TranscriptFile,
    source: &S,
    base: &CompletionSettings,
    options: SessionOptions,
    confirm: C,
    out: &mut W,
) -> Result<String>
where
    S: CompletionSource,
    C: FnOnce(&str) -> Result<bool>,
    W: Write + Send,
{
    file.format()
        .with_context(|| format!("Failed to format: {}", file.path().display()))?;
    let transcript = file
        .load()
        .with_context(|| format!("Failed to read: {}", file.path().display()))?;

    let settings = base.with_overrides(&transcript.config)?;
    writeln!(
        out,
        "{}",
        format!("Configuration: {}", serde_json::to_string(&settings.redacted())?).green()
    )?;

    let blank = transcript.trailing_blank_count();
    let mut messages = transcript.messages;
    messages.truncate(messages.len() - blank);
    remove_sections(file, blank)?;

    let mut pending_removals = 0;
    match messages.last().map(|m| m.role) {
        None => anyhow::bail!("Expected user message."),
        Some(Role::Assistant) => {
            writeln!(
                out,
                "{}",
                "Warning: The last message is an assistant message.".yellow()
            )?;
            if confirm("Replace it?")? {
                pending_removals += 1;
                messages.pop();
            }
        }
        Some(_) => {}
    }
    if messages.is_empty() {
        anyhow::bail!("Expected user message.");
    }

    writeln!(out, "Requesting completion...")?;
    let policy = RetryPolicy::new(settings.max_retries);
    let stream = policy.run(|| source.stream(&messages, &settings)).await?;

    let mut observer = FileStreamObserver {
        file,
        options,
        pending_removals,
        started: false,
        reply: String::new(),
        out,
    };
    let reply = consume_stream(stream, &mut observer).await?;
    tracing::info!(chars = reply.len(), "Completion finished");
    Ok(reply)
}

fn remove_sections(file: &TranscriptFile, count: usize) -> filechat_format::TranscriptResult<()> {
    for _ in 0..count {
        file.remove_last_section_if_role_in(&REPLACEABLE_ROLES)?;
    }
    Ok(())
}

/// Writes a streamed reply into the transcript file and the console.
struct FileStreamObserver<'a, W> {
    file: &'a TranscriptFile,
    options: SessionOptions,
    /// Sections to remove before the reply is written
    pending_removals: usize,
    started: bool,
    reply: String,
    out: &'a mut W,
}

impl<W: Write> FileStreamObserver<'_, W> {
    fn apply_removals(&mut self) -> Result<(), ObserverError> {
        remove_sections(self.file, self.pending_removals)?;
        self.pending_removals = 0;
        Ok(())
    }
}

impl<W: Write + Send> StreamObserver for FileStreamObserver<'_, W> {
    fn on_start(&mut self) -> Result<(), ObserverError> {
        self.started = true;
        if self.options.stream_for_file {
            self.apply_removals()?;
            self.file.append_heading(Role::Assistant)?;
        }
        Ok(())
    }

    fn on_token(&mut self, token: &str) -> Result<(), ObserverError> {
        if self.options.print_response {
            write!(self.out, "{}", token.bright_black())?;
            self.out.flush()?;
        }
        if self.options.stream_for_file {
            self.file.append_raw(token)?;
        }
        self.reply.push_str(token);
        Ok(())
    }

    fn on_end(&mut self) -> Result<(), ObserverError> {
        if self.options.print_response {
            writeln!(self.out)?;
        }

        if self.options.stream_for_file {
            if self.started {
                self.file.append_raw("\n")?;
            }
        } else if self.reply.is_empty() {
            tracing::warn!("Completion stream produced no text; nothing appended");
        } else {
            self.apply_removals()?;
            self.file
                .append_message(&Message::assistant(self.reply.as_str()))?;
        }

        writeln!(self.out, "Completion stream ended.")?;
        self.file.append_heading(Role::User)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use filechat_client::{CompletionError, CompletionResult, TokenStream};
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::sync::Mutex;
    use uuid::Uuid;

    /// Replies with fixed tokens and records what it was asked.
    struct FakeSource {
        tokens: Vec<&'static str>,
        fail_with: Option<u16>,
        requests: Mutex<Vec<(Vec<Message>, CompletionSettings)>>,
    }

    impl FakeSource {
        fn new(tokens: Vec<&'static str>) -> Self {
            Self {
                tokens,
                fail_with: None,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<(Vec<Message>, CompletionSettings)> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CompletionSource for FakeSource {
        async fn stream(
            &self,
            messages: &[Message],
            settings: &CompletionSettings,
        ) -> CompletionResult<TokenStream> {
            self.requests
                .lock()
                .unwrap()
                .push((messages.to_vec(), settings.clone()));
            if let Some(status) = self.fail_with {
                return Err(CompletionError::Api {
                    status,
                    body: "denied".to_string(),
                });
            }
            let items: Vec<CompletionResult<String>> =
                self.tokens.iter().map(|t| Ok(t.to_string())).collect();
            Ok(Box::pin(futures_util::stream::iter(items)))
        }
    }

    fn temp_file(content: &str) -> TranscriptFile {
        let dir = std::env::temp_dir().join(format!("filechat-cli-test-{}", Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("chat.md");
        fs::write(&path, content).unwrap();
        TranscriptFile::new(path)
    }

    fn options(print_response: bool, stream_for_file: bool) -> SessionOptions {
        SessionOptions {
            print_response,
            stream_for_file,
        }
    }

    fn settings() -> CompletionSettings {
        CompletionSettings {
            model: Some("test-model".to_string()),
            max_retries: 0,
            ..CompletionSettings::default()
        }
    }

    fn never_asked(_: &str) -> Result<bool> {
        panic!("unexpected confirmation prompt")
    }

    #[tokio::test]
    async fn test_streams_reply_into_file() {
        let file = temp_file("# User\nhi");
        let source = FakeSource::new(vec!["Hello", " there"]);
        let mut out = Vec::new();

        let reply = run_session(&file, &source, &settings(), options(true, true), never_asked, &mut out)
            .await
            .unwrap();

        assert_eq!(reply, "Hello there");
        assert_eq!(
            file.read_text().unwrap(),
            "# User\n\nhi\n\n# Assistant\n\nHello there\n\n# User\n\n"
        );
        assert_eq!(source.requests()[0].0, vec![Message::user("hi")]);
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("Configuration:"));
        assert!(out.contains("Requesting completion..."));
        assert!(out.contains("Completion stream ended."));
    }

    #[tokio::test]
    async fn test_appends_whole_reply_without_file_streaming() {
        let file = temp_file("# User\n\nhi\n");
        let source = FakeSource::new(vec!["Hello", " there"]);
        let mut out = Vec::new();

        run_session(&file, &source, &settings(), options(false, false), never_asked, &mut out)
            .await
            .unwrap();

        assert_eq!(
            file.read_text().unwrap(),
            "# User\n\nhi\n\n# Assistant\n\nHello there\n\n# User\n\n"
        );
        let out = String::from_utf8(out).unwrap();
        assert!(!out.contains("Hello"));
        assert!(out.contains("Completion stream ended."));
    }

    #[tokio::test]
    async fn test_drops_trailing_blank_messages() {
        let file = temp_file("# User\n\nhi\n\n# Assistant\n\nyo\n\n# User\n\nand?\n\n# User\n\n\n");
        let source = FakeSource::new(vec!["more"]);
        let mut out = Vec::new();

        run_session(&file, &source, &settings(), options(false, true), never_asked, &mut out)
            .await
            .unwrap();

        assert_eq!(
            source.requests()[0].0,
            vec![
                Message::user("hi"),
                Message::assistant("yo"),
                Message::user("and?"),
            ]
        );
        assert_eq!(
            file.read_text().unwrap(),
            "# User\n\nhi\n\n# Assistant\n\nyo\n\n# User\n\nand?\n\n# Assistant\n\nmore\n\n# User\n\n"
        );
    }

    #[tokio::test]
    async fn test_replaces_last_assistant_message() {
        let file = temp_file("# User\n\nhi\n\n# Assistant\n\nold\n\n# User\n\n");
        let source = FakeSource::new(vec!["new"]);
        let mut out = Vec::new();

        let replace = |prompt: &str| {
            assert_eq!(prompt, "Replace it?");
            Ok(true)
        };
        run_session(&file, &source, &settings(), options(false, true), replace, &mut out)
            .await
            .unwrap();

        assert_eq!(source.requests()[0].0, vec![Message::user("hi")]);
        assert_eq!(
            file.read_text().unwrap(),
            "# User\n\nhi\n\n# Assistant\n\nnew\n\n# User\n\n"
        );
        assert!(String::from_utf8(out)
            .unwrap()
            .contains("The last message is an assistant message."));
    }

    #[tokio::test]
    async fn test_keeps_last_assistant_message_when_declined() {
        let file = temp_file("# User\n\nhi\n\n# Assistant\n\nold\n");
        let source = FakeSource::new(vec!["new"]);
        let mut out = Vec::new();

        run_session(&file, &source, &settings(), options(false, true), |_: &str| Ok(false), &mut out)
            .await
            .unwrap();

        assert_eq!(
            source.requests()[0].0,
            vec![Message::user("hi"), Message::assistant("old")]
        );
        assert_eq!(
            file.read_text().unwrap(),
            "# User\n\nhi\n\n# Assistant\n\nold\n\n# Assistant\n\nnew\n\n# User\n\n"
        );
    }

    #[tokio::test]
    async fn test_expected_user_message() {
        let file = temp_file("# User\n\n");
        let source = FakeSource::new(vec!["never"]);
        let mut out = Vec::new();

        let err = run_session(&file, &source, &settings(), options(false, true), never_asked, &mut out)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Expected user message.");
        assert!(source.requests().is_empty());
        assert_eq!(file.read_text().unwrap(), "\n");
    }

    #[tokio::test]
    async fn test_self_repairs_plain_text() {
        let file = temp_file("What is a monad?");
        let source = FakeSource::new(vec!["A burrito."]);
        let mut out = Vec::new();

        run_session(&file, &source, &settings(), options(false, true), never_asked, &mut out)
            .await
            .unwrap();

        assert_eq!(source.requests()[0].0, vec![Message::user("What is a monad?")]);
        assert_eq!(
            file.read_text().unwrap(),
            "# User\n\nWhat is a monad?\n\n# Assistant\n\nA burrito.\n\n# User\n\n"
        );
    }

    #[tokio::test]
    async fn test_front_matter_overrides_settings() {
        let file = temp_file("---\nmodel: from-file\ntemperature: 0.1\n---\n\n# User\n\nhi\n");
        let source = FakeSource::new(vec!["ok"]);
        let mut out = Vec::new();

        run_session(&file, &source, &settings(), options(false, true), never_asked, &mut out)
            .await
            .unwrap();

        let (_, used) = &source.requests()[0];
        assert_eq!(used.model.as_deref(), Some("from-file"));
        assert_eq!(used.temperature, Some(0.1));
        assert_eq!(
            file.read_text().unwrap(),
            "---\nmodel: from-file\ntemperature: 0.1\n---\n\n# User\n\nhi\n\n# Assistant\n\nok\n\n# User\n\n"
        );
    }

    #[tokio::test]
    async fn test_request_failure_leaves_file_alone() {
        let file = temp_file("# User\n\nhi\n\n# Assistant\n\nold\n");
        let mut source = FakeSource::new(vec![]);
        source.fail_with = Some(401);
        let mut out = Vec::new();

        let err = run_session(&file, &source, &settings(), options(false, true), |_: &str| Ok(true), &mut out)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("401"));
        assert_eq!(source.requests().len(), 1);
        assert_eq!(file.read_text().unwrap(), "# User\n\nhi\n\n# Assistant\n\nold\n");
    }

    #[tokio::test]
    async fn test_empty_stream_only_adds_user_heading() {
        let file = temp_file("# User\n\nhi\n\n# Assistant\n\nold\n");
        let source = FakeSource::new(vec![]);
        let mut out = Vec::new();

        run_session(&file, &source, &settings(), options(false, true), |_: &str| Ok(true), &mut out)
            .await
            .unwrap();

        assert_eq!(
            file.read_text().unwrap(),
            "# User\n\nhi\n\n# Assistant\n\nold\n\n# User\n\n"
        );
    }
}
