//! Reading, writing and incrementally updating transcript files.
//!
//! Every operation reads and writes the file directly; nothing is cached
//! between calls. A file is expected to have a single writer at a time.

use crate::grammar::SectionPattern;
use crate::transcript::{decode, repair_text};
use crate::{format_text, serialize, Config, Message, Role, Transcript, TranscriptResult};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// A transcript file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptFile {
    path: PathBuf,
}

impl TranscriptFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the underlying file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the raw file text.
    pub fn read_text(&self) -> TranscriptResult<String> {
        Ok(fs::read_to_string(&self.path)?)
    }

    fn write_text(&self, text: &str) -> TranscriptResult<()> {
        fs::write(&self.path, text)?;
        Ok(())
    }

    fn append(&self, text: &str) -> TranscriptResult<()> {
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        file.write_all(text.as_bytes())?;
        Ok(())
    }

    /// Normalize heading spacing in place.
    pub fn format(&self) -> TranscriptResult<()> {
        let text = self.read_text()?;
        let formatted = format_text(&text);
        if formatted != text {
            tracing::debug!(path = %self.path.display(), "Formatted transcript");
            self.write_text(&formatted)?;
        }
        Ok(())
    }

    /// Parse the file.
    ///
    /// A file with no recognizable sections is treated as one user message:
    /// it is rewritten in that form and parsed again.
    pub fn load(&self) -> TranscriptResult<Transcript> {
        let text = self.read_text()?;
        let decoded = decode(&text)?;
        if !decoded.transcript.messages.is_empty() {
            return Ok(decoded.transcript);
        }

        tracing::info!(
            path = %self.path.display(),
            "No message sections found; rewriting file as a single user message"
        );
        let repaired = repair_text(&decoded.transcript.config, decoded.body)?;
        self.write_text(&repaired)?;
        Transcript::parse(&self.read_text()?)
    }

    /// Overwrite the file with the given messages and config.
    pub fn write_messages(&self, messages: &[Message], config: &Config) -> TranscriptResult<()> {
        self.write_text(&serialize(messages, config)?)
    }

    /// Overwrite the file with a transcript.
    pub fn save(&self, transcript: &Transcript) -> TranscriptResult<()> {
        self.write_messages(&transcript.messages, &transcript.config)
    }

    /// Append a heading for `role`, ready for streamed content.
    pub fn append_heading(&self, role: Role) -> TranscriptResult<()> {
        tracing::debug!(path = %self.path.display(), %role, "Appending heading");
        self.append(&format!("\n{}\n\n", role.heading_line()))
    }

    /// Append raw text, typically one streamed token.
    pub fn append_raw(&self, text: &str) -> TranscriptResult<()> {
        self.append(text)
    }

    /// Append a complete message section.
    pub fn append_message(&self, message: &Message) -> TranscriptResult<()> {
        tracing::debug!(path = %self.path.display(), role = %message.role, "Appending message");
        self.append(&format!(
            "\n{}\n\n{}\n",
            message.role.heading_line(),
            message.content
        ))
    }

    /// Remove the last section if its role is one of `roles`.
    ///
    /// The whole file is scanned for sections of any role; only the very last
    /// one is considered. Returns whether a section was removed.
    pub fn remove_last_section_if_role_in(&self, roles: &[Role]) -> TranscriptResult<bool> {
        let text = self.read_text()?;
        let Some(last) = SectionPattern::all().last(&text) else {
            return Ok(false);
        };
        if !roles.contains(&last.role) {
            return Ok(false);
        }

        tracing::debug!(
            path = %self.path.display(),
            role = %last.role,
            "Removing last section"
        );
        let mut truncated = text[..last.start].to_string();
        truncated.push('\n');
        self.write_text(&truncated)?;
        Ok(true)
    }
}
