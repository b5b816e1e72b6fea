//! Transcript types and the text codec.
//!
//! A transcript file is optional YAML front matter followed by role sections:
//!
//! ```text
//! ---
//! model: gpt-4o
//! ---
//!
//! # System
//!
//! You are terse.
//!
//! # User
//!
//! Hello!
//! ```

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::grammar::SectionPattern;
use crate::{frontmatter, Role, TranscriptResult};

mod schema {
    use schemars::gen::SchemaGenerator;
    use schemars::schema::{InstanceType, ObjectValidation, Schema, SchemaObject};

    pub fn config_schema(_gen: &mut SchemaGenerator) -> Schema {
        Schema::Object(SchemaObject {
            instance_type: Some(InstanceType::Object.into()),
            object: Some(Box::new(ObjectValidation {
                additional_properties: Some(Box::new(Schema::Bool(true))),
                ..ObjectValidation::default()
            })),
            ..SchemaObject::default()
        })
    }
}

/// Per-file configuration from the front matter.
pub type Config = BTreeMap<String, serde_yaml::Value>;

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// True if the content is empty or only whitespace.
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }

    /// The section text for this message: heading, blank line, content.
    pub fn to_section(&self) -> String {
        if self.content.is_empty() {
            format!("{}\n", self.role.heading_line())
        } else {
            format!("{}\n\n{}\n", self.role.heading_line(), self.content)
        }
    }
}

/// A parsed transcript: front matter config plus messages in file order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Transcript {
    /// Front matter configuration (empty when the file has none)
    #[serde(default)]
    #[schemars(schema_with = "schema::config_schema")]
    pub config: Config,
    /// Messages in file order
    pub messages: Vec<Message>,
}

impl Transcript {
    pub fn new(messages: Vec<Message>, config: Config) -> Self {
        Self { config, messages }
    }

    /// Parse transcript text. Never rewrites anything; a text without
    /// sections yields a transcript with no messages.
    pub fn parse(text: &str) -> TranscriptResult<Self> {
        Ok(decode(text)?.transcript)
    }

    /// Serialize back to file text.
    pub fn to_text(&self) -> TranscriptResult<String> {
        serialize(&self.messages, &self.config)
    }

    /// The last message, if any.
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Number of blank messages at the end of the transcript.
    pub fn trailing_blank_count(&self) -> usize {
        self.messages
            .iter()
            .rev()
            .take_while(|m| m.is_blank())
            .count()
    }

    /// Messages with a given role.
    pub fn messages_with_role(&self, role: Role) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(move |m| m.role == role)
    }
}

/// Result of decoding text, keeping the section-free remainder for repair.
#[derive(Debug)]
pub(crate) struct Decoded<'a> {
    pub transcript: Transcript,
    /// Text after the front matter
    pub body: &'a str,
}

pub(crate) fn decode(text: &str) -> TranscriptResult<Decoded<'_>> {
    let (config, body) = match frontmatter::find(text) {
        Some(fm) => (frontmatter::decode(fm.body)?, &text[fm.end..]),
        None => (Config::new(), text),
    };

    let messages = SectionPattern::all()
        .sections(body)
        .into_iter()
        .map(|section| Message::new(section.role, section.content.trim()))
        .collect();

    Ok(Decoded {
        transcript: Transcript { config, messages },
        body,
    })
}

/// Parse transcript text into config and messages.
///
/// Returns [`crate::TranscriptError::MalformedConfig`] when front matter is
/// present but isn't a YAML mapping.
pub fn parse(text: &str) -> TranscriptResult<Transcript> {
    Transcript::parse(text)
}

/// Build the text of a transcript file.
///
/// Front matter is only written when `config` is non-empty. Each message
/// becomes `# Heading`, a blank line, then its content; sections are separated
/// by one blank line.
pub fn serialize(messages: &[Message], config: &Config) -> TranscriptResult<String> {
    let mut text = String::new();
    if !config.is_empty() {
        text.push_str(&frontmatter::encode(config)?);
        text.push('\n');
    }

    let sections: Vec<String> = messages.iter().map(Message::to_section).collect();
    text.push_str(&sections.join("\n"));
    Ok(text)
}

/// The text a section-free body is rewritten to: the whole body as a single
/// user message, keeping the config.
pub(crate) fn repair_text(config: &Config, body: &str) -> TranscriptResult<String> {
    serialize(&[Message::user(body.trim())], config)
}
