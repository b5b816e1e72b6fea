//! # filechat-format
//!
//! A chat transcript kept as a plain-text file: optional YAML front matter
//! followed by `# System`, `# User` and `# Assistant` sections. This crate
//! provides:
//! - The role/heading table
//! - The section grammar used to find messages in text
//! - A formatter that normalizes heading spacing
//! - Parsing and serialization of transcripts
//! - Incremental file updates for streaming a reply into a transcript
//!
//! ## Example
//!
//! ```rust,no_run
//! use filechat_format::{Role, TranscriptFile};
//!
//! let file = TranscriptFile::new("chat.md");
//! file.format()?;
//! let transcript = file.load()?;
//! for message in &transcript.messages {
//!     println!("{}: {}", message.role, message.content);
//! }
//!
//! file.append_heading(Role::Assistant)?;
//! file.append_raw("Hello!")?;
//! # Ok::<(), filechat_format::TranscriptError>(())
//! ```

mod error;
mod file;
mod format;
mod frontmatter;
mod grammar;
mod role;
mod transcript;
mod validation;

pub use error::*;
pub use file::*;
pub use format::format_text;
pub use grammar::{SectionMatch, SectionPattern};
pub use role::Role;
pub use transcript::{parse, serialize, Config, Message, Transcript};
pub use validation::*;

/// Line delimiting the front matter block
pub const FRONT_MATTER_DELIMITER: &str = "---";

/// Conventional file extension for transcripts
pub const FILE_EXTENSION: &str = "md";
