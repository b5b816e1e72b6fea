//! Checks run on a transcript before it is sent for completion.

use crate::{Role, Transcript, ValidationError};

/// Validation options.
#[derive(Debug, Clone)]
pub struct ValidationOptions {
    /// Warn when blank messages trail the transcript
    pub warn_trailing_blank: bool,
    /// Warn when the last message was written by the assistant
    pub warn_assistant_last: bool,
    /// Warn when a system message appears after the first position
    pub warn_late_system: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            warn_trailing_blank: true,
            warn_assistant_last: true,
            warn_late_system: true,
        }
    }
}

/// Validation result.
#[derive(Debug)]
pub struct ValidationResult {
    /// Hard errors: the transcript can't be sent as is
    pub errors: Vec<ValidationError>,
    /// Warnings that don't block a request
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Returns true if there are no errors.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validate a transcript.
pub fn validate(transcript: &Transcript, options: &ValidationOptions) -> ValidationResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let trailing = transcript.trailing_blank_count();
    let sendable = &transcript.messages[..transcript.messages.len() - trailing];

    if sendable.is_empty() {
        errors.push(ValidationError::NoMessages);
    } else if !sendable.iter().any(|m| m.role == Role::User) {
        errors.push(ValidationError::NoUserMessage);
    }

    if options.warn_trailing_blank && trailing > 0 {
        warnings.push(format!(
            "{} blank message(s) at the end will be removed",
            trailing
        ));
    }

    if options.warn_assistant_last {
        if let Some(last) = sendable.last() {
            if last.role == Role::Assistant {
                warnings.push("The last message is an assistant message".to_string());
            }
        }
    }

    if options.warn_late_system {
        for (idx, message) in sendable.iter().enumerate().skip(1) {
            if message.role == Role::System {
                warnings.push(format!("System message at position {} is not first", idx + 1));
            }
        }
    }

    ValidationResult { errors, warnings }
}

/// Validate a transcript with default options.
pub fn validate_default(transcript: &Transcript) -> ValidationResult {
    validate(transcript, &ValidationOptions::default())
}
