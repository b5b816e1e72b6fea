//! Leading `---` front matter holding per-file configuration.

use crate::grammar::lines;
use crate::{Config, TranscriptError, TranscriptResult, FRONT_MATTER_DELIMITER};

/// A front matter block found at the start of a text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FrontMatter<'a> {
    /// The YAML between the delimiter lines
    pub body: &'a str,
    /// Offset just past the closing delimiter line
    pub end: usize,
}

fn is_delimiter(line: &str) -> bool {
    line.trim_end() == FRONT_MATTER_DELIMITER
}

/// Find the front matter block at the start of `text`.
///
/// The first line must be a `---` delimiter; the block ends at the next `---`
/// line. Without a closing delimiter there is no front matter.
pub(crate) fn find(text: &str) -> Option<FrontMatter<'_>> {
    let lines = lines(text);
    let (opening, rest) = lines.split_first()?;
    if !is_delimiter(opening.text) {
        return None;
    }

    let closing = rest.iter().find(|line| is_delimiter(line.text))?;
    let body = &text[opening.end..closing.start];
    Some(FrontMatter {
        body: body.strip_suffix('\n').unwrap_or(body),
        end: closing.end,
    })
}

/// Decode a front matter body into a config mapping.
///
/// An empty body yields an empty config. Anything that isn't valid YAML, or
/// isn't a mapping with string keys (`1: a` is rejected), is a
/// [`TranscriptError::MalformedConfig`].
pub(crate) fn decode(body: &str) -> TranscriptResult<Config> {
    let value: serde_yaml::Value =
        serde_yaml::from_str(body).map_err(|e| TranscriptError::MalformedConfig {
            message: e.to_string(),
            source: Some(e),
        })?;

    match value {
        serde_yaml::Value::Null => Ok(Config::new()),
        serde_yaml::Value::Mapping(mapping) => {
            if let Some(key) = mapping.keys().find(|key| !key.is_string()) {
                return Err(TranscriptError::MalformedConfig {
                    message: format!("keys must be strings, found {}", value_kind(key)),
                    source: None,
                });
            }
            serde_yaml::from_value(serde_yaml::Value::Mapping(mapping)).map_err(|e| {
                TranscriptError::MalformedConfig {
                    message: e.to_string(),
                    source: Some(e),
                }
            })
        }
        other => Err(TranscriptError::MalformedConfig {
            message: format!("expected a mapping, found {}", value_kind(&other)),
            source: None,
        }),
    }
}

/// Encode a config mapping as a complete front matter block (with delimiters).
pub(crate) fn encode(config: &Config) -> TranscriptResult<String> {
    let yaml = serde_yaml::to_string(config).map_err(TranscriptError::ConfigEncode)?;
    Ok(format!(
        "{FRONT_MATTER_DELIMITER}\n{}\n{FRONT_MATTER_DELIMITER}\n",
        yaml.trim()
    ))
}

fn value_kind(value: &serde_yaml::Value) -> &'static str {
    match value {
        serde_yaml::Value::Null => "null",
        serde_yaml::Value::Bool(_) => "a boolean",
        serde_yaml::Value::Number(_) => "a number",
        serde_yaml::Value::String(_) => "a string",
        serde_yaml::Value::Sequence(_) => "a sequence",
        serde_yaml::Value::Mapping(_) => "a mapping",
        serde_yaml::Value::Tagged(_) => "a tagged value",
    }
}
