//! Section grammar: locating `# Heading` sections in transcript text.
//!
//! A section starts with a heading line (`# User`, `# Assistant`, ...) that is
//! either at the very start of the text (after any blank lines) or preceded by
//! a blank line, and that is itself followed by a blank line or the end of the
//! text. Its content runs up to the next such heading or the end of the text.
//!
//! Heading lines that don't meet these rules, or whose role isn't part of the
//! pattern's role set, are ordinary content.

use crate::Role;
use regex::Regex;

/// A line of text with its byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Line<'a> {
    /// Offset of the first byte of the line
    pub start: usize,
    /// Line content without the trailing newline
    pub text: &'a str,
    /// Offset just past the trailing newline (or end of text)
    pub end: usize,
}

/// Split text into lines, keeping byte offsets.
pub(crate) fn lines(text: &str) -> Vec<Line<'_>> {
    let mut offset = 0;
    text.split_inclusive('\n')
        .map(|raw| {
            let start = offset;
            offset += raw.len();
            Line {
                start,
                text: raw.strip_suffix('\n').unwrap_or(raw),
                end: offset,
            }
        })
        .collect()
}

/// One section found in a piece of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionMatch<'a> {
    /// Role named by the heading
    pub role: Role,
    /// Start of the section, including the blank-line gap before the heading
    pub start: usize,
    /// Offset of the `#` of the heading line
    pub heading_start: usize,
    /// Raw content after the heading (untrimmed, may be empty)
    pub content: &'a str,
}

/// Recognizes sections for a subset of roles.
#[derive(Debug, Clone)]
pub struct SectionPattern {
    roles: Vec<Role>,
    heading: Option<Regex>,
}

impl SectionPattern {
    /// Build a pattern that only recognizes headings for `roles`.
    pub fn new(roles: &[Role]) -> Self {
        let alternatives: Vec<String> = roles
            .iter()
            .map(|role| regex::escape(role.heading()))
            .collect();
        // An empty alternation would match a bare `# `, so no roles means no regex.
        let heading = (!alternatives.is_empty()).then(|| {
            Regex::new(&format!("^# ({})$", alternatives.join("|")))
                .expect("escaped heading alternation is a valid regex")
        });

        Self {
            roles: roles.to_vec(),
            heading,
        }
    }

    /// Pattern recognizing every role.
    pub fn all() -> Self {
        Self::new(&Role::ALL)
    }

    /// The roles this pattern recognizes.
    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    /// Role of a heading line, if it is one of this pattern's headings.
    pub fn heading_role(&self, line: &str) -> Option<Role> {
        let captures = self.heading.as_ref()?.captures(line)?;
        Role::from_heading(captures.get(1)?.as_str())
    }

    /// All sections in `text`, in order.
    pub fn sections<'a>(&self, text: &'a str) -> Vec<SectionMatch<'a>> {
        let boundaries: Vec<(Role, usize, usize, usize)> = lines(text)
            .into_iter()
            .filter_map(|line| {
                let role = self.heading_role(line.text)?;
                let start = section_start(text, line.start)?;
                let heading_end = line.start + line.text.len();
                if !followed_by_gap(&text[heading_end..]) {
                    return None;
                }
                Some((role, start, line.start, heading_end))
            })
            .collect();

        boundaries
            .iter()
            .enumerate()
            .map(|(idx, &(role, start, heading_start, heading_end))| {
                let content_start = (heading_end + 2).min(text.len());
                let content = match boundaries.get(idx + 1) {
                    Some(&(_, next_start, _, _)) => {
                        &text[content_start..next_start.max(content_start)]
                    }
                    None => text[content_start..].trim_end_matches('\n'),
                };
                SectionMatch {
                    role,
                    start,
                    heading_start,
                    content,
                }
            })
            .collect()
    }

    /// The last section in `text`, if any.
    pub fn last<'a>(&self, text: &'a str) -> Option<SectionMatch<'a>> {
        self.sections(text).pop()
    }
}

/// Where a section whose heading begins at `heading_start` starts, if the
/// heading is allowed to begin a section there.
fn section_start(text: &str, heading_start: usize) -> Option<usize> {
    let before = &text[..heading_start];
    if before.bytes().all(|b| b == b'\n') {
        Some(0)
    } else if before.ends_with("\n\n") {
        Some(heading_start - 2)
    } else {
        None
    }
}

/// A heading must be followed by a blank line, or only newlines up to the end.
fn followed_by_gap(rest: &str) -> bool {
    rest.starts_with("\n\n") || rest.bytes().all(|b| b == b'\n')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pairs(pattern: &SectionPattern, text: &str) -> Vec<(Role, String)> {
        pattern
            .sections(text)
            .into_iter()
            .map(|s| (s.role, s.content.trim().to_string()))
            .collect()
    }

    #[test]
    fn test_lines_offsets() {
        let text = "ab\n\ncd";
        let lines = lines(text);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].text, "ab");
        assert_eq!(lines[1].start, 3);
        assert_eq!(lines[1].text, "");
        assert_eq!(lines[2].start, 4);
        assert_eq!(lines[2].end, 6);
    }

    #[test]
    fn test_basic_sections() {
        let text = "# System\n\nBe brief.\n\n# User\n\nHi there\n\n# Assistant\n\nHello!\n";
        assert_eq!(
            pairs(&SectionPattern::all(), text),
            vec![
                (Role::System, "Be brief.".to_string()),
                (Role::User, "Hi there".to_string()),
                (Role::Assistant, "Hello!".to_string()),
            ]
        );
    }

    #[test]
    fn test_content_spans_blank_lines() {
        let text = "# User\n\nfirst paragraph\n\nsecond paragraph\n";
        let sections = SectionPattern::all().sections(text);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].content, "first paragraph\n\nsecond paragraph");
    }

    #[test]
    fn test_heading_at_end_has_empty_content() {
        let text = "# User\n\nhi\n\n# Assistant\n\n";
        let sections = SectionPattern::all().sections(text);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[1].role, Role::Assistant);
        assert_eq!(sections[1].content, "");
    }

    #[test]
    fn test_empty_section_followed_by_heading() {
        let text = "# User\n\n# Assistant\n\nreply\n";
        assert_eq!(
            pairs(&SectionPattern::all(), text),
            vec![
                (Role::User, String::new()),
                (Role::Assistant, "reply".to_string()),
            ]
        );
    }

    #[test]
    fn test_heading_needs_blank_line_before() {
        let text = "# User\n\nline one\n# Assistant\n\nnot a section\n";
        let sections = SectionPattern::all().sections(text);
        assert_eq!(sections.len(), 1);
        assert!(sections[0].content.contains("# Assistant"));
    }

    #[test]
    fn test_heading_needs_blank_line_after() {
        let text = "# User\n\nhi\n\n# Assistant\nsame paragraph\n";
        let sections = SectionPattern::all().sections(text);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].content, "hi\n\n# Assistant\nsame paragraph");
    }

    #[test]
    fn test_unrecognized_headings_are_content() {
        let text = "# User\n\n# Notes\n\nstill user\n\n# user\n\nalso user\n";
        let sections = SectionPattern::all().sections(text);
        assert_eq!(sections.len(), 1);
        assert_eq!(
            sections[0].content,
            "# Notes\n\nstill user\n\n# user\n\nalso user"
        );
    }

    #[test]
    fn test_role_subset() {
        let text = "# System\n\nrules\n\n# User\n\nhi\n";
        let pattern = SectionPattern::new(&[Role::System]);
        assert_eq!(
            pairs(&pattern, text),
            vec![(Role::System, "rules\n\n# User\n\nhi".to_string())]
        );
        assert!(SectionPattern::new(&[]).sections(text).is_empty());
    }

    #[test]
    fn test_user_heading_ends_system_section() {
        let text = "# System\n\nExample:\n\n# User\n\nwhat is 2+2\n";
        assert_eq!(
            pairs(&SectionPattern::all(), text),
            vec![
                (Role::System, "Example:".to_string()),
                (Role::User, "what is 2+2".to_string()),
            ]
        );
    }

    #[test]
    fn test_section_starts() {
        let text = "\n# User\n\nhi\n\n# Assistant\n\nyo\n";
        let sections = SectionPattern::all().sections(text);
        assert_eq!(sections[0].start, 0);
        assert_eq!(sections[0].heading_start, 1);
        assert_eq!(sections[1].start, 11);
        assert_eq!(&text[sections[1].heading_start..][..11], "# Assistant");
    }

    #[test]
    fn test_leading_text_is_not_a_section() {
        let text = "preamble\n\n# User\n\nhi\n";
        let sections = SectionPattern::all().sections(text);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].start, 8);
    }

    #[test]
    fn test_no_sections() {
        assert!(SectionPattern::all().sections("hello world").is_empty());
        assert!(SectionPattern::all().sections("").is_empty());
        assert!(SectionPattern::all().last("# Users\n\nx").is_none());
    }
}
