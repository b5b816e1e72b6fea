//! Heading normalization for transcript text.
//!
//! Every recognized role heading ends up with exactly one blank line before
//! and after it. Front matter, fenced code blocks and `$$` math blocks are
//! opaque: they pass through unchanged, so a `# User` line inside a code
//! sample stays where it is.

use crate::frontmatter;
use crate::grammar::{lines, Line, SectionPattern};
use crate::Role;

/// A piece of transcript text as seen by the formatter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block<'a> {
    /// Front matter, fenced code or math, copied verbatim
    Opaque(&'a str),
    /// A recognized role heading line
    Heading(Role),
    /// Any other line, without its newline
    Line(&'a str),
}

fn is_fence_open(line: &str) -> bool {
    line.trim_start().starts_with("```")
}

fn is_fence_close(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= 3 && trimmed.bytes().all(|b| b == b'`')
}

fn is_math_delimiter(line: &str) -> bool {
    line.trim() == "$$"
}

/// Index of the first line after `open` that closes the block, if any.
fn find_close(lines: &[Line<'_>], open: usize, is_close: fn(&str) -> bool) -> Option<usize> {
    lines[open + 1..]
        .iter()
        .position(|line| is_close(line.text))
        .map(|offset| open + 1 + offset)
}

fn scan<'a>(text: &'a str, pattern: &SectionPattern) -> Vec<Block<'a>> {
    let mut blocks = Vec::new();
    let mut start = 0;

    if let Some(fm) = frontmatter::find(text) {
        blocks.push(Block::Opaque(&text[..fm.end]));
        start = fm.end;
    }

    let lines = lines(&text[start..]);
    let rest = &text[start..];
    let mut idx = 0;
    while idx < lines.len() {
        let line = lines[idx];
        let close = if is_fence_open(line.text) {
            find_close(&lines, idx, is_fence_close)
        } else if is_math_delimiter(line.text) {
            find_close(&lines, idx, is_math_delimiter)
        } else {
            None
        };

        if let Some(close) = close {
            blocks.push(Block::Opaque(&rest[line.start..lines[close].end]));
            idx = close + 1;
            continue;
        }

        match pattern.heading_role(line.text) {
            Some(role) => blocks.push(Block::Heading(role)),
            None => blocks.push(Block::Line(line.text)),
        }
        idx += 1;
    }

    blocks
}

/// Normalize heading spacing in transcript text.
///
/// The result is trimmed and ends with exactly one newline. Formatting is
/// idempotent, and the output of [`crate::serialize`] is already formatted.
pub fn format_text(text: &str) -> String {
    let pattern = SectionPattern::all();
    // The output is trimmed, so scan the trimmed text: a last line like
    // `# User  ` must be classified the way it will finally read.
    let text = text.trim();

    let mut out = String::with_capacity(text.len() + 16);
    let mut pending_blank = 0usize;
    let mut after_heading = false;

    for block in scan(text, &pattern) {
        match block {
            Block::Line("") => {
                if !after_heading {
                    pending_blank += 1;
                }
            }
            Block::Line(line) => {
                push_blank_lines(&mut out, &mut pending_blank);
                out.push_str(line);
                out.push('\n');
                after_heading = false;
            }
            Block::Opaque(raw) => {
                push_blank_lines(&mut out, &mut pending_blank);
                out.push_str(raw);
                if !raw.ends_with('\n') {
                    out.push('\n');
                }
                after_heading = false;
            }
            Block::Heading(role) => {
                pending_blank = 0;
                if !out.is_empty() && !after_heading {
                    out.push('\n');
                }
                out.push_str(&role.heading_line());
                out.push_str("\n\n");
                after_heading = true;
            }
        }
    }

    let mut formatted = out.trim().to_string();
    formatted.push('\n');
    formatted
}

fn push_blank_lines(out: &mut String, pending: &mut usize) {
    for _ in 0..*pending {
        out.push('\n');
    }
    *pending = 0;
}
