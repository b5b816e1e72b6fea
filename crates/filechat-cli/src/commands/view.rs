//! View command - Print a parsed transcript to stdout without modifying it.

use anyhow::{Context, Result};
use filechat_format::{parse, Transcript};
use std::fs;
use std::path::Path;

pub fn run(path: &Path, json: bool) -> Result<()> {
    let transcript = load(path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&transcript)?);
        return Ok(());
    }

    if !transcript.config.is_empty() {
        println!("=== CONFIG ===");
        println!("{}", serde_yaml::to_string(&transcript.config)?.trim_end());
        println!();
    }

    if transcript.messages.is_empty() {
        println!("(no messages)");
        return Ok(());
    }

    for (idx, message) in transcript.messages.iter().enumerate() {
        println!("[{}] {}:", idx + 1, message.role.heading().to_uppercase());
        if message.content.is_empty() {
            println!("(empty)");
        } else {
            println!("{}", message.content);
        }
        println!();
    }

    Ok(())
}

pub(crate) fn load(path: &Path) -> Result<Transcript> {
    let text =
        fs::read_to_string(path).with_context(|| format!("Failed to read: {:?}", path))?;
    parse(&text).with_context(|| format!("Failed to parse: {:?}", path))
}
