//! Format command - Normalize heading spacing in place.

use anyhow::{Context, Result};
use filechat_format::TranscriptFile;
use std::path::Path;

pub fn run(path: &Path) -> Result<()> {
    let file = TranscriptFile::new(path);
    let before = file
        .read_text()
        .with_context(|| format!("Failed to read: {:?}", path))?;

    file.format()
        .with_context(|| format!("Failed to format: {:?}", path))?;

    if file.read_text()? == before {
        println!("✅ Already formatted: {}", path.display());
    } else {
        println!("✨ Formatted: {}", path.display());
    }
    Ok(())
}
