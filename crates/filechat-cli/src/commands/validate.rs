//! Validate command - Check whether a transcript is ready to send.

use anyhow::Result;
use filechat_format::validate_default;
use std::path::Path;

use super::view::load;

pub fn run(path: &Path) -> Result<()> {
    println!("🔍 Validating: {:?}\n", path);

    let transcript = load(path)?;
    let result = validate_default(&transcript);

    if result.is_valid() && result.warnings.is_empty() {
        println!("✅ File is valid!");
        println!("   Messages: {}", transcript.messages.len());
        if let Some(model) = transcript.config.get("model").and_then(|v| v.as_str()) {
            println!("   Model:    {}", model);
        }
        return Ok(());
    }

    if !result.errors.is_empty() {
        println!("❌ Errors ({}):", result.errors.len());
        for error in &result.errors {
            println!("   • {}", error);
        }
        println!();
    }

    if !result.warnings.is_empty() {
        println!("⚠️  Warnings ({}):", result.warnings.len());
        for warning in &result.warnings {
            println!("   • {}", warning);
        }
        println!();
    }

    if result.is_valid() {
        println!("✅ File is valid (with warnings)");
        Ok(())
    } else {
        anyhow::bail!("Validation failed with {} error(s)", result.errors.len());
    }
}
