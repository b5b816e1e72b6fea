use schemars::schema_for;
use schemars::JsonSchema;
use std::fs;
use std::path::{Path, PathBuf};

use filechat_format::{Message, Role, Transcript};

fn write_schema<T: JsonSchema>(
    out_dir: &Path,
    name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let schema = schema_for!(T);
    let json = serde_json::to_string_pretty(&schema)?;
    fs::write(out_dir.join(format!("{name}.json")), json)?;
    Ok(())
}

fn schema_output_dir() -> PathBuf {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    manifest_dir.join("../../schema")
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let out_dir = schema_output_dir();
    fs::create_dir_all(&out_dir)?;

    write_schema::<Role>(&out_dir, "role")?;
    write_schema::<Message>(&out_dir, "message")?;
    write_schema::<Transcript>(&out_dir, "transcript")?;

    Ok(())
}
