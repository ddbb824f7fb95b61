use anyhow::{Context, Result};

use super::CommandContext;
use crate::display::print_include_path;

pub fn resolve_command(ctx: &CommandContext, json: bool) -> Result<i32> {
    let pipeline = ctx.pipeline()?;
    let include_path = pipeline.resolve().context("Dependency resolution failed")?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&include_path).context("Failed to serialize include path")?
        );
    } else {
        print_include_path(&include_path);
    }
    Ok(0)
}
