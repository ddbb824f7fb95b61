use anyhow::{Context, Result};
use std::path::PathBuf;

use super::CommandContext;
use phpbridge_core::BuildPipeline;

pub fn package_command(ctx: &CommandContext, output: Option<PathBuf>) -> Result<i32> {
    let mut config = ctx.load_config()?;
    if let Some(output) = output {
        let output = if output.is_absolute() { output } else { ctx.project_dir.join(output) };
        config.archive_destination = Some(output);
    }
    let pipeline = BuildPipeline::new(config).with_global_search_path(true);

    let include_path = pipeline.resolve().context("Dependency resolution failed")?;
    let package = pipeline.package(&include_path).context("Packaging failed")?;

    println!(
        "📦 Wrote {} ({} files)",
        package.destination.display(),
        package.layout.len()
    );
    Ok(0)
}
