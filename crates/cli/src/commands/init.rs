use anyhow::{Context, Result};
use phpbridge_core::{Config, config::CONFIG_FILE_NAMES};
use std::path::PathBuf;

use super::CommandContext;

pub fn init_command(ctx: &CommandContext, force: bool) -> Result<i32> {
    let config_path = ctx.project_dir.join(CONFIG_FILE_NAMES[0]);

    if config_path.exists() && !force {
        println!("❌ Config already exists at: {}", config_path.display());
        println!("   Use --force to overwrite");
        return Ok(0);
    }

    let config = Config {
        base_dir: ctx.project_dir.clone(),
        archive_destination: Some(PathBuf::from("target").join(format!(
            "{}.tar",
            project_name(ctx)
        ))),
        ..Config::default()
    };
    config
        .save_to_file(&config_path)
        .with_context(|| format!("Failed to write config to {}", config_path.display()))?;

    println!("✅ Created config: {}", config_path.display());
    println!("\n📌 Next steps:");
    println!("   Declare dependencies as \"group:artifact:version\" in 'dependencies'");
    println!("   Run 'phpbridge resolve' to check the include path");
    Ok(0)
}

fn project_name(ctx: &CommandContext) -> String {
    ctx.project_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "project".to_string())
}
