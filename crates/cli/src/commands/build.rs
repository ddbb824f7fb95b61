use anyhow::{Context, Result};

use super::CommandContext;
use crate::display::{print_build_result, print_include_path, print_lint_report};

pub fn build_command(ctx: &CommandContext, json: bool) -> Result<i32> {
    let pipeline = ctx.pipeline()?;
    let report = pipeline.build().context("Build failed")?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize build report")?
        );
    } else {
        print_include_path(&report.include_path);
        if let Some(lint) = &report.lint {
            print_lint_report(lint);
        }
        if let Some(package) = &report.package {
            println!(
                "📦 Wrote {} ({} files)",
                package.destination.display(),
                package.layout.len()
            );
        }
        print_build_result(&report.tests);
    }
    if let Some(err) = report.tests.runner_error() {
        eprintln!("❌ {err}");
    }
    Ok(report.exit_code())
}
