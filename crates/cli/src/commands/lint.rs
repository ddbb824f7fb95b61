use anyhow::{Context, Result};

use super::CommandContext;
use crate::display::print_lint_report;

pub fn lint_command(ctx: &CommandContext) -> Result<i32> {
    let pipeline = ctx.pipeline()?;
    let report = pipeline.lint().context("Lint failed to run")?;
    print_lint_report(&report);
    report.into_result().context("Syntax check failed")?;
    Ok(0)
}
