use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::{
    CommandContext, build_command, init_command, lint_command, package_command, resolve_command,
    test_command,
};

#[derive(Parser, Debug)]
#[command(name = "phpbridge")]
#[command(version, about, long_about = None, propagate_version = true)]
#[command(subcommand_required = true, arg_required_else_help = true)]
#[command(after_help = "ENVIRONMENT:\n    RUST_LOG=debug    Enable debug logging")]
pub struct Cli {
    /// Project directory to work in (defaults to the current directory)
    #[arg(short = 'C', long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Use this config file instead of searching for one
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a default .phpbridge.json
    Init {
        /// Overwrite an existing configuration
        #[arg(short, long)]
        force: bool,
    },
    /// Resolve dependencies and print the include path
    #[command(visible_alias = "r")]
    Resolve {
        /// Print the include path as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check sources and tests with `php -l`
    #[command(visible_alias = "l")]
    Lint,
    /// Synthesize the suite and run PHPUnit
    #[command(visible_alias = "t")]
    Test {
        /// Run only this test file
        file: Option<PathBuf>,

        /// Print the runner command lines without executing them
        #[arg(short, long)]
        dry_run: bool,
    },
    /// Package dependencies and sources into an archive
    #[command(visible_alias = "p")]
    Package {
        /// Archive to write (overrides archive_destination)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Resolve, package and test
    #[command(visible_alias = "b")]
    Build {
        /// Print the build report as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    /// Run the selected command; returns the process exit code
    pub fn execute(self) -> Result<i32> {
        let ctx = CommandContext::new(self.cwd, self.config)?;
        match self.command {
            Commands::Init { force } => init_command(&ctx, force),
            Commands::Resolve { json } => resolve_command(&ctx, json),
            Commands::Lint => lint_command(&ctx),
            Commands::Test { file, dry_run } => test_command(&ctx, file.as_deref(), dry_run),
            Commands::Package { output } => package_command(&ctx, output),
            Commands::Build { json } => build_command(&ctx, json),
        }
    }
}
