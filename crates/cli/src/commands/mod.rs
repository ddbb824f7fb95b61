pub mod build;
pub mod init;
pub mod lint;
pub mod package;
pub mod resolve;

pub use build::build_command;
pub use init::init_command;
pub use lint::lint_command;
pub use package::package_command;
pub use resolve::resolve_command;
pub use test::test_command;

use anyhow::{Context, Result};
use phpbridge_core::{BuildPipeline, Config, config::ConfigValidator};
use std::env;
use std::path::PathBuf;
use tracing::debug;

/// Where the command runs and which config it uses
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub project_dir: PathBuf,
    pub config_path: Option<PathBuf>,
}

impl CommandContext {
    pub fn new(cwd: Option<PathBuf>, config_path: Option<PathBuf>) -> Result<Self> {
        let project_dir = match cwd {
            Some(dir) => dir,
            None => env::current_dir().context("Failed to get current directory")?,
        };
        let project_dir = project_dir.canonicalize().with_context(|| {
            format!("Project directory {} does not exist", project_dir.display())
        })?;
        Ok(Self {
            project_dir,
            config_path,
        })
    }

    /// Explicit config file, else the nearest one above the project directory
    pub fn load_config(&self) -> Result<Config> {
        let config = match &self.config_path {
            Some(path) => {
                let path = if path.is_absolute() {
                    path.clone()
                } else {
                    self.project_dir.join(path)
                };
                Config::load_from_file(&path)
                    .with_context(|| format!("Failed to load config from {}", path.display()))?
            }
            None => Config::discover(&self.project_dir).context("Failed to load configuration")?,
        };
        debug!("Using config rooted at {}", config.base_dir.display());

        ConfigValidator::new()
            .validate(&config)
            .context("Invalid configuration")?;
        Ok(config)
    }

    /// Pipeline for the CLI process, which owns the global search path
    pub fn pipeline(&self) -> Result<BuildPipeline> {
        Ok(BuildPipeline::new(self.load_config()?).with_global_search_path(true))
    }
}
