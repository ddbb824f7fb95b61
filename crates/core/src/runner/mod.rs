//! Runner adapter: detect, normalize, execute, collect

pub mod adapter;
pub mod collect;
pub mod normalize;
pub mod process;
pub mod profile;

pub use adapter::{InvocationTarget, RunnerAdapter, RunnerOptions};
pub use normalize::{Normalized, RunTarget};
pub use process::ProcessOutput;
pub use profile::RunnerProfile;

use crate::{
    error::Result,
    types::{BuildResult, IncludePath},
};

/// Run `target` with default options and the declaration scanner
pub fn invoke(
    target: InvocationTarget,
    include_path: &IncludePath,
    hint: Option<RunnerProfile>,
) -> Result<BuildResult> {
    RunnerAdapter::new(RunnerOptions::default()).invoke(target, include_path, hint)
}
