//! Process-wide include path for in-process collaborators.
//!
//! Every build stage receives its [`IncludePath`] as a parameter. Code that
//! needs a process-lifetime search path (an embedded interpreter, a host
//! plugin calling back into this crate) takes the `&'static` reference
//! [`install`] returns. It may be called once per process; repeating the
//! call with the same path is a no-op.

use std::sync::OnceLock;

use crate::{
    error::{Error, Result},
    types::IncludePath,
};

static INSTALLED: OnceLock<IncludePath> = OnceLock::new();

/// Install `path` as the process-wide include path.
///
/// Fails if a different path was installed earlier in this process; the
/// installed path is never extended.
pub fn install(path: &IncludePath) -> Result<&'static IncludePath> {
    let installed = INSTALLED.get_or_init(|| {
        tracing::debug!("Installing process include path: {}", path.to_search_path());
        path.clone()
    });
    if installed != path {
        return Err(Error::Config(format!(
            "Process include path already installed as '{}', refusing '{}'",
            installed.to_search_path(),
            path.to_search_path()
        )));
    }
    Ok(installed)
}
