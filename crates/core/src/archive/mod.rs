//! Archive packager: plan a collision-free layout, then write it atomically

pub mod layout;
pub mod phar;
pub mod tar_writer;

pub use layout::{ArchiveLayout, LayoutEntry};
pub use phar::PharOptions;

use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::{
    config::Config,
    error::{Error, Result},
    impl_case_insensitive_deserialize,
    types::IncludePath,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArchiveFormat {
    #[default]
    Tar,
    Phar,
}

impl_case_insensitive_deserialize!(
    ArchiveFormat,
    Tar => "tar",
    Phar => "phar"
);

impl ArchiveFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ArchiveFormat::Tar => "tar",
            ArchiveFormat::Phar => "phar",
        }
    }
}

/// Writes deterministic archives of an include path plus project sources
#[derive(Debug, Clone, Default)]
pub struct Packager {
    format: ArchiveFormat,
    namespace_map: BTreeMap<String, String>,
    phar: PharOptions,
}

impl Packager {
    pub fn new(format: ArchiveFormat) -> Self {
        Self {
            format,
            ..Self::default()
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let alias = config
            .phar
            .alias
            .clone()
            .or_else(|| {
                config
                    .archive_destination
                    .as_deref()
                    .and_then(Path::file_name)
                    .map(|n| n.to_string_lossy().into_owned())
            })
            .unwrap_or_default();
        Self {
            format: config.archive_format,
            namespace_map: config.namespace_map.clone(),
            phar: PharOptions {
                stub: config.phar.stub.clone().unwrap_or_default(),
                alias,
                metadata: config.phar.metadata.clone(),
            },
        }
    }

    pub fn with_namespace(mut self, key: impl Into<String>, namespace: impl Into<String>) -> Self {
        self.namespace_map.insert(key.into(), namespace.into());
        self
    }

    pub fn with_phar_options(mut self, options: PharOptions) -> Self {
        self.phar = options;
        self
    }

    pub fn format(&self) -> ArchiveFormat {
        self.format
    }

    /// Plan the layout and write it to `destination`.
    ///
    /// Collisions are detected before any byte is written; a failed write
    /// leaves `destination` untouched.
    pub fn pack(
        &self,
        include_path: &IncludePath,
        project_sources: &[PathBuf],
        destination: &Path,
    ) -> Result<ArchiveLayout> {
        let layout = ArchiveLayout::plan(include_path, project_sources, &self.namespace_map)?;
        info!(
            "Packaging {} files into {} ({:?})",
            layout.len(),
            destination.display(),
            self.format
        );

        let parent = match destination.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent)?;
        let temp = NamedTempFile::new_in(&parent)?;

        let writer = BufWriter::new(temp);
        let mut writer = match self.format {
            ArchiveFormat::Tar => tar_writer::write_tar(&layout, writer)?,
            ArchiveFormat::Phar => phar::write_phar(&layout, &self.phar, writer)?,
        };
        writer.flush()?;
        let temp = writer.into_inner().map_err(|e| Error::Io(e.into_error()))?;
        temp.as_file().sync_all()?;
        temp.persist(destination).map_err(|e| Error::Io(e.error))?;

        debug!("Wrote {}", destination.display());
        Ok(layout)
    }
}

/// Pack with the default tar format and no namespace mapping
pub fn pack(
    include_path: &IncludePath,
    project_sources: &[PathBuf],
    destination: &Path,
) -> Result<ArchiveLayout> {
    Packager::default().pack(include_path, project_sources, destination)
}
