//! Output directory management.

use anyhow::Result;
use log::debug;
use std::path::{Path, PathBuf};

use crate::runtime::Runtime;

/// Name of the output directory inside the base directory.
pub const DIST_DIR_NAME: &str = "dist";

/// The output directory of a run and the files placed in it.
#[derive(Debug, Clone, PartialEq)]
pub struct DistDir {
    path: PathBuf,
}

impl DistDir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<base>/dist`
    pub fn in_base(base: &Path) -> Self {
        Self::new(base.join(DIST_DIR_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of a file directly inside the directory.
    pub fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    /// Deletes the directory with everything in it, then creates it empty.
    ///
    /// The parent must already exist.
    #[tracing::instrument(skip(runtime))]
    pub fn prepare<R: Runtime>(&self, runtime: &R) -> Result<()> {
        if runtime.exists(&self.path) {
            debug!("Removing previous output {:?}", self.path);
            runtime.remove_dir_all(&self.path)?;
        }
        runtime.create_dir(&self.path)?;
        Ok(())
    }
}
