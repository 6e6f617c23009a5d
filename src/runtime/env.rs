//! Environment variables, dotenv loading and working directory.

use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

use super::RealRuntime;

impl RealRuntime {
    #[tracing::instrument(skip(self))]
    pub(crate) fn env_var_impl(&self, key: &str) -> Result<String, env::VarError> {
        env::var(key)
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn load_env_file_impl(&self, path: &Path) -> Result<()> {
        dotenvy::from_path(path)
            .with_context(|| format!("Failed to load environment file {}", path.display()))
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn current_dir_impl(&self) -> Result<PathBuf> {
        env::current_dir().context("Failed to determine current directory")
    }
}
