//! Run configuration: token, upstream repository and paths.

use anyhow::Result;
use log::debug;
use std::path::PathBuf;
use std::time::Duration;

use crate::channel::DEFAULT_CHANNEL;
use crate::dist::DistDir;
use crate::error::ChannelError;
use crate::http::{ClientConfig, mask_token};
use crate::provider::{DEFAULT_API_URL, RepoId};
use crate::runtime::Runtime;

/// Preferred token variable.
pub const TOKEN_VAR: &str = "APP_GITHUB_TOKEN";

/// Token variable used when [`TOKEN_VAR`] is unset.
pub const FALLBACK_TOKEN_VAR: &str = "GITHUB_TOKEN";

/// Dotenv file looked up in the base directory.
pub const ENV_FILE_NAME: &str = ".env";

pub const DEFAULT_OWNER: &str = "topjohnwu";
pub const DEFAULT_REPO: &str = "Magisk";

/// Options collected from the command line.
#[derive(Debug, Clone)]
pub struct ConfigOptions {
    /// Directory holding `.env` and `dist`; the working directory when unset
    pub base_dir: Option<PathBuf>,
    pub repo: RepoId,
    pub api_url: String,
    pub timeout: Option<Duration>,
    pub channel: String,
}

impl Default for ConfigOptions {
    fn default() -> Self {
        Self {
            base_dir: None,
            repo: RepoId::new(DEFAULT_OWNER, DEFAULT_REPO),
            api_url: DEFAULT_API_URL.to_string(),
            timeout: None,
            channel: DEFAULT_CHANNEL.to_string(),
        }
    }
}

/// Fully resolved configuration of a run.
#[derive(Debug, Clone)]
pub struct Config {
    pub base_dir: PathBuf,
    pub dist: DistDir,
    pub repo: RepoId,
    pub api_url: String,
    pub channel: String,
    pub client: ClientConfig,
}

impl Config {
    /// Resolves the base directory, loads `<base>/.env` when present and
    /// looks up the access token.
    ///
    /// Fails with [`ChannelError::Config`] when no token is available.
    #[tracing::instrument(skip(runtime))]
    pub fn load<R: Runtime>(runtime: &R, options: ConfigOptions) -> Result<Self> {
        let base_dir = match options.base_dir {
            Some(dir) => dir,
            None => runtime.current_dir()?,
        };

        let env_file = base_dir.join(ENV_FILE_NAME);
        if runtime.is_file(&env_file) {
            debug!("Loading environment from {:?}", env_file);
            runtime.load_env_file(&env_file)?;
        }

        let token = resolve_token(runtime)?;
        debug!("Using token {}", mask_token(&token));

        Ok(Config {
            dist: DistDir::in_base(&base_dir),
            base_dir,
            repo: options.repo,
            api_url: options.api_url,
            channel: options.channel,
            client: ClientConfig::new(token).with_timeout(options.timeout),
        })
    }
}

/// `APP_GITHUB_TOKEN`, then `GITHUB_TOKEN`. Empty values count as unset.
pub fn resolve_token<R: Runtime>(runtime: &R) -> Result<String, ChannelError> {
    [TOKEN_VAR, FALLBACK_TOKEN_VAR]
        .into_iter()
        .filter_map(|key| runtime.env_var(key).ok())
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .ok_or_else(|| {
            ChannelError::Config(format!(
                "Unable to find github token in environment variables ({} or {}).",
                TOKEN_VAR, FALLBACK_TOKEN_VAR
            ))
        })
}
