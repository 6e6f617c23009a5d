//! Error kinds for a channel generation run.
//!
//! Every failure is fatal. The variants let a wrapping scheduler tell
//! configuration problems apart from upstream or validation failures.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChannelError {
    /// No access token could be found.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The release listing endpoint answered with something other than 200.
    #[error("Failed to fetch releases: {status}. {body}")]
    Upstream { status: u16, body: String },

    /// The release JSON does not have the expected shape.
    #[error("Invalid release response: {0}")]
    Shape(String),

    /// The release tag does not carry a usable version.
    #[error("{0}")]
    Parse(String),

    /// No asset URL ends with the expected suffix.
    #[error("{label} asset not found. Available assets: [{}]", .available.join(", "))]
    AssetNotFound {
        label: &'static str,
        available: Vec<String>,
    },

    /// The channel document failed validation and was not written.
    #[error("Invalid channel field {field}: {reason}")]
    OutputValidation { field: &'static str, reason: String },
}

impl ChannelError {
    /// Process exit code for this kind of failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            ChannelError::Config(_) => 2,
            ChannelError::Upstream { .. } => 3,
            ChannelError::Shape(_) => 4,
            ChannelError::Parse(_) => 5,
            ChannelError::AssetNotFound { .. } => 6,
            ChannelError::OutputValidation { .. } => 7,
        }
    }
}

/// Exit code for an arbitrary error chain; 1 when no [`ChannelError`] is found.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<ChannelError>())
        .map(ChannelError::exit_code)
        .unwrap_or(1)
}
