//! Release provider abstraction.
//!
//! A provider answers one question: what is the latest published release of
//! a repository, and which assets does it carry.

mod github;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ChannelError;

pub use github::{DEFAULT_API_URL, GitHubProvider};

/// Longest tag name accepted from the API.
pub const MAX_TAG_LEN: usize = 10;

/// Longest asset download URL accepted from the API.
pub const MAX_URL_LEN: usize = 1000;

/// Repository identifier (owner/repo format).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoId {
    pub owner: String,
    pub repo: String,
}

impl RepoId {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

impl FromStr for RepoId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').collect();
        if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
            anyhow::bail!("Invalid repository format. Expected 'owner/repo'.")
        } else {
            Ok(RepoId::new(parts[0], parts[1]))
        }
    }
}

/// A downloadable asset from a release.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseAsset {
    pub name: Option<String>,
    pub download_url: String,
}

/// A validated release: short tag, at least one asset, absolute asset URLs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Release {
    /// Version tag (e.g., "v29.0")
    pub tag: String,
    pub assets: Vec<ReleaseAsset>,
}

impl Release {
    /// Checks the release against the accepted shape.
    pub fn validate(self) -> Result<Self, ChannelError> {
        let tag_len = self.tag.chars().count();
        if tag_len == 0 || tag_len > MAX_TAG_LEN {
            return Err(ChannelError::Shape(format!(
                "tag_name must be 1 to {} characters, got {:?}",
                MAX_TAG_LEN, self.tag
            )));
        }

        if self.assets.is_empty() {
            return Err(ChannelError::Shape(
                "assets must contain at least one item".to_string(),
            ));
        }

        for asset in &self.assets {
            validate_download_url(&asset.download_url)?;
        }

        Ok(self)
    }

    /// Download URLs of every asset, in API order.
    pub fn asset_urls(&self) -> Vec<String> {
        self.assets.iter().map(|a| a.download_url.clone()).collect()
    }
}

fn validate_download_url(raw: &str) -> Result<(), ChannelError> {
    let len = raw.chars().count();
    if len == 0 || len > MAX_URL_LEN {
        return Err(ChannelError::Shape(format!(
            "browser_download_url must be 1 to {} characters",
            MAX_URL_LEN
        )));
    }

    let parsed = url::Url::parse(raw).map_err(|e| {
        ChannelError::Shape(format!("browser_download_url {:?} is not a URL: {}", raw, e))
    })?;

    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(ChannelError::Shape(format!(
            "browser_download_url {:?} must be an absolute http(s) URL",
            raw
        )));
    }

    Ok(())
}

/// Trait for release providers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Provider: Send + Sync {
    /// Fetch and validate the latest published release
    async fn latest_release(&self, repo: &RepoId) -> Result<Release>;
}
