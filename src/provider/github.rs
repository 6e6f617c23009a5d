//! GitHub provider implementation.

use anyhow::Result;
use async_trait::async_trait;
use log::debug;

use crate::http::HttpClient;

use super::{Provider, Release, ReleaseAsset, RepoId};

/// Public GitHub REST API.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// GitHub API response types (internal).
mod api {
    use serde::Deserialize;

    #[derive(Deserialize, Debug)]
    pub struct Release {
        pub tag_name: String,
        pub assets: Vec<Asset>,
    }

    #[derive(Deserialize, Debug)]
    pub struct Asset {
        #[serde(default)]
        pub name: Option<String>,
        pub browser_download_url: String,
    }
}

/// GitHub provider implementation.
pub struct GitHubProvider {
    http_client: HttpClient,
    api_url: String,
}

impl GitHubProvider {
    /// Create from an existing HttpClient.
    pub fn from_http_client(http_client: HttpClient, api_url: &str) -> Self {
        Self {
            http_client,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn latest_release_url(&self, repo: &RepoId) -> String {
        format!(
            "{}/repos/{}/{}/releases/latest",
            self.api_url, repo.owner, repo.repo
        )
    }
}

#[async_trait]
impl Provider for GitHubProvider {
    #[tracing::instrument(skip(self))]
    async fn latest_release(&self, repo: &RepoId) -> Result<Release> {
        let url = self.latest_release_url(repo);
        debug!("Fetching latest release of {} from {}...", repo, url);

        let release: api::Release = self.http_client.get_json(&url).await?;
        Ok(Release::from(release).validate()?)
    }
}

impl From<api::Release> for Release {
    fn from(r: api::Release) -> Self {
        Release {
            tag: r.tag_name,
            assets: r.assets.into_iter().map(|a| a.into()).collect(),
        }
    }
}

impl From<api::Asset> for ReleaseAsset {
    fn from(a: api::Asset) -> Self {
        ReleaseAsset {
            name: a.name,
            download_url: a.browser_download_url,
        }
    }
}
