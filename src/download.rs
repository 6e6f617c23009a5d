//! Release asset selection and download.

use anyhow::{Context, Result};
use log::debug;
use std::path::{Path, PathBuf};

use crate::error::ChannelError;
use crate::http::HttpClient;
use crate::provider::{Release, ReleaseAsset};
use crate::runtime::Runtime;
use crate::version::Version;

/// The two assets a channel needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Apk,
    Note,
}

impl AssetKind {
    /// Suffix the asset download URL must end with.
    pub fn suffix(self) -> &'static str {
        match self {
            AssetKind::Apk => ".apk",
            AssetKind::Note => ".md",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AssetKind::Apk => "Apk",
            AssetKind::Note => "Note",
        }
    }

    /// Local file name, `<version>.<ext>`.
    pub fn file_name(self, version: &Version) -> String {
        format!("{}{}", version.as_str(), self.suffix())
    }
}

/// Result of one asset download.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadedAsset {
    pub url: String,
    pub path: PathBuf,
    pub bytes: u64,
}

/// First asset whose download URL ends with the kind's suffix.
pub fn find_asset(release: &Release, kind: AssetKind) -> Result<&ReleaseAsset, ChannelError> {
    release
        .assets
        .iter()
        .find(|a| a.download_url.ends_with(kind.suffix()))
        .ok_or_else(|| ChannelError::AssetNotFound {
            label: kind.label(),
            available: release.asset_urls(),
        })
}

/// Downloads the asset of `kind` into `dest_dir` and returns its source URL
/// along with where it was written.
///
/// An existing file at the destination is removed before the download starts.
#[tracing::instrument(skip(runtime, release, version, http_client))]
pub async fn download_asset<R: Runtime>(
    runtime: &R,
    http_client: &HttpClient,
    release: &Release,
    kind: AssetKind,
    version: &Version,
    dest_dir: &Path,
) -> Result<DownloadedAsset> {
    let asset = find_asset(release, kind)?;
    let url = asset.download_url.clone();
    let path = dest_dir.join(kind.file_name(version));

    if runtime.exists(&path) {
        debug!("Removing existing {:?}", path);
        runtime.remove_file(&path)?;
    }

    println!(" downloading {} {}", kind.label().to_lowercase(), url);

    let bytes = http_client
        .download_file(&url, || {
            runtime
                .create_file(&path)
                .with_context(|| format!("Failed to create {:?}", path))
        })
        .await
        .with_context(|| format!("Failed to download {}", url))?;

    Ok(DownloadedAsset { url, path, bytes })
}
