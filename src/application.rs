//! Channel generation use case.
//!
//! Strictly sequential: prepare `dist`, fetch the latest release, download
//! the apk, download the notes, write the channel file. The first failure
//! ends the run and leaves already written files in place.

use anyhow::Result;
use log::info;
use std::path::PathBuf;

use crate::channel::Channel;
use crate::config::Config;
use crate::dist::DistDir;
use crate::download::{AssetKind, DownloadedAsset, download_asset};
use crate::http::HttpClient;
use crate::provider::{GitHubProvider, Provider, RepoId};
use crate::runtime::Runtime;
use crate::version::Version;

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub tag: String,
    pub version: Version,
    pub apk: DownloadedAsset,
    pub note: DownloadedAsset,
    pub channel_path: PathBuf,
}

impl RunSummary {
    pub fn downloaded_bytes(&self) -> u64 {
        self.apk.bytes + self.note.bytes
    }
}

/// Runs the job with a GitHub provider built from `config`.
#[tracing::instrument(skip(runtime, config))]
pub async fn run<R: Runtime>(runtime: &R, config: &Config) -> Result<RunSummary> {
    let http_client = HttpClient::new(config.client.build_client()?);
    let provider = GitHubProvider::from_http_client(http_client.clone(), &config.api_url);

    generate(
        runtime,
        &provider,
        &http_client,
        &config.repo,
        &config.dist,
        &config.channel,
    )
    .await
}

/// Generates the channel for `repo` into `dist` using the given provider.
#[tracing::instrument(skip(runtime, provider, http_client))]
pub async fn generate<R: Runtime, P: Provider + ?Sized>(
    runtime: &R,
    provider: &P,
    http_client: &HttpClient,
    repo: &RepoId,
    dist: &DistDir,
    channel_name: &str,
) -> Result<RunSummary> {
    dist.prepare(runtime)?;

    println!("    fetching {} latest release", repo);
    let release = provider.latest_release(repo).await?;
    let version = Version::from_tag(&release.tag)?;
    info!("Latest release {} is version {}", release.tag, version);

    let apk = download_asset(
        runtime,
        http_client,
        &release,
        AssetKind::Apk,
        &version,
        dist.path(),
    )
    .await?;
    let note = download_asset(
        runtime,
        http_client,
        &release,
        AssetKind::Note,
        &version,
        dist.path(),
    )
    .await?;

    println!("  generating {}.json", channel_name);
    let channel = Channel::new(&version, &apk.url, &note.url);
    let channel_path = channel.write(runtime, dist.path(), channel_name)?;

    Ok(RunSummary {
        tag: release.tag,
        version,
        apk,
        note,
        channel_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::DEFAULT_CHANNEL;
    use crate::error::ChannelError;
    use crate::provider::{MockProvider, Release, ReleaseAsset};
    use crate::runtime::RealRuntime;
    use reqwest::Client;

    fn release(tag: &str, urls: Vec<String>) -> Release {
        Release {
            tag: tag.to_string(),
            assets: urls
                .into_iter()
                .map(|download_url| ReleaseAsset {
                    name: None,
                    download_url,
                })
                .collect(),
        }
    }

    fn provider_returning(result: Release) -> MockProvider {
        let mut provider = MockProvider::new();
        provider
            .expect_latest_release()
            .times(1)
            .returning(move |_| Ok(result.clone()));
        provider
    }

    #[tokio::test]
    async fn test_generate_writes_assets_and_channel() {
        let mut server = mockito::Server::new_async().await;
        let base = server.url();

        let apk_mock = server
            .mock("GET", "/download/v29.0/Magisk-v29.0.apk")
            .with_status(200)
            .with_body("APK")
            .create_async()
            .await;
        let note_mock = server
            .mock("GET", "/download/v29.0/notes.md")
            .with_status(200)
            .with_body("# notes")
            .create_async()
            .await;

        let apk_url = format!("{}/download/v29.0/Magisk-v29.0.apk", base);
        let note_url = format!("{}/download/v29.0/notes.md", base);
        let provider = provider_returning(release(
            "v29.0",
            vec![apk_url.clone(), note_url.clone()],
        ));

        let work = tempfile::tempdir().unwrap();
        let dist = DistDir::in_base(work.path());
        let http = HttpClient::new(Client::new());

        let summary = generate(
            &RealRuntime,
            &provider,
            &http,
            &RepoId::new("topjohnwu", "Magisk"),
            &dist,
            DEFAULT_CHANNEL,
        )
        .await
        .unwrap();

        apk_mock.assert_async().await;
        note_mock.assert_async().await;

        assert_eq!(summary.tag, "v29.0");
        assert_eq!(summary.version.as_str(), "29.0");
        assert_eq!(summary.downloaded_bytes(), 3 + 7);
        assert_eq!(std::fs::read(dist.file("29.0.apk")).unwrap(), b"APK");
        assert_eq!(std::fs::read(dist.file("29.0.md")).unwrap(), b"# notes");

        let written = std::fs::read_to_string(&summary.channel_path).unwrap();
        let channel: Channel = serde_json::from_str(&written).unwrap();
        assert_eq!(channel.magisk.link, apk_url);
        assert_eq!(channel.stub.link, apk_url);
        assert_eq!(channel.magisk.note, note_url);
        assert_eq!(channel.magisk.version_code, "29000");
        assert_eq!(channel.stub.version_code, "29");
    }

    #[tokio::test]
    async fn test_generate_without_apk_writes_no_channel() {
        let provider = provider_returning(release(
            "v29.0",
            vec!["https://example.com/notes.md".to_string()],
        ));

        let work = tempfile::tempdir().unwrap();
        let dist = DistDir::in_base(work.path());
        let http = HttpClient::new(Client::new());

        let err = generate(
            &RealRuntime,
            &provider,
            &http,
            &RepoId::new("topjohnwu", "Magisk"),
            &dist,
            DEFAULT_CHANNEL,
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ChannelError>(),
            Some(ChannelError::AssetNotFound { label: "Apk", .. })
        ));
        assert!(!dist.file("stable.json").exists());
    }

    #[tokio::test]
    async fn test_generate_malformed_tag_downloads_nothing() {
        let provider = provider_returning(release(
            "nightly",
            vec!["https://example.com/app.apk".to_string()],
        ));

        let work = tempfile::tempdir().unwrap();
        let dist = DistDir::in_base(work.path());
        let http = HttpClient::new(Client::new());

        let err = generate(
            &RealRuntime,
            &provider,
            &http,
            &RepoId::new("topjohnwu", "Magisk"),
            &dist,
            DEFAULT_CHANNEL,
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ChannelError>(),
            Some(ChannelError::Parse(_))
        ));
        assert_eq!(std::fs::read_dir(dist.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_generate_upstream_failure_leaves_dist_empty() {
        let mut provider = MockProvider::new();
        provider.expect_latest_release().returning(|_| {
            Err(ChannelError::Upstream {
                status: 500,
                body: "boom".into(),
            }
            .into())
        });

        let work = tempfile::tempdir().unwrap();
        let dist = DistDir::in_base(work.path());
        std::fs::create_dir(dist.path()).unwrap();
        std::fs::write(dist.file("stable.json"), "{}").unwrap();

        let http = HttpClient::new(Client::new());
        let err = generate(
            &RealRuntime,
            &provider,
            &http,
            &RepoId::new("topjohnwu", "Magisk"),
            &dist,
            DEFAULT_CHANNEL,
        )
        .await
        .unwrap_err();

        assert!(err.to_string().contains("500"));
        assert_eq!(std::fs::read_dir(dist.path()).unwrap().count(), 0);
    }
}
