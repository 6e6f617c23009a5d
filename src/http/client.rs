//! HTTP client shared by the release lookup and the asset downloads.

use anyhow::{Context, Result};
use log::debug;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::io::{BufWriter, Write};

use crate::error::ChannelError;

/// Size of the buffer download chunks are written through.
pub const DOWNLOAD_CHUNK_SIZE: usize = 1024;

/// Thin wrapper over one `reqwest::Client`. Requests are never retried.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a new HTTP client wrapping the given reqwest Client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Performs a GET request and deserializes the JSON response.
    ///
    /// Anything other than `200 OK` is an upstream error carrying the status
    /// and body; a body that does not deserialize is a shape error.
    #[tracing::instrument(skip(self))]
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!("GET JSON from {}...", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        let response = expect_status(response, |s| s == StatusCode::OK).await?;

        let body = response
            .text()
            .await
            .context("Failed to read response body")?;

        let parsed = serde_json::from_str(&body).map_err(|e| ChannelError::Shape(e.to_string()))?;
        Ok(parsed)
    }

    /// Streams the body of `url` into the writer returned by `create_writer`.
    ///
    /// The writer is only created once the response status is known to be
    /// successful. Returns the number of bytes written.
    #[tracing::instrument(skip(self, create_writer))]
    pub async fn download_file<W, F>(&self, url: &str, create_writer: F) -> Result<u64>
    where
        W: Write,
        F: FnOnce() -> Result<W>,
    {
        debug!("Downloading file from {}...", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to start download request")?;

        let mut response = expect_status(response, |s| s.is_success()).await?;

        let mut writer = BufWriter::with_capacity(DOWNLOAD_CHUNK_SIZE, create_writer()?);
        let mut downloaded_bytes: u64 = 0;

        while let Some(chunk) = response
            .chunk()
            .await
            .context("Failed to read chunk from download stream")?
        {
            writer
                .write_all(&chunk)
                .context("Failed to write chunk to file")?;
            downloaded_bytes += chunk.len() as u64;
        }
        writer.flush().context("Failed to flush downloaded file")?;

        debug!(
            "Downloaded {:.2} MB",
            downloaded_bytes as f64 / (1024.0 * 1024.0)
        );

        Ok(downloaded_bytes)
    }
}

/// Turns an unexpected status into [`ChannelError::Upstream`].
async fn expect_status(
    response: Response,
    accept: impl Fn(StatusCode) -> bool,
) -> Result<Response> {
    let status = response.status();
    if accept(status) {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ChannelError::Upstream {
        status: status.as_u16(),
        body,
    }
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_json_success() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let mock = server
            .mock("GET", "/test")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"name": "test", "value": 42}"#)
            .create_async()
            .await;

        let client = HttpClient::new(Client::new());

        #[derive(serde::Deserialize, Debug, PartialEq)]
        struct TestResponse {
            name: String,
            value: i32,
        }

        let result: TestResponse = client.get_json(&format!("{}/test", url)).await.unwrap();

        mock.assert_async().await;
        assert_eq!(result.name, "test");
        assert_eq!(result.value, 42);
    }

    #[tokio::test]
    async fn test_get_json_non_200_is_upstream_error() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let mock = server
            .mock("GET", "/test")
            .with_status(404)
            .with_body("Not Found")
            .create_async()
            .await;

        let client = HttpClient::new(Client::new());
        let err = client
            .get_json::<serde_json::Value>(&format!("{}/test", url))
            .await
            .unwrap_err();

        mock.assert_async().await;
        match err.downcast_ref::<ChannelError>() {
            Some(ChannelError::Upstream { status, body }) => {
                assert_eq!(*status, 404);
                assert_eq!(body, "Not Found");
            }
            other => panic!("Expected upstream error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_get_json_other_2xx_is_rejected() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let _mock = server
            .mock("GET", "/test")
            .with_status(204)
            .create_async()
            .await;

        let client = HttpClient::new(Client::new());
        let err = client
            .get_json::<serde_json::Value>(&format!("{}/test", url))
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ChannelError>(),
            Some(ChannelError::Upstream { status: 204, .. })
        ));
    }

    #[tokio::test]
    async fn test_get_json_bad_body_is_shape_error() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let _mock = server
            .mock("GET", "/test")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let client = HttpClient::new(Client::new());
        let err = client
            .get_json::<serde_json::Value>(&format!("{}/test", url))
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ChannelError>(),
            Some(ChannelError::Shape(_))
        ));
    }

    #[tokio::test]
    async fn test_download_file_success() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let mock = server
            .mock("GET", "/file.txt")
            .with_status(200)
            .with_body("test content")
            .create_async()
            .await;

        let client = HttpClient::new(Client::new());
        let bytes = client
            .download_file(&format!("{}/file.txt", url), || Ok(std::io::sink()))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(bytes, 12); // "test content" is 12 bytes
    }

    #[tokio::test]
    async fn test_download_file_larger_than_chunk() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let payload: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let _mock = server
            .mock("GET", "/big.bin")
            .with_status(200)
            .with_body(payload.clone())
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.bin");
        let client = HttpClient::new(Client::new());
        let bytes = client
            .download_file(&format!("{}/big.bin", url), || {
                Ok(std::fs::File::create(&path)?)
            })
            .await
            .unwrap();

        assert_eq!(bytes, payload.len() as u64);
        assert_eq!(std::fs::read(&path).unwrap(), payload);
    }

    #[tokio::test]
    async fn test_download_file_not_found_creates_nothing() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let mock = server
            .mock("GET", "/file.txt")
            .with_status(404)
            .create_async()
            .await;

        let client = HttpClient::new(Client::new());
        let result = client
            .download_file(&format!("{}/file.txt", url), || -> Result<std::io::Sink> {
                panic!("writer must not be created for a failed download")
            })
            .await;

        mock.assert_async().await;
        assert!(result.is_err());
    }
}
