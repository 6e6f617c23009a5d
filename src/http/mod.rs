//! HTTP client module: session configuration and request helpers.

mod client;
mod headers;

pub use client::{DOWNLOAD_CHUNK_SIZE, HttpClient};
pub use headers::{BrowserProfile, ClientConfig, GITHUB_ACCEPT, GITHUB_API_VERSION, mask_token};
