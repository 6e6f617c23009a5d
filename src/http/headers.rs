//! Request header set and client construction.
//!
//! Every request carries a browser-like header profile, the GitHub API
//! headers and an intentionally blank `User-Agent`.

use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use log::debug;
use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderName, HeaderValue, USER_AGENT};

/// Media type requested from the GitHub REST API.
pub const GITHUB_ACCEPT: &str = "application/vnd.github+json";

/// Pinned GitHub REST API version.
pub const GITHUB_API_VERSION: &str = "2022-11-28";

const X_GITHUB_API_VERSION: &str = "x-github-api-version";

/// A set of headers a real browser sends on a top-level navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrowserProfile {
    pub name: &'static str,
    pub headers: &'static [(&'static str, &'static str)],
}

const PROFILES: &[BrowserProfile] = &[
    BrowserProfile {
        name: "chrome-windows",
        headers: &[
            (
                "sec-ch-ua",
                "\"Chromium\";v=\"130\", \"Google Chrome\";v=\"130\", \"Not?A_Brand\";v=\"99\"",
            ),
            ("sec-ch-ua-mobile", "?0"),
            ("sec-ch-ua-platform", "\"Windows\""),
            ("upgrade-insecure-requests", "1"),
            ("sec-fetch-site", "none"),
            ("sec-fetch-mode", "navigate"),
            ("sec-fetch-user", "?1"),
            ("sec-fetch-dest", "document"),
        ],
    },
    BrowserProfile {
        name: "chrome-macos",
        headers: &[
            (
                "sec-ch-ua",
                "\"Google Chrome\";v=\"129\", \"Not=A?Brand\";v=\"8\", \"Chromium\";v=\"129\"",
            ),
            ("sec-ch-ua-mobile", "?0"),
            ("sec-ch-ua-platform", "\"macOS\""),
            ("upgrade-insecure-requests", "1"),
            ("sec-fetch-site", "none"),
            ("sec-fetch-mode", "navigate"),
            ("sec-fetch-user", "?1"),
            ("sec-fetch-dest", "document"),
        ],
    },
    BrowserProfile {
        name: "edge-windows",
        headers: &[
            (
                "sec-ch-ua",
                "\"Microsoft Edge\";v=\"130\", \"Chromium\";v=\"130\", \"Not?A_Brand\";v=\"99\"",
            ),
            ("sec-ch-ua-mobile", "?0"),
            ("sec-ch-ua-platform", "\"Windows\""),
            ("upgrade-insecure-requests", "1"),
            ("sec-fetch-site", "none"),
            ("sec-fetch-mode", "navigate"),
            ("sec-fetch-user", "?1"),
            ("sec-fetch-dest", "document"),
        ],
    },
    BrowserProfile {
        name: "firefox-linux",
        headers: &[
            ("upgrade-insecure-requests", "1"),
            ("sec-fetch-site", "none"),
            ("sec-fetch-mode", "navigate"),
            ("sec-fetch-user", "?1"),
            ("sec-fetch-dest", "document"),
            ("dnt", "1"),
        ],
    },
    BrowserProfile {
        name: "safari-macos",
        headers: &[
            ("sec-fetch-site", "none"),
            ("sec-fetch-mode", "navigate"),
            ("sec-fetch-dest", "document"),
            ("priority", "u=0, i"),
        ],
    },
];

const ACCEPT_LANGUAGES: &[&str] = &[
    "en-US,en;q=0.9",
    "en-GB,en;q=0.9,en-US;q=0.8",
    "en-US,en;q=0.5",
    "de-DE,de;q=0.9,en-US;q=0.8,en;q=0.7",
    "fr-FR,fr;q=0.9,en-US;q=0.8,en;q=0.7",
];

impl BrowserProfile {
    /// All built-in profiles.
    pub fn all() -> &'static [BrowserProfile] {
        PROFILES
    }

    /// Picks one of the built-in profiles at random.
    pub fn random() -> Self {
        PROFILES[fastrand::usize(..PROFILES.len())]
    }
}

/// Explicit configuration for the single HTTP session of a run.
#[derive(Clone)]
pub struct ClientConfig {
    token: String,
    pub timeout: Option<Duration>,
    pub profile: BrowserProfile,
    pub accept_language: &'static str,
}

impl ClientConfig {
    /// Creates a configuration with a randomly chosen browser profile.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            timeout: None,
            profile: BrowserProfile::random(),
            accept_language: ACCEPT_LANGUAGES[fastrand::usize(..ACCEPT_LANGUAGES.len())],
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_profile(mut self, profile: BrowserProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Builds the header map sent with every request.
    ///
    /// Browser headers go in first; the API headers then override anything
    /// they share.
    pub fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        for &(name, value) in self.profile.headers {
            headers.insert(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            );
        }
        headers.insert(
            HeaderName::from_static("accept-language"),
            HeaderValue::from_static(self.accept_language),
        );

        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));
        headers.insert(USER_AGENT, HeaderValue::from_static(""));

        let mut auth_value = HeaderValue::from_str(&format!("Bearer {}", self.token))
            .context("GitHub token contains characters not allowed in a header")?;
        auth_value.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth_value);

        headers.insert(
            HeaderName::from_static(X_GITHUB_API_VERSION),
            HeaderValue::from_static(GITHUB_API_VERSION),
        );

        Ok(headers)
    }

    /// Builds the one `reqwest::Client` used for the whole run.
    #[tracing::instrument(skip(self))]
    pub fn build_client(&self) -> Result<Client> {
        debug!(
            "Using token {} with browser profile {}",
            mask_token(&self.token),
            self.profile.name
        );

        let mut builder = Client::builder().default_headers(self.headers()?);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        builder.build().context("Failed to build HTTP client")
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("token", &mask_token(&self.token))
            .field("timeout", &self.timeout)
            .field("profile", &self.profile.name)
            .field("accept_language", &self.accept_language)
            .finish()
    }
}

/// Masks all but the first and last four characters of a token.
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}*********{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    #[test]
    fn test_headers_contain_api_headers() {
        let config = ClientConfig::new("secret-token");
        let headers = config.headers().unwrap();

        assert_eq!(headers[ACCEPT], GITHUB_ACCEPT);
        assert_eq!(headers[AUTHORIZATION], "Bearer secret-token");
        assert!(headers[AUTHORIZATION].is_sensitive());
        assert_eq!(headers["x-github-api-version"], GITHUB_API_VERSION);
        assert_eq!(headers[USER_AGENT], "");
        assert!(headers.contains_key("accept-language"));
        assert!(headers.contains_key("sec-fetch-mode"));
    }

    #[test]
    fn test_every_profile_builds_valid_headers() {
        for profile in BrowserProfile::all() {
            let config = ClientConfig::new("t").with_profile(*profile);
            let headers = config.headers().unwrap();
            assert_eq!(headers[ACCEPT], GITHUB_ACCEPT, "profile {}", profile.name);
        }
    }

    #[test]
    fn test_random_profile_is_builtin() {
        for _ in 0..20 {
            assert!(BrowserProfile::all().contains(&BrowserProfile::random()));
        }
    }

    #[test]
    fn test_token_with_newline_is_rejected() {
        let config = ClientConfig::new("bad\ntoken");
        assert!(config.headers().is_err());
    }

    #[test]
    fn test_debug_does_not_leak_token() {
        let config = ClientConfig::new("ghp_supersecretvalue1234");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("supersecret"));
        assert!(debug.contains("ghp_*********1234"));
    }

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token("ghp_1234567890abcd"), "ghp_*********abcd");
        assert_eq!(mask_token("short"), "*****");
        assert_eq!(mask_token(""), "");
    }

    #[tokio::test]
    async fn test_client_sends_configured_headers() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/")
            .match_header("authorization", "Bearer test_token")
            .match_header("accept", GITHUB_ACCEPT)
            .match_header("x-github-api-version", GITHUB_API_VERSION)
            .match_header("user-agent", "")
            .create_async()
            .await;

        let client = ClientConfig::new("test_token")
            .with_timeout(Some(Duration::from_secs(10)))
            .build_client()
            .unwrap();
        let _ = client.get(server.url()).send().await;

        mock.assert_async().await;
    }
}
