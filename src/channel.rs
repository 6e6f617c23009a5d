//! Channel descriptor consumed by the app's update checker.
//!
//! ```json
//! {
//!   "magisk": { "version": "29.0", "versionCode": "29000", "link": "...", "note": "..." },
//!   "stub": { "versionCode": "29", "link": "..." }
//! }
//! ```
//!
//! Every value is a JSON string and keys keep the order above.

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ChannelError;
use crate::runtime::Runtime;
use crate::version::Version;

/// Default channel name; the file is written as `<name>.json`.
pub const DEFAULT_CHANNEL: &str = "stable";

/// Longest link or note URL written to the channel.
pub const MAX_LINK_LEN: usize = 1000;

static VERSION_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]+\.[0-9]+$").unwrap());
static CODE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]+$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMagisk {
    pub version: String,
    #[serde(rename = "versionCode")]
    pub version_code: String,
    pub link: String,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelStub {
    #[serde(rename = "versionCode")]
    pub version_code: String,
    pub link: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub magisk: ChannelMagisk,
    pub stub: ChannelStub,
}

impl Channel {
    /// The apk link is shared by both sections; the note only appears under
    /// `magisk`.
    pub fn new(version: &Version, apk_url: &str, note_url: &str) -> Self {
        Channel {
            magisk: ChannelMagisk {
                version: version.as_str().to_string(),
                version_code: version.version_code().to_string(),
                link: apk_url.to_string(),
                note: note_url.to_string(),
            },
            stub: ChannelStub {
                version_code: version.sub_version_code().to_string(),
                link: apk_url.to_string(),
            },
        }
    }

    pub fn validate(&self) -> Result<(), ChannelError> {
        check_pattern("magisk.version", &self.magisk.version, &VERSION_REGEX)?;
        check_pattern("magisk.versionCode", &self.magisk.version_code, &CODE_REGEX)?;
        check_link("magisk.link", &self.magisk.link)?;
        check_link("magisk.note", &self.magisk.note)?;
        check_pattern("stub.versionCode", &self.stub.version_code, &CODE_REGEX)?;
        check_link("stub.link", &self.stub.link)?;
        Ok(())
    }

    /// Validated, pretty-printed JSON with two-space indentation.
    pub fn to_json(&self) -> Result<String> {
        self.validate()?;
        serde_json::to_string_pretty(self).context("Failed to serialize channel")
    }

    /// Validates and writes the channel to `<dir>/<name>.json`, replacing any
    /// previous file. Nothing is written when validation fails.
    #[tracing::instrument(skip(self, runtime))]
    pub fn write<R: Runtime>(&self, runtime: &R, dir: &Path, name: &str) -> Result<PathBuf> {
        let json = self.to_json()?;
        let path = dir.join(format!("{}.json", name));
        runtime.write(&path, json.as_bytes())?;
        Ok(path)
    }
}

fn check_pattern(field: &'static str, value: &str, pattern: &Regex) -> Result<(), ChannelError> {
    if pattern.is_match(value) {
        Ok(())
    } else {
        Err(ChannelError::OutputValidation {
            field,
            reason: format!("{:?} does not match {}", value, pattern.as_str()),
        })
    }
}

fn check_link(field: &'static str, value: &str) -> Result<(), ChannelError> {
    let len = value.chars().count();
    if len == 0 || len > MAX_LINK_LEN {
        return Err(ChannelError::OutputValidation {
            field,
            reason: format!("length must be 1 to {}, got {}", MAX_LINK_LEN, len),
        });
    }
    Ok(())
}
