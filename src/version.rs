//! Version extraction from release tags.
//!
//! A tag such as `v29.0` yields the version text `29.0`, the version code
//! `29000` and the sub version code `29`. Codes are computed from the digit
//! groups directly so that e.g. `v27.1` always gives `27100`.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

use crate::error::ChannelError;

static TAG_VERSION_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"v([0-9]+)\.([0-9]+)").unwrap());

/// Number of fraction digits kept in the version code.
const CODE_FRACTION_DIGITS: usize = 3;

/// A `major.minor` version taken from a release tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    text: String,
    major: u64,
    version_code: u64,
}

impl Version {
    /// Extracts the first `v<major>.<minor>` occurrence from `tag`.
    pub fn from_tag(tag: &str) -> Result<Self, ChannelError> {
        let caps = TAG_VERSION_REGEX
            .captures(tag)
            .ok_or_else(|| ChannelError::Parse(format!("Invalid tag format: {}", tag)))?;

        let major_digits = &caps[1];
        let minor_digits = &caps[2];

        let major: u64 = major_digits.parse().map_err(|_| {
            ChannelError::Parse(format!("Major version out of range in tag: {}", tag))
        })?;

        let fraction: String = minor_digits
            .chars()
            .chain(std::iter::repeat('0'))
            .take(CODE_FRACTION_DIGITS)
            .collect();
        let fraction: u64 = fraction.parse().map_err(|_| {
            ChannelError::Parse(format!("Minor version out of range in tag: {}", tag))
        })?;

        let version_code = major
            .checked_mul(10u64.pow(CODE_FRACTION_DIGITS as u32))
            .and_then(|c| c.checked_add(fraction))
            .ok_or_else(|| {
                ChannelError::Parse(format!("Version code out of range in tag: {}", tag))
            })?;

        let version = Version {
            text: format!("{}.{}", major_digits, minor_digits),
            major,
            version_code,
        };

        let value = version.as_f64();
        if !(value.is_finite() && value >= 0.0) {
            return Err(ChannelError::Parse(format!(
                "Version number must be non-negative: {}",
                value
            )));
        }

        Ok(version)
    }

    /// The captured `major.minor` text, exactly as it appears in the tag.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn as_f64(&self) -> f64 {
        self.text.parse().unwrap_or(f64::NAN)
    }

    /// `floor(version * 1000)`.
    pub fn version_code(&self) -> u64 {
        self.version_code
    }

    /// `floor(version)`.
    pub fn sub_version_code(&self) -> u64 {
        self.major
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
