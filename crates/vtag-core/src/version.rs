//! Release version and tag naming.
//!
//! A [`ReleaseVersion`] is the `package.version` string read from the
//! manifest. Its [`TagName`] is always `v<version>`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, VtagError};

/// Prefix prepended to the version to form the tag name.
pub const TAG_PREFIX: &str = "v";

/// A validated semver-like version: MAJOR.MINOR.PATCH[-pre][+build].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReleaseVersion {
    raw: String,
    pre: Option<String>,
}

impl ReleaseVersion {
    pub fn parse(input: &str) -> Result<Self> {
        let raw = input.trim();
        let invalid = |reason: &str| VtagError::InvalidVersion {
            version: input.to_string(),
            reason: reason.to_string(),
        };

        if raw.is_empty() {
            return Err(invalid("version is empty"));
        }

        // Build metadata carries no ordering meaning; validate and drop it.
        let without_build = match raw.split_once('+') {
            Some((_, build)) if build.is_empty() || !is_ident_list(build) => {
                return Err(invalid("malformed build metadata"));
            }
            Some((v, _)) => v,
            None => raw,
        };

        let (core, pre) = match without_build.split_once('-') {
            Some((_, p)) if p.is_empty() || !is_ident_list(p) => {
                return Err(invalid("malformed pre-release"));
            }
            Some((v, p)) => (v, Some(p.to_string())),
            None => (without_build, None),
        };

        let parts: Vec<&str> = core.split('.').collect();
        let [major, minor, patch] = parts.as_slice() else {
            return Err(invalid("expected MAJOR.MINOR.PATCH"));
        };

        for component in [major, minor, patch] {
            if component.is_empty() || (component.len() > 1 && component.starts_with('0')) {
                return Err(invalid("numeric component is empty or has a leading zero"));
            }
            component
                .parse::<u64>()
                .map_err(|_| invalid("numeric component is not a number"))?;
        }

        Ok(Self {
            raw: raw.to_string(),
            pre,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_prerelease(&self) -> bool {
        self.pre.is_some()
    }

    /// The tag this version publishes as.
    pub fn tag_name(&self) -> TagName {
        TagName(format!("{TAG_PREFIX}{}", self.raw))
    }
}

fn is_ident_list(s: &str) -> bool {
    s.split('.').all(|ident| {
        !ident.is_empty() && ident.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl TryFrom<String> for ReleaseVersion {
    type Error = VtagError;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<ReleaseVersion> for String {
    fn from(v: ReleaseVersion) -> Self {
        v.raw
    }
}

/// A version-control tag name of the form `v<version>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TagName(String);

impl TagName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Fully-qualified ref, e.g. `refs/tags/v1.2.3`.
    pub fn refname(&self) -> String {
        format!("refs/tags/{}", self.0)
    }
}

impl fmt::Display for TagName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_version() {
        let v = ReleaseVersion::parse("1.2.3").unwrap();
        assert_eq!(v.as_str(), "1.2.3");
        assert!(!v.is_prerelease());
        assert_eq!(v.tag_name().as_str(), "v1.2.3");
    }

    #[test]
    fn test_parse_prerelease_and_build() {
        let v = ReleaseVersion::parse("0.4.0-rc.1+build.7").unwrap();
        assert!(v.is_prerelease());
        assert_eq!(v.tag_name().as_str(), "v0.4.0-rc.1+build.7");
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let v = ReleaseVersion::parse(" 2.0.0\n").unwrap();
        assert_eq!(v.as_str(), "2.0.0");
    }

    #[test]
    fn test_rejects_malformed_versions() {
        for bad in ["", "1.2", "1.2.3.4", "a.b.c", "01.2.3", "1.2.3-", "1.2.3+", "1..3", "1.2.99999999999999999999"] {
            let err = ReleaseVersion::parse(bad).unwrap_err();
            assert!(
                matches!(err, VtagError::InvalidVersion { .. }),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_tag_refname() {
        let tag = ReleaseVersion::parse("1.0.0").unwrap().tag_name();
        assert_eq!(tag.refname(), "refs/tags/v1.0.0");
        assert_eq!(tag.to_string(), "v1.0.0");
    }

    #[test]
    fn test_serde_roundtrip_validates() {
        let v: ReleaseVersion = serde_json::from_str("\"3.1.4\"").unwrap();
        assert_eq!(serde_json::to_string(&v).unwrap(), "\"3.1.4\"");
        assert!(serde_json::from_str::<ReleaseVersion>("\"nope\"").is_err());
    }
}
