//! Release records as served by the GitHub releases API and their
//! normalized form.

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;

use crate::error::{Error, Result};

/// Author placeholder used when the API omits the release author.
pub const UNKNOWN_AUTHOR: &str = "unknown";

/// One element of the `GET /repos/{owner}/{repo}/releases` response.
///
/// Every field is optional on the wire; [`normalize`] decides which ones are
/// required.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRelease {
    #[serde(default)]
    pub tag_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub author: Option<RawAuthor>,
    #[serde(default)]
    pub draft: Option<bool>,
    #[serde(default)]
    pub prerelease: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAuthor {
    #[serde(default)]
    pub login: Option<String>,
}

/// A single published release of a configured repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseEvent {
    pub repository: String,
    /// Publication instant, kept in the offset the source reported.
    pub published_at: DateTime<FixedOffset>,
    pub tag: Option<String>,
    pub name: String,
    pub author: String,
    pub draft: bool,
    pub prerelease: bool,
}

impl ReleaseEvent {
    /// Minimal event with only the fields aggregation needs.
    pub fn new(repository: &str, published_at: DateTime<FixedOffset>) -> Self {
        Self {
            repository: repository.to_string(),
            published_at,
            tag: None,
            name: String::new(),
            author: UNKNOWN_AUTHOR.to_string(),
            draft: false,
            prerelease: false,
        }
    }
}

/// Converts a raw API record fetched under `repository` into a [`ReleaseEvent`].
///
/// # Errors
///
/// Returns [`Error::MalformedEvent`] when `published_at` is missing or is not
/// an RFC 3339 timestamp.
pub fn normalize(repository: &str, raw: RawRelease) -> Result<ReleaseEvent> {
    let published = raw.published_at.ok_or_else(|| Error::MalformedEvent {
        repository: repository.to_string(),
        reason: format!(
            "release {} has no published_at",
            raw.tag_name.as_deref().unwrap_or("<untagged>")
        ),
    })?;

    let published_at =
        DateTime::parse_from_rfc3339(&published).map_err(|e| Error::MalformedEvent {
            repository: repository.to_string(),
            reason: format!("invalid published_at {published:?}: {e}"),
        })?;

    Ok(ReleaseEvent {
        repository: repository.to_string(),
        published_at,
        tag: raw.tag_name,
        name: raw.name.unwrap_or_default(),
        author: raw
            .author
            .and_then(|a| a.login)
            .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string()),
        draft: raw.draft.unwrap_or(false),
        prerelease: raw.prerelease.unwrap_or(false),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn raw(published_at: Option<&str>) -> RawRelease {
        RawRelease {
            published_at: published_at.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_normalize_full_record() {
        let json = r#"{
            "tag_name": "@stackflow/core@1.0.0",
            "name": "Core 1.0",
            "published_at": "2024-03-04T10:15:00Z",
            "author": { "login": "octocat" },
            "draft": false,
            "prerelease": true
        }"#;
        let raw: RawRelease = serde_json::from_str(json).unwrap();

        let event = normalize("stackflow", raw).unwrap();

        assert_eq!(event.repository, "stackflow");
        assert_eq!(event.tag.as_deref(), Some("@stackflow/core@1.0.0"));
        assert_eq!(event.name, "Core 1.0");
        assert_eq!(event.author, "octocat");
        assert!(event.prerelease);
        assert!(!event.draft);
        assert_eq!(event.published_at.year(), 2024);
        assert_eq!(event.published_at.hour(), 10);
    }

    #[test]
    fn test_normalize_missing_optional_fields() {
        let event = normalize("seed-design", raw(Some("2024-01-02T00:00:00Z"))).unwrap();

        assert_eq!(event.author, UNKNOWN_AUTHOR);
        assert_eq!(event.name, "");
        assert_eq!(event.tag, None);
        assert!(!event.draft);
    }

    #[test]
    fn test_normalize_author_without_login() {
        let json = r#"{"published_at": "2024-01-02T00:00:00Z", "author": {}}"#;
        let raw: RawRelease = serde_json::from_str(json).unwrap();

        assert_eq!(normalize("a", raw).unwrap().author, UNKNOWN_AUTHOR);
    }

    #[test]
    fn test_normalize_keeps_source_offset() {
        let event = normalize("a", raw(Some("2024-03-09T01:00:00+09:00"))).unwrap();

        assert_eq!(event.published_at.offset().local_minus_utc(), 9 * 3600);
        assert_eq!(event.published_at.day(), 9);
    }

    #[test]
    fn test_normalize_missing_timestamp_is_malformed() {
        let err = normalize("a", raw(None)).unwrap_err();
        assert!(matches!(err, Error::MalformedEvent { .. }));
    }

    #[test]
    fn test_normalize_unparseable_timestamp_is_malformed() {
        let err = normalize("a", raw(Some("last tuesday"))).unwrap_err();
        assert!(matches!(err, Error::MalformedEvent { ref repository, .. } if repository == "a"));
    }
}
