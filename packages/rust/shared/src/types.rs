//! Core domain types: the content map, its cache entry, and the raw sheet payload.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SheetbindError};

// ---------------------------------------------------------------------------
// ContentMap
// ---------------------------------------------------------------------------

/// Field identifier → display text, as loaded from the sheet.
///
/// Serializes as a plain JSON object so the cached blob stays readable.
/// There is no public mutator: a map is built once and then only read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentMap(BTreeMap<String, String>);

impl ContentMap {
    /// An empty map; what every failed load degrades to.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw lookup. Returns `Some("")` for a field present with blank text.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Lookup used by slot guards: absent and blank values both yield `None`.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for ContentMap {
    /// Later entries overwrite earlier ones with the same key.
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ---------------------------------------------------------------------------
// CacheEntry
// ---------------------------------------------------------------------------

/// A persisted content map together with the instant it was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub content: ContentMap,
    pub written_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(content: ContentMap, written_at: DateTime<Utc>) -> Self {
        Self {
            content,
            written_at,
        }
    }

    /// Time elapsed since the entry was written. Negative if the clock moved back.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.written_at
    }

    /// An entry is fresh while its age is strictly below `ttl`.
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.age(now) < ttl
    }

    /// Decode an entry from its two stored strings.
    pub fn decode(content_json: &str, written_at_ms: &str) -> Result<Self> {
        let written_at = parse_epoch_millis(written_at_ms)?;
        let content = serde_json::from_str(content_json)
            .map_err(|e| SheetbindError::CacheCorruption(format!("content blob: {e}")))?;
        Ok(Self {
            content,
            written_at,
        })
    }

    /// Encode the content map as its stored JSON blob.
    pub fn content_json(&self) -> Result<String> {
        serde_json::to_string(&self.content)
            .map_err(|e| SheetbindError::CacheCorruption(format!("encode content: {e}")))
    }

    /// Encode the write instant as a millisecond epoch string.
    pub fn written_at_millis(&self) -> String {
        self.written_at.timestamp_millis().to_string()
    }
}

/// Parse a millisecond epoch string into a UTC instant.
fn parse_epoch_millis(raw: &str) -> Result<DateTime<Utc>> {
    let millis: i64 = raw
        .trim()
        .parse()
        .map_err(|e| SheetbindError::CacheCorruption(format!("timestamp {raw:?}: {e}")))?;
    DateTime::from_timestamp_millis(millis).ok_or_else(|| {
        SheetbindError::CacheCorruption(format!("timestamp {millis} out of range"))
    })
}

// ---------------------------------------------------------------------------
// TabularResponse
// ---------------------------------------------------------------------------

/// Body of a Sheets `values` response. Only `values` is read.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TabularResponse {
    /// Row 0 is the header; the rest are data rows. Trailing empty cells are
    /// omitted by the API, so rows may be shorter than the header.
    #[serde(default)]
    pub values: Option<Vec<Vec<String>>>,
}
