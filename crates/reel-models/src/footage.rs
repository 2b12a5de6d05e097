//! Footage library models.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for an ingested footage asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct AssetId(pub String);

impl AssetId {
    /// Generate a new random asset ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for AssetId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for AssetId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AssetId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A raw video recorded in the footage library.
///
/// Assets are immutable once ingested. Deleting one removes its segments and
/// the backing file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FootageAsset {
    pub id: AssetId,
    /// File name as it appeared when the asset was ingested
    pub origin_filename: String,
    /// Absolute path of the backing file
    pub location: String,
    pub duration_seconds: f64,
    /// Hex-encoded SHA-256 of the file contents
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Tags attached to one sampled interval of an asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ForensicSegment {
    /// Row id assigned by the store (insertion order)
    #[serde(default)]
    pub id: i64,
    pub video_id: AssetId,
    pub start_time: f64,
    pub end_time: f64,
    pub description: String,
    #[serde(default)]
    pub emotion_tags: Vec<String>,
    #[serde(default)]
    pub object_tags: Vec<String>,
    #[serde(default)]
    pub audio_tags: Vec<String>,
}

impl ForensicSegment {
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

/// A search result: a segment joined with its asset's file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SegmentHit {
    #[serde(flatten)]
    pub segment: ForensicSegment,
    pub origin_filename: String,
    pub location: String,
}

/// Structured answer expected from the vision service for one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FrameTags {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub emotions: Vec<String>,
    #[serde(default)]
    pub objects: Vec<String>,
    #[serde(default, alias = "audio_tags", rename = "audioTags")]
    pub audio_tags: Vec<String>,
}

/// Cached trend research payload for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrendSnapshot {
    pub category: String,
    pub payload: serde_json::Value,
    pub last_updated: DateTime<Utc>,
}

impl TrendSnapshot {
    /// Whether the snapshot is older than `ttl` at `now`.
    pub fn is_stale(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        now - self.last_updated > ttl
    }
}
