//! Repository for `footage_assets` and `forensic_segments`.

use chrono::{DateTime, Utc};
use reel_models::{AssetId, FootageAsset, ForensicSegment, SegmentHit};
use sqlx::FromRow;

use crate::db::DbPool;
use crate::error::{StoreError, StoreResult};

const ASSET_COLUMNS: &str =
    "id, origin_filename, location, duration_seconds, content_hash, created_at";

const SEGMENT_COLUMNS: &str = "s.id, s.video_id, s.start_time, s.end_time, s.description, \
    s.emotion_tags, s.object_tags, s.audio_tags";

/// Fields supplied when recording a new asset.
#[derive(Debug, Clone)]
pub struct NewAsset {
    pub origin_filename: String,
    pub location: String,
    pub duration_seconds: f64,
    pub content_hash: String,
}

/// Fields supplied when appending a segment.
#[derive(Debug, Clone)]
pub struct NewSegment {
    pub start_time: f64,
    pub end_time: f64,
    pub description: String,
    pub emotion_tags: Vec<String>,
    pub object_tags: Vec<String>,
    pub audio_tags: Vec<String>,
}

#[derive(Debug, FromRow)]
struct AssetRow {
    id: String,
    origin_filename: String,
    location: String,
    duration_seconds: f64,
    content_hash: String,
    created_at: DateTime<Utc>,
}

impl From<AssetRow> for FootageAsset {
    fn from(row: AssetRow) -> Self {
        FootageAsset {
            id: AssetId(row.id),
            origin_filename: row.origin_filename,
            location: row.location,
            duration_seconds: row.duration_seconds,
            content_hash: row.content_hash,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct SegmentRow {
    id: i64,
    video_id: String,
    start_time: f64,
    end_time: f64,
    description: String,
    emotion_tags: String,
    object_tags: String,
    audio_tags: String,
}

impl SegmentRow {
    fn into_segment(self) -> ForensicSegment {
        ForensicSegment {
            id: self.id,
            video_id: AssetId(self.video_id),
            start_time: self.start_time,
            end_time: self.end_time,
            description: self.description,
            emotion_tags: decode_tags(&self.emotion_tags),
            object_tags: decode_tags(&self.object_tags),
            audio_tags: decode_tags(&self.audio_tags),
        }
    }
}

#[derive(Debug, FromRow)]
struct HitRow {
    #[sqlx(flatten)]
    segment: SegmentRow,
    origin_filename: String,
    location: String,
}

/// Tag columns hold JSON arrays; anything unreadable is treated as empty.
fn decode_tags(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}

/// Escape LIKE wildcards so the query matches literally.
fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Provides footage and segment persistence.
pub struct FootageRepo;

impl FootageRepo {
    /// Record a new asset.
    ///
    /// Fails with [`StoreError::Duplicate`] if the location or content hash
    /// is already recorded.
    pub async fn insert_asset(pool: &DbPool, input: &NewAsset) -> StoreResult<FootageAsset> {
        let asset = FootageAsset {
            id: AssetId::new(),
            origin_filename: input.origin_filename.clone(),
            location: input.location.clone(),
            duration_seconds: input.duration_seconds,
            content_hash: input.content_hash.clone(),
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO footage_assets
                (id, origin_filename, location, duration_seconds, content_hash, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(asset.id.as_str())
        .bind(&asset.origin_filename)
        .bind(&asset.location)
        .bind(asset.duration_seconds)
        .bind(&asset.content_hash)
        .bind(asset.created_at)
        .execute(pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Duplicate(format!("footage asset {}", asset.location))
            }
            e => e.into(),
        })?;

        Ok(asset)
    }

    pub async fn find_by_id(pool: &DbPool, id: &AssetId) -> StoreResult<Option<FootageAsset>> {
        let query = format!("SELECT {ASSET_COLUMNS} FROM footage_assets WHERE id = ?");
        let row = sqlx::query_as::<_, AssetRow>(&query)
            .bind(id.as_str())
            .fetch_optional(pool)
            .await?;
        Ok(row.map(Into::into))
    }

    pub async fn get(pool: &DbPool, id: &AssetId) -> StoreResult<FootageAsset> {
        Self::find_by_id(pool, id)
            .await?
            .ok_or_else(|| StoreError::not_found(format!("footage asset {id}")))
    }

    pub async fn find_by_hash(pool: &DbPool, content_hash: &str) -> StoreResult<Option<FootageAsset>> {
        let query = format!(
            "SELECT {ASSET_COLUMNS} FROM footage_assets
             WHERE content_hash = ?
             ORDER BY created_at ASC
             LIMIT 1"
        );
        let row = sqlx::query_as::<_, AssetRow>(&query)
            .bind(content_hash)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(Into::into))
    }

    pub async fn find_by_location(pool: &DbPool, location: &str) -> StoreResult<Option<FootageAsset>> {
        let query = format!("SELECT {ASSET_COLUMNS} FROM footage_assets WHERE location = ?");
        let row = sqlx::query_as::<_, AssetRow>(&query)
            .bind(location)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(Into::into))
    }

    /// All assets, newest first.
    pub async fn list(pool: &DbPool) -> StoreResult<Vec<FootageAsset>> {
        let query = format!(
            "SELECT {ASSET_COLUMNS} FROM footage_assets ORDER BY created_at DESC, rowid DESC"
        );
        let rows = sqlx::query_as::<_, AssetRow>(&query).fetch_all(pool).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Delete an asset and, by cascade, its segments. Returns the removed row.
    pub async fn delete(pool: &DbPool, id: &AssetId) -> StoreResult<Option<FootageAsset>> {
        let Some(asset) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };
        sqlx::query("DELETE FROM footage_assets WHERE id = ?")
            .bind(id.as_str())
            .execute(pool)
            .await?;
        Ok(Some(asset))
    }

    pub async fn insert_segment(
        pool: &DbPool,
        video_id: &AssetId,
        input: &NewSegment,
    ) -> StoreResult<ForensicSegment> {
        let emotion_tags = serde_json::to_string(&input.emotion_tags)?;
        let object_tags = serde_json::to_string(&input.object_tags)?;
        let audio_tags = serde_json::to_string(&input.audio_tags)?;

        let result = sqlx::query(
            "INSERT INTO forensic_segments
                (video_id, start_time, end_time, description, emotion_tags, object_tags, audio_tags)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(video_id.as_str())
        .bind(input.start_time)
        .bind(input.end_time)
        .bind(&input.description)
        .bind(&emotion_tags)
        .bind(&object_tags)
        .bind(&audio_tags)
        .execute(pool)
        .await?;

        Ok(ForensicSegment {
            id: result.last_insert_rowid(),
            video_id: video_id.clone(),
            start_time: input.start_time,
            end_time: input.end_time,
            description: input.description.clone(),
            emotion_tags: input.emotion_tags.clone(),
            object_tags: input.object_tags.clone(),
            audio_tags: input.audio_tags.clone(),
        })
    }

    /// Segments of one asset in time order.
    pub async fn segments_for_asset(pool: &DbPool, video_id: &AssetId) -> StoreResult<Vec<ForensicSegment>> {
        let query = format!(
            "SELECT {SEGMENT_COLUMNS} FROM forensic_segments s
             WHERE s.video_id = ?
             ORDER BY s.start_time ASC, s.id ASC"
        );
        let rows = sqlx::query_as::<_, SegmentRow>(&query)
            .bind(video_id.as_str())
            .fetch_all(pool)
            .await?;
        Ok(rows.into_iter().map(SegmentRow::into_segment).collect())
    }

    /// Case-insensitive substring search over description, emotion and
    /// object tags, in insertion order.
    ///
    /// Case folding is ASCII only, matching SQLite's `lower()`.
    pub async fn search(pool: &DbPool, query_text: &str, limit: i64) -> StoreResult<Vec<SegmentHit>> {
        let needle = query_text.trim();
        if needle.is_empty() || limit <= 0 {
            return Ok(Vec::new());
        }
        let pattern = like_pattern(&needle.to_ascii_lowercase());

        let query = format!(
            "SELECT {SEGMENT_COLUMNS}, a.origin_filename, a.location
             FROM forensic_segments s
             JOIN footage_assets a ON a.id = s.video_id
             WHERE lower(s.description) LIKE ? ESCAPE '\\'
                OR lower(s.emotion_tags) LIKE ? ESCAPE '\\'
                OR lower(s.object_tags) LIKE ? ESCAPE '\\'
             ORDER BY s.id ASC
             LIMIT ?"
        );
        let rows = sqlx::query_as::<_, HitRow>(&query)
            .bind(&pattern)
            .bind(&pattern)
            .bind(&pattern)
            .bind(limit)
            .fetch_all(pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| SegmentHit {
                segment: row.segment.into_segment(),
                origin_filename: row.origin_filename,
                location: row.location,
            })
            .collect())
    }

    pub async fn count_segments(pool: &DbPool, video_id: &AssetId) -> StoreResult<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM forensic_segments WHERE video_id = ?")
                .bind(video_id.as_str())
                .fetch_one(pool)
                .await?;
        Ok(count)
    }
}
