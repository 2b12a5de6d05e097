//! Render schedule: the renderer-ready program produced by the compiler.
//!
//! Field names serialize in camelCase. The deserializer also accepts the
//! short keys emitted by the generative service (`src`, `startAt`,
//! `startFrom`, `duration`, `width`, `height`, `fps`, `durationInFrames`).

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

pub const DEFAULT_CANVAS_WIDTH: u32 = 1080;
pub const DEFAULT_CANVAS_HEIGHT: u32 = 1920;
pub const DEFAULT_FRAME_RATE: u32 = 30;

/// Source used when a clip's footage cannot be resolved.
pub const PLACEHOLDER_SOURCE: &str = "builtin:placeholder";

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif", "svg"];

fn placeholder_source() -> String {
    PLACEHOLDER_SOURCE.to_string()
}

/// Generated schedules copy an absent footage reference through as `null`.
fn source_or_placeholder<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(match value {
        Some(src) if !src.trim().is_empty() && !src.trim().eq_ignore_ascii_case("null") => src,
        _ => placeholder_source(),
    })
}

/// Per-clip visual effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ClipEffect {
    KenBurns,
    Glitch,
    #[serde(alias = "bw")]
    BwFilter,
    #[serde(alias = "zoom")]
    ZoomIn,
    #[default]
    #[serde(other)]
    None,
}

/// Entry transition applied over the clip's lead-in window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    Fade,
    Slide,
    Wipe,
    #[default]
    #[serde(other)]
    None,
}

/// Text entrance animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TextAnimation {
    #[default]
    Scale,
    Slide,
    Typewriter,
    Shake,
    ColorPulse,
    #[serde(other)]
    None,
}

impl ClipEffect {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClipEffect::KenBurns => "ken_burns",
            ClipEffect::Glitch => "glitch",
            ClipEffect::BwFilter => "bw_filter",
            ClipEffect::ZoomIn => "zoom_in",
            ClipEffect::None => "none",
        }
    }
}

/// Whole-video overlays applied after every clip.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GlobalStyleFlags {
    #[serde(default)]
    pub vignette: bool,
    #[serde(default)]
    pub letterbox: bool,
    #[serde(default, alias = "film_grain")]
    pub film_grain: bool,
}

impl GlobalStyleFlags {
    /// Union of two flag sets.
    pub fn merge(self, other: GlobalStyleFlags) -> GlobalStyleFlags {
        GlobalStyleFlags {
            vignette: self.vignette || other.vignette,
            letterbox: self.letterbox || other.letterbox,
            film_grain: self.film_grain || other.film_grain,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VideoClip {
    /// Null, blank or `"null"` sources read as [`PLACEHOLDER_SOURCE`]
    #[serde(
        alias = "src",
        default = "placeholder_source",
        deserialize_with = "source_or_placeholder"
    )]
    pub source_uri: String,
    #[serde(default, alias = "startFrom")]
    pub source_offset_seconds: f64,
    #[serde(alias = "duration")]
    pub clip_duration_seconds: f64,
    #[serde(default, alias = "startAt")]
    pub timeline_start_seconds: f64,
    #[serde(default)]
    pub effect: ClipEffect,
    #[serde(default)]
    pub transition: TransitionKind,
    /// `[start, end]` sub-range of the source to materialize as a new file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical_trim_range: Option<[f64; 2]>,
    #[serde(default)]
    pub use_external_trim: bool,
}

impl VideoClip {
    pub fn timeline_end_seconds(&self) -> f64 {
        self.timeline_start_seconds + self.clip_duration_seconds
    }

    pub fn is_placeholder(&self) -> bool {
        self.source_uri == PLACEHOLDER_SOURCE
    }

    /// Whether the source is a still image rather than a video.
    pub fn is_still_image(&self) -> bool {
        if self.is_placeholder() {
            return true;
        }
        let lower = self.source_uri.to_ascii_lowercase();
        lower
            .rsplit_once('.')
            .map(|(_, ext)| IMAGE_EXTENSIONS.contains(&ext))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AudioClip {
    #[serde(
        alias = "src",
        default = "placeholder_source",
        deserialize_with = "source_or_placeholder"
    )]
    pub source_uri: String,
    #[serde(default, alias = "startAt")]
    pub timeline_start_seconds: f64,
    #[serde(alias = "duration")]
    pub clip_duration_seconds: f64,
    #[serde(default = "default_volume")]
    pub volume: f64,
}

fn default_volume() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TextStyle {
    #[serde(default, alias = "animation")]
    pub animation_kind: TextAnimation,
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default = "default_font_family")]
    pub font_family: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            animation_kind: TextAnimation::default(),
            font_size: default_font_size(),
            color: default_color(),
            font_family: default_font_family(),
            background: None,
        }
    }
}

fn default_font_size() -> f64 {
    72.0
}

fn default_color() -> String {
    "#FFFFFF".to_string()
}

fn default_font_family() -> String {
    "Inter, sans-serif".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TextClip {
    pub content: String,
    #[serde(default, alias = "startAt")]
    pub timeline_start_seconds: f64,
    #[serde(alias = "duration")]
    pub clip_duration_seconds: f64,
    #[serde(default, alias = "textStyle")]
    pub style: TextStyle,
}

/// All clips of a schedule, grouped by kind.
///
/// On the wire this is a list of `{kind, clips}` objects; several entries of
/// the same kind are concatenated when read back.
#[derive(Debug, Clone, Default, PartialEq, JsonSchema)]
pub struct Tracks {
    pub video: Vec<VideoClip>,
    pub audio: Vec<AudioClip>,
    pub text: Vec<TextClip>,
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum TrackOut<'a> {
    Video { clips: &'a [VideoClip] },
    Audio { clips: &'a [AudioClip] },
    Text { clips: &'a [TextClip] },
}

#[derive(Deserialize)]
struct TrackIn {
    #[serde(alias = "type")]
    kind: String,
    #[serde(default)]
    clips: Vec<serde_json::Value>,
}

impl Serialize for Tracks {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let tracks = [
            TrackOut::Video { clips: &self.video },
            TrackOut::Audio { clips: &self.audio },
            TrackOut::Text { clips: &self.text },
        ];
        tracks.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Tracks {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;

        let raw = Vec::<TrackIn>::deserialize(deserializer)?;
        let mut tracks = Tracks::default();
        for track in raw {
            match track.kind.to_ascii_lowercase().as_str() {
                "video" => {
                    for clip in track.clips {
                        tracks.video.push(serde_json::from_value(clip).map_err(D::Error::custom)?);
                    }
                }
                "audio" => {
                    for clip in track.clips {
                        tracks.audio.push(serde_json::from_value(clip).map_err(D::Error::custom)?);
                    }
                }
                "text" => {
                    for clip in track.clips {
                        tracks.text.push(serde_json::from_value(clip).map_err(D::Error::custom)?);
                    }
                }
                other => return Err(D::Error::custom(format!("unknown track kind: {other}"))),
            }
        }
        Ok(tracks)
    }
}

/// A clip that does not fit the schedule.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScheduleViolation {
    #[error("canvas must be non-empty, got {width}x{height}")]
    InvalidCanvas { width: u32, height: u32 },

    #[error("frame rate must be positive")]
    InvalidFrameRate,

    #[error("{track} clip {index} ends at {end:.3}s, past the timeline end {total:.3}s")]
    ClipOverrunsTimeline {
        track: &'static str,
        index: usize,
        end: f64,
        total: f64,
    },

    #[error("{track} clip {index} has a negative start or duration")]
    NegativeTiming { track: &'static str, index: usize },
}

/// Renderer-ready program for one video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenderSchedule {
    #[serde(default = "default_width", alias = "width")]
    pub canvas_width: u32,
    #[serde(default = "default_height", alias = "height")]
    pub canvas_height: u32,
    #[serde(default = "default_fps", alias = "fps")]
    pub frame_rate: u32,
    #[serde(default, alias = "durationInFrames")]
    pub total_duration_frames: u64,
    #[schemars(with = "Vec<serde_json::Value>")]
    pub tracks: Tracks,
    #[serde(default)]
    pub global_style_flags: GlobalStyleFlags,
}

fn default_width() -> u32 {
    DEFAULT_CANVAS_WIDTH
}

fn default_height() -> u32 {
    DEFAULT_CANVAS_HEIGHT
}

fn default_fps() -> u32 {
    DEFAULT_FRAME_RATE
}

/// Slack allowed when comparing clip ends with the timeline end.
const TIMING_EPSILON: f64 = 1e-6;

impl RenderSchedule {
    /// Empty vertical schedule with the default canvas.
    pub fn vertical(total_duration_frames: u64) -> Self {
        Self {
            canvas_width: DEFAULT_CANVAS_WIDTH,
            canvas_height: DEFAULT_CANVAS_HEIGHT,
            frame_rate: DEFAULT_FRAME_RATE,
            total_duration_frames,
            tracks: Tracks::default(),
            global_style_flags: GlobalStyleFlags::default(),
        }
    }

    pub fn duration_seconds(&self) -> f64 {
        if self.frame_rate == 0 {
            return 0.0;
        }
        self.total_duration_frames as f64 / self.frame_rate as f64
    }

    /// Nearest frame index for a time in seconds.
    pub fn seconds_to_frames(&self, seconds: f64) -> u64 {
        (seconds.max(0.0) * self.frame_rate as f64).round() as u64
    }

    /// Frames needed to cover `seconds` completely.
    pub fn frames_covering(&self, seconds: f64) -> u64 {
        (seconds.max(0.0) * self.frame_rate as f64).ceil() as u64
    }

    /// End of the furthest clip on any track, in seconds.
    pub fn furthest_clip_end(&self) -> f64 {
        let video = self.tracks.video.iter().map(|c| c.timeline_end_seconds());
        let audio = self
            .tracks
            .audio
            .iter()
            .map(|c| c.timeline_start_seconds + c.clip_duration_seconds);
        let text = self
            .tracks
            .text
            .iter()
            .map(|c| c.timeline_start_seconds + c.clip_duration_seconds);
        video.chain(audio).chain(text).fold(0.0, f64::max)
    }

    /// Seconds of the timeline not covered by any video clip.
    pub fn uncovered_video_seconds(&self) -> f64 {
        let mut spans: Vec<(f64, f64)> = self
            .tracks
            .video
            .iter()
            .map(|c| (c.timeline_start_seconds, c.timeline_end_seconds()))
            .collect();
        spans.sort_by(|a, b| a.0.total_cmp(&b.0));

        let total = self.duration_seconds();
        let mut covered_until = 0.0_f64;
        let mut gaps = 0.0;
        for (start, end) in spans {
            if start > covered_until {
                gaps += start.min(total) - covered_until;
            }
            covered_until = covered_until.max(end);
            if covered_until >= total {
                break;
            }
        }
        if covered_until < total {
            gaps += total - covered_until;
        }
        gaps.max(0.0)
    }

    /// Check the hard timing rules.
    pub fn validate(&self) -> Result<(), ScheduleViolation> {
        if self.canvas_width == 0 || self.canvas_height == 0 {
            return Err(ScheduleViolation::InvalidCanvas {
                width: self.canvas_width,
                height: self.canvas_height,
            });
        }
        if self.frame_rate == 0 {
            return Err(ScheduleViolation::InvalidFrameRate);
        }

        let total = self.duration_seconds();
        let spans = self
            .tracks
            .video
            .iter()
            .map(|c| ("video", c.timeline_start_seconds, c.clip_duration_seconds))
            .chain(
                self.tracks
                    .audio
                    .iter()
                    .map(|c| ("audio", c.timeline_start_seconds, c.clip_duration_seconds)),
            )
            .chain(
                self.tracks
                    .text
                    .iter()
                    .map(|c| ("text", c.timeline_start_seconds, c.clip_duration_seconds)),
            );

        let mut last_track = "";
        let mut index = 0;
        for (track, start, duration) in spans {
            if track != last_track {
                last_track = track;
                index = 0;
            }
            if start < 0.0 || duration < 0.0 {
                return Err(ScheduleViolation::NegativeTiming { track, index });
            }
            let end = start + duration;
            if end > total + TIMING_EPSILON {
                return Err(ScheduleViolation::ClipOverrunsTimeline {
                    track,
                    index,
                    end,
                    total,
                });
            }
            index += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(start: f64, duration: f64) -> VideoClip {
        VideoClip {
            source_uri: "/footage/raw/a.mp4".into(),
            source_offset_seconds: 0.0,
            clip_duration_seconds: duration,
            timeline_start_seconds: start,
            effect: ClipEffect::None,
            transition: TransitionKind::None,
            physical_trim_range: None,
            use_external_trim: false,
        }
    }

    #[test]
    fn test_reads_generated_schedule_shape() {
        let json = r#"{
            "width": 1080, "height": 1920, "fps": 30, "durationInFrames": 180,
            "tracks": [
                {"type": "video", "clips": [
                    {"src": "beach.mp4", "startAt": 0, "duration": 3, "effect": "ken_burns", "transition": "fade"},
                    {"src": "city.mp4", "startAt": 3, "duration": 3, "startFrom": 12.5, "effect": "sparkles"}
                ]},
                {"type": "audio", "clips": []},
                {"type": "text", "clips": [
                    {"content": "HELLO", "startAt": 0, "duration": 2, "textStyle": {"animation": "typewriter"}}
                ]}
            ]
        }"#;
        let schedule: RenderSchedule = serde_json::from_str(json).unwrap();
        assert_eq!(schedule.frame_rate, 30);
        assert_eq!(schedule.total_duration_frames, 180);
        assert_eq!(schedule.tracks.video.len(), 2);
        assert_eq!(schedule.tracks.video[0].effect, ClipEffect::KenBurns);
        assert_eq!(schedule.tracks.video[1].effect, ClipEffect::None);
        assert_eq!(schedule.tracks.video[1].source_offset_seconds, 12.5);
        assert_eq!(schedule.tracks.text[0].style.animation_kind, TextAnimation::Typewriter);
        assert_eq!(schedule.tracks.text[0].style.color, "#FFFFFF");
        assert!(schedule.validate().is_ok());
    }

    #[test]
    fn test_absent_source_reads_as_placeholder() {
        let json = r#"{"tracks": [
            {"type": "video", "clips": [
                {"src": null, "startAt": 0, "duration": 1},
                {"sourceUri": "null", "startAt": 1, "duration": 1},
                {"startAt": 2, "duration": 1},
                {"src": "beach.mp4", "startAt": 3, "duration": 1}
            ]},
            {"type": "audio", "clips": [{"src": null, "duration": 4}]}
        ]}"#;
        let schedule: RenderSchedule = serde_json::from_str(json).unwrap();
        let sources: Vec<&str> = schedule
            .tracks
            .video
            .iter()
            .map(|c| c.source_uri.as_str())
            .collect();
        assert_eq!(
            sources,
            vec![PLACEHOLDER_SOURCE, PLACEHOLDER_SOURCE, PLACEHOLDER_SOURCE, "beach.mp4"]
        );
        assert!(schedule.tracks.video[0].is_placeholder());
        assert_eq!(schedule.tracks.audio[0].source_uri, PLACEHOLDER_SOURCE);
    }

    #[test]
    fn test_tracks_serialize_as_kind_list() {
        let mut schedule = RenderSchedule::vertical(90);
        schedule.tracks.video.push(video(0.0, 3.0));
        let value = serde_json::to_value(&schedule).unwrap();
        let tracks = value["tracks"].as_array().unwrap();
        assert_eq!(tracks.len(), 3);
        assert_eq!(tracks[0]["kind"], "video");
        assert_eq!(tracks[0]["clips"][0]["sourceUri"], "/footage/raw/a.mp4");
        assert_eq!(value["canvasHeight"], 1920);

        let back: RenderSchedule = serde_json::from_value(value).unwrap();
        assert_eq!(back, schedule);
    }

    #[test]
    fn test_validate_rejects_overrun() {
        let mut schedule = RenderSchedule::vertical(90);
        schedule.tracks.video.push(video(0.0, 2.0));
        schedule.tracks.video.push(video(2.0, 1.5));
        let err = schedule.validate().unwrap_err();
        assert!(matches!(
            err,
            ScheduleViolation::ClipOverrunsTimeline { track: "video", index: 1, .. }
        ));
    }

    #[test]
    fn test_uncovered_video_seconds() {
        let mut schedule = RenderSchedule::vertical(300);
        schedule.tracks.video.push(video(0.0, 3.0));
        schedule.tracks.video.push(video(5.0, 3.0));
        // gaps: [3,5) and [8,10)
        assert!((schedule.uncovered_video_seconds() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_still_image_detection() {
        let mut clip = video(0.0, 1.0);
        assert!(!clip.is_still_image());
        clip.source_uri = "poster.PNG".into();
        assert!(clip.is_still_image());
        clip.source_uri = PLACEHOLDER_SOURCE.into();
        assert!(clip.is_still_image());
    }
}
