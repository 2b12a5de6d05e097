//! Shot plan and audio analysis models.
//!
//! A [`ShotPlan`] is produced once by the planning stage and consumed once by
//! the schedule compiler. It is never persisted.

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

use crate::schedule::{ClipEffect, TextAnimation, TransitionKind};

/// Average speaking rate used when no measured duration is available.
pub const WORDS_PER_SECOND: f64 = 2.5;

/// Estimate spoken duration of a script from its word count.
pub fn estimate_duration_seconds(script: &str) -> f64 {
    script.split_whitespace().count() as f64 / WORDS_PER_SECOND
}

/// Structured plan for the whole video.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShotPlan {
    #[serde(default, alias = "script_analysis", skip_serializing_if = "Option::is_none")]
    pub script_analysis: Option<ScriptAnalysis>,
    pub segments: Vec<PlanSegment>,
    #[serde(default, alias = "global_style")]
    pub global_style: GlobalStyle,
}

impl ShotPlan {
    /// End of the last planned segment, in seconds.
    pub fn planned_duration(&self) -> f64 {
        self.segments
            .iter()
            .map(|s| s.time_range.end)
            .fold(0.0, f64::max)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScriptAnalysis {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub tone: String,
    #[serde(default, alias = "estimated_duration")]
    pub estimated_duration: Option<f64>,
}

/// One planned shot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlanSegment {
    #[serde(alias = "time_range")]
    #[schemars(with = "String")]
    pub time_range: TimeRange,
    #[serde(default, alias = "script_text")]
    pub script_text: String,
    #[serde(default, alias = "visual_intent")]
    pub visual_intent: String,
    /// File name of library footage, or `None` for a placeholder visual
    #[serde(default, alias = "suggested_footage", alias = "suggested_footage_ref")]
    pub suggested_footage_ref: Option<String>,
    #[serde(default)]
    pub effect: ClipEffect,
    #[serde(default)]
    pub transition: TransitionKind,
    #[serde(default, alias = "text_overlay")]
    pub text_overlay: Option<String>,
    #[serde(default, alias = "text_animation")]
    pub text_animation: TextAnimation,
}

/// Whole-video look requested by the planner.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GlobalStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
    #[serde(default)]
    pub vignette: bool,
    #[serde(default)]
    pub letterbox: bool,
    #[serde(default, alias = "film_grain")]
    pub film_grain: bool,
}

/// Output of the transcription/analysis service for a voice track.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AudioAnalysis {
    #[serde(default, alias = "script_text")]
    pub text: String,
    #[serde(default, alias = "duration_sec", alias = "duration_seconds")]
    pub duration_seconds: Option<f64>,
    #[serde(default, alias = "emotion_timeline")]
    pub emotion_timeline: Vec<EmotionMark>,
    #[serde(default, alias = "cue_words")]
    pub cue_words: Vec<CueWord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmotionMark {
    #[serde(alias = "atSec", alias = "at_sec")]
    pub at_seconds: f64,
    pub emotion: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CueWord {
    #[serde(alias = "atSec", alias = "at_sec")]
    pub at_seconds: f64,
    pub word: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid time range: {0}")]
pub struct TimeRangeError(pub String);

/// A `[start, end)` window in seconds, written as `"0-3s"` on the wire.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

impl TimeRange {
    pub fn new(start: f64, end: f64) -> Result<Self, TimeRangeError> {
        if !start.is_finite() || !end.is_finite() || start < 0.0 || end < start {
            return Err(TimeRangeError(format!("{start}-{end}")));
        }
        Ok(Self { start, end })
    }

    /// Parse forms such as `"0-3s"`, `"0s - 3s"` or `"1.5-4"`.
    pub fn parse(raw: &str) -> Result<Self, TimeRangeError> {
        let cleaned: String = raw
            .chars()
            .filter(|c| !c.is_whitespace() && *c != 's' && *c != 'S')
            .collect();
        let (a, b) = cleaned
            .split_once('-')
            .ok_or_else(|| TimeRangeError(raw.to_string()))?;
        let start = a.parse::<f64>().map_err(|_| TimeRangeError(raw.to_string()))?;
        let end = b.parse::<f64>().map_err(|_| TimeRangeError(raw.to_string()))?;
        Self::new(start, end).map_err(|_| TimeRangeError(raw.to_string()))
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}s", self.start, self.end)
    }
}

impl Serialize for TimeRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeRange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Pair([f64; 2]),
            Object { start: f64, end: f64 },
        }

        let range = match Repr::deserialize(deserializer)? {
            Repr::Text(s) => TimeRange::parse(&s),
            Repr::Pair([start, end]) => TimeRange::new(start, end),
            Repr::Object { start, end } => TimeRange::new(start, end),
        };
        range.map_err(serde::de::Error::custom)
    }
}
