//! Evaluated state of a single frame.

use serde::Serialize;

/// 2D transform applied around the canvas centre.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transform {
    pub scale: f64,
    /// Pixels, positive to the right
    pub translate_x: f64,
    /// Pixels, positive downward
    pub translate_y: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            translate_x: 0.0,
            translate_y: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Filters {
    /// 0 = colour, 1 = fully grayscale
    pub grayscale: f64,
    pub contrast: f64,
    /// Horizontal red/blue channel offset in pixels
    pub channel_split_px: f64,
}

impl Default for Filters {
    fn default() -> Self {
        Self {
            grayscale: 0.0,
            contrast: 1.0,
            channel_split_px: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum LayerSource {
    Image {
        uri: String,
    },
    #[serde(rename_all = "camelCase")]
    Video {
        uri: String,
        /// Position in the source file to sample
        source_time_seconds: f64,
    },
}

/// One video-track clip as it appears on this frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualLayer {
    pub clip_index: usize,
    pub local_frame: u64,
    pub source: LayerSource,
    pub transform: Transform,
    pub opacity: f64,
    pub filters: Filters,
    /// Fraction of the layer revealed left to right (wipe), 1 = whole layer
    pub reveal: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextLayer {
    pub clip_index: usize,
    /// Characters visible on this frame
    pub visible_text: String,
    pub opacity: f64,
    pub transform: Transform,
    /// Colour-pulse intensity in `[0, 1]`
    pub highlight: f64,
    pub font_size: f64,
    pub color: String,
    pub font_family: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioSample {
    pub clip_index: usize,
    pub uri: String,
    pub source_time_seconds: f64,
    pub volume: f64,
}

/// Whole-frame overlays, independent of any clip.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalOverlays {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vignette_strength: Option<f64>,
    /// Height in pixels of each of the top and bottom bars
    #[serde(skip_serializing_if = "Option::is_none")]
    pub letterbox_bar_px: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grain_opacity: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameState {
    pub frame: u64,
    pub time_seconds: f64,
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// Bottom to top
    pub layers: Vec<VisualLayer>,
    pub texts: Vec<TextLayer>,
    pub audio: Vec<AudioSample>,
    pub overlays: GlobalOverlays,
}
