//! Per-clip visual effects.

use reel_models::ClipEffect;

use crate::frame::{Filters, Transform};
use crate::noise::{noise01, noise_signed};

pub const KEN_BURNS_INTENSITY: f64 = 1.15;
pub const ZOOM_INTENSITY: f64 = 1.3;
pub const GLITCH_PERIOD_FRAMES: u64 = 10;
pub const GLITCH_BURST_FRAMES: u64 = 3;

const GLITCH_MAX_SHIFT_PX: f64 = 12.0;
const GLITCH_MIN_SPLIT_PX: f64 = 2.0;
const GLITCH_SPLIT_RANGE_PX: f64 = 6.0;
const GLITCH_SEED: u64 = 0x6C17_C400;
const BW_CONTRAST: f64 = 1.2;

pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Continuous pan/zoom: scale grows linearly to `intensity` over the clip
/// while drifting left by the extra width.
pub fn pan_zoom(progress: f64, intensity: f64, canvas_width: f64) -> Transform {
    let scale = lerp(1.0, intensity, progress.clamp(0.0, 1.0));
    Transform {
        scale,
        translate_x: -(scale - 1.0) * canvas_width * 0.25,
        translate_y: 0.0,
    }
}

/// Apply `effect` on top of the base transform and filters.
///
/// `progress` is `local_frame / clip_frames`; glitch timing uses the local
/// frame and is seeded per clip so neighbouring clips jitter differently.
pub fn apply_effect(
    effect: ClipEffect,
    clip_index: usize,
    local_frame: u64,
    progress: f64,
    canvas_width: f64,
    transform: &mut Transform,
    filters: &mut Filters,
) {
    match effect {
        ClipEffect::KenBurns => {
            *transform = pan_zoom(progress, KEN_BURNS_INTENSITY, canvas_width);
        }
        ClipEffect::ZoomIn => {
            transform.scale *= lerp(1.0, ZOOM_INTENSITY, progress.clamp(0.0, 1.0));
        }
        ClipEffect::Glitch => {
            if local_frame % GLITCH_PERIOD_FRAMES < GLITCH_BURST_FRAMES {
                let seed = GLITCH_SEED ^ clip_index as u64;
                transform.translate_x += noise_signed(seed, local_frame * 2) * GLITCH_MAX_SHIFT_PX;
                transform.translate_y +=
                    noise_signed(seed, local_frame * 2 + 1) * GLITCH_MAX_SHIFT_PX * 0.5;
                filters.channel_split_px =
                    GLITCH_MIN_SPLIT_PX + noise01(seed.rotate_left(17), local_frame) * GLITCH_SPLIT_RANGE_PX;
            }
        }
        ClipEffect::BwFilter => {
            filters.grayscale = 1.0;
            filters.contrast = BW_CONTRAST;
        }
        ClipEffect::None => {}
    }
}
