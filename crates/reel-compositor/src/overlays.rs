//! Global overlays applied after every clip.

use reel_models::GlobalStyleFlags;

use crate::frame::GlobalOverlays;
use crate::noise::noise01;

const VIGNETTE_STRENGTH: f64 = 0.6;
/// Bar height as a fraction of canvas height
const LETTERBOX_FRACTION: f64 = 0.1;
const GRAIN_BASE_OPACITY: f64 = 0.04;
const GRAIN_JITTER: f64 = 0.04;
const GRAIN_SEED: u64 = 0x6EA1_7000;

pub fn evaluate_overlays(flags: GlobalStyleFlags, frame: u64, canvas_height: u32) -> GlobalOverlays {
    GlobalOverlays {
        vignette_strength: flags.vignette.then_some(VIGNETTE_STRENGTH),
        letterbox_bar_px: flags
            .letterbox
            .then(|| (canvas_height as f64 * LETTERBOX_FRACTION).round()),
        grain_opacity: flags
            .film_grain
            .then(|| GRAIN_BASE_OPACITY + noise01(GRAIN_SEED, frame) * GRAIN_JITTER),
    }
}
