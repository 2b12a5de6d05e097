//! Entry transitions over a fixed lead-in window.

use reel_models::TransitionKind;

use crate::frame::Transform;

pub const TRANSITION_LEAD_IN_FRAMES: u64 = 15;

/// Linear ramp from 0 to 1 across the lead-in, clamped afterwards.
pub fn lead_in_progress(local_frame: u64) -> f64 {
    (local_frame.min(TRANSITION_LEAD_IN_FRAMES) as f64) / TRANSITION_LEAD_IN_FRAMES as f64
}

/// Apply the entry transition to an already effected layer.
pub fn apply_transition(
    kind: TransitionKind,
    local_frame: u64,
    canvas_width: f64,
    transform: &mut Transform,
    opacity: &mut f64,
    reveal: &mut f64,
) {
    let t = lead_in_progress(local_frame);
    match kind {
        TransitionKind::Fade => *opacity *= t,
        TransitionKind::Slide => transform.translate_x += (1.0 - t) * canvas_width,
        TransitionKind::Wipe => *reveal = reveal.min(t),
        TransitionKind::None => {}
    }
}
