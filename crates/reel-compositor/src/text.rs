//! Text clip animation.

use std::f64::consts::TAU;

use reel_models::{TextAnimation, TextClip};

use crate::frame::{TextLayer, Transform};
use crate::noise::noise_signed;
use crate::spring::{spring_progress, SpringConfig};

/// Typewriter finishes revealing at this fraction of the clip.
const TYPEWRITER_SPAN: f64 = 0.7;
const SLIDE_DISTANCE_PX: f64 = 60.0;
const SCALE_FROM: f64 = 0.6;
const SHAKE_AMPLITUDE_PX: f64 = 6.0;
const PULSE_PERIOD_SECONDS: f64 = 1.0;
const SHAKE_SEED: u64 = 0x5A4E_0000;

/// Number of characters shown by the typewriter at `local_frame`.
pub fn typewriter_visible_chars(char_count: usize, local_frame: u64, clip_frames: u64) -> usize {
    let span = ((clip_frames as f64 * TYPEWRITER_SPAN).round() as u64).max(1);
    let fraction = (local_frame as f64 / span as f64).min(1.0);
    ((char_count as f64 * fraction).ceil() as usize).min(char_count)
}

pub fn evaluate_text(
    clip: &TextClip,
    clip_index: usize,
    local_frame: u64,
    clip_frames: u64,
    fps: f64,
) -> TextLayer {
    let progress = spring_progress(local_frame, fps, SpringConfig::default());
    let mut transform = Transform::default();
    let mut opacity = 1.0;
    let mut highlight = 0.0;
    let mut visible_text = clip.content.clone();

    match clip.style.animation_kind {
        TextAnimation::Scale => {
            opacity = progress;
            transform.scale = SCALE_FROM + (1.0 - SCALE_FROM) * progress;
        }
        TextAnimation::Slide => {
            opacity = progress;
            transform.translate_y = (1.0 - progress) * SLIDE_DISTANCE_PX;
        }
        TextAnimation::Typewriter => {
            let total = clip.content.chars().count();
            let visible = typewriter_visible_chars(total, local_frame, clip_frames);
            visible_text = clip.content.chars().take(visible).collect();
        }
        TextAnimation::Shake => {
            let seed = SHAKE_SEED ^ clip_index as u64;
            transform.translate_x = noise_signed(seed, local_frame * 2) * SHAKE_AMPLITUDE_PX;
            transform.translate_y = noise_signed(seed, local_frame * 2 + 1) * SHAKE_AMPLITUDE_PX;
        }
        TextAnimation::ColorPulse => {
            opacity = progress;
            let t = local_frame as f64 / fps.max(1.0);
            highlight = 0.5 - 0.5 * (TAU * t / PULSE_PERIOD_SECONDS).cos();
        }
        TextAnimation::None => {}
    }

    TextLayer {
        clip_index,
        visible_text,
        opacity,
        transform,
        highlight,
        font_size: clip.style.font_size,
        color: clip.style.color.clone(),
        font_family: clip.style.font_family.clone(),
        background: clip.style.background.clone(),
    }
}
