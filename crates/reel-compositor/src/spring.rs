//! Damped-spring entrance progress for text clips.

use serde::{Deserialize, Serialize};

/// Distance from 1.0 at which the spring counts as settled.
const REST_THRESHOLD: f64 = 0.005;

/// Progress is forced to 1.0 at this clip-local time regardless of
/// the spring parameters.
pub const SETTLE_SECONDS: f64 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpringConfig {
    pub damping: f64,
    pub stiffness: f64,
    pub mass: f64,
}

impl Default for SpringConfig {
    fn default() -> Self {
        Self {
            damping: 12.0,
            stiffness: 120.0,
            mass: 1.0,
        }
    }
}

/// Step response of a mass-spring-damper starting at rest at 0, target 1.
fn spring_step(t: f64, config: SpringConfig) -> f64 {
    let k = config.stiffness.max(0.0);
    let c = config.damping.max(0.0);
    let m = config.mass.max(1e-9);

    let w0 = (k / m).sqrt();
    if w0 == 0.0 {
        return t;
    }
    let zeta = c / (2.0 * (k * m).sqrt()).max(1e-9);

    if (zeta - 1.0).abs() < 1e-6 {
        let e = (-w0 * t).exp();
        1.0 - e * (1.0 + w0 * t)
    } else if zeta < 1.0 {
        let wd = w0 * (1.0 - zeta * zeta).sqrt();
        let e = (-zeta * w0 * t).exp();
        let ratio = zeta / (1.0 - zeta * zeta).sqrt();
        1.0 - e * ((wd * t).cos() + ratio * (wd * t).sin())
    } else {
        let z2 = (zeta * zeta - 1.0).sqrt();
        let r1 = -w0 * (zeta - z2);
        let r2 = -w0 * (zeta + z2);
        let c2 = (zeta + z2) / (2.0 * z2);
        let c1 = (zeta - z2) / (2.0 * z2);
        1.0 - (c2 * (r1 * t).exp() - c1 * (r2 * t).exp())
    }
}

/// Entrance progress in `[0, 1]` at `local_frame` frames into a clip.
///
/// The raw step response overshoots for underdamped springs; progress is the
/// running maximum of the clamped response, so it never decreases and stays
/// at 1.0 once the spring first reaches rest.
pub fn spring_progress(local_frame: u64, fps: f64, config: SpringConfig) -> f64 {
    if fps <= 0.0 {
        return 1.0;
    }
    if local_frame as f64 / fps >= SETTLE_SECONDS {
        return 1.0;
    }

    let mut best = 0.0_f64;
    for f in 0..=local_frame {
        let value = spring_step(f as f64 / fps, config).clamp(0.0, 1.0);
        best = best.max(value);
        if best >= 1.0 - REST_THRESHOLD {
            return 1.0;
        }
    }
    best
}
