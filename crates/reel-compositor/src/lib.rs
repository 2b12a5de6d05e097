//! Frame-indexed evaluation of a [`RenderSchedule`](reel_models::RenderSchedule).
//!
//! Everything here is a pure function of the schedule and a frame number:
//! the same inputs always produce the same [`FrameState`]. Effects compose in
//! a fixed order per video clip (base content, clip effect, entry
//! transition) and global overlays are applied last.

pub mod effects;
pub mod error;
pub mod frame;
pub mod noise;
pub mod overlays;
pub mod spring;
pub mod text;
pub mod timeline;
pub mod transitions;

pub use error::{CompositorError, CompositorResult};
pub use frame::{
    AudioSample, Filters, FrameState, GlobalOverlays, LayerSource, TextLayer, Transform,
    VisualLayer,
};
pub use spring::{spring_progress, SpringConfig};
pub use timeline::{evaluate_frame, Timeline};
