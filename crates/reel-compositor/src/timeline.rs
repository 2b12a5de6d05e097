//! Frame lookup over a validated schedule.

use reel_models::{RenderSchedule, VideoClip};

use crate::effects::apply_effect;
use crate::error::{CompositorError, CompositorResult};
use crate::frame::{AudioSample, Filters, FrameState, LayerSource, Transform, VisualLayer};
use crate::overlays::evaluate_overlays;
use crate::text::evaluate_text;
use crate::transitions::apply_transition;

/// Clip placement in frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    start: u64,
    frames: u64,
}

impl Span {
    fn new(start_seconds: f64, duration_seconds: f64, fps: f64) -> Self {
        Self {
            start: (start_seconds.max(0.0) * fps).round() as u64,
            frames: ((duration_seconds.max(0.0) * fps).round() as u64).max(1),
        }
    }

    /// Clip-local frame if `frame` falls inside `[start, start + frames)`.
    fn local(&self, frame: u64) -> Option<u64> {
        (frame >= self.start && frame < self.start + self.frames).then(|| frame - self.start)
    }
}

/// A schedule checked once and ready for per-frame evaluation.
#[derive(Debug, Clone)]
pub struct Timeline {
    schedule: RenderSchedule,
    video: Vec<Span>,
    audio: Vec<Span>,
    text: Vec<Span>,
}

impl Timeline {
    pub fn new(schedule: RenderSchedule) -> CompositorResult<Self> {
        schedule.validate()?;
        let fps = schedule.frame_rate as f64;
        let video = schedule
            .tracks
            .video
            .iter()
            .map(|c| Span::new(c.timeline_start_seconds, c.clip_duration_seconds, fps))
            .collect();
        let audio = schedule
            .tracks
            .audio
            .iter()
            .map(|c| Span::new(c.timeline_start_seconds, c.clip_duration_seconds, fps))
            .collect();
        let text = schedule
            .tracks
            .text
            .iter()
            .map(|c| Span::new(c.timeline_start_seconds, c.clip_duration_seconds, fps))
            .collect();
        Ok(Self {
            schedule,
            video,
            audio,
            text,
        })
    }

    pub fn schedule(&self) -> &RenderSchedule {
        &self.schedule
    }

    pub fn total_frames(&self) -> u64 {
        self.schedule.total_duration_frames
    }

    pub fn evaluate(&self, frame: u64) -> CompositorResult<FrameState> {
        let total = self.total_frames();
        if frame >= total {
            return Err(CompositorError::FrameOutOfRange { frame, total });
        }

        let fps = self.schedule.frame_rate as f64;
        let width = self.schedule.canvas_width as f64;
        let tracks = &self.schedule.tracks;

        let layers = tracks
            .video
            .iter()
            .zip(&self.video)
            .enumerate()
            .filter_map(|(index, (clip, span))| {
                span.local(frame)
                    .map(|local| video_layer(clip, index, local, span.frames, fps, width))
            })
            .collect();

        let texts = tracks
            .text
            .iter()
            .zip(&self.text)
            .enumerate()
            .filter_map(|(index, (clip, span))| {
                span.local(frame)
                    .map(|local| evaluate_text(clip, index, local, span.frames, fps))
            })
            .collect();

        let audio = tracks
            .audio
            .iter()
            .zip(&self.audio)
            .enumerate()
            .filter_map(|(index, (clip, span))| {
                span.local(frame).map(|local| AudioSample {
                    clip_index: index,
                    uri: clip.source_uri.clone(),
                    source_time_seconds: local as f64 / fps,
                    volume: clip.volume,
                })
            })
            .collect();

        Ok(FrameState {
            frame,
            time_seconds: frame as f64 / fps,
            canvas_width: self.schedule.canvas_width,
            canvas_height: self.schedule.canvas_height,
            layers,
            texts,
            audio,
            overlays: evaluate_overlays(
                self.schedule.global_style_flags,
                frame,
                self.schedule.canvas_height,
            ),
        })
    }
}

fn video_layer(
    clip: &VideoClip,
    index: usize,
    local: u64,
    clip_frames: u64,
    fps: f64,
    canvas_width: f64,
) -> VisualLayer {
    let source = if clip.is_still_image() {
        LayerSource::Image {
            uri: clip.source_uri.clone(),
        }
    } else {
        LayerSource::Video {
            uri: clip.source_uri.clone(),
            source_time_seconds: clip.source_offset_seconds + local as f64 / fps,
        }
    };

    let mut transform = Transform::default();
    let mut filters = Filters::default();
    let mut opacity = 1.0;
    let mut reveal = 1.0;

    let progress = local as f64 / clip_frames as f64;
    apply_effect(
        clip.effect,
        index,
        local,
        progress,
        canvas_width,
        &mut transform,
        &mut filters,
    );
    apply_transition(
        clip.transition,
        local,
        canvas_width,
        &mut transform,
        &mut opacity,
        &mut reveal,
    );

    VisualLayer {
        clip_index: index,
        local_frame: local,
        source,
        transform,
        opacity,
        filters,
        reveal,
    }
}

/// Validate `schedule` and evaluate a single frame.
pub fn evaluate_frame(schedule: &RenderSchedule, frame: u64) -> CompositorResult<FrameState> {
    Timeline::new(schedule.clone())?.evaluate(frame)
}
