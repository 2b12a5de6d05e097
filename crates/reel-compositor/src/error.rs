use reel_models::ScheduleViolation;
use thiserror::Error;

pub type CompositorResult<T> = Result<T, CompositorError>;

#[derive(Debug, Error)]
pub enum CompositorError {
    #[error("frame {frame} is outside the timeline (0..{total})")]
    FrameOutOfRange { frame: u64, total: u64 },

    #[error("invalid schedule: {0}")]
    InvalidSchedule(#[from] ScheduleViolation),
}
