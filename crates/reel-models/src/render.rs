//! Render request lifecycle models.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

use crate::footage::AssetId;

/// Identifier of a render request and of its workspace directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct RenderId(pub String);

impl RenderId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the id is safe to use as a single path component.
    pub fn is_path_safe(&self) -> bool {
        !self.0.is_empty()
            && self
                .0
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    }
}

impl Default for RenderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RenderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for RenderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RenderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Render request state.
///
/// `Queued -> Running -> Succeeded | Failed`; both end states are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RenderState {
    #[default]
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl RenderState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderState::Queued => "QUEUED",
            RenderState::Running => "RUNNING",
            RenderState::Succeeded => "SUCCEEDED",
            RenderState::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RenderState::Succeeded | RenderState::Failed)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(&self, next: RenderState) -> bool {
        matches!(
            (self, next),
            (RenderState::Queued, RenderState::Running)
                | (RenderState::Queued, RenderState::Failed)
                | (RenderState::Running, RenderState::Succeeded)
                | (RenderState::Running, RenderState::Failed)
        )
    }
}

impl fmt::Display for RenderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a render request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenderStatus {
    pub render_id: RenderId,
    pub state: RenderState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_asset_id: Option<AssetId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl RenderStatus {
    pub fn queued(render_id: RenderId) -> Self {
        Self {
            render_id,
            state: RenderState::Queued,
            output_asset_id: None,
            error: None,
            updated_at: Utc::now(),
        }
    }
}

/// Isolated per-render workspace holding trimmed derivatives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenderProject {
    pub id: RenderId,
    pub created_at: DateTime<Utc>,
    pub root: PathBuf,
    pub assets_dir: PathBuf,
}
