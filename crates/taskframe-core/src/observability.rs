use serde::{Deserialize, Serialize};

use crate::domain::{RenderMode, RunId, SessionStatus};

/// Serializable view of the session, published on every state change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub run_id: Option<RunId>,
    pub render_mode: RenderMode,
    pub has_completed: bool,
}
