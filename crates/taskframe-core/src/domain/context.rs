//! Execution context: ambient metadata the host attaches to a run.
//!
//! The context is supplied wholesale with INIT and never partially updated.
//! Only `conversation_id`, `api_token` and `api_base_url` are read by the crate
//! itself (remote task invocation); the rest is carried for the embedding
//! application.

use serde::{Deserialize, Serialize};

use super::ids::{RunId, StepId};

/// Whether the task only displays information or blocks on user completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    #[default]
    Display,
    Interaction,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

/// Capabilities the host advertises to the task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostCapabilities {
    #[serde(default)]
    pub resize: bool,
    #[serde(default)]
    pub fullscreen: bool,
    #[serde(default)]
    pub file_upload: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationIdentity {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionContext {
    pub run_id: RunId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_id: Option<StepId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserIdentity>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<OrganizationIdentity>,

    #[serde(default)]
    pub theme: Theme,

    #[serde(default = "default_locale")]
    pub locale: String,

    #[serde(default)]
    pub capabilities: HostCapabilities,

    /// Forwarded as `x-conversation-id` on remote task invocations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,

    /// Bearer token for remote task invocations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,

    /// Explicit API base URL; wins over hostname-based detection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,
}

fn default_locale() -> String {
    "en-US".to_string()
}

impl ExecutionContext {
    pub fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            step_id: None,
            user: None,
            organization: None,
            theme: Theme::default(),
            locale: default_locale(),
            capabilities: HostCapabilities::default(),
            conversation_id: None,
            api_token: None,
            api_base_url: None,
        }
    }
}
