//! Message catalog: the closed set of envelopes exchanged between host and task.
//!
//! Every envelope is `{ "type": "<prefix><name>", "payload": { ... } }`.
//! Host→task and task→host messages are separate enums so that a side can
//! only construct what it is allowed to send.

use serde::{Deserialize, Serialize};

use super::context::{ExecutionContext, RenderMode};
use super::ids::RunId;

/// Reserved prefix shared by every protocol message type.
pub const MESSAGE_PREFIX: &str = "task-ui:";

/// Version announced in READY.
pub const PROTOCOL_VERSION: &str = "1.0.0";

/// Which way an envelope legally travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    HostToTask,
    TaskToHost,
}

/// Wire tag of every catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Init,
    UpdateInputs,
    Destroy,
    Ready,
    Complete,
    Cancel,
    Resize,
    Error,
    Log,
}

impl MessageType {
    pub const ALL: [MessageType; 9] = [
        MessageType::Init,
        MessageType::UpdateInputs,
        MessageType::Destroy,
        MessageType::Ready,
        MessageType::Complete,
        MessageType::Cancel,
        MessageType::Resize,
        MessageType::Error,
        MessageType::Log,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::Init => "task-ui:init",
            MessageType::UpdateInputs => "task-ui:update-inputs",
            MessageType::Destroy => "task-ui:destroy",
            MessageType::Ready => "task-ui:ready",
            MessageType::Complete => "task-ui:complete",
            MessageType::Cancel => "task-ui:cancel",
            MessageType::Resize => "task-ui:resize",
            MessageType::Error => "task-ui:error",
            MessageType::Log => "task-ui:log",
        }
    }

    /// Exact, case-sensitive lookup.
    pub fn from_wire(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == tag)
    }

    pub fn direction(self) -> Direction {
        match self {
            MessageType::Init | MessageType::UpdateInputs | MessageType::Destroy => {
                Direction::HostToTask
            }
            _ => Direction::TaskToHost,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// host → task
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitPayload {
    pub run_id: RunId,
    #[serde(default)]
    pub inputs: serde_json::Value,
    pub context: ExecutionContext,
    #[serde(default)]
    pub render_mode: RenderMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInputsPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<RunId>,
    pub inputs: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DestroyPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<RunId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum HostMessage {
    #[serde(rename = "task-ui:init")]
    Init(InitPayload),
    #[serde(rename = "task-ui:update-inputs")]
    UpdateInputs(UpdateInputsPayload),
    #[serde(rename = "task-ui:destroy")]
    Destroy(DestroyPayload),
}

impl HostMessage {
    pub fn message_type(&self) -> MessageType {
        match self {
            HostMessage::Init(_) => MessageType::Init,
            HostMessage::UpdateInputs(_) => MessageType::UpdateInputs,
            HostMessage::Destroy(_) => MessageType::Destroy,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// task → host
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadyPayload {
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletePayload {
    pub run_id: RunId,
    pub output: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelPayload {
    pub run_id: RunId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Requested frame height: logical pixels, or the `"auto"` sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Value", into = "serde_json::Value")]
pub enum Height {
    Pixels(f64),
    Auto,
}

const AUTO_HEIGHT: &str = "auto";

impl Height {
    /// `None` unless `px` is finite and non-negative.
    pub fn pixels(px: f64) -> Option<Self> {
        (px.is_finite() && px >= 0.0).then_some(Height::Pixels(px))
    }

    /// Whether the value survives the wire (NaN serializes as `null`).
    pub fn is_valid(&self) -> bool {
        match self {
            Height::Pixels(px) => px.is_finite() && *px >= 0.0,
            Height::Auto => true,
        }
    }
}

impl TryFrom<serde_json::Value> for Height {
    type Error = String;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        match &value {
            serde_json::Value::String(s) if s == AUTO_HEIGHT => Ok(Height::Auto),
            serde_json::Value::Number(n) => match n.as_f64().and_then(Height::pixels) {
                Some(height) => Ok(height),
                _ => Err(format!("height must be non-negative, got {n}")),
            },
            other => Err(format!("height must be a number or \"auto\", got {other}")),
        }
    }
}

impl From<Height> for serde_json::Value {
    fn from(height: Height) -> Self {
        match height {
            Height::Pixels(px) => serde_json::json!(px),
            Height::Auto => serde_json::Value::String(AUTO_HEIGHT.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResizePayload {
    pub run_id: RunId,
    pub height: Height,
}

/// Error details reported by the task to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskError {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl TaskError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub run_id: RunId,
    pub error: TaskError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogPayload {
    pub run_id: RunId,
    pub level: LogLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum TaskMessage {
    #[serde(rename = "task-ui:ready")]
    Ready(ReadyPayload),
    #[serde(rename = "task-ui:complete")]
    Complete(CompletePayload),
    #[serde(rename = "task-ui:cancel")]
    Cancel(CancelPayload),
    #[serde(rename = "task-ui:resize")]
    Resize(ResizePayload),
    #[serde(rename = "task-ui:error")]
    Error(ErrorPayload),
    #[serde(rename = "task-ui:log")]
    Log(LogPayload),
}

impl TaskMessage {
    pub fn ready() -> Self {
        TaskMessage::Ready(ReadyPayload {
            version: PROTOCOL_VERSION.to_string(),
        })
    }

    pub fn message_type(&self) -> MessageType {
        match self {
            TaskMessage::Ready(_) => MessageType::Ready,
            TaskMessage::Complete(_) => MessageType::Complete,
            TaskMessage::Cancel(_) => MessageType::Cancel,
            TaskMessage::Resize(_) => MessageType::Resize,
            TaskMessage::Error(_) => MessageType::Error,
            TaskMessage::Log(_) => MessageType::Log,
        }
    }

    /// Run the message belongs to; READY is the only run-less message.
    pub fn run_id(&self) -> Option<&RunId> {
        match self {
            TaskMessage::Ready(_) => None,
            TaskMessage::Complete(p) => Some(&p.run_id),
            TaskMessage::Cancel(p) => Some(&p.run_id),
            TaskMessage::Resize(p) => Some(&p.run_id),
            TaskMessage::Error(p) => Some(&p.run_id),
            TaskMessage::Log(p) => Some(&p.run_id),
        }
    }
}
