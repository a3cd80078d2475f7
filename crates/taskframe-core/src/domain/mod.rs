//! Domain model (ids, message catalog, execution context, status, errors).
//!
//! - ids: 不透明な文字列 ID（RunId, StepId, TaskUuid）
//! - message: wire 上の envelope カタログ
//! - classify: 生の値 → catalog message への全域関数
//! - context: INIT で渡される ExecutionContext
//! - inputs: 部分更新の shallow merge
//! - state: SessionStatus
//! - errors: SessionError / TransportError / ExecutionError

pub mod classify;
pub mod context;
pub mod errors;
pub mod ids;
pub mod inputs;
pub mod message;
pub mod state;

pub use classify::{Catalog, Classified, UnrecognizedReason, classify, has_protocol_tag};
pub use context::{
    ExecutionContext, HostCapabilities, OrganizationIdentity, RenderMode, Theme, UserIdentity,
};
pub use errors::{ExecutionError, SessionError, TransportError};
pub use ids::{Id, IdMarker, RunId, StepId, TaskUuid};
pub use inputs::merge_inputs;
pub use message::{
    CancelPayload, CompletePayload, DestroyPayload, Direction, ErrorPayload, Height, HostMessage,
    InitPayload, LogLevel, LogPayload, MESSAGE_PREFIX, MessageType, PROTOCOL_VERSION,
    ReadyPayload, ResizePayload, TaskError, TaskMessage, UpdateInputsPayload,
};
pub use state::SessionStatus;
