//! TaskTransport - task 側から見た channel アダプタ
//!
//! # 役割
//! - embedded / standalone の判定
//!   - embedded: 親 frame（host）に送る
//!   - standalone: 自分自身に送る（開発用 harness で同じコードパスを動かすため）
//! - 送信時の target origin 制限（embedded のみ）
//! - 受信時の origin フィルタ（embedded のみ）

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::domain::{TaskMessage, TransportError};
use crate::ports::{Frame, FrameMessage, TargetOrigin};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameMode {
    /// Nested inside a host; messages go to the parent.
    Embedded,
    /// Top-level; messages loop back to this frame.
    Standalone,
}

#[derive(Clone)]
pub struct TaskTransport {
    own: Arc<dyn Frame>,
    parent: Option<Arc<dyn Frame>>,
    target_origin: TargetOrigin,
}

impl TaskTransport {
    pub fn new(own: Arc<dyn Frame>, parent: Option<Arc<dyn Frame>>) -> Self {
        Self {
            own,
            parent,
            target_origin: TargetOrigin::Any,
        }
    }

    pub fn embedded(own: Arc<dyn Frame>, parent: Arc<dyn Frame>) -> Self {
        Self::new(own, Some(parent))
    }

    pub fn standalone(own: Arc<dyn Frame>) -> Self {
        Self::new(own, None)
    }

    pub fn with_target_origin(mut self, target_origin: TargetOrigin) -> Self {
        self.target_origin = target_origin;
        self
    }

    pub fn mode(&self) -> FrameMode {
        if self.parent.is_some() {
            FrameMode::Embedded
        } else {
            FrameMode::Standalone
        }
    }

    pub fn is_embedded(&self) -> bool {
        self.mode() == FrameMode::Embedded
    }

    /// Origin of the task's own frame.
    pub fn origin(&self) -> &str {
        self.own.origin()
    }

    pub fn target_origin(&self) -> &TargetOrigin {
        &self.target_origin
    }

    /// Serialize and post `message` to the destination frame.
    ///
    /// Returns whether anyone received it. The target origin restricts
    /// delivery to the parent only; standalone loopback never leaves this
    /// frame.
    pub fn send(&self, message: &TaskMessage) -> Result<bool, TransportError> {
        let data = serde_json::to_value(message)?;
        let delivered = match &self.parent {
            Some(parent) => parent.post_message(data, self.own.origin(), &self.target_origin),
            None => self.own.post_message(data, self.own.origin(), &TargetOrigin::Any),
        };
        if !delivered {
            tracing::trace!(
                message_type = message.message_type().as_str(),
                "envelope had no listener"
            );
        }
        Ok(delivered)
    }

    /// Listen on the task's own frame.
    pub fn subscribe(&self) -> broadcast::Receiver<FrameMessage> {
        self.own.subscribe()
    }

    /// Inbound origin filter, symmetric with the outbound restriction.
    ///
    /// Standalone frames have no host to trust; whatever drives them
    /// (typically the development harness) is accepted.
    pub fn accepts_inbound(&self, message: &FrameMessage) -> bool {
        match self.mode() {
            FrameMode::Embedded => self.target_origin.accepts(&message.origin),
            FrameMode::Standalone => true,
        }
    }
}
