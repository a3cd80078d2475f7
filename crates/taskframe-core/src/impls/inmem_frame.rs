//! InMemoryFrame - 開発用の broadcast frame
//!
//! # 実装詳細
//! - tokio::sync::broadcast で「全 listener に全メッセージ」を再現
//! - 宛先 origin が一致しない投稿は黙って捨てる（postMessage と同じ）

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::ports::{Frame, FrameMessage, TargetOrigin};

const DEFAULT_CAPACITY: usize = 64;

/// InMemoryFrame は 1 つの window / iframe を表す
///
/// # 使用例
/// ```ignore
/// let host = InMemoryFrame::shared("https://host.example.com");
/// let task = InMemoryFrame::shared("https://task.example.com");
/// let transport = TaskTransport::embedded(task.clone(), host.clone());
/// ```
pub struct InMemoryFrame {
    origin: String,
    sender: broadcast::Sender<FrameMessage>,
}

impl InMemoryFrame {
    pub fn new(origin: impl Into<String>) -> Self {
        let (sender, _) = broadcast::channel(DEFAULT_CAPACITY);
        Self {
            origin: origin.into(),
            sender,
        }
    }

    pub fn shared(origin: impl Into<String>) -> Arc<dyn Frame> {
        Arc::new(Self::new(origin))
    }
}

impl Frame for InMemoryFrame {
    fn origin(&self) -> &str {
        &self.origin
    }

    fn post_message(
        &self,
        data: serde_json::Value,
        source_origin: &str,
        target_origin: &TargetOrigin,
    ) -> bool {
        if !target_origin.accepts(&self.origin) {
            tracing::debug!(
                frame = %self.origin,
                target = %target_origin,
                "dropping message for non-matching target origin"
            );
            return false;
        }
        let message = FrameMessage {
            origin: source_origin.to_string(),
            data,
        };
        // send は listener が 0 のとき Err になる
        self.sender.send(message).is_ok()
    }

    fn subscribe(&self) -> broadcast::Receiver<FrameMessage> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn every_listener_receives_every_message() {
        let frame = InMemoryFrame::new("https://task.local");
        let mut a = frame.subscribe();
        let mut b = frame.subscribe();

        assert!(frame.post_message(json!({ "n": 1 }), "https://host.local", &TargetOrigin::Any));

        let got_a = a.recv().await.unwrap();
        let got_b = b.recv().await.unwrap();
        assert_eq!(got_a, got_b);
        assert_eq!(got_a.origin, "https://host.local");
        assert_eq!(got_a.data, json!({ "n": 1 }));
    }

    #[tokio::test]
    async fn mismatched_target_origin_is_dropped() {
        let frame = InMemoryFrame::new("https://task.local");
        let mut rx = frame.subscribe();

        let delivered = frame.post_message(
            json!({}),
            "https://host.local",
            &TargetOrigin::exact("https://other.local"),
        );
        assert!(!delivered);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn post_without_listeners_reports_undelivered() {
        let frame = InMemoryFrame::new("https://task.local");
        assert!(!frame.post_message(json!({}), "x", &TargetOrigin::Any));
    }
}
