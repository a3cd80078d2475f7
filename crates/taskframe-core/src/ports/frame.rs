//! Frame port - broadcast 型メッセージチャネルの抽象化
//!
//! ブラウザの `window.postMessage` と同じモデルです。
//! - 投稿されたメッセージは、その frame の全 listener に届く
//! - 宛先を絞る場合は `TargetOrigin::Exact` を指定する
//!
//! # 実装
//! - **InMemoryFrame**: tokio broadcast ベース（開発・テスト用）

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// A message as seen by a listener: payload plus the sender's origin.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameMessage {
    pub origin: String,
    pub data: serde_json::Value,
}

/// Delivery restriction for outbound messages.
///
/// `Any` ("*") is the default. Production embeddings should pin the host's
/// exact origin so run data never reaches an unexpected parent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TargetOrigin {
    #[default]
    Any,
    Exact(String),
}

impl TargetOrigin {
    pub fn exact(origin: impl Into<String>) -> Self {
        TargetOrigin::Exact(origin.into())
    }

    pub fn accepts(&self, origin: &str) -> bool {
        match self {
            TargetOrigin::Any => true,
            TargetOrigin::Exact(expected) => expected == origin,
        }
    }
}

impl From<String> for TargetOrigin {
    fn from(value: String) -> Self {
        if value == "*" {
            TargetOrigin::Any
        } else {
            TargetOrigin::Exact(value)
        }
    }
}

impl From<TargetOrigin> for String {
    fn from(value: TargetOrigin) -> Self {
        value.to_string()
    }
}

impl fmt::Display for TargetOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetOrigin::Any => f.write_str("*"),
            TargetOrigin::Exact(origin) => f.write_str(origin),
        }
    }
}

/// Frame は 1 つの実行コンテキスト（window / iframe）
///
/// # Thread Safety
/// - `Send + Sync` を要求（listener task から共有される）
pub trait Frame: Send + Sync {
    /// Origin of this frame, e.g. `https://app.example.com`.
    fn origin(&self) -> &str;

    /// Post `data` into this frame on behalf of `source_origin`.
    ///
    /// Returns whether the message reached at least one listener. A message
    /// whose `target_origin` does not accept this frame's origin is dropped.
    fn post_message(
        &self,
        data: serde_json::Value,
        source_origin: &str,
        target_origin: &TargetOrigin,
    ) -> bool;

    /// Register a listener. Every listener receives every message.
    fn subscribe(&self) -> broadcast::Receiver<FrameMessage>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_origin_round_trips_through_strings() {
        assert_eq!(TargetOrigin::from("*".to_string()), TargetOrigin::Any);
        let exact = TargetOrigin::exact("https://host.example.com");
        assert_eq!(String::from(exact.clone()), "https://host.example.com");
        assert!(exact.accepts("https://host.example.com"));
        assert!(!exact.accepts("https://evil.example.com"));
        assert!(TargetOrigin::Any.accepts("anything"));
    }
}
