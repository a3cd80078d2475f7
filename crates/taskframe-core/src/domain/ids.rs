//! Domain identifiers (strongly-typed IDs).
//!
//! host から渡される ID は不透明な文字列です。中身は解釈しません。
//! Phantom type パターンで `RunId` と `StepId` を型レベルで区別します。
//!
//! ## 生成
//! 開発用 harness などで新しい ID が必要な場合は `Id::generate()` を使います。
//! ULID ベースで `"run-01J..."` のようなプレフィックス付き文字列になります。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

/// IdMarker は各 ID 型のマーカー trait
///
/// `generate()` で使うプレフィックス（"run-", "step-", "task-"）を提供します。
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// ジェネリック ID 型
///
/// wire 上は素の文字列として serialize されます。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<T: IdMarker> {
    value: String,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    /// Wrap an opaque identifier supplied by the other party.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            _marker: PhantomData,
        }
    }

    /// Fresh identifier: `{prefix}{ulid}`.
    pub fn generate() -> Self {
        Self::new(format!("{}{}", T::prefix(), Ulid::new()))
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl<T: IdMarker> From<&str> for Id<T> {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl<T: IdMarker> From<String> for Id<T> {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

// ========================================
// マーカー型の定義
// ========================================

/// Run のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Run {}

impl IdMarker for Run {
    fn prefix() -> &'static str {
        "run-"
    }
}

/// Step のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Step {}

impl IdMarker for Step {
    fn prefix() -> &'static str {
        "step-"
    }
}

/// リモート実行対象 Task のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RemoteTask {}

impl IdMarker for RemoteTask {
    fn prefix() -> &'static str {
        "task-"
    }
}

// ========================================
// Type Alias
// ========================================

/// Identifier of one execution of a task inside the embedded frame.
pub type RunId = Id<Run>;

/// Identifier of the workflow step that hosts the run.
pub type StepId = Id<Step>;

/// Identifier of a task executed through the remote API (`task_uuid`).
pub type TaskUuid = Id<RemoteTask>;
