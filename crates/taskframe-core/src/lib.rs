//! taskframe-core
//!
//! Host ↔ embedded task protocol and the remote task invocation client.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, message catalog, classify, context, state, errors）
//! - **ports**: 抽象化レイヤー（Frame, HttpTransport）
//! - **impls**: 実装（InMemoryFrame, ReqwestTransport）
//! - **app**: アプリケーションロジック（session, mount, transport, resize, invoke）
//! - **harness**: 開発用の synthetic host と INIT シミュレーション
//! - **config**: SdkConfig（TOML + 環境変数）
//! - **observability**: SessionSnapshot

pub mod app;
pub mod config;
pub mod domain;
pub mod harness;
pub mod impls;
pub mod observability;
pub mod ports;

pub use app::{
    BoundInvoker, ExecutionReport, InvocationContext, MountedSession, ResizeBridge, SessionHandle,
    SessionHooks, TaskApiClient, TaskTransport,
};
pub use config::{ApiConfig, ConfigError, SdkConfig};
pub use domain::{
    ExecutionContext, ExecutionError, HostMessage, RunId, SessionError, SessionStatus,
    TaskMessage,
};
pub use observability::SessionSnapshot;
