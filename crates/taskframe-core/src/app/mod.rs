//! App - アプリケーション層
//!
//! ports を組み合わせて protocol の振る舞いを実装します。
//!
//! # 主要コンポーネント
//! - **TaskTransport**: embedded / standalone 判定と envelope 送受信
//! - **TaskSession**: run の state machine
//! - **MountedSession / SessionHandle**: listener の登録と直列化
//! - **ResizeBridge**: content 高さ → RESIZE
//! - **TaskApiClient**: リモート task 実行

pub mod invoke;
pub mod listener;
pub mod mount;
pub mod resize;
pub mod session;
pub mod transport;

pub use self::invoke::{
    BoundInvoker, ExecutionReport, InvocationContext, TaskApiClient, hostname_of,
    resolve_base_url,
};
pub use self::listener::ListenerGuard;
pub use self::mount::{MountedSession, SessionHandle, SessionHooks};
pub use self::resize::ResizeBridge;
pub use self::session::{Notification, TaskSession};
pub use self::transport::{FrameMode, TaskTransport};
