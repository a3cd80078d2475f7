//! Ports - 抽象化レイヤー
//!
//! 外部との境界を trait で切り出します。
//! - Frame: host / task 間の broadcast チャネル
//! - HttpTransport: リモート task 実行 API への HTTP 送信

pub mod frame;
pub mod http;

pub use self::frame::{Frame, FrameMessage, TargetOrigin};
pub use self::http::{CredentialsMode, HttpFailure, HttpRequest, HttpResponse, HttpTransport};
