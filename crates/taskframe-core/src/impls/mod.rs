//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **InMemoryFrame**: tokio broadcast ベースの Frame（開発・テスト用）
//! - **ReqwestTransport**: reqwest ベースの HttpTransport

pub mod inmem_frame;
pub mod reqwest_http;

pub use self::inmem_frame::InMemoryFrame;
pub use self::reqwest_http::ReqwestTransport;
