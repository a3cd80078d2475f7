//! Harness - host なしで task を動かすための開発用ツール
//!
//! - simulate: 既定 context + override で INIT を組み立てて遅延送信
//! - host: SyntheticHost（init / update_inputs / destroy / theme / locale + hooks）

pub mod host;
pub mod simulate;

pub use self::host::{HostHooks, SyntheticHost, UPDATE_LOCALE_TYPE, UPDATE_THEME_TYPE};
pub use self::simulate::{
    ContextOverrides, DEFAULT_INIT_DELAY, HARNESS_ORIGIN, InitRequest, default_context,
    listen_protocol_messages, simulate_init,
};
