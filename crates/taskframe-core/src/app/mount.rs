//! MountedSession - session を channel に接続する
//!
//! # フロー
//! 1. 自 frame を subscribe（listener 登録）
//! 2. READY を送出
//! 3. listener loop: 受信 → classify → 状態遷移 → snapshot 公開 → callback
//!
//! 状態は 1 つの Mutex で直列化します。メッセージ処理は 1 件ずつ完了してから
//! 次に進むので、`has_completed` のチェックは競合しません。
//! callback は lock を外してから呼ぶので、callback の中から
//! `SessionHandle::complete()` などを呼んでも構いません。

use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tokio::sync::{broadcast, watch};

use crate::domain::{
    ExecutionContext, Height, LogLevel, RenderMode, RunId, SessionError, SessionStatus, TaskError,
    TransportError,
};
use crate::observability::SessionSnapshot;

use super::listener::ListenerGuard;
use super::session::{Notification, TaskSession};
use super::transport::TaskTransport;

type InputsCallback = Box<dyn Fn(&Value) + Send + Sync>;
type InitCallback = Box<dyn Fn(&RunId) + Send + Sync>;
type DestroyCallback = Box<dyn Fn() + Send + Sync>;

/// Callbacks registered by the embedding application.
#[derive(Default)]
pub struct SessionHooks {
    on_init: Option<InitCallback>,
    on_inputs_update: Option<InputsCallback>,
    on_destroy: Option<DestroyCallback>,
}

impl SessionHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_init(mut self, f: impl Fn(&RunId) + Send + Sync + 'static) -> Self {
        self.on_init = Some(Box::new(f));
        self
    }

    /// Receives the raw partial inputs, not the merged value.
    pub fn on_inputs_update(mut self, f: impl Fn(&Value) + Send + Sync + 'static) -> Self {
        self.on_inputs_update = Some(Box::new(f));
        self
    }

    /// Teardown is the application's job; the session state is left as is.
    pub fn on_destroy(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_destroy = Some(Box::new(f));
        self
    }

    fn dispatch(&self, notification: &Notification) {
        match notification {
            Notification::Initialized(run_id) => {
                if let Some(f) = &self.on_init {
                    f(run_id);
                }
            }
            Notification::InputsUpdated(partial) => {
                if let Some(f) = &self.on_inputs_update {
                    f(partial);
                }
            }
            Notification::DestroyRequested => {
                if let Some(f) = &self.on_destroy {
                    f();
                }
            }
        }
    }
}

/// Cloneable handle the embedding application uses to drive the run.
#[derive(Clone)]
pub struct SessionHandle {
    session: Arc<Mutex<TaskSession>>,
    snapshots: Arc<watch::Sender<SessionSnapshot>>,
}

impl SessionHandle {
    pub fn new(session: TaskSession) -> Self {
        let (tx, _) = watch::channel(session.snapshot());
        Self {
            session: Arc::new(Mutex::new(session)),
            snapshots: Arc::new(tx),
        }
    }

    /// Run `f` under the state lock and publish the resulting snapshot.
    fn with<R>(&self, f: impl FnOnce(&mut TaskSession) -> R) -> R {
        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        let result = f(&mut *session);
        let snapshot = session.snapshot();
        drop(session);
        self.snapshots.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
        result
    }

    pub fn complete(&self, output: Value) -> Result<bool, SessionError> {
        self.with(|s| s.complete(output))
    }

    pub fn cancel(&self, reason: Option<String>) -> Result<bool, SessionError> {
        self.with(|s| s.cancel(reason))
    }

    pub fn report_error(&self, error: TaskError) -> Result<(), SessionError> {
        self.with(|s| s.report_error(error))
    }

    pub fn set_height(&self, height: Height) -> bool {
        self.with(|s| s.set_height(height))
    }

    pub fn log(&self, level: LogLevel, message: impl Into<String>, data: Option<Value>) -> bool {
        let message = message.into();
        self.with(|s| s.log(level, message, data))
    }

    /// Resize-bridge entry point: only forwarded while a run exists and the
    /// task is embedded.
    pub fn observe_content_height(&self, height: f64) -> bool {
        self.with(|s| {
            if s.run_id().is_none() || !s.transport().is_embedded() {
                return false;
            }
            match Height::pixels(height) {
                Some(height) => s.set_height(height),
                None => {
                    tracing::debug!(height, "ignoring invalid content height");
                    false
                }
            }
        })
    }

    pub fn announce_ready(&self) -> Result<bool, TransportError> {
        self.with(|s| s.announce_ready())
    }

    pub fn status(&self) -> SessionStatus {
        self.with(|s| s.status())
    }

    pub fn run_id(&self) -> Option<RunId> {
        self.with(|s| s.run_id().cloned())
    }

    pub fn render_mode(&self) -> RenderMode {
        self.with(|s| s.render_mode())
    }

    pub fn inputs(&self) -> Option<Value> {
        self.with(|s| s.inputs().cloned())
    }

    pub fn context(&self) -> Option<ExecutionContext> {
        self.with(|s| s.context().cloned())
    }

    pub fn is_embedded(&self) -> bool {
        self.with(|s| s.transport().is_embedded())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Observe state changes.
    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.subscribe()
    }
}

/// A session wired to its channel. Dropping it removes the listener.
pub struct MountedSession {
    handle: SessionHandle,
    listener: ListenerGuard,
}

impl MountedSession {
    /// Register the listener, announce READY and start processing.
    ///
    /// Must be called from within a tokio runtime.
    pub fn mount(
        transport: TaskTransport,
        hooks: SessionHooks,
        debug: bool,
    ) -> Result<Self, TransportError> {
        let receiver = transport.subscribe();
        let handle = SessionHandle::new(TaskSession::new(transport).with_debug(debug));
        handle.announce_ready()?;

        let listener = ListenerGuard::spawn(listen(handle.clone(), hooks, receiver));
        Ok(Self { handle, listener })
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    pub fn is_listening(&self) -> bool {
        self.listener.is_active()
    }

    pub fn unmount(self) {
        self.listener.release();
    }
}

async fn listen(
    handle: SessionHandle,
    hooks: SessionHooks,
    mut receiver: broadcast::Receiver<crate::ports::FrameMessage>,
) {
    loop {
        match receiver.recv().await {
            Ok(message) => {
                let notification = handle.with(|s| s.handle_frame_message(&message));
                if let Some(notification) = notification {
                    hooks.dispatch(&notification);
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "session listener lagged; messages dropped");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
