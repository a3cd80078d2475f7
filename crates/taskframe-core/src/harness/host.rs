//! SyntheticHost - 開発用の偽 host
//!
//! host → task のメッセージ（と theme / locale の拡張メッセージ）を送り、
//! task → host のメッセージを hook で受け取ります。

use std::sync::Arc;

use serde_json::{Value, json};
use tokio::sync::broadcast;

use crate::app::ListenerGuard;
use crate::domain::{
    CancelPayload, Classified, CompletePayload, DestroyPayload, ErrorPayload, HostMessage,
    LogPayload, ReadyPayload, ResizePayload, RunId, TaskMessage, Theme, UpdateInputsPayload,
    UnrecognizedReason, classify,
};
use crate::ports::{Frame, TargetOrigin};

use super::simulate::{HARNESS_ORIGIN, InitRequest, post_host_message, simulate_init};

/// Extension message outside the core catalog.
pub const UPDATE_THEME_TYPE: &str = "task-ui:update-theme";
/// Extension message outside the core catalog.
pub const UPDATE_LOCALE_TYPE: &str = "task-ui:update-locale";

type Hook<T> = Option<Box<dyn Fn(&T) + Send + Sync>>;

/// One optional callback per task → host message type.
#[derive(Default)]
pub struct HostHooks {
    on_ready: Hook<ReadyPayload>,
    on_complete: Hook<CompletePayload>,
    on_cancel: Hook<CancelPayload>,
    on_resize: Hook<ResizePayload>,
    on_error: Hook<ErrorPayload>,
    on_log: Hook<LogPayload>,
}

impl HostHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_ready(mut self, f: impl Fn(&ReadyPayload) + Send + Sync + 'static) -> Self {
        self.on_ready = Some(Box::new(f));
        self
    }

    pub fn on_complete(mut self, f: impl Fn(&CompletePayload) + Send + Sync + 'static) -> Self {
        self.on_complete = Some(Box::new(f));
        self
    }

    pub fn on_cancel(mut self, f: impl Fn(&CancelPayload) + Send + Sync + 'static) -> Self {
        self.on_cancel = Some(Box::new(f));
        self
    }

    pub fn on_resize(mut self, f: impl Fn(&ResizePayload) + Send + Sync + 'static) -> Self {
        self.on_resize = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&ErrorPayload) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    pub fn on_log(mut self, f: impl Fn(&LogPayload) + Send + Sync + 'static) -> Self {
        self.on_log = Some(Box::new(f));
        self
    }

    fn dispatch(&self, message: &TaskMessage) {
        fn call<T>(hook: &Hook<T>, payload: &T) {
            if let Some(f) = hook {
                f(payload);
            }
        }
        match message {
            TaskMessage::Ready(p) => call(&self.on_ready, p),
            TaskMessage::Complete(p) => call(&self.on_complete, p),
            TaskMessage::Cancel(p) => call(&self.on_cancel, p),
            TaskMessage::Resize(p) => call(&self.on_resize, p),
            TaskMessage::Error(p) => call(&self.on_error, p),
            TaskMessage::Log(p) => call(&self.on_log, p),
        }
    }
}

/// Drives a task through its handshake without a real host.
pub struct SyntheticHost {
    /// Where host messages are posted (the task's own frame).
    task_frame: Arc<dyn Frame>,
    /// Where the task's replies arrive.
    reply_frame: Arc<dyn Frame>,
    origin: String,
    current_run: Option<RunId>,
}

impl SyntheticHost {
    pub fn new(task_frame: Arc<dyn Frame>, reply_frame: Arc<dyn Frame>) -> Self {
        Self {
            task_frame,
            reply_frame,
            origin: HARNESS_ORIGIN.to_string(),
            current_run: None,
        }
    }

    /// The task runs standalone, so replies loop back on its own frame.
    pub fn standalone(task_frame: Arc<dyn Frame>) -> Self {
        Self::new(task_frame.clone(), task_frame)
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    pub fn current_run(&self) -> Option<&RunId> {
        self.current_run.as_ref()
    }

    /// Start receiving task → host messages.
    pub fn listen(&self, hooks: HostHooks) -> ListenerGuard {
        let mut receiver = self.reply_frame.subscribe();
        ListenerGuard::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(message) => match classify::<TaskMessage>(&message.data) {
                        Classified::Recognized(m) => hooks.dispatch(&m),
                        // standalone: our own host messages come back too
                        Classified::Unrecognized(UnrecognizedReason::WrongDirection(_)) => {}
                        Classified::Unrecognized(reason) => {
                            tracing::trace!(?reason, "host ignored message");
                        }
                    },
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "host listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Send INIT after the request's delay and remember the run.
    pub async fn init(&mut self, request: InitRequest) -> RunId {
        let (run_id, delivery) = simulate_init(self.task_frame.clone(), request);
        match delivery.await {
            Ok(true) => {}
            Ok(false) => tracing::debug!(%run_id, "INIT had no listener"),
            Err(e) => tracing::warn!(%run_id, error = %e, "INIT delivery task failed"),
        }
        self.current_run = Some(run_id.clone());
        run_id
    }

    pub fn update_inputs(&self, partial: Value) -> bool {
        self.post(&HostMessage::UpdateInputs(UpdateInputsPayload {
            run_id: self.current_run.clone(),
            inputs: partial,
        }))
    }

    pub fn destroy(&self) -> bool {
        self.post(&HostMessage::Destroy(DestroyPayload {
            run_id: self.current_run.clone(),
        }))
    }

    pub fn update_theme(&self, theme: Theme) -> bool {
        self.post_extension(UPDATE_THEME_TYPE, json!({ "theme": theme }))
    }

    pub fn update_locale(&self, locale: impl Into<String>) -> bool {
        self.post_extension(UPDATE_LOCALE_TYPE, json!({ "locale": locale.into() }))
    }

    fn post(&self, message: &HostMessage) -> bool {
        post_host_message(&self.task_frame, &self.origin, message)
    }

    fn post_extension(&self, message_type: &str, payload: Value) -> bool {
        let data = json!({ "type": message_type, "payload": payload });
        self.task_frame
            .post_message(data, &self.origin, &TargetOrigin::Any)
    }
}
