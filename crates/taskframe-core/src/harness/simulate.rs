//! INIT のシミュレーションと汎用 listener
//!
//! 本物の host なしで task を動かすための道具です。
//! 既定の context に override を重ねて INIT を組み立て、
//! 指定した遅延の後に task frame へ投稿します。

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::app::ListenerGuard;
use crate::domain::{
    ExecutionContext, HostCapabilities, HostMessage, InitPayload, OrganizationIdentity,
    RenderMode, RunId, StepId, Theme, UserIdentity, has_protocol_tag,
};
use crate::ports::{Frame, FrameMessage, TargetOrigin};

/// Origin the harness posts from.
pub const HARNESS_ORIGIN: &str = "http://localhost:3000";

pub const DEFAULT_INIT_DELAY: Duration = Duration::from_millis(100);

/// The fixed context every simulated run starts from.
pub fn default_context(run_id: RunId) -> ExecutionContext {
    ExecutionContext {
        run_id,
        step_id: Some(StepId::new("step-dev")),
        user: Some(UserIdentity {
            id: "user-dev".to_string(),
            name: Some("Dev User".to_string()),
            email: Some("dev@localhost".to_string()),
        }),
        organization: Some(OrganizationIdentity {
            id: "org-dev".to_string(),
            name: Some("Dev Org".to_string()),
        }),
        theme: Theme::Light,
        locale: "en-US".to_string(),
        capabilities: HostCapabilities {
            resize: true,
            fullscreen: false,
            file_upload: false,
        },
        conversation_id: None,
        api_token: None,
        api_base_url: None,
    }
}

/// Fields layered onto [`default_context`]; `None` keeps the default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextOverrides {
    pub step_id: Option<StepId>,
    pub user: Option<UserIdentity>,
    pub organization: Option<OrganizationIdentity>,
    pub theme: Option<Theme>,
    pub locale: Option<String>,
    pub capabilities: Option<HostCapabilities>,
    pub conversation_id: Option<String>,
    pub api_token: Option<String>,
    pub api_base_url: Option<String>,
}

impl ContextOverrides {
    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = Some(theme);
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    pub fn with_conversation_id(mut self, id: impl Into<String>) -> Self {
        self.conversation_id = Some(id.into());
        self
    }

    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    pub fn apply(self, mut context: ExecutionContext) -> ExecutionContext {
        if let Some(step_id) = self.step_id {
            context.step_id = Some(step_id);
        }
        if let Some(user) = self.user {
            context.user = Some(user);
        }
        if let Some(organization) = self.organization {
            context.organization = Some(organization);
        }
        if let Some(theme) = self.theme {
            context.theme = theme;
        }
        if let Some(locale) = self.locale {
            context.locale = locale;
        }
        if let Some(capabilities) = self.capabilities {
            context.capabilities = capabilities;
        }
        if self.conversation_id.is_some() {
            context.conversation_id = self.conversation_id;
        }
        if self.api_token.is_some() {
            context.api_token = self.api_token;
        }
        if self.api_base_url.is_some() {
            context.api_base_url = self.api_base_url;
        }
        context
    }
}

/// A simulated INIT.
#[derive(Debug, Clone)]
pub struct InitRequest {
    pub delay: Duration,
    pub run_id: Option<RunId>,
    pub render_mode: RenderMode,
    pub inputs: Value,
    pub context: ContextOverrides,
}

impl Default for InitRequest {
    fn default() -> Self {
        Self {
            delay: DEFAULT_INIT_DELAY,
            run_id: None,
            render_mode: RenderMode::Interaction,
            inputs: Value::Object(Default::default()),
            context: ContextOverrides::default(),
        }
    }
}

impl InitRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_run_id(mut self, run_id: impl Into<RunId>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    pub fn with_render_mode(mut self, render_mode: RenderMode) -> Self {
        self.render_mode = render_mode;
        self
    }

    pub fn with_inputs(mut self, inputs: Value) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_context(mut self, overrides: ContextOverrides) -> Self {
        self.context = overrides;
        self
    }

    /// Resolve the run id (generating one if unset) and build the message.
    pub fn into_message(self) -> (RunId, HostMessage) {
        let run_id = self.run_id.unwrap_or_else(RunId::generate);
        let context = self.context.apply(default_context(run_id.clone()));
        let message = HostMessage::Init(InitPayload {
            run_id: run_id.clone(),
            inputs: self.inputs,
            context,
            render_mode: self.render_mode,
        });
        (run_id, message)
    }
}

pub(crate) fn post_host_message(
    target: &Arc<dyn Frame>,
    origin: &str,
    message: &HostMessage,
) -> bool {
    match serde_json::to_value(message) {
        Ok(data) => target.post_message(data, origin, &TargetOrigin::Any),
        Err(e) => {
            tracing::warn!(error = %e, "failed to serialize host message");
            false
        }
    }
}

/// Deliver an INIT to `target` after `request.delay`.
///
/// The run id is returned right away; the handle resolves to whether the
/// message reached a listener.
pub fn simulate_init(target: Arc<dyn Frame>, request: InitRequest) -> (RunId, JoinHandle<bool>) {
    let delay = request.delay;
    let (run_id, message) = request.into_message();
    tracing::debug!(%run_id, ?delay, "scheduling simulated INIT");

    let handle = tokio::spawn(async move {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        post_host_message(&target, HARNESS_ORIGIN, &message)
    });
    (run_id, handle)
}

/// Observe every protocol message (either direction) posted to `frame`.
pub fn listen_protocol_messages<F>(frame: &Arc<dyn Frame>, callback: F) -> ListenerGuard
where
    F: Fn(&FrameMessage) + Send + 'static,
{
    let mut receiver = frame.subscribe();
    ListenerGuard::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(message) if has_protocol_tag(&message.data) => callback(&message),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{MountedSession, SessionHooks, TaskTransport};
    use crate::domain::SessionStatus;
    use crate::impls::InMemoryFrame;
    use serde_json::json;
    use tokio::sync::mpsc;

    #[test]
    fn overrides_layer_onto_defaults() {
        let (run_id, message) = InitRequest::new()
            .with_run_id("r-7")
            .with_render_mode(RenderMode::Display)
            .with_context(
                ContextOverrides::default()
                    .with_theme(Theme::Dark)
                    .with_api_token("tok"),
            )
            .into_message();

        assert_eq!(run_id.as_str(), "r-7");
        let HostMessage::Init(init) = message else {
            panic!("expected INIT");
        };
        assert_eq!(init.render_mode, RenderMode::Display);
        assert_eq!(init.context.run_id, run_id);
        assert_eq!(init.context.theme, Theme::Dark);
        assert_eq!(init.context.api_token.as_deref(), Some("tok"));
        // untouched defaults survive
        assert_eq!(init.context.locale, "en-US");
        assert_eq!(init.context.user.unwrap().id, "user-dev");
    }

    #[test]
    fn run_id_is_generated_when_unset() {
        let (run_id, _) = InitRequest::new().into_message();
        assert!(run_id.as_str().starts_with("run-"));
    }

    #[tokio::test]
    async fn simulated_init_arrives_after_delay() {
        let task = InMemoryFrame::shared("http://localhost:5173");
        let mounted = MountedSession::mount(
            TaskTransport::standalone(task.clone()),
            SessionHooks::new(),
            false,
        )
        .unwrap();
        let handle = mounted.handle();

        let (run_id, delivered) = simulate_init(
            task,
            InitRequest::new()
                .with_delay(Duration::from_millis(30))
                .with_inputs(json!({ "topic": "rust" })),
        );
        assert_eq!(handle.status(), SessionStatus::Initializing);

        assert!(delivered.await.unwrap());
        let mut states = handle.watch();
        states.wait_for(|s| s.status == SessionStatus::Ready).await.unwrap();
        assert_eq!(handle.run_id(), Some(run_id));
        assert_eq!(handle.inputs(), Some(json!({ "topic": "rust" })));
    }

    #[tokio::test]
    async fn generic_listener_sees_only_protocol_messages() {
        let frame = InMemoryFrame::shared("http://localhost:5173");
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _guard = listen_protocol_messages(&frame, move |m| {
            let _ = tx.send(m.data["type"].as_str().unwrap_or_default().to_string());
        });

        let any = TargetOrigin::Any;
        frame.post_message(json!({ "type": "vite:ping" }), "x", &any);
        frame.post_message(
            json!({ "type": "task-ui:ready", "payload": { "version": "1" } }),
            "x",
            &any,
        );
        frame.post_message(json!({ "type": "task-ui:destroy", "payload": {} }), "x", &any);

        assert_eq!(rx.recv().await.unwrap(), "task-ui:ready");
        assert_eq!(rx.recv().await.unwrap(), "task-ui:destroy");
        assert!(rx.try_recv().is_err());
    }
}
