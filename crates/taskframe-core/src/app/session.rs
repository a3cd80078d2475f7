//! TaskSession - embedded task 側の session state machine
//!
//! # 状態遷移
//! - Initializing --INIT--> Ready
//! - Ready --complete()--> Completed
//! - Ready --cancel()--> Cancelled
//! - Ready --report_error()--> Error
//! - any --INIT--> Ready（新しい run が前の run を黙って置き換える）
//!
//! # 冪等性
//! `has_completed` が complete / cancel を run ごとに高々 1 回に制限します。
//! INIT を受けるとリセットされます。
//!
//! この型自体は同期的で、lock や task を持ちません。listener loop と
//! embedding application からの呼び出しは `MountedSession` が直列化します。

use serde_json::Value;

use crate::domain::{
    CancelPayload, Classified, CompletePayload, ErrorPayload, ExecutionContext, Height,
    HostMessage, LogLevel, LogPayload, RenderMode, ResizePayload, RunId, SessionError,
    SessionStatus, TaskError, TaskMessage, TransportError, classify, merge_inputs,
};
use crate::observability::SessionSnapshot;
use crate::ports::FrameMessage;

use super::transport::TaskTransport;

/// What the embedding application should be told after an inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// A new run was adopted.
    Initialized(RunId),
    /// Raw partial inputs as received, not the merged result.
    InputsUpdated(Value),
    DestroyRequested,
}

pub struct TaskSession {
    transport: TaskTransport,
    debug: bool,
    status: SessionStatus,
    run_id: Option<RunId>,
    render_mode: RenderMode,
    context: Option<ExecutionContext>,
    inputs: Option<Value>,
    has_completed: bool,
}

impl TaskSession {
    pub fn new(transport: TaskTransport) -> Self {
        Self {
            transport,
            debug: false,
            status: SessionStatus::Initializing,
            run_id: None,
            render_mode: RenderMode::default(),
            context: None,
            inputs: None,
            has_completed: false,
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn run_id(&self) -> Option<&RunId> {
        self.run_id.as_ref()
    }

    pub fn render_mode(&self) -> RenderMode {
        self.render_mode
    }

    pub fn context(&self) -> Option<&ExecutionContext> {
        self.context.as_ref()
    }

    pub fn inputs(&self) -> Option<&Value> {
        self.inputs.as_ref()
    }

    pub fn has_completed(&self) -> bool {
        self.has_completed
    }

    pub fn transport(&self) -> &TaskTransport {
        &self.transport
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: self.status,
            run_id: self.run_id.clone(),
            render_mode: self.render_mode,
            has_completed: self.has_completed,
        }
    }

    /// Emit READY. Safe to repeat; not gated by the run or completion state.
    pub fn announce_ready(&self) -> Result<bool, TransportError> {
        self.transport.send(&TaskMessage::ready())
    }

    /// Filter and classify one delivered message, then apply it.
    ///
    /// Anything that is not a host→task catalog message from an accepted
    /// origin is inert.
    pub fn handle_frame_message(&mut self, message: &FrameMessage) -> Option<Notification> {
        if !self.transport.accepts_inbound(message) {
            if self.debug {
                tracing::debug!(origin = %message.origin, "ignoring message from untrusted origin");
            }
            return None;
        }
        match classify::<HostMessage>(&message.data) {
            Classified::Recognized(host_message) => Some(self.apply(host_message)),
            Classified::Unrecognized(reason) => {
                if self.debug {
                    tracing::debug!(?reason, "ignoring unrecognized message");
                }
                None
            }
        }
    }

    pub fn apply(&mut self, message: HostMessage) -> Notification {
        match message {
            HostMessage::Init(init) => {
                if self.debug
                    && let Some(previous) = &self.run_id
                    && *previous != init.run_id
                {
                    tracing::debug!(%previous, next = %init.run_id, "superseding run");
                }
                self.run_id = Some(init.run_id.clone());
                self.inputs = Some(init.inputs);
                self.context = Some(init.context);
                self.render_mode = init.render_mode;
                self.has_completed = false;
                self.status = SessionStatus::Ready;
                tracing::info!(run_id = %init.run_id, "run initialized");
                Notification::Initialized(init.run_id)
            }
            HostMessage::UpdateInputs(update) => {
                if self.debug
                    && let (Some(current), Some(target)) = (&self.run_id, &update.run_id)
                    && current != target
                {
                    tracing::debug!(%current, %target, "inputs update addressed to another run");
                }
                self.inputs = Some(merge_inputs(self.inputs.as_ref(), &update.inputs));
                Notification::InputsUpdated(update.inputs)
            }
            HostMessage::Destroy(_) => Notification::DestroyRequested,
        }
    }

    /// Report the run's output. At most once per run.
    ///
    /// `Ok(true)` when COMPLETE was emitted, `Ok(false)` when the run had
    /// already completed or been cancelled.
    pub fn complete(&mut self, output: Value) -> Result<bool, SessionError> {
        let run_id = self.require_run("complete")?;
        if self.has_completed {
            self.ignore_duplicate("complete");
            return Ok(false);
        }
        self.transport
            .send(&TaskMessage::Complete(CompletePayload { run_id, output }))?;
        self.has_completed = true;
        self.status = SessionStatus::Completed;
        Ok(true)
    }

    /// Cancel the run. Shares the at-most-once guard with `complete`.
    pub fn cancel(&mut self, reason: Option<String>) -> Result<bool, SessionError> {
        let run_id = self.require_run("cancel")?;
        if self.has_completed {
            self.ignore_duplicate("cancel");
            return Ok(false);
        }
        self.transport
            .send(&TaskMessage::Cancel(CancelPayload { run_id, reason }))?;
        self.has_completed = true;
        self.status = SessionStatus::Cancelled;
        Ok(true)
    }

    /// Report a failure to the host and move to `error`.
    pub fn report_error(&mut self, error: TaskError) -> Result<(), SessionError> {
        let run_id = self.require_run("report_error")?;
        self.transport
            .send(&TaskMessage::Error(ErrorPayload { run_id, error }))?;
        self.status = SessionStatus::Error;
        Ok(())
    }

    /// Ask the host to resize the frame. Not gated by completion; a no-op
    /// without a run.
    pub fn set_height(&self, height: Height) -> bool {
        let Some(run_id) = self.run_id.clone() else {
            self.ignore_without_run("set_height");
            return false;
        };
        if !height.is_valid() {
            if self.debug {
                tracing::debug!(%run_id, ?height, "rejecting height outside the catalog");
            }
            return false;
        }
        if self.debug && self.status.is_terminal() {
            tracing::debug!(%run_id, "resize after terminal state");
        }
        self.emit(&TaskMessage::Resize(ResizePayload { run_id, height }))
    }

    /// Forward a log line to the host. A no-op without a run.
    pub fn log(&self, level: LogLevel, message: impl Into<String>, data: Option<Value>) -> bool {
        let Some(run_id) = self.run_id.clone() else {
            self.ignore_without_run("log");
            return false;
        };
        self.emit(&TaskMessage::Log(LogPayload {
            run_id,
            level,
            message: message.into(),
            data,
        }))
    }

    fn emit(&self, message: &TaskMessage) -> bool {
        match self.transport.send(message) {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, "failed to send envelope");
                false
            }
        }
    }

    fn require_run(&self, operation: &'static str) -> Result<RunId, SessionError> {
        match &self.run_id {
            Some(run_id) => Ok(run_id.clone()),
            None => {
                tracing::warn!(operation, "no active run; INIT has not been received");
                Err(SessionError::MissingRunContext)
            }
        }
    }

    fn ignore_duplicate(&self, operation: &'static str) {
        if self.debug {
            tracing::debug!(operation, "run already finished; ignoring");
        }
    }

    fn ignore_without_run(&self, operation: &'static str) {
        if self.debug {
            tracing::debug!(operation, "no active run; ignoring");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{InitPayload, MessageType, UpdateInputsPayload};
    use crate::impls::InMemoryFrame;
    use crate::ports::{Frame, TargetOrigin};
    use serde_json::json;
    use std::sync::Arc;
    use tokio::sync::broadcast;

    const HOST: &str = "https://host.example.com";
    const TASK: &str = "https://task.example.com";

    fn setup() -> (TaskSession, broadcast::Receiver<FrameMessage>) {
        let host = InMemoryFrame::shared(HOST);
        let task = InMemoryFrame::shared(TASK);
        let rx = host.subscribe();
        let session = TaskSession::new(TaskTransport::embedded(task, host));
        (session, rx)
    }

    fn init_message(run_id: &str, inputs: Value) -> FrameMessage {
        let init = HostMessage::Init(InitPayload {
            run_id: RunId::new(run_id),
            inputs,
            context: ExecutionContext::new(RunId::new(run_id)),
            render_mode: RenderMode::Interaction,
        });
        FrameMessage {
            origin: HOST.to_string(),
            data: serde_json::to_value(init).unwrap(),
        }
    }

    fn from_host(data: Value) -> FrameMessage {
        FrameMessage {
            origin: HOST.to_string(),
            data,
        }
    }

    fn drain(rx: &mut broadcast::Receiver<FrameMessage>) -> Vec<TaskMessage> {
        let mut out = Vec::new();
        while let Ok(m) = rx.try_recv() {
            out.push(serde_json::from_value(m.data).unwrap());
        }
        out
    }

    #[test]
    fn starts_initializing_and_announces_ready() {
        let (session, mut rx) = setup();
        assert_eq!(session.status(), SessionStatus::Initializing);

        session.announce_ready().unwrap();
        session.announce_ready().unwrap();
        let sent = drain(&mut rx);
        assert_eq!(sent, vec![TaskMessage::ready(), TaskMessage::ready()]);
    }

    #[test]
    fn init_adopts_run() {
        let (mut session, _rx) = setup();
        let n = session.handle_frame_message(&init_message("r1", json!({ "a": 1 })));

        assert_eq!(n, Some(Notification::Initialized(RunId::new("r1"))));
        assert_eq!(session.status(), SessionStatus::Ready);
        assert_eq!(session.run_id(), Some(&RunId::new("r1")));
        assert_eq!(session.inputs(), Some(&json!({ "a": 1 })));
        assert_eq!(session.render_mode(), RenderMode::Interaction);
        assert!(session.context().is_some());
    }

    #[test]
    fn completion_is_at_most_once() {
        let (mut session, mut rx) = setup();
        session.handle_frame_message(&init_message("r1", json!({})));

        assert!(session.complete(json!("A")).unwrap());
        assert!(!session.complete(json!("B")).unwrap());
        assert!(!session.cancel(None).unwrap());

        let sent = drain(&mut rx);
        assert_eq!(
            sent,
            vec![TaskMessage::Complete(CompletePayload {
                run_id: RunId::new("r1"),
                output: json!("A"),
            })]
        );
        assert_eq!(session.status(), SessionStatus::Completed);
    }

    #[test]
    fn cancel_then_complete_is_ignored() {
        let (mut session, mut rx) = setup();
        session.handle_frame_message(&init_message("r1", json!({})));

        assert!(session.cancel(Some("user closed".to_string())).unwrap());
        assert!(!session.complete(json!(1)).unwrap());

        let sent = drain(&mut rx);
        assert_eq!(sent.len(), 1);
        assert!(matches!(
            &sent[0],
            TaskMessage::Cancel(CancelPayload { reason: Some(r), .. }) if r == "user closed"
        ));
        assert_eq!(session.status(), SessionStatus::Cancelled);
    }

    #[test]
    fn reinit_resets_completion_guard() {
        let (mut session, mut rx) = setup();
        session.handle_frame_message(&init_message("r1", json!({})));
        session.complete(json!(1)).unwrap();

        session.handle_frame_message(&init_message("r2", json!({})));
        assert_eq!(session.status(), SessionStatus::Ready);
        assert!(!session.has_completed());
        assert!(session.complete(json!(2)).unwrap());

        let sent = drain(&mut rx);
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].run_id(), Some(&RunId::new("r2")));
    }

    #[test]
    fn update_inputs_merges_and_reports_raw_partial() {
        let (mut session, _rx) = setup();
        session.handle_frame_message(&init_message("r1", json!({ "a": 1, "b": 2 })));

        let update = HostMessage::UpdateInputs(UpdateInputsPayload {
            run_id: Some(RunId::new("r1")),
            inputs: json!({ "b": 3 }),
        });
        let n = session.handle_frame_message(&from_host(serde_json::to_value(update).unwrap()));

        assert_eq!(n, Some(Notification::InputsUpdated(json!({ "b": 3 }))));
        assert_eq!(session.inputs(), Some(&json!({ "a": 1, "b": 3 })));
        assert_eq!(session.status(), SessionStatus::Ready);
    }

    #[test]
    fn update_before_init_becomes_full_inputs() {
        let (mut session, _rx) = setup();
        let n = session.handle_frame_message(&from_host(json!({
            "type": "task-ui:update-inputs",
            "payload": { "inputs": { "x": 9 } }
        })));

        assert!(matches!(n, Some(Notification::InputsUpdated(_))));
        assert_eq!(session.inputs(), Some(&json!({ "x": 9 })));
        assert_eq!(session.run_id(), None);
        assert_eq!(session.status(), SessionStatus::Initializing);
    }

    #[test]
    fn destroy_notifies_without_changing_state() {
        let (mut session, _rx) = setup();
        session.handle_frame_message(&init_message("r1", json!({})));

        let n = session.handle_frame_message(&from_host(json!({
            "type": "task-ui:destroy",
            "payload": { "runId": "r1" }
        })));

        assert_eq!(n, Some(Notification::DestroyRequested));
        assert_eq!(session.status(), SessionStatus::Ready);
        assert_eq!(session.run_id(), Some(&RunId::new("r1")));
    }

    #[test]
    fn unrecognized_messages_are_inert() {
        let (mut session, mut rx) = setup();
        let before = session.snapshot();

        for data in [
            json!({ "type": "webpackHotUpdate" }),
            json!({ "payload": { "runId": "r1" } }),
            json!("hello"),
            json!({ "type": "task-ui:update-theme", "payload": { "theme": "dark" } }),
            json!({ "type": "task-ui:complete", "payload": { "runId": "r1", "output": 1 } }),
        ] {
            assert_eq!(session.handle_frame_message(&from_host(data)), None);
        }

        assert_eq!(session.snapshot(), before);
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn outbound_operations_require_a_run() {
        let (mut session, mut rx) = setup();

        assert!(!session.set_height(Height::Pixels(100.0)));
        assert!(!session.log(LogLevel::Info, "hi", None));
        assert!(matches!(
            session.complete(json!(1)),
            Err(SessionError::MissingRunContext)
        ));
        assert!(matches!(
            session.cancel(None),
            Err(SessionError::MissingRunContext)
        ));
        assert!(matches!(
            session.report_error(TaskError {
                code: "E".to_string(),
                message: "m".to_string(),
                details: None,
            }),
            Err(SessionError::MissingRunContext)
        ));

        assert!(drain(&mut rx).is_empty());
        assert_eq!(session.status(), SessionStatus::Initializing);
        assert!(!session.has_completed());
    }

    #[test]
    fn resize_and_log_are_allowed_after_completion() {
        let (mut session, mut rx) = setup();
        session.handle_frame_message(&init_message("r1", json!({})));
        session.complete(json!(null)).unwrap();

        assert!(session.set_height(Height::Auto));
        assert!(session.log(LogLevel::Warn, "late", Some(json!({ "k": 1 }))));

        let types: Vec<MessageType> = drain(&mut rx).iter().map(|m| m.message_type()).collect();
        assert_eq!(
            types,
            vec![MessageType::Complete, MessageType::Resize, MessageType::Log]
        );
    }

    #[test]
    fn invalid_heights_never_reach_the_wire() {
        let (mut session, mut rx) = setup();
        session.handle_frame_message(&init_message("r1", json!({})));

        assert!(!session.set_height(Height::Pixels(-5.0)));
        assert!(!session.set_height(Height::Pixels(f64::NAN)));
        assert!(!session.set_height(Height::Pixels(f64::INFINITY)));
        assert!(drain(&mut rx).is_empty());

        assert!(session.set_height(Height::Pixels(0.0)));
        let sent = rx.try_recv().unwrap();
        assert!(classify::<TaskMessage>(&sent.data).recognized().is_some());
    }

    #[test]
    fn report_error_moves_to_error() {
        let (mut session, mut rx) = setup();
        session.handle_frame_message(&init_message("r1", json!({})));

        session
            .report_error(TaskError {
                code: "BAD_INPUT".to_string(),
                message: "missing field".to_string(),
                details: Some(json!({ "field": "a" })),
            })
            .unwrap();

        assert_eq!(session.status(), SessionStatus::Error);
        let sent = drain(&mut rx);
        assert!(matches!(&sent[0], TaskMessage::Error(p) if p.error.code == "BAD_INPUT"));
    }

    #[test]
    fn messages_from_untrusted_origin_are_ignored() {
        let host = InMemoryFrame::shared(HOST);
        let task: Arc<dyn Frame> = InMemoryFrame::shared(TASK);
        let transport =
            TaskTransport::embedded(task, host).with_target_origin(TargetOrigin::exact(HOST));
        let mut session = TaskSession::new(transport);

        let mut msg = init_message("r1", json!({}));
        msg.origin = "https://evil.example.com".to_string();
        assert_eq!(session.handle_frame_message(&msg), None);
        assert_eq!(session.status(), SessionStatus::Initializing);

        msg.origin = HOST.to_string();
        assert!(session.handle_frame_message(&msg).is_some());
    }
}
