//! ResizeBridge - content の高さ変化を RESIZE に変換する
//!
//! 明示的な `SessionHandle::set_height()` の代わりではなく、その上の便利層です。
//! どちらも同じ RESIZE 送出に合流します。
//!
//! - 観測値は `watch::Receiver<f64>`（layout 側が最新の高さを書き込む）
//! - run が存在し、かつ embedded のときだけ転送
//! - 新しい run が始まったら現在の高さを送り直す
//! - bridge を drop すると観測も止まる

use tokio::sync::watch;

use super::listener::ListenerGuard;
use super::mount::SessionHandle;

pub struct ResizeBridge {
    _listener: ListenerGuard,
}

impl ResizeBridge {
    /// Start forwarding observed content heights. The current value is
    /// forwarded immediately, like an initial observer callback, and again
    /// whenever a new run becomes active.
    pub fn attach(session: SessionHandle, mut heights: watch::Receiver<f64>) -> Self {
        let mut states = session.watch();
        let listener = ListenerGuard::spawn(async move {
            let mut current_run = states.borrow_and_update().run_id.clone();
            let height = *heights.borrow_and_update();
            session.observe_content_height(height);

            loop {
                tokio::select! {
                    changed = heights.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let height = *heights.borrow_and_update();
                        session.observe_content_height(height);
                    }
                    changed = states.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let run_id = states.borrow_and_update().run_id.clone();
                        if run_id.is_some() && run_id != current_run {
                            let height = *heights.borrow();
                            session.observe_content_height(height);
                        }
                        current_run = run_id;
                    }
                }
            }
        });
        Self {
            _listener: listener,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{MountedSession, SessionHooks, TaskTransport};
    use crate::domain::{
        ExecutionContext, Height, HostMessage, InitPayload, RenderMode, RunId, TaskMessage,
    };
    use crate::impls::InMemoryFrame;
    use crate::ports::{Frame, FrameMessage, TargetOrigin};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::broadcast;

    const HOST: &str = "https://host.example.com";
    const TASK: &str = "https://task.example.com";

    fn post_init(task: &Arc<dyn Frame>, run_id: &str) {
        let init = HostMessage::Init(InitPayload {
            run_id: RunId::new(run_id),
            inputs: serde_json::json!({}),
            context: ExecutionContext::new(RunId::new(run_id)),
            render_mode: RenderMode::Display,
        });
        task.post_message(serde_json::to_value(init).unwrap(), HOST, &TargetOrigin::Any);
    }

    async fn next_resize(rx: &mut broadcast::Receiver<FrameMessage>) -> Option<Height> {
        loop {
            let m = tokio::time::timeout(Duration::from_millis(200), rx.recv())
                .await
                .ok()?
                .ok()?;
            if let Ok(TaskMessage::Resize(p)) = serde_json::from_value(m.data) {
                return Some(p.height);
            }
        }
    }

    #[tokio::test]
    async fn forwards_heights_while_a_run_is_active() {
        let host = InMemoryFrame::shared(HOST);
        let task = InMemoryFrame::shared(TASK);
        let mut host_rx = host.subscribe();

        let mounted = MountedSession::mount(
            TaskTransport::embedded(task.clone(), host),
            SessionHooks::new(),
            false,
        )
        .unwrap();
        let handle = mounted.handle();
        let mut states = handle.watch();
        post_init(&task, "r1");
        states.wait_for(|s| s.run_id.is_some()).await.unwrap();

        let (tx, rx) = watch::channel(120.0);
        let _bridge = ResizeBridge::attach(handle, rx);
        assert_eq!(next_resize(&mut host_rx).await, Some(Height::Pixels(120.0)));

        tx.send(300.0).unwrap();
        assert_eq!(next_resize(&mut host_rx).await, Some(Height::Pixels(300.0)));
    }

    #[tokio::test]
    async fn bridge_attached_before_init_sends_once_the_run_starts() {
        let host = InMemoryFrame::shared(HOST);
        let task = InMemoryFrame::shared(TASK);
        let mut host_rx = host.subscribe();

        let mounted = MountedSession::mount(
            TaskTransport::embedded(task.clone(), host),
            SessionHooks::new(),
            false,
        )
        .unwrap();
        let handle = mounted.handle();
        let (_tx, rx) = watch::channel(120.0);
        let _bridge = ResizeBridge::attach(handle.clone(), rx);
        assert_eq!(next_resize(&mut host_rx).await, None);

        post_init(&task, "r1");
        assert_eq!(next_resize(&mut host_rx).await, Some(Height::Pixels(120.0)));

        // a new run gets the current height too
        post_init(&task, "r2");
        assert_eq!(next_resize(&mut host_rx).await, Some(Height::Pixels(120.0)));
        assert_eq!(handle.run_id(), Some(RunId::new("r2")));
    }

    #[tokio::test]
    async fn invalid_observed_heights_are_dropped() {
        let host = InMemoryFrame::shared(HOST);
        let task = InMemoryFrame::shared(TASK);
        let mut host_rx = host.subscribe();

        let mounted = MountedSession::mount(
            TaskTransport::embedded(task.clone(), host),
            SessionHooks::new(),
            false,
        )
        .unwrap();
        let handle = mounted.handle();
        let mut states = handle.watch();
        post_init(&task, "r1");
        states.wait_for(|s| s.run_id.is_some()).await.unwrap();

        assert!(!handle.observe_content_height(f64::NAN));
        assert!(!handle.observe_content_height(-3.0));
        assert_eq!(next_resize(&mut host_rx).await, None);
    }

    #[tokio::test]
    async fn nothing_is_sent_without_a_run() {
        let host = InMemoryFrame::shared(HOST);
        let task = InMemoryFrame::shared(TASK);
        let mut host_rx = host.subscribe();

        let mounted =
            MountedSession::mount(TaskTransport::embedded(task, host), SessionHooks::new(), false)
                .unwrap();
        let (tx, rx) = watch::channel(80.0);
        let _bridge = ResizeBridge::attach(mounted.handle(), rx);
        tx.send(90.0).unwrap();

        assert_eq!(next_resize(&mut host_rx).await, None);
    }

    #[tokio::test]
    async fn standalone_frames_are_not_resized() {
        let task = InMemoryFrame::shared(TASK);
        let mut rx_self = task.subscribe();

        let mounted = MountedSession::mount(
            TaskTransport::standalone(task.clone()),
            SessionHooks::new(),
            false,
        )
        .unwrap();
        let handle = mounted.handle();
        let mut states = handle.watch();
        post_init(&task, "r1");
        states.wait_for(|s| s.run_id.is_some()).await.unwrap();

        let (_tx, heights) = watch::channel(200.0);
        let _bridge = ResizeBridge::attach(handle, heights);

        assert_eq!(next_resize(&mut rx_self).await, None);
    }

    #[tokio::test]
    async fn dropping_the_bridge_stops_observation() {
        let host = InMemoryFrame::shared(HOST);
        let task = InMemoryFrame::shared(TASK);
        let mut host_rx = host.subscribe();

        let mounted = MountedSession::mount(
            TaskTransport::embedded(task.clone(), host),
            SessionHooks::new(),
            false,
        )
        .unwrap();
        let handle = mounted.handle();
        let mut states = handle.watch();
        post_init(&task, "r1");
        states.wait_for(|s| s.run_id.is_some()).await.unwrap();

        let (tx, rx) = watch::channel(50.0);
        let bridge = ResizeBridge::attach(handle, rx);
        assert_eq!(next_resize(&mut host_rx).await, Some(Height::Pixels(50.0)));

        drop(bridge);
        tokio::time::sleep(Duration::from_millis(20)).await;
        // receiver は bridge と一緒に drop 済み
        assert!(tx.send(60.0).is_err());
        assert_eq!(next_resize(&mut host_rx).await, None);
    }
}
