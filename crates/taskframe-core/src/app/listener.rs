//! ListenerGuard - listener 登録のスコープ管理
//!
//! listener task は channel の Receiver を所有しています。
//! guard を drop すると task が abort され、Receiver も drop される
//! （= 登録解除）。再マウントをまたいだ listener のリークを防ぎます。

use std::future::Future;

use tokio::task::JoinHandle;

pub struct ListenerGuard {
    handle: Option<JoinHandle<()>>,
}

impl ListenerGuard {
    /// Spawn a listener loop on the current tokio runtime.
    pub fn spawn<F>(listener: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            handle: Some(tokio::spawn(listener)),
        }
    }

    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Tear down now instead of at end of scope.
    pub fn release(mut self) {
        self.abort();
    }

    fn abort(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        self.abort();
    }
}
