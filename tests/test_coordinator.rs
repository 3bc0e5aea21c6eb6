//! End-to-end tests for the coordinator event loop
//!
//! Drives a running `Coordinator` through its handle and records what
//! reaches the host.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use tabgate::coord::{HostCall, HostError, ObserverMessage, TabHost};
use tabgate::{
    Coordinator, CoordinatorConfig, CoordinatorHook, EventKind, Inbound, NavigationPhase,
    TabCommand, TabId, VideoEvent,
};
use tokio::sync::{mpsc, oneshot, Semaphore};
use tokio::time::timeout;

/// Host double: records every call, fails for tabs marked gone
struct RecordingHost {
    calls: mpsc::UnboundedSender<HostCall>,
    gone: Mutex<HashSet<TabId>>,
}

impl RecordingHost {
    fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<HostCall>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let host = Arc::new(Self {
            calls: tx,
            gone: Mutex::new(HashSet::new()),
        });
        (host, rx)
    }

    fn mark_gone(&self, tab_id: TabId) {
        self.gone.lock().unwrap().insert(tab_id);
    }

    fn record(&self, call: HostCall, tab_id: TabId) -> Result<(), HostError> {
        let _ = self.calls.send(call);
        if self.gone.lock().unwrap().contains(&tab_id) {
            Err(HostError::TabGone(tab_id))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl TabHost for RecordingHost {
    async fn close_tab(&self, tab_id: TabId) -> Result<(), HostError> {
        self.record(HostCall::CloseTab { tab_id }, tab_id)
    }

    async fn focus_tab(&self, tab_id: TabId) -> Result<(), HostError> {
        self.record(HostCall::FocusTab { tab_id }, tab_id)
    }

    async fn send_to_tab(&self, tab_id: TabId, message: ObserverMessage) -> Result<(), HostError> {
        self.record(HostCall::SendMessage { tab_id, message }, tab_id)
    }
}

#[derive(Default)]
struct CountingHook {
    inbound: AtomicUsize,
    malformed: AtomicUsize,
    shutdowns: AtomicUsize,
}

impl CoordinatorHook for CountingHook {
    fn on_inbound(&self, _inbound: &Inbound, _commands: &[TabCommand]) {
        self.inbound.fetch_add(1, Ordering::SeqCst);
    }

    fn on_malformed(&self, _reason: &str) {
        self.malformed.fetch_add(1, Ordering::SeqCst);
    }

    fn on_shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

async fn next_calls(rx: &mut mpsc::UnboundedReceiver<HostCall>, n: usize) -> Vec<HostCall> {
    let mut calls = Vec::with_capacity(n);
    for _ in 0..n {
        let call = timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("host call not dispatched in time")
            .expect("dispatcher closed");
        calls.push(call);
    }
    calls
}

fn video_line(tab: u32, event: &str, extra: &str) -> String {
    format!(
        r#"{{"sender":{{"tab":{{"id":{}}}}},"message":{{"type":"VIDEO_EVENT","event":"{}"{}}}}}"#,
        tab, event, extra
    )
}

fn send(tab: u32, message: ObserverMessage) -> HostCall {
    HostCall::SendMessage {
        tab_id: TabId(tab),
        message,
    }
}

#[tokio::test]
async fn test_full_session_over_wire_lines() {
    let hook = Arc::new(CountingHook::default());
    let coordinator = Coordinator::new(&CoordinatorConfig::default())
        .unwrap()
        .with_hook(hook.clone());
    let handle = coordinator.handle();
    let (host, mut rx) = RecordingHost::new();
    let (cancel_tx, cancel_rx) = oneshot::channel();
    let running = tokio::spawn(coordinator.run(host, cancel_rx));

    // Handshake, then tab 1 starts and is granted
    let handshake = r#"{"sender":{"tab":{"id":1}},"message":{"type":"REQUEST_STATE"}}"#;
    assert!(handle.submit_line(handshake).await.unwrap());
    assert!(handle
        .submit_line(&video_line(1, "playing", r#","playing":true,"completed":false"#))
        .await
        .unwrap());
    assert_eq!(next_calls(&mut rx, 1).await, vec![send(1, ObserverMessage::AllowPlay)]);

    // Tab 2 starts while 1 holds the slot
    handle
        .submit_line(&video_line(2, "playing", r#","playing":true,"completed":false"#))
        .await
        .unwrap();
    assert_eq!(
        next_calls(&mut rx, 2).await,
        vec![
            send(2, ObserverMessage::ForcePause),
            HostCall::FocusTab { tab_id: TabId(1) },
        ]
    );

    let snap = handle.snapshot().await.unwrap();
    assert_eq!(snap.active, Some(TabId(1)));
    assert_eq!(snap.queue, vec![TabId(1), TabId(2)]);

    // Malformed input is dropped without touching state
    let no_sender = r#"{"message":{"type":"VIDEO_EVENT","event":"ended"}}"#;
    assert!(!handle.submit_line(no_sender).await.unwrap());
    assert!(!handle.submit_line("garbage").await.unwrap());
    assert_eq!(handle.snapshot().await.unwrap(), snap);

    // Tab 1 ends: closed, and tab 2 gets the slot
    handle.submit_line(&video_line(1, "ended", "")).await.unwrap();
    assert_eq!(
        next_calls(&mut rx, 3).await,
        vec![
            HostCall::CloseTab { tab_id: TabId(1) },
            HostCall::FocusTab { tab_id: TabId(2) },
            send(2, ObserverMessage::AllowPlay),
        ]
    );

    // Host then reports tab 1 removed: nothing further to do
    handle.submit_line(r#"{"type":"TAB_REMOVED","tabId":1}"#).await.unwrap();
    let snap = handle.snapshot().await.unwrap();
    assert_eq!(snap.active, Some(TabId(2)));
    assert_eq!(snap.queue, vec![TabId(2)]);

    cancel_tx.send(()).unwrap();
    running.await.unwrap().unwrap();

    assert_eq!(hook.inbound.load(Ordering::SeqCst), 5);
    assert_eq!(hook.malformed.load(Ordering::SeqCst), 2);
    assert_eq!(hook.shutdowns.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_host_failures_do_not_stop_the_loop() {
    let coordinator = Coordinator::new(&CoordinatorConfig::default()).unwrap();
    let handle = coordinator.handle();
    let (host, mut rx) = RecordingHost::new();
    host.mark_gone(TabId(1));
    let (_cancel_tx, cancel_rx) = oneshot::channel();
    let running = tokio::spawn(coordinator.run(host.clone(), cancel_rx));

    handle
        .video_event(VideoEvent::new(1, EventKind::StartedPlaying).with_playing(true))
        .await
        .unwrap();
    handle
        .video_event(VideoEvent::new(2, EventKind::StartedPlaying).with_playing(true))
        .await
        .unwrap();
    handle
        .video_event(VideoEvent::new(1, EventKind::ProgressUpdate).with_completed(true))
        .await
        .unwrap();

    // allow 1 (fails), pause 2, focus 1 (fails), close 1 (fails), focus 2, allow 2
    let calls = next_calls(&mut rx, 6).await;
    assert_eq!(calls.last(), Some(&send(2, ObserverMessage::AllowPlay)));
    assert_eq!(handle.snapshot().await.unwrap().active, Some(TabId(2)));

    drop(handle);
    timeout(Duration::from_secs(2), running)
        .await
        .expect("loop did not stop after handles dropped")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_lifecycle_through_handle() {
    let config = CoordinatorConfig::builder().focus_on_advance(false).build().unwrap();
    let coordinator = Coordinator::new(&config).unwrap();
    let handle = coordinator.handle();
    let (host, mut rx) = RecordingHost::new();
    let (cancel_tx, cancel_rx) = oneshot::channel();
    let running = tokio::spawn(coordinator.run(host, cancel_rx));

    for tab in [1, 2, 3] {
        handle
            .video_event(VideoEvent::new(tab, EventKind::StartedPlaying).with_playing(true))
            .await
            .unwrap();
    }
    next_calls(&mut rx, 5).await;

    // Active tab navigates off the site: slot cleared, nobody advanced
    handle
        .tab_navigated(TabId(1), "https://example.com/", NavigationPhase::Loading)
        .await
        .unwrap();
    let snap = handle.snapshot().await.unwrap();
    assert_eq!(snap.active, None);
    assert_eq!(snap.queue, vec![TabId(2), TabId(3)]);

    // Next start from tab 3 is granted; tab 2 is still reported playing
    handle
        .video_event(VideoEvent::new(3, EventKind::StartedPlaying).with_playing(true))
        .await
        .unwrap();
    assert_eq!(
        next_calls(&mut rx, 2).await,
        vec![send(3, ObserverMessage::AllowPlay), send(2, ObserverMessage::ForcePause)]
    );

    // Closing the active tab hands the slot to tab 2
    handle.tab_closed(TabId(3)).await.unwrap();
    assert_eq!(next_calls(&mut rx, 1).await, vec![send(2, ObserverMessage::AllowPlay)]);
    assert_eq!(handle.snapshot().await.unwrap().active, Some(TabId(2)));

    cancel_tx.send(()).unwrap();
    running.await.unwrap().unwrap();
}

/// Host that blocks every call until permits are released
struct StalledHost {
    gate: Semaphore,
    delivered: AtomicUsize,
}

impl StalledHost {
    async fn pass(&self) -> Result<(), HostError> {
        let _permit = self.gate.acquire().await;
        self.delivered.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl TabHost for StalledHost {
    async fn close_tab(&self, _tab_id: TabId) -> Result<(), HostError> {
        self.pass().await
    }

    async fn focus_tab(&self, _tab_id: TabId) -> Result<(), HostError> {
        self.pass().await
    }

    async fn send_to_tab(
        &self,
        _tab_id: TabId,
        _message: ObserverMessage,
    ) -> Result<(), HostError> {
        self.pass().await
    }
}

#[tokio::test]
async fn test_stalled_host_backlog_is_bounded() {
    let config = CoordinatorConfig::builder()
        .focus_on_advance(false)
        .command_capacity(1)
        .build()
        .unwrap();
    let hook = Arc::new(CountingHook::default());
    let coordinator = Coordinator::new(&config).unwrap().with_hook(hook.clone());
    let handle = coordinator.handle();
    let host = Arc::new(StalledHost {
        gate: Semaphore::new(0),
        delivered: AtomicUsize::new(0),
    });
    let (cancel_tx, cancel_rx) = oneshot::channel();
    let running = tokio::spawn(coordinator.run(host.clone(), cancel_rx));

    // 1 grant + 2 commands per denial = 7 commands against a stalled host
    for tab in [1, 2, 3, 4] {
        handle
            .video_event(VideoEvent::new(tab, EventKind::StartedPlaying).with_playing(true))
            .await
            .unwrap();
    }
    let snap = timeout(Duration::from_secs(2), handle.snapshot())
        .await
        .expect("loop blocked by stalled host")
        .unwrap();
    assert_eq!(snap.active, Some(TabId(1)));
    assert_eq!(hook.inbound.load(Ordering::SeqCst), 4);

    host.gate.add_permits(16);
    cancel_tx.send(()).unwrap();
    running.await.unwrap().unwrap();

    // at most one call in flight plus one queued survived
    let delivered = host.delivered.load(Ordering::SeqCst);
    assert!((1..=2).contains(&delivered), "delivered {}", delivered);
}
