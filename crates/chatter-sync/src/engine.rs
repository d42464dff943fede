//! The sync engine state machine.
//!
//! The engine runs in a dedicated tokio task that owns every piece of mutable
//! state: the connectivity mode, the single subscription slot, the pending
//! cache load and the published message list. The [`SyncEngine`] handle talks
//! to it over a command channel and reads results from `watch` channels, so
//! connectivity signals, snapshots and sends are processed strictly one at a
//! time.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use chatter_shared::{
    ConnectivityState, Message, MessageList, OutgoingMessage, OutgoingRecord, Reachability,
    RemoteRecord,
};

use crate::adapters::{
    ConnectivityMonitor, DurableCache, RemoteChannel, SnapshotEvent, SnapshotSink,
    SubscriptionHandle, SubscriptionId,
};
use crate::cache_worker::CacheWorker;
use crate::error::SyncError;
use crate::merge;

enum EngineCommand {
    Send {
        message: OutgoingMessage,
        reply: oneshot::Sender<Result<(), SyncError>>,
    },
    Teardown,
}

/// Next mode for a signal, or `None` when the signal changes nothing.
///
/// `Unknown` never moves the engine: a monitor that briefly loses track must
/// not evict a running subscription.
pub fn next_state(current: ConnectivityState, signal: Reachability) -> Option<ConnectivityState> {
    let target = match signal {
        Reachability::Reachable => ConnectivityState::Online,
        Reachability::Unreachable => ConnectivityState::Offline,
        Reachability::Unknown => return None,
    };
    (target != current).then_some(target)
}

/// Handle to a running sync engine.
///
/// Dropping the handle tears the engine down.
pub struct SyncEngine {
    cmd_tx: mpsc::Sender<EngineCommand>,
    messages_rx: watch::Receiver<MessageList>,
    state_rx: watch::Receiver<ConnectivityState>,
    task: Option<JoinHandle<()>>,
}

impl SyncEngine {
    /// Start the engine in a background task. Must be called inside a tokio
    /// runtime.
    ///
    /// The list starts empty and the mode starts `Unknown`; nothing happens
    /// until the monitor emits its first signal.
    pub fn spawn<R, C, M>(remote: R, cache: C, monitor: M) -> Self
    where
        R: RemoteChannel,
        C: DurableCache,
        M: ConnectivityMonitor,
    {
        let (cmd_tx, cmd_rx) = mpsc::channel(64);
        let (messages_tx, messages_rx) = watch::channel(MessageList::empty());
        let (state_tx, state_rx) = watch::channel(ConnectivityState::Unknown);
        let (snapshots_tx, snapshots_rx) = mpsc::unbounded_channel();

        let signals = monitor.start();
        let cache = CacheWorker::spawn(Arc::new(cache));

        let task = EngineTask {
            remote: Arc::new(remote),
            cache,
            state: ConnectivityState::Unknown,
            subscription: None,
            subscriptions_opened: 0,
            pending_load: None,
            snapshots_tx,
            messages_tx,
            state_tx,
        };

        let task = tokio::spawn(task.run(cmd_rx, signals, snapshots_rx));

        info!("Sync engine started");

        Self {
            cmd_tx,
            messages_rx,
            state_rx,
            task: Some(task),
        }
    }

    /// Current message list (newest first). The returned snapshot never
    /// changes under the caller.
    pub fn messages(&self) -> MessageList {
        self.messages_rx.borrow().clone()
    }

    /// Receiver that is notified every time the list is replaced.
    pub fn watch_messages(&self) -> watch::Receiver<MessageList> {
        self.messages_rx.clone()
    }

    pub fn state(&self) -> ConnectivityState {
        *self.state_rx.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectivityState> {
        self.state_rx.clone()
    }

    /// Whether the presentation layer should offer the composer. Local-only
    /// composition is not supported, so this is false unless online.
    pub fn composer_enabled(&self) -> bool {
        self.state() == ConnectivityState::Online
    }

    /// Write a message to the remote channel.
    ///
    /// The write is attempted whatever the connectivity mode; the channel
    /// decides how to fail. Nothing is added to the list locally: the message
    /// shows up when the subscription delivers it.
    pub async fn send(&self, message: OutgoingMessage) -> Result<(), SyncError> {
        self.sender().send(message).await
    }

    /// Cloneable send handle that does not borrow the engine, for sending
    /// from spawned tasks.
    pub fn sender(&self) -> MessageSender {
        MessageSender {
            cmd_tx: self.cmd_tx.clone(),
        }
    }

    /// Release the subscription, cancel the pending cache write and stop the
    /// engine task. Calling it again is a no-op.
    pub async fn teardown(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        // A closed channel means the task already stopped.
        let _ = self.cmd_tx.send(EngineCommand::Teardown).await;
        if let Err(e) = task.await {
            if !e.is_cancelled() {
                error!(error = %e, "Sync engine task failed");
            }
        }
    }
}

/// Send handle obtained from [`SyncEngine::sender`]. Sends fail with
/// [`SyncError::Closed`] once the engine is torn down.
#[derive(Clone)]
pub struct MessageSender {
    cmd_tx: mpsc::Sender<EngineCommand>,
}

impl MessageSender {
    pub async fn send(&self, message: OutgoingMessage) -> Result<(), SyncError> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(EngineCommand::Send { message, reply })
            .await
            .map_err(|_| SyncError::Closed)?;
        rx.await.map_err(|_| SyncError::Closed)?
    }
}

impl Drop for SyncEngine {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

struct EngineTask<R> {
    remote: Arc<R>,
    cache: CacheWorker,
    state: ConnectivityState,
    /// The single subscription slot.
    subscription: Option<SubscriptionHandle>,
    subscriptions_opened: u64,
    /// Cache read started by the last fallback, dropped when it goes stale.
    pending_load: Option<oneshot::Receiver<Vec<Message>>>,
    snapshots_tx: mpsc::UnboundedSender<SnapshotEvent>,
    messages_tx: watch::Sender<MessageList>,
    state_tx: watch::Sender<ConnectivityState>,
}

impl<R: RemoteChannel> EngineTask<R> {
    async fn run(
        mut self,
        mut cmd_rx: mpsc::Receiver<EngineCommand>,
        mut signals: mpsc::Receiver<Reachability>,
        mut snapshots_rx: mpsc::UnboundedReceiver<SnapshotEvent>,
    ) {
        let mut monitor_open = true;

        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(EngineCommand::Send { message, reply }) => self.send(message, reply),
                        Some(EngineCommand::Teardown) => {
                            info!("Sync engine teardown requested");
                            break;
                        }
                        None => {
                            info!("Engine handle dropped, shutting down");
                            break;
                        }
                    }
                }

                signal = signals.recv(), if monitor_open => {
                    match signal {
                        Some(signal) => self.on_signal(signal),
                        None => {
                            warn!(state = %self.state, "Connectivity monitor stopped, holding current mode");
                            monitor_open = false;
                        }
                    }
                }

                Some(event) = snapshots_rx.recv() => {
                    self.on_snapshot(event.subscription, event.records);
                }

                loaded = wait_for_load(&mut self.pending_load), if self.pending_load.is_some() => {
                    self.pending_load = None;
                    match loaded {
                        Some(messages) => self.on_cache_loaded(messages),
                        None => warn!("Cache worker dropped a load"),
                    }
                }
            }
        }

        self.shutdown();
    }

    fn on_signal(&mut self, signal: Reachability) {
        let Some(next) = next_state(self.state, signal) else {
            debug!(state = %self.state, ?signal, "Connectivity signal ignored");
            return;
        };

        info!(from = %self.state, to = %next, "Connectivity transition");

        match next {
            ConnectivityState::Online => {
                self.remote.set_network_enabled(true);
                self.open_subscription();
            }
            ConnectivityState::Offline => {
                // Close before reading the cache so a late callback cannot
                // race the fallback.
                self.close_subscription();
                self.remote.set_network_enabled(false);
                self.load_cache();
            }
            ConnectivityState::Unknown => {}
        }

        self.state = next;
        self.state_tx.send_replace(next);
    }

    fn open_subscription(&mut self) {
        self.close_subscription();
        self.pending_load = None;

        self.subscriptions_opened += 1;
        let id = SubscriptionId(self.subscriptions_opened);
        let sink = SnapshotSink::new(id, self.snapshots_tx.clone());

        match self.remote.subscribe(sink) {
            Ok(handle) => {
                info!(subscription = %id, "Subscription opened");
                self.subscription = Some(handle);
            }
            Err(e) => {
                error!(error = %e, "Failed to open subscription, showing cached messages");
                self.load_cache();
            }
        }
    }

    fn close_subscription(&mut self) {
        if let Some(mut handle) = self.subscription.take() {
            handle.close();
            info!(subscription = %handle.id(), "Subscription closed");
        }
    }

    fn load_cache(&mut self) {
        self.pending_load = Some(self.cache.load());
    }

    fn on_snapshot(&mut self, subscription: SubscriptionId, records: Vec<RemoteRecord>) {
        let live = self.subscription.as_ref().map(SubscriptionHandle::id);
        if live != Some(subscription) {
            debug!(%subscription, "Discarding snapshot from closed subscription");
            return;
        }

        let list = merge::from_snapshot(records, Utc::now());
        debug!(%subscription, count = list.len(), "Applying remote snapshot");
        self.publish(list.clone());
        self.cache.save(list);
    }

    fn on_cache_loaded(&mut self, messages: Vec<Message>) {
        let list = merge::from_cache(messages);
        info!(count = list.len(), "Showing cached messages");
        self.publish(list);
    }

    fn send(&self, message: OutgoingMessage, reply: oneshot::Sender<Result<(), SyncError>>) {
        let record = OutgoingRecord::from(&message);
        let remote = self.remote.clone();
        let kind = message.body.kind();
        debug!(kind, state = %self.state, "Sending message");

        tokio::spawn(async move {
            let result = remote.append(record).await.map_err(SyncError::from);
            match &result {
                Ok(()) => info!(kind, "Message sent"),
                Err(e) => warn!(kind, error = %e, "Message send failed"),
            }
            let _ = reply.send(result);
        });
    }

    fn publish(&self, list: MessageList) {
        self.messages_tx.send_replace(list);
    }

    fn shutdown(&mut self) {
        self.close_subscription();
        self.pending_load = None;
        self.cache.abort();
        info!("Sync engine stopped");
    }
}

async fn wait_for_load(slot: &mut Option<oneshot::Receiver<Vec<Message>>>) -> Option<Vec<Message>> {
    match slot {
        Some(rx) => rx.await.ok(),
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chatter_shared::{ChannelError, MessageBody, Sender};
    use chrono::{DateTime, TimeZone};

    use super::*;
    use crate::fakes::{text_record, FakeCache, FakeRemote};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn ids(list: &MessageList) -> Vec<&str> {
        list.iter().map(|m| m.id.as_str()).collect()
    }

    // With the clock paused, a sleep only returns once every task is idle.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    struct Harness {
        engine: SyncEngine,
        signals: mpsc::Sender<Reachability>,
        remote: FakeRemote,
        cache: FakeCache,
    }

    impl Harness {
        fn start(remote: FakeRemote, cache: FakeCache) -> Self {
            let (signals, monitor) = mpsc::channel(16);
            let engine = SyncEngine::spawn(remote.clone(), cache.clone(), monitor);
            Self {
                engine,
                signals,
                remote,
                cache,
            }
        }

        async fn signal(&self, signal: Reachability) {
            self.signals.send(signal).await.unwrap();
            settle().await;
        }
    }

    #[test]
    fn test_next_state_transitions() {
        use ConnectivityState::*;

        assert_eq!(next_state(Unknown, Reachability::Reachable), Some(Online));
        assert_eq!(next_state(Unknown, Reachability::Unreachable), Some(Offline));
        assert_eq!(next_state(Online, Reachability::Unreachable), Some(Offline));
        assert_eq!(next_state(Offline, Reachability::Reachable), Some(Online));
        assert_eq!(next_state(Online, Reachability::Reachable), None);
        assert_eq!(next_state(Offline, Reachability::Unreachable), None);
        assert_eq!(next_state(Online, Reachability::Unknown), None);
        assert_eq!(next_state(Unknown, Reachability::Unknown), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_starts_empty_and_unknown() {
        let h = Harness::start(FakeRemote::default(), FakeCache::default());
        settle().await;

        assert!(h.engine.messages().is_empty());
        assert_eq!(h.engine.state(), ConnectivityState::Unknown);
        assert!(!h.engine.composer_enabled());
        assert_eq!(h.remote.total_subscriptions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_online_snapshot_is_published_and_cached() {
        let remote = FakeRemote::default();
        remote.push(vec![
            text_record("a", Some(at(10)), "first"),
            text_record("c", Some(at(30)), "third"),
            text_record("b", Some(at(20)), "second"),
        ]);
        let h = Harness::start(remote, FakeCache::default());

        h.signal(Reachability::Reachable).await;

        assert_eq!(h.engine.state(), ConnectivityState::Online);
        assert!(h.engine.composer_enabled());
        assert_eq!(ids(&h.engine.messages()), vec!["c", "b", "a"]);
        assert_eq!(h.remote.live_subscriptions(), 1);
        assert_eq!(h.remote.network_toggles(), vec![true]);

        let stored = h.cache.stored().unwrap();
        assert_eq!(stored, h.engine.messages().to_vec());
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_snapshot_replaces_the_list() {
        let h = Harness::start(FakeRemote::default(), FakeCache::default());
        h.signal(Reachability::Reachable).await;

        h.remote.push(vec![text_record("a", Some(at(10)), "one")]);
        settle().await;
        assert_eq!(ids(&h.engine.messages()), vec!["a"]);

        // A deletion upstream shows up as a shorter snapshot.
        h.remote.push(vec![
            text_record("b", Some(at(20)), "two"),
            text_record("b", Some(at(20)), "two again"),
        ]);
        settle().await;
        assert_eq!(ids(&h.engine.messages()), vec!["b"]);
        assert_eq!(h.cache.stored().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_offline_start_shows_cached_messages() {
        let cached = merge::from_snapshot(
            vec![
                text_record("y", Some(at(20)), "newer"),
                text_record("x", Some(at(10)), "older"),
            ],
            at(100),
        );
        let h = Harness::start(FakeRemote::default(), FakeCache::with_messages(&cached));

        h.signal(Reachability::Unreachable).await;

        assert_eq!(h.engine.state(), ConnectivityState::Offline);
        assert!(!h.engine.composer_enabled());
        assert_eq!(h.engine.messages(), cached);
        assert_eq!(h.remote.total_subscriptions(), 0);
        assert_eq!(h.remote.network_toggles(), vec![false]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_offline_with_unreadable_cache_shows_nothing() {
        let h = Harness::start(FakeRemote::default(), FakeCache::corrupt());
        h.signal(Reachability::Unreachable).await;
        assert!(h.engine.messages().is_empty());

        let failing = FakeCache::default();
        failing.fail_loads();
        let h = Harness::start(FakeRemote::default(), failing);
        h.signal(Reachability::Unreachable).await;
        assert!(h.engine.messages().is_empty());
        assert_eq!(h.engine.state(), ConnectivityState::Offline);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connection_loss_falls_back_to_last_snapshot() {
        let h = Harness::start(FakeRemote::default(), FakeCache::default());
        h.signal(Reachability::Reachable).await;

        h.remote.push(vec![text_record("a", Some(at(10)), "one")]);
        h.remote.push(vec![
            text_record("b", Some(at(20)), "two"),
            text_record("a", Some(at(10)), "one"),
        ]);
        settle().await;
        h.signal(Reachability::Unreachable).await;

        assert_eq!(h.engine.state(), ConnectivityState::Offline);
        assert_eq!(h.remote.live_subscriptions(), 0);
        assert_eq!(ids(&h.engine.messages()), vec!["b", "a"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_opens_a_fresh_subscription() {
        let h = Harness::start(FakeRemote::default(), FakeCache::default());

        h.signal(Reachability::Reachable).await;
        h.signal(Reachability::Unreachable).await;
        h.signal(Reachability::Reachable).await;

        assert_eq!(h.remote.total_subscriptions(), 2);
        assert_eq!(h.remote.live_subscriptions(), 1);
        assert_eq!(h.remote.network_toggles(), vec![true, false, true]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_signal_is_a_no_op() {
        let h = Harness::start(FakeRemote::default(), FakeCache::default());

        h.signal(Reachability::Reachable).await;
        h.signal(Reachability::Reachable).await;
        h.signal(Reachability::Unknown).await;

        assert_eq!(h.engine.state(), ConnectivityState::Online);
        assert_eq!(h.remote.total_subscriptions(), 1);
        assert_eq!(h.remote.live_subscriptions(), 1);
        assert_eq!(h.remote.network_toggles(), vec![true]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_snapshot_from_closed_subscription_is_ignored() {
        let remote = FakeRemote::default();
        remote.push(vec![text_record("c", Some(at(5)), "cached")]);
        let h = Harness::start(remote, FakeCache::default());

        h.signal(Reachability::Reachable).await;
        h.signal(Reachability::Unreachable).await;
        assert_eq!(ids(&h.engine.messages()), vec!["c"]);

        h.remote
            .push_via_closed(vec![text_record("late", Some(at(50)), "too late")]);
        settle().await;

        assert_eq!(ids(&h.engine.messages()), vec!["c"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_cache_load_is_discarded() {
        let cached = merge::from_cache(vec![merge::resolve_record(
            text_record("c", Some(at(5)), "cached"),
            at(5),
        )]);
        let mut cache = FakeCache::with_messages(&cached);
        let loads = cache.gate_loads();
        let remote = FakeRemote::default();
        remote.push(vec![text_record("r", Some(at(50)), "remote")]);
        let h = Harness::start(remote, cache);

        h.signal(Reachability::Unreachable).await;
        h.signal(Reachability::Reachable).await;
        assert_eq!(ids(&h.engine.messages()), vec!["r"]);

        loads.add_permits(1);
        settle().await;

        assert_eq!(ids(&h.engine.messages()), vec!["r"]);
        assert_eq!(h.cache.stored().unwrap()[0].id.as_str(), "r");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_write_failure_keeps_the_list() {
        let cache = FakeCache::default();
        cache.fail_saves();
        let remote = FakeRemote::default();
        remote.push(vec![text_record("a", Some(at(10)), "one")]);
        let h = Harness::start(remote, cache);

        h.signal(Reachability::Reachable).await;

        assert_eq!(ids(&h.engine.messages()), vec!["a"]);
        assert_eq!(h.cache.saves(), 0);
        assert_eq!(h.engine.state(), ConnectivityState::Online);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_waits_for_the_channel_to_deliver() {
        let h = Harness::start(FakeRemote::echoing(), FakeCache::default());
        h.signal(Reachability::Reachable).await;

        let sender = Sender::new("u1", Some("Ada"));
        h.engine
            .send(OutgoingMessage::text(sender.clone(), "hello"))
            .await
            .unwrap();
        settle().await;

        let list = h.engine.messages();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].sender, sender);
        assert_eq!(
            list[0].body,
            MessageBody::Text {
                text: "hello".into()
            }
        );
        assert_eq!(h.remote.appended().len(), 1);
        assert!(h.remote.appended()[0].id.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_attachment_keeps_its_client_id() {
        let h = Harness::start(FakeRemote::echoing(), FakeCache::default());
        h.signal(Reachability::Reachable).await;

        let message = OutgoingMessage::attachment(
            Sender::new("u1", None),
            MessageBody::Image {
                url: "https://img.example/cat.png".into(),
            },
        );
        let id = message.id.clone().unwrap();
        h.engine.send(message).await.unwrap();
        settle().await;

        assert_eq!(h.engine.messages()[0].id, id);
        assert_eq!(h.engine.messages()[0].sender.display_name, "Chatter");
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_failure_is_reported_and_list_unchanged() {
        let remote = FakeRemote::default();
        remote.push(vec![text_record("a", Some(at(10)), "one")]);
        remote.fail_appends(ChannelError::Offline);
        let h = Harness::start(remote, FakeCache::default());
        h.signal(Reachability::Reachable).await;

        let result = h
            .engine
            .send(OutgoingMessage::text(Sender::new("u1", None), "lost"))
            .await;
        settle().await;

        assert!(matches!(
            result,
            Err(SyncError::Channel(ChannelError::Offline))
        ));
        assert_eq!(ids(&h.engine.messages()), vec!["a"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_is_attempted_while_offline() {
        let h = Harness::start(FakeRemote::default(), FakeCache::default());
        h.signal(Reachability::Unreachable).await;

        h.engine
            .send(OutgoingMessage::text(Sender::new("u1", None), "queued"))
            .await
            .unwrap();

        assert_eq!(h.remote.appended().len(), 1);
        assert!(h.engine.messages().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sender_handle_outlives_the_borrow() {
        let mut h = Harness::start(FakeRemote::echoing(), FakeCache::default());
        h.signal(Reachability::Reachable).await;

        let sender = h.engine.sender();
        let sent = tokio::spawn(async move {
            sender
                .send(OutgoingMessage::text(Sender::new("u1", None), "from a task"))
                .await
        });
        sent.await.unwrap().unwrap();
        settle().await;
        assert_eq!(h.engine.messages().len(), 1);

        let sender = h.engine.sender();
        h.engine.teardown().await;
        let result = sender
            .send(OutgoingMessage::text(Sender::new("u1", None), "too late"))
            .await;
        assert!(matches!(result, Err(SyncError::Closed)));
        assert_eq!(h.remote.appended().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_releases_everything() {
        let mut cache = FakeCache::default();
        let saves = cache.gate_saves();
        let remote = FakeRemote::default();
        remote.push(vec![text_record("a", Some(at(10)), "one")]);
        let mut h = Harness::start(remote, cache);

        h.signal(Reachability::Reachable).await;
        assert_eq!(h.remote.live_subscriptions(), 1);

        h.engine.teardown().await;
        h.engine.teardown().await;
        saves.add_permits(1);
        settle().await;

        assert_eq!(h.remote.live_subscriptions(), 0);
        assert_eq!(h.cache.saves(), 0);
        assert!(h.cache.stored().is_none());

        let result = h
            .engine
            .send(OutgoingMessage::text(Sender::new("u1", None), "after"))
            .await;
        assert!(matches!(result, Err(SyncError::Closed)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_monitor_shutdown_holds_current_mode() {
        let h = Harness::start(FakeRemote::default(), FakeCache::default());
        h.signal(Reachability::Reachable).await;

        let Harness {
            engine,
            signals,
            remote,
            ..
        } = h;
        drop(signals);
        settle().await;

        assert_eq!(engine.state(), ConnectivityState::Online);
        assert_eq!(remote.live_subscriptions(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_watchers_see_mode_changes() {
        let h = Harness::start(FakeRemote::default(), FakeCache::default());
        let mut state = h.engine.watch_state();
        let mut messages = h.engine.watch_messages();

        h.remote.push(vec![text_record("a", Some(at(10)), "one")]);
        h.signal(Reachability::Reachable).await;

        assert!(state.has_changed().unwrap());
        assert_eq!(*state.borrow_and_update(), ConnectivityState::Online);
        assert!(messages.has_changed().unwrap());
        assert_eq!(ids(&messages.borrow_and_update()), vec!["a"]);
    }
}
