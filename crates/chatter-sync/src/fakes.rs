// In-memory adapters for engine tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;

use chatter_shared::protocol::{WirePayload, WireUser};
use chatter_shared::{CacheError, ChannelError, Message, MessageList, OutgoingRecord, RemoteRecord};

use crate::adapters::{DurableCache, RemoteChannel, SnapshotSink, SubscriptionHandle};

pub fn text_record(id: &str, sent_at: Option<DateTime<Utc>>, text: &str) -> RemoteRecord {
    RemoteRecord {
        id: id.to_string(),
        user: WireUser {
            id: "u1".into(),
            name: Some("Ada".into()),
        },
        created_at: sent_at,
        payload: WirePayload {
            text: Some(text.to_string()),
            ..WirePayload::default()
        },
    }
}

struct FakeSubscription {
    sink: SnapshotSink,
    live: Arc<AtomicBool>,
}

#[derive(Default)]
struct RemoteState {
    subscriptions: Vec<FakeSubscription>,
    records: Vec<RemoteRecord>,
    appended: Vec<OutgoingRecord>,
    append_error: Option<ChannelError>,
    network_toggles: Vec<bool>,
    echo_appends: bool,
}

impl RemoteState {
    fn deliver_to_live(&self) {
        for sub in self.subscriptions.iter().filter(|s| s.live.load(Ordering::SeqCst)) {
            sub.sink.deliver(self.records.clone());
        }
    }
}

/// Remote channel whose collection is driven by the test.
#[derive(Clone, Default)]
pub struct FakeRemote {
    inner: Arc<Mutex<RemoteState>>,
}

impl FakeRemote {
    /// Appends land in the collection with a server timestamp and are pushed
    /// to live subscriptions, like the real service.
    pub fn echoing() -> Self {
        let remote = Self::default();
        remote.inner.lock().unwrap().echo_appends = true;
        remote
    }

    /// Replace the collection and notify live subscriptions.
    pub fn push(&self, records: Vec<RemoteRecord>) {
        let mut state = self.inner.lock().unwrap();
        state.records = records;
        state.deliver_to_live();
    }

    /// Deliver through sinks whose handles were already released, as a slow
    /// callback would.
    pub fn push_via_closed(&self, records: Vec<RemoteRecord>) {
        let state = self.inner.lock().unwrap();
        for sub in state.subscriptions.iter().filter(|s| !s.live.load(Ordering::SeqCst)) {
            sub.sink.deliver(records.clone());
        }
    }

    pub fn fail_appends(&self, error: ChannelError) {
        self.inner.lock().unwrap().append_error = Some(error);
    }

    pub fn live_subscriptions(&self) -> usize {
        let state = self.inner.lock().unwrap();
        state
            .subscriptions
            .iter()
            .filter(|s| s.live.load(Ordering::SeqCst))
            .count()
    }

    pub fn total_subscriptions(&self) -> usize {
        self.inner.lock().unwrap().subscriptions.len()
    }

    pub fn appended(&self) -> Vec<OutgoingRecord> {
        self.inner.lock().unwrap().appended.clone()
    }

    pub fn network_toggles(&self) -> Vec<bool> {
        self.inner.lock().unwrap().network_toggles.clone()
    }
}

impl RemoteChannel for FakeRemote {
    fn subscribe(&self, sink: SnapshotSink) -> Result<SubscriptionHandle, ChannelError> {
        let live = Arc::new(AtomicBool::new(true));
        let mut state = self.inner.lock().unwrap();

        sink.deliver(state.records.clone());
        state.subscriptions.push(FakeSubscription {
            sink: sink.clone(),
            live: live.clone(),
        });

        Ok(SubscriptionHandle::new(sink.id(), move || {
            live.store(false, Ordering::SeqCst)
        }))
    }

    async fn append(&self, record: OutgoingRecord) -> Result<(), ChannelError> {
        let mut state = self.inner.lock().unwrap();
        if let Some(error) = state.append_error.clone() {
            return Err(error);
        }
        state.appended.push(record.clone());

        if state.echo_appends {
            let id = record
                .id
                .clone()
                .unwrap_or_else(|| format!("srv-{}", state.appended.len()));
            state.records.insert(
                0,
                RemoteRecord {
                    id,
                    user: record.user,
                    created_at: Some(Utc::now()),
                    payload: record.payload,
                },
            );
            state.deliver_to_live();
        }
        Ok(())
    }

    fn set_network_enabled(&self, enabled: bool) {
        self.inner.lock().unwrap().network_toggles.push(enabled);
    }
}

#[derive(Default)]
struct CacheState {
    stored: Option<String>,
    fail_saves: bool,
    fail_loads: bool,
    saves: usize,
}

/// Cache that stores the JSON blob in memory. Saves and loads can be held
/// behind gates to simulate slow storage.
#[derive(Clone, Default)]
pub struct FakeCache {
    inner: Arc<Mutex<CacheState>>,
    save_gate: Option<Arc<Semaphore>>,
    load_gate: Option<Arc<Semaphore>>,
}

impl FakeCache {
    pub fn with_messages(messages: &[Message]) -> Self {
        let cache = Self::default();
        cache.inner.lock().unwrap().stored = Some(serde_json_string(messages));
        cache
    }

    pub fn corrupt() -> Self {
        let cache = Self::default();
        cache.inner.lock().unwrap().stored = Some("[{\"id\":".to_string());
        cache
    }

    /// Hold every save until a permit is added to the returned semaphore.
    pub fn gate_saves(&mut self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.save_gate = Some(gate.clone());
        gate
    }

    pub fn gate_loads(&mut self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.load_gate = Some(gate.clone());
        gate
    }

    pub fn fail_saves(&self) {
        self.inner.lock().unwrap().fail_saves = true;
    }

    pub fn fail_loads(&self) {
        self.inner.lock().unwrap().fail_loads = true;
    }

    pub fn stored(&self) -> Option<Vec<Message>> {
        let state = self.inner.lock().unwrap();
        state
            .stored
            .as_deref()
            .and_then(serde_json_parse)
    }

    pub fn saves(&self) -> usize {
        self.inner.lock().unwrap().saves
    }
}

impl DurableCache for FakeCache {
    async fn save(&self, messages: MessageList) -> Result<(), CacheError> {
        if let Some(gate) = &self.save_gate {
            gate.acquire()
                .await
                .map_err(|e| CacheError::TaskFailed(e.to_string()))?
                .forget();
        }
        let mut state = self.inner.lock().unwrap();
        if state.fail_saves {
            return Err(CacheError::Storage("disk full".into()));
        }
        state.stored = Some(serde_json_string(&messages));
        state.saves += 1;
        Ok(())
    }

    async fn load(&self) -> Result<Vec<Message>, CacheError> {
        if let Some(gate) = &self.load_gate {
            gate.acquire()
                .await
                .map_err(|e| CacheError::TaskFailed(e.to_string()))?
                .forget();
        }
        let state = self.inner.lock().unwrap();
        if state.fail_loads {
            return Err(CacheError::Storage("io error".into()));
        }
        Ok(state
            .stored
            .as_deref()
            .and_then(serde_json_parse)
            .unwrap_or_default())
    }
}

fn serde_json_string(messages: &[Message]) -> String {
    serde_json::to_string(messages).unwrap()
}

fn serde_json_parse(json: &str) -> Option<Vec<Message>> {
    serde_json::from_str(json).ok()
}
