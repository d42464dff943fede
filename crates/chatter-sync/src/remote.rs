//! Bindings from the engine's traits to the HTTP channel and health probe.

use tokio::sync::mpsc;

use chatter_net::{HttpChannel, ProbeMonitor};
use chatter_shared::{ChannelError, OutgoingRecord, Reachability};

use crate::adapters::{ConnectivityMonitor, RemoteChannel, SnapshotSink, SubscriptionHandle};

impl RemoteChannel for HttpChannel {
    fn subscribe(&self, sink: SnapshotSink) -> Result<SubscriptionHandle, ChannelError> {
        let id = sink.id();
        let task = self.spawn_watch(move |snapshot| sink.deliver(snapshot.messages));
        Ok(SubscriptionHandle::from_task(id, task))
    }

    async fn append(&self, record: OutgoingRecord) -> Result<(), ChannelError> {
        HttpChannel::append(self, &record).await
    }

    fn set_network_enabled(&self, enabled: bool) {
        HttpChannel::set_network_enabled(self, enabled);
    }
}

impl ConnectivityMonitor for ProbeMonitor {
    fn start(self) -> mpsc::Receiver<Reachability> {
        self.spawn()
    }
}
