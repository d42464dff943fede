// Serializes all durable-cache I/O on one task so a load always observes
// every save queued before it.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use chatter_shared::{Message, MessageList};

use crate::adapters::DurableCache;

enum CacheJob {
    Save(MessageList),
    Load(oneshot::Sender<Vec<Message>>),
}

pub(crate) struct CacheWorker {
    tx: mpsc::UnboundedSender<CacheJob>,
    task: JoinHandle<()>,
}

impl CacheWorker {
    pub fn spawn<C: DurableCache>(cache: Arc<C>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<CacheJob>();

        let task = tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                match job {
                    CacheJob::Save(list) => {
                        let count = list.len();
                        match cache.save(list).await {
                            Ok(()) => debug!(count, "Cache updated"),
                            Err(e) => warn!(error = %e, count, "Cache write failed, ignoring"),
                        }
                    }
                    CacheJob::Load(reply) => {
                        let messages = match cache.load().await {
                            Ok(messages) => messages,
                            Err(e) => {
                                warn!(error = %e, "Cache read failed, using empty list");
                                Vec::new()
                            }
                        };
                        // The engine drops the receiver when the load went stale.
                        let _ = reply.send(messages);
                    }
                }
            }
        });

        Self { tx, task }
    }

    /// Queue a best-effort write.
    pub fn save(&self, list: MessageList) {
        if self.tx.send(CacheJob::Save(list)).is_err() {
            warn!("Cache worker stopped, dropping write");
        }
    }

    /// Queue a read behind any pending writes.
    pub fn load(&self) -> oneshot::Receiver<Vec<Message>> {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(CacheJob::Load(reply)).is_err() {
            warn!("Cache worker stopped, load will yield nothing");
        }
        rx
    }

    /// Stop the worker, cancelling whatever write is in flight.
    pub fn abort(&self) {
        self.task.abort();
    }
}

impl Drop for CacheWorker {
    fn drop(&mut self) {
        self.task.abort();
    }
}
