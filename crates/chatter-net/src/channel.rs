//! HTTP client for the remote `messages` collection.
//!
//! Appends are plain `POST`s. The subscription is a long-poll loop running in
//! its own tokio task: it fetches the current snapshot once, then keeps asking
//! the server to hold a request open until the collection version moves past
//! the last one delivered.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Response};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use chatter_shared::constants::{DEFAULT_HTTP_PORT, DEFAULT_WATCH_TIMEOUT_SECS};
use chatter_shared::{ChannelError, OutgoingRecord, Snapshot};

/// Configuration for [`HttpChannel`].
#[derive(Debug, Clone)]
pub struct HttpChannelConfig {
    /// Base URL of the message service, without trailing slash.
    pub base_url: String,
    /// Timeout for snapshot fetches and appends.
    pub request_timeout: Duration,
    /// Client-side cap on a long-poll request. Must exceed the server's hold
    /// time or every watch ends in a timeout.
    pub watch_timeout: Duration,
    /// Pause after a failed watch request, and between checks while the
    /// network is disabled.
    pub poll_retry: Duration,
}

impl Default for HttpChannelConfig {
    fn default() -> Self {
        Self {
            base_url: format!("http://127.0.0.1:{DEFAULT_HTTP_PORT}"),
            request_timeout: Duration::from_secs(10),
            watch_timeout: Duration::from_secs(DEFAULT_WATCH_TIMEOUT_SECS + 10),
            poll_retry: Duration::from_secs(2),
        }
    }
}

impl HttpChannelConfig {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }
}

/// Cheap to clone; clones share the HTTP client and the network switch.
#[derive(Clone)]
pub struct HttpChannel {
    client: Client,
    config: Arc<HttpChannelConfig>,
    network_enabled: Arc<AtomicBool>,
}

impl HttpChannel {
    pub fn new(mut config: HttpChannelConfig) -> Result<Self, ChannelError> {
        let trimmed = config.base_url.trim_end_matches('/').len();
        config.base_url.truncate(trimmed);

        let client = Client::builder().build().map_err(transport)?;

        Ok(Self {
            client,
            config: Arc::new(config),
            network_enabled: Arc::new(AtomicBool::new(true)),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Enable or disable network use. While disabled, appends fail with
    /// [`ChannelError::Offline`] without touching the network and watch loops
    /// idle.
    pub fn set_network_enabled(&self, enabled: bool) {
        let previous = self.network_enabled.swap(enabled, Ordering::SeqCst);
        if previous != enabled {
            info!(enabled, "Remote channel network toggled");
        }
    }

    pub fn network_enabled(&self) -> bool {
        self.network_enabled.load(Ordering::SeqCst)
    }

    /// Fetch the full current snapshot.
    pub async fn fetch_snapshot(&self) -> Result<Snapshot, ChannelError> {
        self.ensure_enabled()?;
        let resp = self
            .client
            .get(self.url("/messages"))
            .timeout(self.config.request_timeout)
            .send()
            .await
            .map_err(transport)?;
        decode_snapshot(resp).await
    }

    /// Long-poll for a snapshot that is no longer at `(epoch, after)`. Returns
    /// the unchanged snapshot when the server's hold time runs out.
    pub async fn watch_once(&self, epoch: &str, after: u64) -> Result<Snapshot, ChannelError> {
        self.ensure_enabled()?;
        let resp = self
            .client
            .get(self.url("/messages/watch"))
            .query(&[("after", after)])
            .query(&[("epoch", epoch)])
            .timeout(self.config.watch_timeout)
            .send()
            .await
            .map_err(transport)?;
        decode_snapshot(resp).await
    }

    /// Append one record. No retries.
    pub async fn append(&self, record: &OutgoingRecord) -> Result<(), ChannelError> {
        self.ensure_enabled()?;
        let resp = self
            .client
            .post(self.url("/messages"))
            .json(record)
            .timeout(self.config.request_timeout)
            .send()
            .await
            .map_err(transport)?;
        check_status(resp).await?;
        debug!(client_id = ?record.id, "Record appended");
        Ok(())
    }

    /// Run the subscription loop in a background task.
    ///
    /// `on_snapshot` is called with every snapshot whose epoch or version
    /// differs from the previous delivery, starting with the current one. Returning `false`
    /// ends the loop; so does aborting the returned handle.
    pub fn spawn_watch<F>(&self, on_snapshot: F) -> JoinHandle<()>
    where
        F: FnMut(Snapshot) -> bool + Send + 'static,
    {
        let channel = self.clone();
        tokio::spawn(async move { channel.watch_loop(on_snapshot).await })
    }

    async fn watch_loop<F>(&self, mut on_snapshot: F)
    where
        F: FnMut(Snapshot) -> bool,
    {
        // (epoch, version) of the last delivery.
        let mut delivered: Option<(String, u64)> = None;

        loop {
            if !self.network_enabled() {
                tokio::time::sleep(self.config.poll_retry).await;
                continue;
            }

            let result = match &delivered {
                None => self.fetch_snapshot().await,
                Some((epoch, version)) => self.watch_once(epoch, *version).await,
            };

            match result {
                Ok(snapshot) => {
                    if let Some((epoch, version)) = &delivered {
                        if snapshot.is_at(epoch, *version) {
                            continue;
                        }
                        if *epoch != snapshot.epoch {
                            info!(epoch = %snapshot.epoch, "Message service restarted, resyncing");
                        }
                    }
                    let position = (snapshot.epoch.clone(), snapshot.version);
                    debug!(
                        version = position.1,
                        count = snapshot.messages.len(),
                        "Snapshot received"
                    );
                    if !on_snapshot(snapshot) {
                        debug!("Snapshot consumer gone, stopping watch");
                        break;
                    }
                    delivered = Some(position);
                }
                // Offline races a toggle between the check above and the
                // request; the next iteration idles.
                Err(ChannelError::Offline) => {}
                Err(e) => {
                    warn!(error = %e, "Watch request failed, retrying");
                    tokio::time::sleep(self.config.poll_retry).await;
                }
            }
        }
    }

    fn ensure_enabled(&self) -> Result<(), ChannelError> {
        if self.network_enabled() {
            Ok(())
        } else {
            Err(ChannelError::Offline)
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }
}

fn transport(e: reqwest::Error) -> ChannelError {
    if e.is_timeout() {
        ChannelError::Transport(format!("timed out: {e}"))
    } else {
        ChannelError::Transport(e.to_string())
    }
}

async fn check_status(resp: Response) -> Result<Response, ChannelError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ChannelError::Status {
        status: status.as_u16(),
        body,
    })
}

async fn decode_snapshot(resp: Response) -> Result<Snapshot, ChannelError> {
    let resp = check_status(resp).await?;
    resp.json::<Snapshot>()
        .await
        .map_err(|e| ChannelError::Decode(e.to_string()))
}
