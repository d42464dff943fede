//! Reachability probing.
//!
//! The monitor polls the message service's health endpoint and reports
//! reachability on a channel: once as soon as the first probe finishes, then
//! only when the answer changes.

use std::time::Duration;

use reqwest::Client;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use chatter_shared::constants::DEFAULT_PROBE_INTERVAL_SECS;
use chatter_shared::{ChannelError, Reachability};

/// Configuration for [`ProbeMonitor`].
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Full URL of the health endpoint.
    pub health_url: String,
    /// Time between probes.
    pub interval: Duration,
    /// A probe that takes longer than this counts as unreachable.
    pub timeout: Duration,
}

impl ProbeConfig {
    /// Probe `{base_url}/health` with default timing.
    pub fn for_base_url(base_url: &str) -> Self {
        Self {
            health_url: format!("{}/health", base_url.trim_end_matches('/')),
            interval: Duration::from_secs(DEFAULT_PROBE_INTERVAL_SECS),
            timeout: Duration::from_secs(3),
        }
    }
}

pub struct ProbeMonitor {
    client: Client,
    config: ProbeConfig,
}

impl ProbeMonitor {
    pub fn new(config: ProbeConfig) -> Result<Self, ChannelError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ChannelError::Transport(e.to_string()))?;
        Ok(Self { client, config })
    }

    /// Run a single probe.
    pub async fn probe_once(&self) -> Reachability {
        match self.client.get(&self.config.health_url).send().await {
            Ok(resp) if resp.status().is_success() => Reachability::Reachable,
            Ok(resp) => {
                debug!(status = %resp.status(), "Health probe answered with error status");
                Reachability::Unreachable
            }
            Err(e) => {
                debug!(error = %e, "Health probe failed");
                Reachability::Unreachable
            }
        }
    }

    /// Spawn the probe loop. It stops once the receiver is dropped.
    pub fn spawn(self) -> mpsc::Receiver<Reachability> {
        let (tx, rx) = mpsc::channel(16);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.config.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut last: Option<Reachability> = None;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = tx.closed() => break,
                }

                let current = self.probe_once().await;
                if last == Some(current) {
                    continue;
                }

                info!(url = %self.config.health_url, reachability = ?current, "Connectivity changed");
                last = Some(current);
                if tx.send(current).await.is_err() {
                    break;
                }
            }

            debug!("Probe loop terminated");
        });

        rx
    }
}
