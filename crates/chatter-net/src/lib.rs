// HTTP access to the remote message service: the channel adapter and the
// reachability probe.

pub mod channel;
pub mod probe;

#[cfg(any(test, feature = "test-util"))]
pub mod test_server;

pub use channel::{HttpChannel, HttpChannelConfig};
pub use probe::{ProbeConfig, ProbeMonitor};
