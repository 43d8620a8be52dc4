//! Bounded-time TCP reachability check.
//!
//! Used to decide between the cloud and the local speech path before a
//! pipeline is built.  Name resolution and the TCP handshake share one
//! timeout; every failure (DNS, refused, unreachable, timed out) collapses to
//! `false`.
//!
//! ```rust,no_run
//! use pipeplay::probe::{AvailabilityProbe, Reachability};
//!
//! # async fn example() {
//! let online = AvailabilityProbe
//!     .is_reachable("8.8.8.8", 53, 100)
//!     .await;
//! # }
//! ```

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::{lookup_host, TcpStream};

/// Public DNS resolver; reachable whenever there is a working uplink.
pub const DEFAULT_HOST: &str = "8.8.8.8";
pub const DEFAULT_PORT: u16 = 53;
pub const DEFAULT_TIMEOUT_MS: u64 = 100;

// ---------------------------------------------------------------------------
// Reachability trait
// ---------------------------------------------------------------------------

/// Anything that can answer "is this host:port reachable right now?".
///
/// Implementors must be `Send + Sync` so a single probe can be shared by the
/// speaker and the entry point.
#[async_trait]
pub trait Reachability: Send + Sync {
    /// `true` when a TCP connection to `host:port` completes within
    /// `timeout_ms` milliseconds.
    async fn is_reachable(&self, host: &str, port: u16, timeout_ms: u64) -> bool;
}

// ---------------------------------------------------------------------------
// AvailabilityProbe
// ---------------------------------------------------------------------------

/// Stateless TCP probe.  No retries.
#[derive(Debug, Clone, Copy, Default)]
pub struct AvailabilityProbe;

impl AvailabilityProbe {
    /// Probe [`DEFAULT_HOST`]:[`DEFAULT_PORT`] with [`DEFAULT_TIMEOUT_MS`].
    pub async fn internet(&self) -> bool {
        self.is_reachable(DEFAULT_HOST, DEFAULT_PORT, DEFAULT_TIMEOUT_MS)
            .await
    }
}

#[async_trait]
impl Reachability for AvailabilityProbe {
    async fn is_reachable(&self, host: &str, port: u16, timeout_ms: u64) -> bool {
        let budget = Duration::from_millis(timeout_ms);
        match tokio::time::timeout(budget, connect(host, port)).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                log::debug!("probe: {host}:{port} unreachable: {e}");
                false
            }
            Err(_) => {
                log::debug!("probe: {host}:{port} timed out after {timeout_ms} ms");
                false
            }
        }
    }
}

/// Resolve, then try each address in turn.
async fn connect(host: &str, port: u16) -> io::Result<()> {
    let mut last = io::Error::new(io::ErrorKind::NotFound, "no addresses resolved");
    for addr in lookup_host((host, port)).await? {
        match TcpStream::connect(addr).await {
            Ok(_) => return Ok(()),
            Err(e) => last = e,
        }
    }
    Err(last)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
