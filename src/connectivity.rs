//! Connectivity oracles
//!
//! The cached fetcher asks an oracle once per call whether the network is
//! reachable. `TcpCheck` answers by opening a TCP connection to a well-known
//! address; `FixedConnectivity` always gives the same answer and backs the
//! `--offline` flag and tests.

use async_trait::async_trait;
use std::io;
use std::time::Duration;
use tokio::net::TcpStream;

/// Result of a connectivity check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    Online,
    Offline,
    /// The check could not be carried out
    Unknown,
}

impl Connectivity {
    /// Whether a fetch should attempt the network
    ///
    /// `Unknown` is treated as online.
    pub fn allows_network(self) -> bool {
        !matches!(self, Connectivity::Offline)
    }
}

#[async_trait]
pub trait ConnectivityOracle: Send + Sync + std::fmt::Debug {
    async fn check(&self) -> Connectivity;
}

/// Oracle that always reports the same state
#[derive(Debug, Clone, Copy)]
pub struct FixedConnectivity(pub Connectivity);

#[async_trait]
impl ConnectivityOracle for FixedConnectivity {
    async fn check(&self) -> Connectivity {
        self.0
    }
}

/// Oracle that opens a TCP connection to a known endpoint
#[derive(Debug, Clone)]
pub struct TcpCheck {
    addr: String,
    timeout: Duration,
}

impl TcpCheck {
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
        }
    }
}

#[async_trait]
impl ConnectivityOracle for TcpCheck {
    async fn check(&self) -> Connectivity {
        let state = match tokio::time::timeout(self.timeout, TcpStream::connect(&self.addr)).await {
            Ok(Ok(_stream)) => Connectivity::Online,
            Ok(Err(e)) => classify_connect_error(&e),
            Err(_elapsed) => classify_connect_error(&io::ErrorKind::TimedOut.into()),
        };
        tracing::debug!(addr = %self.addr, ?state, "connectivity check");
        state
    }
}

/// A refusal or reset still proves a packet made the round trip. A timeout
/// only shows the check address is unreachable, not the weather API.
fn classify_connect_error(error: &io::Error) -> Connectivity {
    match error.kind() {
        io::ErrorKind::ConnectionRefused | io::ErrorKind::ConnectionReset => Connectivity::Online,
        io::ErrorKind::PermissionDenied | io::ErrorKind::TimedOut => Connectivity::Unknown,
        _ => Connectivity::Offline,
    }
}
