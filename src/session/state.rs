use super::keepalive::KeepAliveStatus;
use std::fmt;

/// Where a session is in its connect/bind lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    TcpConnected,
    Binding,
    Bound,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "DISCONNECTED",
            ConnectionState::Connecting => "CONNECTING",
            ConnectionState::TcpConnected => "TCP_CONNECTED",
            ConnectionState::Binding => "BINDING",
            ConnectionState::Bound => "BOUND",
        };
        f.write_str(name)
    }
}

/// Point-in-time view of a session, for health endpoints and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub state: ConnectionState,
    pub connected: bool,
    pub bound: bool,
    pub binding: bool,
    pub heartbeat_armed: bool,
    pub reconnect_pending: bool,
    /// Requests awaiting a response PDU, bind included.
    pub in_flight: usize,
    /// Reconnects scheduled since the last successful bind.
    pub reconnect_attempts: u32,
    pub keepalive: KeepAliveStatus,
}
