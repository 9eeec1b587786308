// ABOUTME: Transport contract between a provider session and the PDU socket underneath it
// ABOUTME: A connector opens a handle plus an ordered event stream; the session never touches sockets

//! The session core treats the transport as a black box: it opens one
//! connection per attempt through a [`Connector`], issues requests through the
//! returned [`TransportHandle`], and consumes everything the connection
//! reports (connect, inbound PDUs, errors, close) from a single ordered
//! [`TransportEvent`] stream. Responses are correlated by sequence number in
//! the session, not here.
//!
//! [`tcp::TcpConnector`] is the production implementation; tests substitute a
//! scripted connector.

pub mod tcp;

use crate::codec::{Frame, PduHeader};
use crate::datatypes::{
    BindTransceiver, DeliverSmResponse, EnquireLink, EnquireLinkResponse, SubmitSm,
    UnbindResponse,
};
use std::fmt;
use thiserror::Error;
use tokio::sync::mpsc;

pub use tcp::TcpConnector;

/// Where a provider's SMSC listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Everything a connection reports, in the order it happened.
#[derive(Debug)]
pub enum TransportEvent {
    /// The socket is established; the session may bind.
    Connected,
    /// An inbound PDU, request or response.
    Pdu(Frame),
    /// An inbound PDU that could not be decoded. The connection stays up and
    /// a request has already been answered with an error status.
    Malformed { header: PduHeader, reason: String },
    /// The connection failed. A `Closed` event follows.
    Error(TransportError),
    /// The connection is gone. Always the last event.
    Closed,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("connect to {endpoint} failed: {reason}")]
    Connect { endpoint: String, reason: String },

    #[error("I/O error: {0}")]
    Io(String),

    #[error("malformed PDU: {0}")]
    Codec(String),

    #[error("transport is closed")]
    Closed,
}

/// Request side of one live connection.
///
/// Every method only queues the PDU; the outcome of a request arrives later as
/// a [`TransportEvent::Pdu`] carrying the same sequence number. An `Err` means
/// the PDU could not even be queued (connection already gone).
pub trait TransportHandle: Send + Sync + 'static {
    fn bind_transceiver(&self, pdu: BindTransceiver) -> Result<(), TransportError>;

    fn submit_sm(&self, pdu: SubmitSm) -> Result<(), TransportError>;

    fn deliver_sm_resp(&self, pdu: DeliverSmResponse) -> Result<(), TransportError>;

    fn enquire_link(&self, pdu: EnquireLink) -> Result<(), TransportError>;

    fn enquire_link_resp(&self, pdu: EnquireLinkResponse) -> Result<(), TransportError>;

    fn unbind_resp(&self, pdu: UnbindResponse) -> Result<(), TransportError>;

    /// Close the connection. Idempotent; a `Closed` event follows if the
    /// connection was still open.
    fn close(&self);
}

/// Opens connections. One call per connection attempt.
pub trait Connector: Send + Sync + 'static {
    type Handle: TransportHandle;

    /// Start connecting to `endpoint`. Never blocks: the outcome is reported
    /// on the returned event stream as `Connected`, or `Error` then `Closed`.
    fn connect(&self, endpoint: &Endpoint)
    -> (Self::Handle, mpsc::UnboundedReceiver<TransportEvent>);
}
