// ABOUTME: TCP implementation of the transport contract using tokio sockets and the frame codec
// ABOUTME: One background task per connection multiplexes socket reads with queued outbound PDUs

use crate::codec::{CodecError, Encodable, PduHeader};
use crate::connection::{FrameReader, FrameWriter};
use crate::datatypes::{
    BindTransceiver, CommandId, CommandStatus, DeliverSmResponse, EnquireLink,
    EnquireLinkResponse, GenericNack, SubmitSm, UnbindResponse,
};
use crate::transport::{Connector, Endpoint, TransportError, TransportEvent, TransportHandle};
use bytes::Bytes;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, warn};

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Opens plain TCP connections to an SMSC.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    connect_timeout: Duration,
}

impl TcpConnector {
    pub fn new() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }
}

impl Default for TcpConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
enum Outbound {
    Pdu(Bytes),
    Close,
}

/// Handle to one TCP connection task.
#[derive(Debug)]
pub struct TcpHandle {
    outbound: mpsc::UnboundedSender<Outbound>,
}

impl TcpHandle {
    fn queue(&self, pdu: Result<Bytes, CodecError>) -> Result<(), TransportError> {
        let bytes = pdu.map_err(|e| TransportError::Codec(e.to_string()))?;
        self.outbound
            .send(Outbound::Pdu(bytes))
            .map_err(|_| TransportError::Closed)
    }
}

impl TransportHandle for TcpHandle {
    fn bind_transceiver(&self, pdu: BindTransceiver) -> Result<(), TransportError> {
        self.queue(pdu.to_bytes())
    }

    fn submit_sm(&self, pdu: SubmitSm) -> Result<(), TransportError> {
        self.queue(pdu.to_bytes())
    }

    fn deliver_sm_resp(&self, pdu: DeliverSmResponse) -> Result<(), TransportError> {
        self.queue(pdu.to_bytes())
    }

    fn enquire_link(&self, pdu: EnquireLink) -> Result<(), TransportError> {
        self.queue(pdu.to_bytes())
    }

    fn enquire_link_resp(&self, pdu: EnquireLinkResponse) -> Result<(), TransportError> {
        self.queue(pdu.to_bytes())
    }

    fn unbind_resp(&self, pdu: UnbindResponse) -> Result<(), TransportError> {
        self.queue(pdu.to_bytes())
    }

    fn close(&self) {
        let _ = self.outbound.send(Outbound::Close);
    }
}

impl Drop for TcpHandle {
    fn drop(&mut self) {
        self.close();
    }
}

impl Connector for TcpConnector {
    type Handle = TcpHandle;

    fn connect(
        &self,
        endpoint: &Endpoint,
    ) -> (Self::Handle, mpsc::UnboundedReceiver<TransportEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        tokio::spawn(run_connection(
            endpoint.clone(),
            self.connect_timeout,
            outbound_rx,
            events_tx,
        ));

        (
            TcpHandle {
                outbound: outbound_tx,
            },
            events_rx,
        )
    }
}

async fn run_connection(
    endpoint: Endpoint,
    connect_timeout: Duration,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    events: mpsc::UnboundedSender<TransportEvent>,
) {
    let address = endpoint.to_string();
    let stream = match timeout(connect_timeout, TcpStream::connect(&address)).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => {
            let _ = events.send(TransportEvent::Error(TransportError::Connect {
                endpoint: address,
                reason: e.to_string(),
            }));
            let _ = events.send(TransportEvent::Closed);
            return;
        }
        Err(_) => {
            let _ = events.send(TransportEvent::Error(TransportError::Connect {
                endpoint: address,
                reason: format!("timed out after {connect_timeout:?}"),
            }));
            let _ = events.send(TransportEvent::Closed);
            return;
        }
    };

    if let Err(e) = stream.set_nodelay(true) {
        debug!("set_nodelay on {address} failed: {e}");
    }
    let _ = events.send(TransportEvent::Connected);

    let (read_half, write_half) = stream.into_split();
    let mut reader = FrameReader::new(read_half);
    let mut writer = FrameWriter::new(write_half);

    loop {
        tokio::select! {
            inbound = reader.read_frame() => match inbound {
                Ok(Some(frame)) => {
                    if events.send(TransportEvent::Pdu(frame)).is_err() {
                        // Nobody is listening any more.
                        break;
                    }
                }
                Ok(None) => {
                    debug!("{address} closed the connection");
                    break;
                }
                Err(CodecError::Malformed { header, source }) => {
                    warn!(
                        command_id = header.command_id,
                        sequence_number = header.sequence_number,
                        "skipping undecodable PDU from {address}: {source}"
                    );
                    if let Some(reply) = rejection(&header, &source) {
                        if let Err(e) = writer.write_pdu(&reply).await {
                            warn!("write to {address} failed: {e}");
                            let _ = events.send(TransportEvent::Error(TransportError::Io(e.to_string())));
                            break;
                        }
                    }
                    let event = TransportEvent::Malformed {
                        header,
                        reason: source.to_string(),
                    };
                    if events.send(event).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("read from {address} failed: {e}");
                    let error = match e {
                        CodecError::Io(io) => TransportError::Io(io.to_string()),
                        other => TransportError::Codec(other.to_string()),
                    };
                    let _ = events.send(TransportEvent::Error(error));
                    break;
                }
            },
            queued = outbound.recv() => match queued {
                Some(Outbound::Pdu(bytes)) => {
                    if let Err(e) = writer.write_pdu(&bytes).await {
                        warn!("write to {address} failed: {e}");
                        let _ = events.send(TransportEvent::Error(TransportError::Io(e.to_string())));
                        break;
                    }
                }
                Some(Outbound::Close) | None => {
                    let _ = writer.shutdown().await;
                    break;
                }
            },
        }
    }

    let _ = events.send(TransportEvent::Closed);
}

/// The answer to a request the codec could not read. Responses get none.
///
/// A deliver_sm is refused with a permanent error so the SMSC does not
/// redeliver the same undecodable PDU forever.
fn rejection(header: &PduHeader, cause: &CodecError) -> Option<Bytes> {
    if header.is_response() {
        return None;
    }
    let reply = match header.command() {
        Some(CommandId::DeliverSm) => DeliverSmResponse::new(header.sequence_number)
            .with_status(CommandStatus::ReceiverPermanentAppError as u32)
            .to_bytes(),
        _ => {
            let status = match cause {
                CodecError::Incomplete => CommandStatus::InvalidCommandLength,
                _ => CommandStatus::SystemError,
            };
            GenericNack::new(header.sequence_number, status as u32).to_bytes()
        }
    };
    reply.ok()
}
