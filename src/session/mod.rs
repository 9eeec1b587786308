// ABOUTME: Persistent per-provider SMPP session: connect, bind, heartbeat, reconnect and submit
// ABOUTME: All connection failures are recovered here; callers only ever see a ready or unready session

//! A [`Session`] keeps one provider bound for the life of the process.
//!
//! ```text
//! DISCONNECTED -> CONNECTING -> TCP_CONNECTED -> BINDING -> BOUND
//!       ^                                                     |
//!       +---------------- close / error / bind reject --------+
//! ```
//!
//! Every way of losing the link (socket error, socket close, bind rejection,
//! unbind from the SMSC) ends in the same place: heartbeat disarmed, flags
//! cleared and exactly one reconnect scheduled. Binding never retries in
//! place.
//!
//! Transport events are consumed by one pump task per transport, in order.
//! Each transport gets a generation number; events from a replaced transport
//! are dropped.

mod correlation;
mod error;
mod keepalive;
mod reconnect;
mod state;
mod throttle;

pub use error::SessionError;
pub use keepalive::KeepAliveStatus;
pub use reconnect::{ExponentialBackoff, FixedDelay, ReconnectPolicy};
pub use state::{ConnectionState, SessionSnapshot};
pub use throttle::TokenBucket;

use crate::codec::Frame;
use crate::config::ProviderConfig;
use crate::datatypes::{
    BindTransceiver, CommandStatus, DeliverSm, DeliverSmResponse, EnquireLink,
    EnquireLinkResponse, SubmitSm, UnbindResponse, limits,
};
use crate::receipt::parse_receipt;
use crate::store::{MessageStatus, MessageStore, StatusUpdate};
use crate::transport::{Connector, TransportEvent, TransportHandle};
use chrono::Utc;
use correlation::{PendingRequest, PendingRequests};
use keepalive::KeepAlive;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep};
use tracing::{debug, error, info, warn};

/// How often a throttled send re-checks the token bucket.
const THROTTLE_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// One outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundSms {
    pub to: String,
    pub text: String,
    /// Source address. Falls back to the provider's default sender.
    pub from: Option<String>,
}

impl OutboundSms {
    pub fn new(to: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            text: text.into(),
            from: None,
        }
    }

    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }
}

/// Handle to a provider session. Clones share the same session.
///
/// Must be used from within a tokio runtime: starting, binding and
/// reconnecting spawn tasks.
pub struct Session<C: Connector, S: MessageStore> {
    inner: Arc<Inner<C, S>>,
}

impl<C: Connector, S: MessageStore> Clone for Session<C, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<C: Connector, S: MessageStore> {
    name: String,
    config: ProviderConfig,
    connector: C,
    store: Arc<S>,
    policy: Box<dyn ReconnectPolicy>,
    shared: Mutex<Shared<C::Handle>>,
}

/// Mutable session state. The lock is never held across an await.
struct Shared<H> {
    state: ConnectionState,
    connected: bool,
    bound: bool,
    binding: bool,
    /// Set by `start`, cleared by `stop`. No reconnects while false.
    running: bool,
    transport: Option<Arc<H>>,
    generation: u64,
    pump: Option<JoinHandle<()>>,
    heartbeat: Option<JoinHandle<()>>,
    reconnect: Option<JoinHandle<()>>,
    reconnect_attempts: u32,
    pending: PendingRequests,
    throttle: TokenBucket,
    keepalive: KeepAlive,
}

impl<H: TransportHandle> Shared<H> {
    fn disarm_heartbeat(&mut self) {
        if let Some(heartbeat) = self.heartbeat.take() {
            heartbeat.abort();
        }
        self.keepalive.stop();
    }

    fn clear_flags(&mut self) {
        self.connected = false;
        self.bound = false;
        self.binding = false;
        self.state = ConnectionState::Disconnected;
    }
}

impl<H> Drop for Shared<H> {
    fn drop(&mut self) {
        for task in [self.pump.take(), self.heartbeat.take(), self.reconnect.take()]
            .into_iter()
            .flatten()
        {
            task.abort();
        }
    }
}

impl<C: Connector, S: MessageStore> Session<C, S> {
    /// A stopped session using a fixed reconnect delay from `config`.
    pub fn new(name: impl Into<String>, config: ProviderConfig, connector: C, store: Arc<S>) -> Self {
        let policy = FixedDelay(config.reconnect_delay());
        Self::with_reconnect_policy(name, config, connector, store, policy)
    }

    pub fn with_reconnect_policy(
        name: impl Into<String>,
        config: ProviderConfig,
        connector: C,
        store: Arc<S>,
        policy: impl ReconnectPolicy,
    ) -> Self {
        let throttle = TokenBucket::new(config.max_mps, Instant::now());
        let shared = Shared {
            state: ConnectionState::Disconnected,
            connected: false,
            bound: false,
            binding: false,
            running: false,
            transport: None,
            generation: 0,
            pump: None,
            heartbeat: None,
            reconnect: None,
            reconnect_attempts: 0,
            pending: PendingRequests::new(),
            throttle,
            keepalive: KeepAlive::default(),
        };

        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                config,
                connector,
                store,
                policy: Box::new(policy),
                shared: Mutex::new(shared),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.inner.config
    }

    /// Opens a transport unless one is open, opening, or already scheduled.
    pub fn start(&self) {
        let mut shared = self.inner.lock();
        shared.running = true;
        if shared.transport.is_some() || shared.reconnect.is_some() {
            debug!(provider = %self.inner.name, state = %shared.state, "start ignored, session already active");
            return;
        }
        self.inner.open_transport(&mut shared);
    }

    /// Tears everything down. Safe in any state, including before `start`.
    pub fn stop(&self) {
        let mut shared = self.inner.lock();
        shared.running = false;
        if let Some(reconnect) = shared.reconnect.take() {
            reconnect.abort();
        }
        shared.disarm_heartbeat();
        if let Some(pump) = shared.pump.take() {
            pump.abort();
        }
        if let Some(transport) = shared.transport.take() {
            transport.close();
        }
        shared.generation += 1;
        shared.clear_flags();
        let provider = self.inner.name.clone();
        shared
            .pending
            .fail_all(|| SessionError::ConnectionLost { provider: provider.clone() });
        info!(provider = %self.inner.name, "session stopped");
    }

    /// True only in the BOUND state.
    pub fn is_ready(&self) -> bool {
        self.inner.lock().bound
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.lock().state
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let shared = self.inner.lock();
        SessionSnapshot {
            state: shared.state,
            connected: shared.connected,
            bound: shared.bound,
            binding: shared.binding,
            heartbeat_armed: shared.heartbeat.is_some(),
            reconnect_pending: shared.reconnect.is_some(),
            in_flight: shared.pending.len(),
            reconnect_attempts: shared.reconnect_attempts,
            keepalive: shared.keepalive.status(),
        }
    }

    /// Submits one message and waits for the provider's message id.
    ///
    /// Fails fast with `NotReady` unless bound, then waits for a throughput
    /// token. There is no timeout on the submit_sm_resp; wrap the call if one
    /// is needed.
    pub async fn send_sms(&self, sms: OutboundSms) -> Result<String, SessionError> {
        let OutboundSms { to, text, from } = sms;
        let length = text.len();
        if length > limits::SHORT_MESSAGE {
            return Err(SessionError::MessageTooLong {
                length,
                max: limits::SHORT_MESSAGE,
            });
        }
        let source = from.unwrap_or_else(|| self.inner.config.default_sender.clone());
        check_address("destination_addr", &to)?;
        check_address("source_addr", &source)?;
        if !self.is_ready() {
            return Err(self.inner.not_ready());
        }

        self.acquire_token().await;

        let response = {
            let mut shared = self.inner.lock();
            // The link may have dropped while we waited for a token.
            let transport = match (&shared.transport, shared.bound) {
                (Some(transport), true) => Arc::clone(transport),
                _ => return Err(self.inner.not_ready()),
            };

            let sequence_number = shared.pending.next_sequence_number();
            let pdu = SubmitSm::new(sequence_number, source, to, text.into_bytes())
                .with_delivery_receipt(self.inner.config.registered_delivery);

            let (tx, rx) = oneshot::channel();
            shared
                .pending
                .register(sequence_number, PendingRequest::Submit(tx));
            if let Err(e) = transport.submit_sm(pdu) {
                shared.pending.take(sequence_number);
                warn!(provider = %self.inner.name, sequence_number, "submit_sm not sent: {e}");
                return Err(e.into());
            }
            debug!(provider = %self.inner.name, sequence_number, "submit_sm sent");
            rx
        };

        response.await.unwrap_or_else(|_| {
            Err(SessionError::ConnectionLost {
                provider: self.inner.name.clone(),
            })
        })
    }

    async fn acquire_token(&self) {
        loop {
            let acquired = self.inner.lock().throttle.try_acquire(Instant::now());
            if acquired {
                return;
            }
            sleep(THROTTLE_POLL_INTERVAL).await;
        }
    }
}

/// Rejects addresses the address fields cannot carry: 20 octets at most, no NUL.
fn check_address(field: &'static str, value: &str) -> Result<(), SessionError> {
    if value.len() >= limits::ADDRESS || value.contains('\0') {
        return Err(SessionError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

impl<C: Connector, S: MessageStore> Inner<C, S> {
    fn lock(&self) -> MutexGuard<'_, Shared<C::Handle>> {
        self.shared.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The shared state, unless the transport of `generation` was replaced.
    ///
    /// Handlers check the generation under the same lock they mutate with,
    /// so a concurrent `stop` or reconnect cannot slip in between.
    fn lock_current(&self, generation: u64) -> Option<MutexGuard<'_, Shared<C::Handle>>> {
        let shared = self.lock();
        (shared.generation == generation).then_some(shared)
    }

    fn not_ready(&self) -> SessionError {
        SessionError::NotReady {
            provider: self.name.clone(),
        }
    }

    fn connection_lost(&self) -> SessionError {
        SessionError::ConnectionLost {
            provider: self.name.clone(),
        }
    }

    /// Replaces whatever transport exists with a fresh one.
    fn open_transport(self: &Arc<Self>, shared: &mut Shared<C::Handle>) {
        if let Some(old) = shared.transport.take() {
            old.close();
        }
        if let Some(pump) = shared.pump.take() {
            pump.abort();
        }
        shared.disarm_heartbeat();
        shared.pending.fail_all(|| self.connection_lost());
        shared.clear_flags();
        shared.generation += 1;
        shared.state = ConnectionState::Connecting;

        let endpoint = self.config.endpoint();
        info!(provider = %self.name, %endpoint, generation = shared.generation, "connecting");
        let (handle, events) = self.connector.connect(&endpoint);
        shared.transport = Some(Arc::new(handle));
        shared.pump = Some(tokio::spawn(pump_events(
            Arc::downgrade(self),
            shared.generation,
            events,
        )));
    }

    /// Arms the single reconnect timer unless one is pending or the session
    /// is stopped.
    fn schedule_reconnect(self: &Arc<Self>, shared: &mut Shared<C::Handle>) {
        if !shared.running || shared.reconnect.is_some() {
            return;
        }

        shared.reconnect_attempts = shared.reconnect_attempts.saturating_add(1);
        let delay = self.policy.delay(shared.reconnect_attempts);
        info!(
            provider = %self.name,
            attempt = shared.reconnect_attempts,
            "reconnecting in {delay:?}"
        );

        let session = Arc::downgrade(self);
        shared.reconnect = Some(tokio::spawn(async move {
            sleep(delay).await;
            let Some(inner) = session.upgrade() else {
                return;
            };
            let mut shared = inner.lock();
            shared.reconnect = None;
            if shared.running {
                inner.open_transport(&mut shared);
            }
        }));
    }

    fn arm_heartbeat(self: &Arc<Self>, shared: &mut Shared<C::Handle>) {
        shared.disarm_heartbeat();
        shared.keepalive.start();

        let period = self.config.enquire_link_interval();
        let session = Arc::downgrade(self);
        shared.heartbeat = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(inner) = session.upgrade() else {
                    break;
                };
                inner.send_enquire_link();
            }
        }));
    }

    /// One heartbeat tick. Failure is logged; only the transport's own
    /// close/error events end the connection.
    fn send_enquire_link(&self) {
        let mut shared = self.lock();
        let Some(transport) = shared.transport.clone() else {
            return;
        };
        let sequence_number = shared.pending.next_sequence_number();
        shared.keepalive.on_ping_sent(&self.name, Instant::now());
        if let Err(e) = transport.enquire_link(EnquireLink::new(sequence_number)) {
            shared.keepalive.on_ping_failed();
            warn!(provider = %self.name, sequence_number, "enquire_link not sent: {e}");
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.lock().generation == generation
    }

    async fn handle_event(self: &Arc<Self>, generation: u64, event: TransportEvent) {
        match event {
            TransportEvent::Connected => self.on_connected(generation),
            TransportEvent::Pdu(frame) => self.on_pdu(generation, frame).await,
            TransportEvent::Malformed { header, reason } => {
                warn!(
                    provider = %self.name,
                    command_id = header.command_id,
                    sequence_number = header.sequence_number,
                    "undecodable PDU: {reason}"
                );
                // Whoever waits on this sequence number must not hang.
                if header.is_response() {
                    self.on_response(
                        generation,
                        header.sequence_number,
                        header.command_status,
                        None,
                    );
                }
            }
            TransportEvent::Error(e) => {
                warn!(provider = %self.name, "transport error: {e}");
                self.on_disconnected(generation);
            }
            TransportEvent::Closed => self.on_disconnected(generation),
        }
    }

    fn on_connected(self: &Arc<Self>, generation: u64) {
        let Some(mut shared) = self.lock_current(generation) else {
            return;
        };
        shared.connected = true;
        shared.state = ConnectionState::TcpConnected;
        if shared.binding || shared.bound {
            return;
        }
        let Some(transport) = shared.transport.clone() else {
            return;
        };

        let sequence_number = shared.pending.next_sequence_number();
        let bind = BindTransceiver::new(
            sequence_number,
            self.config.system_id.as_str(),
            self.config.password.as_str(),
            self.config.system_type.as_str(),
            self.config.interface_version,
        );
        shared.pending.register(sequence_number, PendingRequest::Bind);
        shared.binding = true;
        shared.state = ConnectionState::Binding;
        debug!(provider = %self.name, sequence_number, "bind_transceiver sent");

        if let Err(e) = transport.bind_transceiver(bind) {
            shared.pending.take(sequence_number);
            error!(provider = %self.name, code = "BIND_FAILED", "bind_transceiver not sent: {e}");
            self.on_bind_rejected(&mut shared);
        }
    }

    fn on_bind_response(self: &Arc<Self>, generation: u64, command_status: u32) {
        let Some(mut shared) = self.lock_current(generation) else {
            return;
        };
        shared.binding = false;

        if command_status == 0 && shared.connected {
            shared.bound = true;
            shared.state = ConnectionState::Bound;
            shared.reconnect_attempts = 0;
            self.arm_heartbeat(&mut shared);
            info!(provider = %self.name, "bound");
        } else {
            error!(
                provider = %self.name,
                code = "BIND_FAILED",
                status = command_status,
                "bind rejected: {}",
                CommandStatus::describe(command_status)
            );
            self.on_bind_rejected(&mut shared);
        }
    }

    fn on_bind_rejected(self: &Arc<Self>, shared: &mut Shared<C::Handle>) {
        shared.binding = false;
        shared.bound = false;
        shared.disarm_heartbeat();
        if shared.connected {
            shared.state = ConnectionState::TcpConnected;
        }
        self.schedule_reconnect(shared);
    }

    fn on_disconnected(self: &Arc<Self>, generation: u64) {
        let Some(mut shared) = self.lock_current(generation) else {
            return;
        };
        let was_bound = shared.bound;
        shared.disarm_heartbeat();
        shared.clear_flags();
        if let Some(transport) = shared.transport.take() {
            transport.close();
        }
        // Called from the pump itself, so detach rather than abort.
        shared.pump.take();
        shared.pending.fail_all(|| self.connection_lost());

        if was_bound {
            warn!(provider = %self.name, "connection lost while bound");
        } else {
            debug!(provider = %self.name, "transport closed");
        }
        self.schedule_reconnect(&mut shared);
    }

    async fn on_pdu(self: &Arc<Self>, generation: u64, frame: Frame) {
        match frame {
            Frame::BindTransceiverResp(resp) => {
                self.on_response(generation, resp.sequence_number, resp.command_status, None)
            }
            Frame::SubmitSmResp(resp) => self.on_response(
                generation,
                resp.sequence_number,
                resp.command_status,
                Some(resp.message_id),
            ),
            Frame::GenericNack(nack) => {
                warn!(
                    provider = %self.name,
                    sequence_number = nack.sequence_number,
                    "generic_nack: {}",
                    CommandStatus::describe(nack.command_status)
                );
                self.on_response(generation, nack.sequence_number, nack.command_status, None)
            }
            Frame::DeliverSm(deliver) => self.on_deliver_sm(generation, *deliver).await,
            Frame::EnquireLink(ping) => {
                let transport = self.current_transport(generation);
                if let Some(transport) = transport {
                    let reply = EnquireLinkResponse::new(ping.sequence_number);
                    if let Err(e) = transport.enquire_link_resp(reply) {
                        debug!(provider = %self.name, "enquire_link_resp not sent: {e}");
                    }
                }
            }
            Frame::EnquireLinkResp(_) => {
                if let Some(mut shared) = self.lock_current(generation) {
                    shared.keepalive.on_pong();
                }
            }
            Frame::Unbind(unbind) => {
                info!(provider = %self.name, "SMSC requested unbind");
                let transport = {
                    let Some(mut shared) = self.lock_current(generation) else {
                        return;
                    };
                    shared.bound = false;
                    shared.state = ConnectionState::TcpConnected;
                    shared.disarm_heartbeat();
                    shared.transport.clone()
                };
                if let Some(transport) = transport {
                    if let Err(e) = transport.unbind_resp(UnbindResponse::new(unbind.sequence_number)) {
                        debug!(provider = %self.name, "unbind_resp not sent: {e}");
                    }
                    // The resulting Closed event schedules the reconnect.
                    transport.close();
                }
            }
            Frame::UnbindResp(_) => debug!(provider = %self.name, "unbind_resp"),
            other => warn!(
                provider = %self.name,
                command_id = other.command_id(),
                sequence_number = other.sequence_number(),
                "ignoring unexpected PDU"
            ),
        }
    }

    /// Resolves the request waiting on `sequence_number`.
    fn on_response(
        self: &Arc<Self>,
        generation: u64,
        sequence_number: u32,
        command_status: u32,
        message_id: Option<String>,
    ) {
        let pending = match self.lock_current(generation) {
            Some(mut shared) => shared.pending.take(sequence_number),
            None => return,
        };
        match pending {
            Some(PendingRequest::Bind) => self.on_bind_response(generation, command_status),
            Some(PendingRequest::Submit(tx)) => {
                let result = match (command_status, message_id) {
                    (0, Some(message_id)) => Ok(message_id),
                    (0, None) => Ok(String::new()),
                    (status, _) => {
                        warn!(
                            provider = %self.name,
                            sequence_number,
                            "submit rejected: {}",
                            CommandStatus::describe(status)
                        );
                        Err(SessionError::SubmitFailed {
                            provider: self.name.clone(),
                            status,
                        })
                    }
                };
                // The caller may have dropped the future.
                let _ = tx.send(result);
            }
            None => debug!(provider = %self.name, sequence_number, "response for unknown request"),
        }
    }

    /// The live transport, if `generation` is still the current one.
    fn current_transport(&self, generation: u64) -> Option<Arc<C::Handle>> {
        self.lock_current(generation)
            .and_then(|shared| shared.transport.clone())
    }

    async fn on_deliver_sm(&self, generation: u64, deliver: DeliverSm) {
        // Receipts from a replaced transport are redelivered on the new one.
        let Some(transport) = self.current_transport(generation) else {
            return;
        };
        if let Err(e) = transport.deliver_sm_resp(DeliverSmResponse::new(deliver.sequence_number)) {
            // The SMSC will redeliver; nothing else to do.
            debug!(provider = %self.name, "deliver_sm_resp not sent: {e}");
        }

        let text = String::from_utf8_lossy(deliver.payload()).into_owned();
        let receipt = parse_receipt(&text);
        let Some(provider_message_id) = receipt.provider_message_id.as_deref() else {
            info!(provider = %self.name, payload = %text, "deliver_sm without a receipt id");
            return;
        };

        let status = receipt
            .status
            .map(MessageStatus::from)
            .unwrap_or(MessageStatus::Unknown);
        let mut update = StatusUpdate::new(status);
        if let Some(raw_status) = &receipt.raw_status {
            update = update.with_provider_status(raw_status.as_str());
        }
        if receipt.is_delivered() {
            update = update.with_delivered_at(Utc::now());
        } else if let Some(error_code) = &receipt.error_code {
            update = update.with_error(format!("err:{error_code}"));
        }

        match self
            .store
            .update_by_provider_message_id(provider_message_id, update)
            .await
        {
            Ok(true) => info!(
                provider = %self.name,
                provider_message_id,
                status = ?status,
                "delivery receipt applied"
            ),
            Ok(false) => debug!(
                provider = %self.name,
                provider_message_id,
                "delivery receipt for unknown message"
            ),
            Err(e) => warn!(provider = %self.name, provider_message_id, "store update failed: {e}"),
        }
    }
}

/// Feeds one transport's events into the session until the transport ends or
/// is replaced.
async fn pump_events<C: Connector, S: MessageStore>(
    session: Weak<Inner<C, S>>,
    generation: u64,
    mut events: mpsc::UnboundedReceiver<TransportEvent>,
) {
    while let Some(event) = events.recv().await {
        let Some(inner) = session.upgrade() else {
            break;
        };
        if !inner.is_current(generation) {
            debug!(provider = %inner.name, generation, "dropping event from replaced transport");
            break;
        }
        inner.handle_event(generation, event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use crate::transport::{Endpoint, TransportError};

    /// Connector whose connections never report anything.
    #[derive(Clone, Default)]
    struct SilentConnector {
        connects: Arc<Mutex<u32>>,
    }

    struct SilentHandle;

    impl TransportHandle for SilentHandle {
        fn bind_transceiver(&self, _: BindTransceiver) -> Result<(), TransportError> {
            Ok(())
        }
        fn submit_sm(&self, _: SubmitSm) -> Result<(), TransportError> {
            panic!("submit_sm must not be called on an unbound session");
        }
        fn deliver_sm_resp(&self, _: DeliverSmResponse) -> Result<(), TransportError> {
            Ok(())
        }
        fn enquire_link(&self, _: EnquireLink) -> Result<(), TransportError> {
            Ok(())
        }
        fn enquire_link_resp(&self, _: EnquireLinkResponse) -> Result<(), TransportError> {
            Ok(())
        }
        fn unbind_resp(&self, _: UnbindResponse) -> Result<(), TransportError> {
            Err(TransportError::Closed)
        }
        fn close(&self) {}
    }

    impl Connector for SilentConnector {
        type Handle = SilentHandle;

        fn connect(&self, _: &Endpoint) -> (SilentHandle, mpsc::UnboundedReceiver<TransportEvent>) {
            *self.connects.lock().unwrap() += 1;
            let (tx, rx) = mpsc::unbounded_channel();
            // Keep the stream open forever.
            std::mem::forget(tx);
            (SilentHandle, rx)
        }
    }

    fn session(connector: SilentConnector) -> Session<SilentConnector, InMemoryStore> {
        Session::new(
            "primary",
            ProviderConfig::new("127.0.0.1", "acme", "pw"),
            connector,
            Arc::new(InMemoryStore::new()),
        )
    }

    #[tokio::test]
    async fn stop_before_start_is_harmless() {
        let session = session(SilentConnector::default());
        session.stop();
        assert_eq!(session.state(), ConnectionState::Disconnected);
        assert!(!session.is_ready());
    }

    #[tokio::test]
    async fn start_is_idempotent() {
        let connector = SilentConnector::default();
        let session = session(connector.clone());

        session.start();
        session.start();

        assert_eq!(*connector.connects.lock().unwrap(), 1);
        assert_eq!(session.state(), ConnectionState::Connecting);
        session.stop();
    }

    #[tokio::test]
    async fn oversized_body_is_rejected_before_readiness() {
        let session = session(SilentConnector::default());
        let err = session
            .send_sms(OutboundSms::new("+15550001", "x".repeat(255)))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "MESSAGE_TOO_LONG");
    }

    #[tokio::test]
    async fn event_checked_before_a_restart_changes_nothing() {
        let connector = SilentConnector::default();
        let session = session(connector.clone());
        session.start();
        let stale = session.inner.lock().generation;

        // Stop lands between the pump's generation check and the handler.
        session.stop();
        session.inner.handle_event(stale, TransportEvent::Connected).await;
        let snapshot = session.snapshot();
        assert_eq!(snapshot.state, ConnectionState::Disconnected);
        assert!(!snapshot.connected && !snapshot.binding);

        // Same for a reconnect: the new transport must not be bound for the old one.
        session.start();
        session.inner.handle_event(stale, TransportEvent::Connected).await;
        assert_eq!(session.state(), ConnectionState::Connecting);
        assert_eq!(session.snapshot().in_flight, 0);

        session.inner.handle_event(stale, TransportEvent::Closed).await;
        assert!(!session.snapshot().reconnect_pending);
        assert_eq!(*connector.connects.lock().unwrap(), 2);
        session.stop();
    }

    #[tokio::test]
    async fn unbind_is_honoured_when_the_reply_cannot_be_sent() {
        let session = session(SilentConnector::default());
        session.start();
        let generation = session.inner.lock().generation;

        session.inner.handle_event(generation, TransportEvent::Connected).await;
        let bind = crate::datatypes::BindTransceiverResponse::new(1, 0, "SMSC");
        session
            .inner
            .handle_event(generation, TransportEvent::Pdu(Frame::BindTransceiverResp(bind)))
            .await;
        assert!(session.is_ready());

        let unbind = crate::datatypes::Unbind::new(8);
        session
            .inner
            .handle_event(generation, TransportEvent::Pdu(Frame::Unbind(unbind)))
            .await;
        let snapshot = session.snapshot();
        assert!(!snapshot.bound && !snapshot.heartbeat_armed);
        assert_eq!(snapshot.state, ConnectionState::TcpConnected);
        session.stop();
    }

    #[tokio::test]
    async fn unbound_send_is_not_ready() {
        let session = session(SilentConnector::default());
        session.start();

        let err = session
            .send_sms(OutboundSms::new("+15550001", "hello"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            SessionError::NotReady {
                provider: "primary".into()
            }
        );
        session.stop();
    }
}
