//! Persistent SMPP client core.
//!
//! Keeps one bound SMPP v3.4 transceiver session per upstream provider,
//! limits submit throughput, correlates submit_sm_resp with the caller that is
//! waiting on it, and feeds delivery receipts into a message store. Sessions
//! recover from socket errors, silent closes and bind rejections on their own;
//! callers only ever observe a session as ready or not ready.
//!
//! # Sending through the router
//!
//! ```rust,no_run
//! use smpp_session::{
//!     GatewayConfig, InMemoryStore, OutboundSms, ProviderRouter, RoutedSms, TcpConnector,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GatewayConfig::load("gateway.toml")?;
//!     let store = Arc::new(InMemoryStore::new());
//!     let router = ProviderRouter::from_config(&config, TcpConnector::new(), store)?;
//!     router.start();
//!
//!     let sms = OutboundSms::new("+15550001", "Hello, World!");
//!     match router.send_sms(RoutedSms::new(sms).via("primary")).await {
//!         Ok(message_id) => println!("accepted as {message_id}"),
//!         Err(e) if e.code() == "NOT_READY" => println!("not bound yet, retry later"),
//!         Err(e) => println!("failed: {}", e.code()),
//!     }
//!
//!     router.stop();
//!     Ok(())
//! }
//! ```

#[macro_use]
mod macros;

pub mod codec;
pub mod config;
pub mod connection;
pub mod datatypes;
pub mod receipt;
pub mod router;
pub mod session;
pub mod store;
pub mod transport;


pub use codec::{CodecError, Decodable, Encodable, Frame, PduHeader};
pub use config::{ConfigError, GatewayConfig, ProviderConfig};
pub use receipt::{DeliveryReceipt, DeliveryStatus, parse_receipt};
pub use router::{ProviderRouter, Readiness, RoutedSms, RouterError};
pub use session::{ConnectionState, OutboundSms, Session, SessionError, SessionSnapshot};
pub use store::{InMemoryStore, MessageRecord, MessageStatus, MessageStore, StatusUpdate};
pub use transport::{Connector, Endpoint, TcpConnector, TransportError, TransportEvent, TransportHandle};
