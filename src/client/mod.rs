pub mod client;
pub mod connection;
pub mod correlator;

pub use client::{BridgeClient, ClientOptions};
pub use connection::{ConnectionConfig, ConnectionManager, ConnectionState, ReconnectBackoff};
pub use correlator::RequestCorrelator;
