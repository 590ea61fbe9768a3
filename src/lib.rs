//! Tool bridge: register callable tools with a server over a persistent
//! link, invoke their methods, and receive correlated responses.

pub mod client;
pub mod config;
pub mod downstream;
pub mod protocol;
pub mod server;
pub mod transport;
pub mod utils;

pub use config::Config;
pub use utils::errors::{BridgeError, BridgeResult};
