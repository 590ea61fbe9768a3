pub mod memory;
pub mod traits;
pub mod websocket;

pub use traits::{Connector, MessageSink, MessageStream};
pub use websocket::WebSocketConnector;
