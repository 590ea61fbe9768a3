pub mod dispatcher;
pub mod handler;
pub mod registry;
pub mod server;

pub use dispatcher::CommandDispatcher;
pub use handler::{handler_fn, HandlerProvider, NoProvider, ToolHandler};
pub use registry::ToolRegistry;
pub use server::{BindConfig, BridgeServer};
