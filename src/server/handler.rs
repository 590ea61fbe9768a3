//! Handler seam between the dispatcher and tool implementations.

use crate::protocol::ToolDescriptor;
use crate::utils::errors::BridgeResult;
use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

/// A tool implementation invocable by the dispatcher.
///
/// The dispatcher only calls methods that appear in the tool's registered
/// descriptor; `method` is the method name without the tool prefix.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn invoke(&self, method: &str, params: Value) -> BridgeResult<Value>;
}

/// Binds wire registrations to implementations.
///
/// When a client registers a tool descriptor over the connection, the
/// server asks its provider for the matching implementation. `None` rejects
/// the registration.
pub trait HandlerProvider: Send + Sync {
    fn handler_for(&self, descriptor: &ToolDescriptor) -> Option<Arc<dyn ToolHandler>>;
}

/// Provider that rejects every wire registration. Useful for servers whose
/// tools are all registered programmatically.
pub struct NoProvider;

impl HandlerProvider for NoProvider {
    fn handler_for(&self, _descriptor: &ToolDescriptor) -> Option<Arc<dyn ToolHandler>> {
        None
    }
}

struct FnHandler<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> ToolHandler for FnHandler<F>
where
    F: Fn(String, Value) -> Fut + Send + Sync,
    Fut: Future<Output = BridgeResult<Value>> + Send,
{
    async fn invoke(&self, method: &str, params: Value) -> BridgeResult<Value> {
        (self.f)(method.to_string(), params).await
    }
}

/// Wrap a closure as a [`ToolHandler`]
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn ToolHandler>
where
    F: Fn(String, Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = BridgeResult<Value>> + Send + 'static,
{
    Arc::new(FnHandler { f })
}
