pub mod http;
pub mod issues;
pub mod retry;
pub mod wiki;

pub use http::{HttpClient, HttpClientConfig, HttpResponse};
pub use retry::{with_retry, RetryPolicy};

use crate::protocol::ToolDescriptor;
use crate::server::handler::{HandlerProvider, ToolHandler};
use std::sync::Arc;

/// Provider binding the two builtin tools to their HTTP clients.
///
/// Registrations for any other tool name are rejected.
pub struct DownstreamProvider {
    issues: Arc<HttpClient>,
    wiki: Arc<HttpClient>,
}

impl DownstreamProvider {
    pub fn new(issues: Arc<HttpClient>, wiki: Arc<HttpClient>) -> Self {
        Self { issues, wiki }
    }
}

impl HandlerProvider for DownstreamProvider {
    fn handler_for(&self, descriptor: &ToolDescriptor) -> Option<Arc<dyn ToolHandler>> {
        match descriptor.name.as_str() {
            issues::TOOL_NAME => Some(Arc::new(issues::IssueTool::new(self.issues.clone()))),
            wiki::TOOL_NAME => Some(Arc::new(wiki::WikiTool::new(self.wiki.clone()))),
            _ => None,
        }
    }
}
