//! Builtin issue-tracker tool.
//!
//! Maps `issues.*` methods onto the downstream tracker's REST surface. The
//! field shapes inside `params` are opaque to the bridge; only the routing
//! fields (`key`, `query`) are inspected here.

use crate::downstream::http::HttpClient;
use crate::protocol::{MethodDescriptor, ParameterDescriptor, ReturnDescriptor, ToolDescriptor};
use crate::server::handler::ToolHandler;
use crate::utils::errors::{BridgeError, BridgeResult};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

pub const TOOL_NAME: &str = "issues";

pub struct IssueTool {
    http: Arc<HttpClient>,
}

impl IssueTool {
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ToolHandler for IssueTool {
    async fn invoke(&self, method: &str, params: Value) -> BridgeResult<Value> {
        match method {
            "createIssue" => {
                let response = self.http.post("/issues", params).await?;
                Ok(response.data)
            }
            "getIssue" => {
                let key = require_str(&params, "key")?;
                let response = self.http.get(&format!("/issues/{}", key)).await?;
                Ok(response.data)
            }
            "updateIssue" => {
                let key = require_str(&params, "key")?;
                let fields = params.get("fields").cloned().unwrap_or(Value::Null);
                let response = self.http.put(&format!("/issues/{}", key), fields).await?;
                Ok(response.data)
            }
            "deleteIssue" => {
                let key = require_str(&params, "key")?;
                self.http.delete(&format!("/issues/{}", key)).await?;
                Ok(json!({ "deleted": key }))
            }
            "searchIssues" => {
                let query = require_str(&params, "query")?;
                let response = self
                    .http
                    .get(&format!("/issues/search?query={}", urlencode(query)))
                    .await?;
                Ok(response.data)
            }
            other => Err(BridgeError::ExecutionError(format!(
                "issue tool has no method '{}'",
                other
            ))),
        }
    }
}

/// Descriptor advertised for the builtin issue tool
pub fn descriptor() -> ToolDescriptor {
    ToolDescriptor::new(TOOL_NAME, env!("CARGO_PKG_VERSION"))
        .with_description("Issue tracker operations")
        .with_method(
            MethodDescriptor::new("createIssue", "Create a new issue")
                .with_parameter(ParameterDescriptor::new("fields", "object", true))
                .with_returns(ReturnDescriptor::new("issue", "object")),
        )
        .with_method(
            MethodDescriptor::new("getIssue", "Fetch an issue by key")
                .with_parameter(ParameterDescriptor::new("key", "string", true))
                .with_returns(ReturnDescriptor::new("issue", "object")),
        )
        .with_method(
            MethodDescriptor::new("updateIssue", "Update fields of an issue")
                .with_parameter(ParameterDescriptor::new("key", "string", true))
                .with_parameter(ParameterDescriptor::new("fields", "object", true))
                .with_returns(ReturnDescriptor::new("issue", "object")),
        )
        .with_method(
            MethodDescriptor::new("deleteIssue", "Delete an issue")
                .with_parameter(ParameterDescriptor::new("key", "string", true))
                .with_returns(ReturnDescriptor::new("result", "object")),
        )
        .with_method(
            MethodDescriptor::new("searchIssues", "Search issues by query")
                .with_parameter(ParameterDescriptor::new("query", "string", true))
                .with_returns(ReturnDescriptor::new("results", "array")),
        )
}

pub(crate) fn require_str<'a>(params: &'a Value, field: &str) -> BridgeResult<&'a str> {
    params
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| {
            BridgeError::ValidationError(format!("missing required string param '{}'", field))
        })
}

pub(crate) fn urlencode(raw: &str) -> String {
    url::form_urlencoded::byte_serialize(raw.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::RoutingKey;

    #[test]
    fn test_descriptor_routes_every_method() {
        let descriptor = descriptor();
        let keys: Vec<_> = descriptor.routing_keys().collect();
        assert_eq!(keys.len(), 5);
        assert!(keys.contains(&RoutingKey::new(TOOL_NAME, "searchIssues")));
    }

    #[test]
    fn test_require_str_rejects_missing_and_non_string() {
        assert!(require_str(&json!({}), "key").is_err());
        assert!(require_str(&json!({"key": 7}), "key").is_err());
        assert_eq!(require_str(&json!({"key": "X-1"}), "key").unwrap(), "X-1");
    }

    #[test]
    fn test_urlencode_escapes_spaces() {
        assert_eq!(urlencode("open bugs"), "open+bugs");
    }
}
