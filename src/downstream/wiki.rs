//! Builtin wiki tool mapping `wiki.*` methods onto the downstream wiki's
//! REST surface.

use crate::downstream::http::HttpClient;
use crate::downstream::issues::{require_str, urlencode};
use crate::protocol::{MethodDescriptor, ParameterDescriptor, ReturnDescriptor, ToolDescriptor};
use crate::server::handler::ToolHandler;
use crate::utils::errors::{BridgeError, BridgeResult};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

pub const TOOL_NAME: &str = "wiki";

pub struct WikiTool {
    http: Arc<HttpClient>,
}

impl WikiTool {
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ToolHandler for WikiTool {
    async fn invoke(&self, method: &str, params: Value) -> BridgeResult<Value> {
        match method {
            "createPage" => {
                let response = self.http.post("/pages", params).await?;
                Ok(response.data)
            }
            "getPage" => {
                let id = require_str(&params, "id")?;
                let response = self.http.get(&format!("/pages/{}", id)).await?;
                Ok(response.data)
            }
            "updatePage" => {
                let id = require_str(&params, "id")?;
                let content = params.get("content").cloned().unwrap_or(Value::Null);
                let response = self.http.put(&format!("/pages/{}", id), content).await?;
                Ok(response.data)
            }
            "deletePage" => {
                let id = require_str(&params, "id")?;
                self.http.delete(&format!("/pages/{}", id)).await?;
                Ok(json!({ "deleted": id }))
            }
            "searchPages" => {
                let query = require_str(&params, "query")?;
                let response = self
                    .http
                    .get(&format!("/pages/search?query={}", urlencode(query)))
                    .await?;
                Ok(response.data)
            }
            other => Err(BridgeError::ExecutionError(format!(
                "wiki tool has no method '{}'",
                other
            ))),
        }
    }
}

/// Descriptor advertised for the builtin wiki tool
pub fn descriptor() -> ToolDescriptor {
    ToolDescriptor::new(TOOL_NAME, env!("CARGO_PKG_VERSION"))
        .with_description("Wiki page operations")
        .with_method(
            MethodDescriptor::new("createPage", "Create a new page")
                .with_parameter(ParameterDescriptor::new("title", "string", true))
                .with_parameter(ParameterDescriptor::new("content", "object", true))
                .with_returns(ReturnDescriptor::new("page", "object")),
        )
        .with_method(
            MethodDescriptor::new("getPage", "Fetch a page by id")
                .with_parameter(ParameterDescriptor::new("id", "string", true))
                .with_returns(ReturnDescriptor::new("page", "object")),
        )
        .with_method(
            MethodDescriptor::new("updatePage", "Replace a page's content")
                .with_parameter(ParameterDescriptor::new("id", "string", true))
                .with_parameter(ParameterDescriptor::new("content", "object", true))
                .with_returns(ReturnDescriptor::new("page", "object")),
        )
        .with_method(
            MethodDescriptor::new("deletePage", "Delete a page")
                .with_parameter(ParameterDescriptor::new("id", "string", true))
                .with_returns(ReturnDescriptor::new("result", "object")),
        )
        .with_method(
            MethodDescriptor::new("searchPages", "Search pages by query")
                .with_parameter(ParameterDescriptor::new("query", "string", true))
                .with_returns(ReturnDescriptor::new("results", "array")),
        )
}
