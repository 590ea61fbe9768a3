//! Tool and method descriptors plus the routing key derived from them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A named, versioned capability exposing one or more invocable methods
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub methods: Vec<MethodDescriptor>,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: String::new(),
            methods: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_method(mut self, method: MethodDescriptor) -> Self {
        self.methods.push(method);
        self
    }

    /// Routing keys for every method of this tool
    pub fn routing_keys(&self) -> impl Iterator<Item = RoutingKey> + '_ {
        self.methods
            .iter()
            .map(|m| RoutingKey::new(&self.name, &m.name))
    }
}

/// A single named operation on a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: Vec<ParameterDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub returns: Option<ReturnDescriptor>,
}

impl MethodDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
            returns: None,
        }
    }

    pub fn with_parameter(mut self, parameter: ParameterDescriptor) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_returns(mut self, returns: ReturnDescriptor) -> Self {
        self.returns = Some(returns);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
}

impl ParameterDescriptor {
    pub fn new(name: impl Into<String>, param_type: impl Into<String>, required: bool) -> Self {
        Self {
            name: name.into(),
            param_type: param_type.into(),
            description: String::new(),
            required,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub return_type: String,
    #[serde(default)]
    pub description: String,
}

impl ReturnDescriptor {
    pub fn new(name: impl Into<String>, return_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            return_type: return_type.into(),
            description: String::new(),
        }
    }
}

/// Value-typed lookup key for handler dispatch.
///
/// Holding the tool and method components separately means unregistration
/// compares tool names exactly instead of matching a `"tool."` string
/// prefix, so removing `jira` can never touch `jira2`'s entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoutingKey {
    tool: String,
    method: String,
}

impl RoutingKey {
    pub fn new(tool: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            method: method.into(),
        }
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }

    pub fn method(&self) -> &str {
        &self.method
    }
}

impl fmt::Display for RoutingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.tool, self.method)
    }
}
