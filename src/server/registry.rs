//! Server-side tool registry.
//!
//! One registry instance owns the descriptor table and the routing table.
//! Mutation is serialized behind a single write lock so a tool and its
//! routing entries always appear and disappear atomically; lookups take the
//! read lock and may run concurrently.

use crate::protocol::{RoutingKey, ToolDescriptor};
use crate::server::handler::ToolHandler;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Default)]
struct Tables {
    tools: HashMap<String, ToolDescriptor>,
    routes: HashMap<RoutingKey, Arc<dyn ToolHandler>>,
}

#[derive(Default)]
pub struct ToolRegistry {
    tables: RwLock<Tables>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a tool and one routing entry per method.
    ///
    /// Overwriting first removes the previous version's routing entries so
    /// methods dropped between versions do not linger.
    pub fn register(&self, descriptor: ToolDescriptor, handler: Arc<dyn ToolHandler>) {
        let mut tables = self.tables.write();

        if tables.tools.contains_key(&descriptor.name) {
            let name = descriptor.name.clone();
            tables.routes.retain(|key, _| key.tool() != name);
            debug!(tool = %name, "replacing existing registration");
        }

        for key in descriptor.routing_keys() {
            tables.routes.insert(key, handler.clone());
        }
        info!(tool = %descriptor.name, methods = descriptor.methods.len(), "tool registered");
        tables.tools.insert(descriptor.name.clone(), descriptor);
    }

    /// Remove a tool and exactly its routing entries.
    ///
    /// Returns false if no such tool was registered. Comparison is on the
    /// routing key's tool component, never on a string prefix.
    pub fn unregister(&self, tool_name: &str) -> bool {
        let mut tables = self.tables.write();
        if tables.tools.remove(tool_name).is_none() {
            return false;
        }
        tables.routes.retain(|key, _| key.tool() != tool_name);
        info!(tool = %tool_name, "tool unregistered");
        true
    }

    /// O(1) handler lookup by exact routing key
    pub fn lookup(&self, key: &RoutingKey) -> Option<Arc<dyn ToolHandler>> {
        self.tables.read().routes.get(key).cloned()
    }

    pub fn descriptor(&self, tool_name: &str) -> Option<ToolDescriptor> {
        self.tables.read().tools.get(tool_name).cloned()
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tables.read().tools.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tables.read().tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
