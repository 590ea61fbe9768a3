//! Unique message ID generation
//!
//! Ids must be unique within the lifetime of one logical connection.
//! Production uses UUIDs; tests use sequential ids for determinism.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

enum IdMode {
    Sequential { prefix: String },
    Uuid,
}

struct Inner {
    counter: AtomicU64,
    mode: IdMode,
}

/// Thread-safe message ID generator, cheap to clone
#[derive(Clone)]
pub struct MessageIdGenerator {
    inner: Arc<Inner>,
}

impl MessageIdGenerator {
    /// UUID v4 ids (production default)
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                counter: AtomicU64::new(1),
                mode: IdMode::Uuid,
            }),
        }
    }

    /// Sequential `prefix-N` ids for deterministic tests
    pub fn sequential(prefix: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                counter: AtomicU64::new(1),
                mode: IdMode::Sequential {
                    prefix: prefix.into(),
                },
            }),
        }
    }

    pub fn next_id(&self) -> String {
        match &self.inner.mode {
            IdMode::Uuid => Uuid::new_v4().to_string(),
            IdMode::Sequential { prefix } => {
                let n = self.inner.counter.fetch_add(1, Ordering::SeqCst);
                format!("{}-{}", prefix, n)
            }
        }
    }
}

impl Default for MessageIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
