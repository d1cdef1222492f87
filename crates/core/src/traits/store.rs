//! Call state storage trait

use async_trait::async_trait;
use std::time::Duration;

use crate::{CallState, Result};

/// Keyed storage for per-call conversation state
///
/// Implementations:
/// - `InMemoryCallStore` - process-local map with TTL eviction
///
/// A multi-instance deployment needs an implementation backed by a shared
/// store with per-call mutual exclusion.
#[async_trait]
pub trait CallStore: Send + Sync + 'static {
    /// Look up a call. `None` when unknown or already evicted.
    async fn get(&self, call_id: &str) -> Result<Option<CallState>>;

    /// Insert or replace the state for `state.call_id`
    async fn put(&self, state: CallState) -> Result<()>;

    /// Drop a call, returning its last state
    async fn remove(&self, call_id: &str) -> Result<Option<CallState>>;

    /// Number of stored calls
    fn len(&self) -> usize;

    /// Whether the store is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evict entries untouched for longer than `ttl`, returning how many
    async fn evict_expired(&self, ttl: Duration) -> usize;
}
