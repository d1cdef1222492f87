//! In-memory call state store
//!
//! Process-local map from call id to conversation state. Entries expire a
//! fixed time after their last write, and the map is capped so a stream of
//! calls that never connect cannot grow it without bound.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::watch;
use voicebot_core::{CallState, CallStore, Error, Result};

struct StoredCall {
    state: CallState,
    touched: Instant,
}

impl StoredCall {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.touched.elapsed() > ttl
    }
}

/// Mutex-guarded call map with TTL eviction and a capacity bound
pub struct InMemoryCallStore {
    calls: RwLock<HashMap<String, StoredCall>>,
    max_calls: usize,
    ttl: Duration,
}

impl InMemoryCallStore {
    /// Create a store holding at most `max_calls` entries for `ttl` each
    pub fn new(max_calls: usize, ttl: Duration) -> Self {
        Self {
            calls: RwLock::new(HashMap::new()),
            max_calls,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Start a background task that periodically evicts expired calls.
    ///
    /// Returns a shutdown sender; send `true` to stop the task.
    pub fn start_cleanup_task(self: &Arc<Self>, interval: Duration) -> watch::Sender<bool> {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let store = Arc::clone(self);

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(interval);
            interval_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        let evicted = store.evict_expired_now(store.ttl);
                        if evicted > 0 {
                            tracing::info!(
                                evicted,
                                remaining = store.len(),
                                "Call store cleanup"
                            );
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            tracing::info!("Call store cleanup task shutting down");
                            break;
                        }
                    }
                }
            }
        });

        shutdown_tx
    }

    fn evict_expired_now(&self, ttl: Duration) -> usize {
        let mut calls = self.calls.write();
        evict_expired_internal(&mut calls, ttl)
    }
}

fn evict_expired_internal(calls: &mut HashMap<String, StoredCall>, ttl: Duration) -> usize {
    let before = calls.len();
    calls.retain(|call_id, call| {
        let keep = !call.is_expired(ttl);
        if !keep {
            tracing::debug!(call_id = %call_id, stage = %call.state.stage, "Expired call");
        }
        keep
    });
    before - calls.len()
}

#[async_trait]
impl CallStore for InMemoryCallStore {
    async fn get(&self, call_id: &str) -> Result<Option<CallState>> {
        let calls = self.calls.read();
        Ok(calls
            .get(call_id)
            .filter(|call| !call.is_expired(self.ttl))
            .map(|call| call.state.clone()))
    }

    async fn put(&self, state: CallState) -> Result<()> {
        let mut calls = self.calls.write();

        if !calls.contains_key(&state.call_id) && calls.len() >= self.max_calls {
            evict_expired_internal(&mut calls, self.ttl);
            if calls.len() >= self.max_calls {
                return Err(Error::CapacityExceeded(self.max_calls));
            }
        }

        calls.insert(
            state.call_id.clone(),
            StoredCall {
                state,
                touched: Instant::now(),
            },
        );
        Ok(())
    }

    async fn remove(&self, call_id: &str) -> Result<Option<CallState>> {
        Ok(self.calls.write().remove(call_id).map(|call| call.state))
    }

    fn len(&self) -> usize {
        self.calls.read().len()
    }

    async fn evict_expired(&self, ttl: Duration) -> usize {
        self.evict_expired_now(ttl)
    }
}
