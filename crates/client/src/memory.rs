//! In-memory transport for tests and local development.
//!
//! Collections are stored as JSON arrays keyed by name. Each request path
//! (`products`, `suppliers/3`, ...) can be given a latency and/or a forced
//! failure, and every request is counted.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use catalog_core::TransportError;
use serde::Serialize;
use serde_json::Value;

use crate::transport::Transport;

#[derive(Debug, Default)]
struct State {
    collections: HashMap<String, Value>,
    latency: HashMap<String, Duration>,
    failures: HashMap<String, TransportError>,
    calls: HashMap<String, usize>,
}

/// Seeded fake of the remote API.
#[derive(Debug, Default)]
pub struct InMemoryTransport {
    state: Mutex<State>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed (or replace) a collection.
    pub fn with_collection<T: Serialize>(self, name: &str, items: &[T]) -> Self {
        self.set_collection(name, items);
        self
    }

    pub fn set_collection<T: Serialize>(&self, name: &str, items: &[T]) {
        let payload = serde_json::to_value(items).unwrap_or(Value::Array(Vec::new()));
        self.with_state(|s| {
            s.collections.insert(name.to_string(), payload);
        });
    }

    /// Delay every request to `path` by `delay` (tokio time, so pausable in tests).
    pub fn set_latency(&self, path: &str, delay: Duration) {
        self.with_state(|s| {
            s.latency.insert(path.to_string(), delay);
        });
    }

    /// Make every request to `path` fail with `error` until cleared.
    pub fn fail(&self, path: &str, error: TransportError) {
        self.with_state(|s| {
            s.failures.insert(path.to_string(), error);
        });
    }

    pub fn clear_failure(&self, path: &str) {
        self.with_state(|s| {
            s.failures.remove(path);
        });
    }

    /// Number of requests issued to `path` so far.
    pub fn calls(&self, path: &str) -> usize {
        self.state
            .lock()
            .map(|s| s.calls.get(path).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    fn with_state(&self, f: impl FnOnce(&mut State)) {
        match self.state.lock() {
            Ok(mut state) => f(&mut state),
            Err(_) => tracing::warn!("in-memory transport state poisoned; change dropped"),
        }
    }

    /// Record the call and return (latency, outcome). Lock released before any await.
    fn begin(
        &self,
        path: &str,
        resolve: impl FnOnce(&State) -> Result<Value, TransportError>,
    ) -> (Option<Duration>, Result<Value, TransportError>) {
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(_) => {
                return (None, Err(TransportError::network("transport state poisoned")));
            }
        };
        *state.calls.entry(path.to_string()).or_default() += 1;

        let delay = state.latency.get(path).copied();
        let outcome = match state.failures.get(path) {
            Some(err) => Err(err.clone()),
            None => resolve(&state),
        };
        (delay, outcome)
    }

    async fn respond(
        &self,
        path: &str,
        resolve: impl FnOnce(&State) -> Result<Value, TransportError>,
    ) -> Result<Value, TransportError> {
        let (delay, outcome) = self.begin(path, resolve);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        tracing::trace!(path, ok = outcome.is_ok(), "in-memory response");
        outcome
    }
}

fn not_found(path: &str) -> TransportError {
    TransportError::status(404, format!("`{path}` not found"))
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn fetch_collection(&self, name: &str) -> Result<Value, TransportError> {
        self.respond(name, |s| {
            s.collections.get(name).cloned().ok_or_else(|| not_found(name))
        })
        .await
    }

    async fn fetch_entity(&self, name: &str, id: u32) -> Result<Value, TransportError> {
        let path = format!("{name}/{id}");
        self.respond(&path, |s| {
            s.collections
                .get(name)
                .and_then(Value::as_array)
                .and_then(|items| {
                    items
                        .iter()
                        .find(|item| item.get("id").and_then(Value::as_u64) == Some(u64::from(id)))
                })
                .cloned()
                .ok_or_else(|| not_found(&path))
        })
        .await
    }
}
