//! Fetch abstraction.

use async_trait::async_trait;
use catalog_core::TransportError;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Collection names exposed by the remote API.
pub mod resources {
    pub const PRODUCTS: &str = "products";
    pub const CATEGORIES: &str = "productCategories";
    pub const SUPPLIERS: &str = "suppliers";
}

/// One request, one response (or one failure). Implementations must not retry:
/// the engine decides what a failure means for each branch.
#[async_trait]
pub trait Transport: Send + Sync {
    /// `GET /{name}`: the full collection payload.
    async fn fetch_collection(&self, name: &str) -> Result<Value, TransportError>;

    /// `GET /{name}/{id}`: a single entity.
    async fn fetch_entity(&self, name: &str, id: u32) -> Result<Value, TransportError>;
}

/// Fetch and decode a whole collection.
pub async fn fetch_all<T>(transport: &dyn Transport, name: &str) -> Result<Vec<T>, TransportError>
where
    T: DeserializeOwned,
{
    let payload = transport.fetch_collection(name).await?;
    serde_json::from_value(payload)
        .map_err(|e| TransportError::decode(format!("{name}: {e}")))
}

/// Fetch and decode one entity.
pub async fn fetch_one<T>(transport: &dyn Transport, name: &str, id: u32) -> Result<T, TransportError>
where
    T: DeserializeOwned,
{
    let payload = transport.fetch_entity(name, id).await?;
    serde_json::from_value(payload)
        .map_err(|e| TransportError::decode(format!("{name}/{id}: {e}")))
}
