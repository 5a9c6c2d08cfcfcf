//! `catalog-client`
//!
//! **Responsibility:** the single-shot fetch boundary between the catalog
//! engine and the remote API.
//!
//! This crate provides:
//! - The [`Transport`] trait (`GET /{collection}` and `GET /{collection}/{id}`)
//! - [`HttpTransport`], backed by `reqwest`
//! - [`InMemoryTransport`], a seeded fake with latency and failure injection
//!
//! No pagination, no writes: insertions never leave the client.

pub mod http;
pub mod memory;
pub mod transport;

pub use http::{HttpConfig, HttpTransport};
pub use memory::InMemoryTransport;
pub use transport::{Transport, fetch_all, fetch_one, resources};
