//! `catalog-core`: data model for the catalog composition engine.
//!
//! This crate contains **pure data** primitives (no IO, no async, no channels):
//! identifiers, the remote entities, and the error taxonomy shared by every
//! layer above it.

pub mod entity;
pub mod error;
pub mod id;
pub mod model;

pub use entity::{Entity, find_by_id, index_by_id};
pub use error::{DomainError, FanOutError, JoinIntegrityError, TransportError};
pub use id::{CategoryId, ProductId, SupplierId};
pub use model::{Category, Collection, Product, Supplier};
