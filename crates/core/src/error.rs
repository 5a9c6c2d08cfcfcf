//! Error taxonomy.
//!
//! Every error here is `Clone + PartialEq` so it can be stored in a replay
//! channel and compared in tests.

use thiserror::Error;

use crate::id::{CategoryId, ProductId, SupplierId};

/// Deterministic failures of the data layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}

/// Failure of a single fetch against the remote API.
///
/// The `Display` output is the user-facing message published on the error
/// sink.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// A client-side or network fault (no response was received).
    #[error("An error occurred: {0}")]
    Network(String),

    /// The backend answered with a non-2xx status.
    #[error("Backend returned code {status}: {body}")]
    Status { status: u16, body: String },

    /// The response arrived but its payload did not have the expected shape.
    #[error("An error occurred: malformed response: {0}")]
    Decode(String),
}

impl TransportError {
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }
}

/// A foreign key resolved to nothing. Data-integrity fault, never retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JoinIntegrityError {
    #[error("product {product} references unknown category {category}")]
    UnknownCategory {
        product: ProductId,
        category: CategoryId,
    },

    #[error("product {product} references unknown supplier {supplier}")]
    UnknownSupplier {
        product: ProductId,
        supplier: SupplierId,
    },
}

/// One of the per-supplier fetches of a fan-out failed; the whole aggregate
/// for that selection is abandoned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FanOutError {
    #[error("failed to load supplier {supplier} for product {product}: {source}")]
    Transport {
        product: ProductId,
        supplier: SupplierId,
        #[source]
        source: TransportError,
    },

    #[error(transparent)]
    Integrity(#[from] JoinIntegrityError),
}

impl FanOutError {
    /// Classify a failed per-supplier fetch. A 404 means the supplier id
    /// dangles, which is an integrity fault rather than a transport one.
    pub fn from_fetch(product: ProductId, supplier: SupplierId, source: TransportError) -> Self {
        if source.is_not_found() {
            JoinIntegrityError::UnknownSupplier { product, supplier }.into()
        } else {
            Self::Transport {
                product,
                supplier,
                source,
            }
        }
    }
}
