//! Per-branch error boundary.
//!
//! A branch that fails never propagates the failure downstream. It reports a
//! user-facing message here and then continues according to its
//! [`Continuation`]. Each branch has its own replay channel, so losing the
//! categories never blanks the product list, and a view that attaches after
//! the failure still sees the message.

use std::fmt::Display;

use catalog_events::{ReplayChannel, ReplaySubscription};
use chrono::{DateTime, Utc};

/// Independently failing parts of the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorBranch {
    /// Raw product collection.
    Products,
    /// Category collection.
    Categories,
    /// Full supplier collection.
    Suppliers,
    /// Product × category join (integrity faults).
    Catalog,
    /// Selected product detail (supplier fan-out).
    Detail,
}

impl ErrorBranch {
    pub const ALL: [ErrorBranch; 5] = [
        ErrorBranch::Products,
        ErrorBranch::Categories,
        ErrorBranch::Suppliers,
        ErrorBranch::Catalog,
        ErrorBranch::Detail,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorBranch::Products => "products",
            ErrorBranch::Categories => "categories",
            ErrorBranch::Suppliers => "suppliers",
            ErrorBranch::Catalog => "catalog",
            ErrorBranch::Detail => "detail",
        }
    }

    fn index(self) -> usize {
        match self {
            ErrorBranch::Products => 0,
            ErrorBranch::Categories => 1,
            ErrorBranch::Suppliers => 2,
            ErrorBranch::Catalog => 3,
            ErrorBranch::Detail => 4,
        }
    }
}

impl core::fmt::Display for ErrorBranch {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a branch publishes after a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Continuation {
    /// Stop: no further values. Consumers combining this branch with others
    /// wait forever, so only use it for leaf views.
    Complete,
    /// Publish an empty collection and stay alive.
    #[default]
    EmptyCollection,
}

impl Continuation {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "complete" | "none" => Some(Self::Complete),
            "empty" | "empty-collection" => Some(Self::EmptyCollection),
            _ => None,
        }
    }
}

/// A reported failure, ready for display.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorMessage {
    pub branch: ErrorBranch,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
}

/// One replay channel of messages per [`ErrorBranch`].
#[derive(Debug)]
pub struct ErrorSink {
    channels: [ReplayChannel<ErrorMessage>; 5],
}

impl ErrorSink {
    pub fn new() -> Self {
        Self {
            channels: std::array::from_fn(|_| ReplayChannel::new()),
        }
    }

    /// Convert `error` into a message, log it, and publish it on `branch`.
    pub fn report(&self, branch: ErrorBranch, error: &dyn Display) -> ErrorMessage {
        let message = ErrorMessage {
            branch,
            message: error.to_string(),
            occurred_at: Utc::now(),
        };
        tracing::error!(branch = %branch, message = %message.message, "branch failed");
        self.channels[branch.index()].publish(message.clone());
        message
    }

    /// Most recent message on `branch`, if any.
    pub fn latest(&self, branch: ErrorBranch) -> Option<ErrorMessage> {
        self.channels[branch.index()].latest()
    }

    pub fn subscribe(&self, branch: ErrorBranch) -> ReplaySubscription<ErrorMessage> {
        self.channels[branch.index()].subscribe()
    }
}

impl Default for ErrorSink {
    fn default() -> Self {
        Self::new()
    }
}
