//! Locally originated actions.
//!
//! Two channels with different memory:
//!
//! - **selection**: state. Always has a current value (default
//!   [`ProductId::NONE`]); new subscribers get it immediately.
//! - **insertions**: events. Each insert is delivered once to the
//!   subscriptions that exist at the time; nothing is replayed.
//!
//! Both entry points are synchronous and fire-and-forget.

use std::sync::Arc;

use catalog_core::{Product, ProductId};
use catalog_events::{EventBus, InMemoryEventBus, ReplayChannel, ReplaySubscription, Subscription};

#[derive(Debug)]
pub struct ActionChannel {
    selection: ReplayChannel<ProductId>,
    insertions: Arc<InMemoryEventBus<Product>>,
}

impl ActionChannel {
    pub fn new() -> Self {
        Self {
            selection: ReplayChannel::with_initial(ProductId::NONE),
            insertions: Arc::new(InMemoryEventBus::new()),
        }
    }

    /// Change the selected product. `ProductId::NONE` clears the selection.
    pub fn select(&self, id: ProductId) {
        tracing::debug!(product = %id, "product selected");
        self.selection.publish(id);
    }

    /// Submit a locally created product. Display fields are stripped: only the
    /// category join may set them.
    pub fn insert(&self, product: Product) {
        tracing::debug!(product = %product.id, "product inserted");
        if let Err(err) = self.insertions.publish(product.without_derived()) {
            tracing::warn!(?err, "insert dropped");
        }
    }

    pub fn current_selection(&self) -> ProductId {
        self.selection.latest().unwrap_or(ProductId::NONE)
    }

    pub fn selection(&self) -> ReplaySubscription<ProductId> {
        self.selection.subscribe()
    }

    pub fn insertions(&self) -> Subscription<Product> {
        self.insertions.subscribe()
    }
}

impl Default for ActionChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_core::CategoryId;

    #[tokio::test]
    async fn selection_defaults_to_none_and_replays() {
        let actions = ActionChannel::new();
        assert_eq!(actions.current_selection(), ProductId::NONE);
        assert_eq!(actions.selection().next().await, Some(ProductId::NONE));

        actions.select(ProductId::new(5));
        actions.select(ProductId::new(6));
        let mut late = actions.selection();
        assert_eq!(late.next().await, Some(ProductId::new(6)));
    }

    #[tokio::test]
    async fn insertions_are_events_not_state() {
        let actions = ActionChannel::new();
        actions.insert(Product::sample());

        let mut late = actions.insertions();
        assert!(late.try_recv().is_err());

        let next = Product::new(ProductId::new(43), "Hammer", "TBX-0043", 9.0, CategoryId::new(3));
        actions.insert(next.clone());
        assert_eq!(late.recv().await, Some(next));
    }

    #[tokio::test]
    async fn insert_strips_display_fields() {
        let actions = ActionChannel::new();
        let mut sub = actions.insertions();
        actions.insert(Product::sample().with_derived("Toolbox", vec!["x".into()]));

        let received = sub.recv().await.unwrap();
        assert_eq!(received.category(), None);
        assert!(received.search_key().is_empty());
    }
}
