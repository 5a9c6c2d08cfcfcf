//! Working set: the joined remote collection plus local insertions.
//!
//! The snapshot is always `base ++ inserts`, rebuilt from scratch on every
//! change. A new base (e.g. after a refresh) keeps every insert seen so far,
//! re-applied in arrival order. Inserts that arrive before the first base are
//! held back; nothing is published until the base has emitted once.

use std::sync::Arc;

use catalog_core::{Collection, Product};
use catalog_events::{ReplayChannel, ReplayHandle, ReplaySubscription, Subscription};
use tokio::task::JoinHandle;

/// Pure accumulation state.
#[derive(Debug, Clone, Default)]
pub struct WorkingSet {
    base: Option<Collection<Product>>,
    inserts: Vec<Product>,
}

impl WorkingSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rebase(&mut self, base: Collection<Product>) {
        self.base = Some(base);
    }

    pub fn push(&mut self, product: Product) {
        self.inserts.push(product);
    }

    pub fn inserted(&self) -> &[Product] {
        &self.inserts
    }

    /// `None` until a base has been seen.
    pub fn snapshot(&self) -> Option<Collection<Product>> {
        let base = self.base.as_ref()?;
        if self.inserts.is_empty() {
            return Some(Arc::clone(base));
        }
        let mut records = Vec::with_capacity(base.len() + self.inserts.len());
        records.extend(base.iter().cloned());
        records.extend(self.inserts.iter().cloned());
        Some(Arc::new(records))
    }
}

/// Graph node publishing the working set with replay to late subscribers.
#[derive(Debug)]
pub struct Accumulator {
    handle: ReplayHandle<Collection<Product>>,
}

impl Accumulator {
    pub fn spawn(
        base: ReplaySubscription<Collection<Product>>,
        inserts: Subscription<Product>,
    ) -> (Self, JoinHandle<()>) {
        let channel = ReplayChannel::new();
        let handle = channel.handle();
        let task = tokio::spawn(run(base, inserts, channel));
        (Self { handle }, task)
    }

    pub fn subscribe(&self) -> ReplaySubscription<Collection<Product>> {
        self.handle.subscribe()
    }

    pub fn latest(&self) -> Option<Collection<Product>> {
        self.handle.latest()
    }
}

async fn run(
    mut base: ReplaySubscription<Collection<Product>>,
    mut inserts: Subscription<Product>,
    channel: ReplayChannel<Collection<Product>>,
) {
    let mut working = WorkingSet::new();
    let mut base_open = true;
    let mut inserts_open = true;

    while base_open || inserts_open {
        tokio::select! {
            next = base.next(), if base_open => match next {
                Some(collection) => {
                    tracing::debug!(base = collection.len(), kept_inserts = working.inserted().len(), "working set rebased");
                    working.rebase(collection);
                }
                None => {
                    base_open = false;
                    continue;
                }
            },
            next = inserts.recv(), if inserts_open => match next {
                Some(product) => {
                    tracing::debug!(product = %product.id, "insert accumulated");
                    working.push(product);
                }
                None => {
                    inserts_open = false;
                    continue;
                }
            },
        }

        if let Some(snapshot) = working.snapshot() {
            channel.publish(snapshot);
        }
    }
}
