//! Selected product resolution.
//!
//! One [`SelectionResolver`] is shared by every view: the list highlight and
//! the detail page subscribe to the same channel, so the working set × selection
//! combination is computed once per change regardless of subscriber count.
//!
//! A working set change that leaves the resolved record untouched is not
//! republished. An explicit selection always is, even of the same id, so a
//! re-select re-runs the supplier fan-out downstream.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use catalog_core::{Collection, Product, ProductId, find_by_id};
use catalog_events::{ReplayChannel, ReplayHandle, ReplaySubscription};
use tokio::task::JoinHandle;

/// The working set entry whose id equals `selection`. The sentinel never matches.
pub fn resolve_selection(working_set: &[Product], selection: ProductId) -> Option<Product> {
    if selection.is_none() {
        return None;
    }
    find_by_id(working_set, selection).cloned()
}

#[derive(Debug)]
pub struct SelectionResolver {
    handle: ReplayHandle<Option<Product>>,
    recomputations: Arc<AtomicUsize>,
}

impl SelectionResolver {
    pub fn spawn(
        working_set: ReplaySubscription<Collection<Product>>,
        selection: ReplaySubscription<ProductId>,
    ) -> (Self, JoinHandle<()>) {
        let channel = ReplayChannel::new();
        let handle = channel.handle();
        let recomputations = Arc::new(AtomicUsize::new(0));
        let task = tokio::spawn(run(working_set, selection, channel, recomputations.clone()));
        (Self { handle, recomputations }, task)
    }

    /// Resolved selection: `Some(product)` or `None` when nothing matches.
    pub fn subscribe(&self) -> ReplaySubscription<Option<Product>> {
        self.handle.subscribe()
    }

    /// `None` before both inputs have emitted, `Some(None)` for no selection.
    pub fn latest(&self) -> Option<Option<Product>> {
        self.handle.latest()
    }

    /// Number of times the resolution ran since the node started.
    pub fn recomputations(&self) -> usize {
        self.recomputations.load(Ordering::Relaxed)
    }
}

async fn run(
    mut working_set: ReplaySubscription<Collection<Product>>,
    mut selection: ReplaySubscription<ProductId>,
    channel: ReplayChannel<Option<Product>>,
    recomputations: Arc<AtomicUsize>,
) {
    let mut latest_set: Option<Collection<Product>> = None;
    let mut latest_selection: Option<ProductId> = None;
    let mut set_open = true;
    let mut selection_open = true;

    while set_open || selection_open {
        let mut reselected = false;
        tokio::select! {
            next = working_set.next(), if set_open => match next {
                Some(value) => latest_set = Some(value),
                None => set_open = false,
            },
            next = selection.next(), if selection_open => match next {
                Some(value) => {
                    latest_selection = Some(value);
                    reselected = true;
                }
                None => selection_open = false,
            },
        }

        if (!set_open && latest_set.is_none()) || (!selection_open && latest_selection.is_none()) {
            return;
        }

        let (Some(set), Some(selected)) = (&latest_set, latest_selection) else {
            continue;
        };

        recomputations.fetch_add(1, Ordering::Relaxed);
        let resolved = resolve_selection(set, selected);
        let changed = if reselected {
            channel.publish(resolved);
            true
        } else {
            channel.publish_if_changed(resolved)
        };
        tracing::debug!(selection = %selected, reselected, changed, "selection resolved");
    }
}
