//! Supplier fan-out for the selected product.
//!
//! Each selected product triggers one `GET /suppliers/{id}` per entry in its
//! `supplierIds`, all in flight at once. The aggregate is published only when
//! every fetch has succeeded, in completion order. A newer selection
//! supersedes the running fan-out: its future is dropped (which cancels the
//! outstanding requests) and the epoch moves on, so a late completion can
//! never land in the newer selection's aggregate.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use catalog_client::{Transport, fetch_one, resources};
use catalog_core::{Collection, FanOutError, Product, ProductId, Supplier, SupplierId};
use catalog_events::{ReplayChannel, ReplayHandle, ReplaySubscription};
use futures::FutureExt;
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::task::JoinHandle;

use crate::errors::{Continuation, ErrorBranch, ErrorSink};

/// Suppliers of one product. The tag lets consumers ignore an aggregate that
/// belongs to an earlier selection.
#[derive(Debug, Clone, PartialEq)]
pub struct SupplierSet {
    pub product: ProductId,
    pub suppliers: Collection<Supplier>,
}

impl SupplierSet {
    pub fn empty(product: ProductId) -> Self {
        Self {
            product,
            suppliers: Arc::new(Vec::new()),
        }
    }
}

/// Fetch every supplier of `product` concurrently.
///
/// Results are collected as they complete. The first failure abandons the
/// whole aggregate; the remaining requests are dropped with it.
pub async fn fetch_suppliers(
    transport: &dyn Transport,
    product: ProductId,
    ids: &[SupplierId],
) -> Result<Vec<Supplier>, FanOutError> {
    let mut in_flight: FuturesUnordered<_> = ids
        .iter()
        .map(|&supplier| async move {
            fetch_one::<Supplier>(transport, resources::SUPPLIERS, supplier.get())
                .await
                .map_err(|source| FanOutError::from_fetch(product, supplier, source))
        })
        .collect();

    let mut suppliers = Vec::with_capacity(ids.len());
    while let Some(result) = in_flight.next().await {
        suppliers.push(result?);
    }
    Ok(suppliers)
}

struct Pending {
    epoch: u64,
    product: ProductId,
    fetch: BoxFuture<'static, Result<Vec<Supplier>, FanOutError>>,
}

/// Graph node publishing `selectedProductSuppliers`.
#[derive(Debug)]
pub struct FanOutResolver {
    handle: ReplayHandle<SupplierSet>,
    epoch: Arc<AtomicU64>,
}

impl FanOutResolver {
    pub fn spawn(
        selected: ReplaySubscription<Option<Product>>,
        transport: Arc<dyn Transport>,
        errors: Arc<ErrorSink>,
        on_error: Continuation,
    ) -> (Self, JoinHandle<()>) {
        let channel = ReplayChannel::new();
        let handle = channel.handle();
        let epoch = Arc::new(AtomicU64::new(0));
        let task = tokio::spawn(run(selected, transport, errors, on_error, channel, epoch.clone()));
        (Self { handle, epoch }, task)
    }

    pub fn subscribe(&self) -> ReplaySubscription<SupplierSet> {
        self.handle.subscribe()
    }

    pub fn latest(&self) -> Option<SupplierSet> {
        self.handle.latest()
    }

    /// Selection generation; bumped on every selection change.
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }
}

async fn run(
    mut selected: ReplaySubscription<Option<Product>>,
    transport: Arc<dyn Transport>,
    errors: Arc<ErrorSink>,
    on_error: Continuation,
    channel: ReplayChannel<SupplierSet>,
    epoch: Arc<AtomicU64>,
) {
    let mut pending: Option<Pending> = None;
    let mut selection_open = true;

    while selection_open || pending.is_some() {
        tokio::select! {
            next = selected.next(), if selection_open => {
                let Some(selection) = next else {
                    selection_open = false;
                    continue;
                };
                let current = epoch.fetch_add(1, Ordering::AcqRel) + 1;
                if let Some(superseded) = pending.take() {
                    tracing::debug!(product = %superseded.product, epoch = superseded.epoch, "supplier fan-out superseded");
                }
                pending = selection.map(|product| start(&transport, &product, current));
            }
            (captured, product, result) = wait(&mut pending) => {
                pending = None;
                if captured != epoch.load(Ordering::Acquire) {
                    tracing::warn!(product = %product, epoch = captured, "discarding stale supplier fan-out");
                    continue;
                }
                match result {
                    Ok(suppliers) => {
                        tracing::debug!(product = %product, suppliers = suppliers.len(), "supplier fan-out complete");
                        channel.publish(SupplierSet {
                            product,
                            suppliers: Arc::new(suppliers),
                        });
                    }
                    Err(err) => {
                        errors.report(ErrorBranch::Detail, &err);
                        // `Complete` only ends this selection's branch; the next selection fans out again.
                        if on_error == Continuation::EmptyCollection {
                            channel.publish(SupplierSet::empty(product));
                        }
                    }
                }
            }
        }
    }
}

fn start(transport: &Arc<dyn Transport>, product: &Product, epoch: u64) -> Pending {
    tracing::debug!(product = %product.id, suppliers = product.supplier_ids.len(), epoch, "supplier fan-out started");
    let transport = Arc::clone(transport);
    let id = product.id;
    let ids = product.supplier_ids.clone();
    Pending {
        epoch,
        product: id,
        fetch: async move { fetch_suppliers(transport.as_ref(), id, &ids).await }.boxed(),
    }
}

/// Resolves with the pending fan-out's outcome; never resolves when idle.
async fn wait(pending: &mut Option<Pending>) -> (u64, ProductId, Result<Vec<Supplier>, FanOutError>) {
    match pending {
        Some(running) => {
            let result = (&mut running.fetch).await;
            (running.epoch, running.product, result)
        }
        None => std::future::pending().await,
    }
}
