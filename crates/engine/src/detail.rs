//! Detail page view model.

use catalog_core::{Collection, Product, Supplier};
use catalog_events::{ReplayChannel, ReplayHandle, ReplaySubscription};
use tokio::task::JoinHandle;

use crate::fanout::SupplierSet;

pub fn page_title(product: &Product) -> String {
    format!("Product Detail for: {}", product.product_name)
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetailView {
    pub product: Product,
    pub title: String,
    /// `None` while the supplier fan-out for this product is outstanding.
    pub suppliers: Option<Collection<Supplier>>,
}

impl DetailView {
    /// Suppliers are attached only when the aggregate belongs to `product`.
    pub fn build(product: Product, suppliers: Option<&SupplierSet>) -> Self {
        let suppliers = suppliers
            .filter(|set| set.product == product.id)
            .map(|set| set.suppliers.clone());
        Self {
            title: page_title(&product),
            product,
            suppliers,
        }
    }
}

/// Publishes a [`DetailView`] whenever a product is selected or its suppliers
/// arrive. Nothing is published while the selection is empty, and a missing
/// supplier aggregate never holds the view back.
#[derive(Debug)]
pub struct DetailPresenter {
    handle: ReplayHandle<DetailView>,
}

impl DetailPresenter {
    pub fn spawn(
        selected: ReplaySubscription<Option<Product>>,
        suppliers: ReplaySubscription<SupplierSet>,
    ) -> (Self, JoinHandle<()>) {
        let channel = ReplayChannel::new();
        let handle = channel.handle();
        let task = tokio::spawn(run(selected, suppliers, channel));
        (Self { handle }, task)
    }

    pub fn subscribe(&self) -> ReplaySubscription<DetailView> {
        self.handle.subscribe()
    }

    pub fn latest(&self) -> Option<DetailView> {
        self.handle.latest()
    }
}

async fn run(
    mut selected: ReplaySubscription<Option<Product>>,
    mut suppliers: ReplaySubscription<SupplierSet>,
    channel: ReplayChannel<DetailView>,
) {
    let mut product: Option<Product> = None;
    let mut supplier_set: Option<SupplierSet> = None;
    let mut selected_open = true;
    let mut suppliers_open = true;

    while selected_open {
        tokio::select! {
            next = selected.next() => match next {
                Some(value) => product = value,
                None => selected_open = false,
            },
            next = suppliers.next(), if suppliers_open => match next {
                Some(value) => supplier_set = Some(value),
                None => suppliers_open = false,
            },
        }

        if let Some(product) = &product {
            let view = DetailView::build(product.clone(), supplier_set.as_ref());
            if channel.publish_if_changed(view) {
                tracing::debug!(product = %product.id, "detail view updated");
            }
        }
    }
}
