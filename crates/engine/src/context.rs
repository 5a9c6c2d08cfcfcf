//! The wired composition graph.
//!
//! [`CatalogContext`] is built once at startup and passed by reference to
//! every view. It owns the sources, the derived nodes and the action
//! channels; views only ever get read subscriptions plus the two entry points
//! ([`CatalogContext::select_product`] and [`CatalogContext::insert_product`]).
//!
//! ```text
//! products ──┐
//!            ├─ CategoryJoiner ─┐
//! categories ┘                  ├─ Accumulator ─┐
//!                  insertions ──┘               ├─ SelectionResolver ─ FanOutResolver
//!                                   selection ──┘          └──────── DetailPresenter ─┘
//! ```

use std::sync::Arc;

use catalog_client::{HttpTransport, Transport, resources};
use catalog_core::{Category, Collection, Product, ProductId, Supplier, TransportError};
use catalog_events::ReplaySubscription;
use tokio::task::JoinHandle;
use tokio_stream::{Stream, StreamExt};

use crate::accumulator::Accumulator;
use crate::actions::ActionChannel;
use crate::config::CatalogConfig;
use crate::detail::{DetailPresenter, DetailView};
use crate::errors::{ErrorBranch, ErrorMessage, ErrorSink};
use crate::fanout::{FanOutResolver, SupplierSet};
use crate::join::{CategoryJoiner, JoinSettings};
use crate::selection::SelectionResolver;
use crate::source::CollectionSource;

/// Node tasks, aborted together.
#[derive(Debug, Default)]
struct TaskGroup {
    tasks: Vec<JoinHandle<()>>,
}

impl TaskGroup {
    fn push(&mut self, task: JoinHandle<()>) {
        self.tasks.push(task);
    }

    async fn shutdown(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
        for task in self.tasks.drain(..) {
            if let Err(err) = task.await {
                if !err.is_cancelled() {
                    tracing::warn!(%err, "catalog node panicked");
                }
            }
        }
    }
}

impl Drop for TaskGroup {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

pub struct CatalogContext {
    config: CatalogConfig,
    errors: Arc<ErrorSink>,
    products: CollectionSource<Product>,
    categories: CollectionSource<Category>,
    suppliers: CollectionSource<Supplier>,
    joiner: CategoryJoiner,
    actions: ActionChannel,
    working_set: Accumulator,
    selection: SelectionResolver,
    fan_out: FanOutResolver,
    detail: DetailPresenter,
    tasks: TaskGroup,
}

impl CatalogContext {
    /// Wire the graph over `transport` and start it. Each source issues its
    /// single fetch immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(transport: Arc<dyn Transport>, config: CatalogConfig) -> Self {
        let errors = Arc::new(ErrorSink::new());
        let on_error = config.on_error;
        let mut tasks = TaskGroup::default();

        let (products, task) = CollectionSource::<Product>::spawn(
            resources::PRODUCTS,
            ErrorBranch::Products,
            transport.clone(),
            errors.clone(),
            on_error,
        );
        tasks.push(task);
        let (categories, task) = CollectionSource::<Category>::spawn(
            resources::CATEGORIES,
            ErrorBranch::Categories,
            transport.clone(),
            errors.clone(),
            on_error,
        );
        tasks.push(task);
        let (suppliers, task) = CollectionSource::<Supplier>::spawn(
            resources::SUPPLIERS,
            ErrorBranch::Suppliers,
            transport.clone(),
            errors.clone(),
            on_error,
        );
        tasks.push(task);

        let settings = JoinSettings {
            markup: config.price_markup,
            policy: config.integrity,
        };
        let (joiner, task) = CategoryJoiner::spawn(
            products.subscribe_state(),
            categories.subscribe_state(),
            settings,
            errors.clone(),
            on_error,
        );
        tasks.push(task);

        let actions = ActionChannel::new();
        let (working_set, task) = Accumulator::spawn(joiner.subscribe(), actions.insertions());
        tasks.push(task);

        let (selection, task) = SelectionResolver::spawn(working_set.subscribe(), actions.selection());
        tasks.push(task);

        let (fan_out, task) = FanOutResolver::spawn(selection.subscribe(), transport, errors.clone(), on_error);
        tasks.push(task);

        let (detail, task) = DetailPresenter::spawn(selection.subscribe(), fan_out.subscribe());
        tasks.push(task);

        tracing::info!(
            api_url = %config.api_url,
            markup = config.price_markup,
            integrity = ?config.integrity,
            on_error = ?config.on_error,
            "catalog context started"
        );

        Self {
            config,
            errors,
            products,
            categories,
            suppliers,
            joiner,
            actions,
            working_set,
            selection,
            fan_out,
            detail,
            tasks,
        }
    }

    /// Start over the HTTP API described by `config`.
    pub fn connect(config: CatalogConfig) -> Result<Self, TransportError> {
        let transport = HttpTransport::new(config.http())?;
        Ok(Self::start(Arc::new(transport), config))
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Raw products, as served.
    pub fn products(&self) -> ReplaySubscription<Collection<Product>> {
        self.products.subscribe()
    }

    /// Every category, as served.
    pub fn categories(&self) -> ReplaySubscription<Collection<Category>> {
        self.categories.subscribe()
    }

    /// Every supplier, as served.
    pub fn suppliers(&self) -> ReplaySubscription<Collection<Supplier>> {
        self.suppliers.subscribe()
    }

    /// Products with category name, search key and marked-up price.
    pub fn products_with_category(&self) -> ReplaySubscription<Collection<Product>> {
        self.joiner.subscribe()
    }

    /// Joined products followed by local inserts.
    pub fn working_set(&self) -> ReplaySubscription<Collection<Product>> {
        self.working_set.subscribe()
    }

    pub fn selected_product(&self) -> ReplaySubscription<Option<Product>> {
        self.selection.subscribe()
    }

    pub fn selected_product_suppliers(&self) -> ReplaySubscription<SupplierSet> {
        self.fan_out.subscribe()
    }

    /// Supplier aggregates only, for views that don't need the product tag.
    pub fn selected_product_suppliers_stream(&self) -> impl Stream<Item = Collection<Supplier>> + Send + Unpin + use<> {
        self.fan_out.subscribe().into_stream().map(|set| set.suppliers)
    }

    pub fn detail(&self) -> ReplaySubscription<DetailView> {
        self.detail.subscribe()
    }

    pub fn errors(&self, branch: ErrorBranch) -> ReplaySubscription<ErrorMessage> {
        self.errors.subscribe(branch)
    }

    pub fn latest_error(&self, branch: ErrorBranch) -> Option<ErrorMessage> {
        self.errors.latest(branch)
    }

    pub fn select_product(&self, id: ProductId) {
        self.actions.select(id);
    }

    pub fn current_selection(&self) -> ProductId {
        self.actions.current_selection()
    }

    pub fn insert_product(&self, product: Product) {
        self.actions.insert(product);
    }

    /// Insert `product`, or the stock sample product when `None`.
    pub fn add_product(&self, product: Option<Product>) {
        self.insert_product(product.unwrap_or_else(Product::sample));
    }

    pub fn refresh_products(&self) {
        self.products.refresh();
    }

    pub fn refresh_categories(&self) {
        self.categories.refresh();
    }

    pub fn refresh_suppliers(&self) {
        self.suppliers.refresh();
    }

    /// Stop every node. Open subscriptions drain their last value and then
    /// report completion.
    pub async fn shutdown(mut self) {
        self.tasks.shutdown().await;
        tracing::info!("catalog context stopped");
    }
}

impl core::fmt::Debug for CatalogContext {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CatalogContext")
            .field("config", &self.config)
            .field("selection", &self.actions.current_selection())
            .field("nodes", &self.tasks.tasks.len())
            .finish()
    }
}
