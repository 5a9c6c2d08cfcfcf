//! Product × category join.
//!
//! [`join_categories`] is pure and total over its inputs: the same raw
//! products and categories always give the same enriched records, so
//! re-running it on a re-emission never compounds the price markup.
//! [`CategoryJoiner`] is the graph node around it: it holds the latest value
//! of each input and recomputes when either changes, but only once both have
//! emitted. An input whose source failed to load is not joined: the source
//! has already reported it, so the node applies its continuation and adds no
//! integrity reports of its own.

use std::sync::Arc;

use catalog_core::{Category, Collection, JoinIntegrityError, Product, index_by_id};
use catalog_events::{ReplayChannel, ReplayHandle, ReplaySubscription};
use tokio::task::JoinHandle;

use crate::errors::{Continuation, ErrorBranch, ErrorSink};
use crate::source::SourceState;

/// Handling of a product whose `categoryId` matches no category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntegrityPolicy {
    /// Drop the offending record, report it, keep the rest.
    #[default]
    SkipRecord,
    /// Abandon the whole join for this emission.
    FailJoin,
}

impl IntegrityPolicy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "skip" | "skip-record" => Some(Self::SkipRecord),
            "fail" | "fail-join" => Some(Self::FailJoin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JoinSettings {
    pub markup: f64,
    pub policy: IntegrityPolicy,
}

impl Default for JoinSettings {
    fn default() -> Self {
        Self {
            markup: crate::config::DEFAULT_PRICE_MARKUP,
            policy: IntegrityPolicy::default(),
        }
    }
}

/// Output of one join pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Joined {
    /// Enriched records, in product order.
    pub records: Vec<Product>,
    /// Records dropped under [`IntegrityPolicy::SkipRecord`].
    pub skipped: Vec<JoinIntegrityError>,
}

/// Enrich every product with its category name, search key and marked-up price.
pub fn join_categories(
    products: &[Product],
    categories: &[Category],
    settings: &JoinSettings,
) -> Result<Joined, JoinIntegrityError> {
    let by_id = index_by_id(categories);
    let mut joined = Joined {
        records: Vec::with_capacity(products.len()),
        skipped: Vec::new(),
    };

    for product in products {
        match by_id.get(&product.category_id) {
            Some(category) => joined.records.push(enrich(product, category, settings.markup)),
            None => {
                let fault = JoinIntegrityError::UnknownCategory {
                    product: product.id,
                    category: product.category_id,
                };
                match settings.policy {
                    IntegrityPolicy::SkipRecord => joined.skipped.push(fault),
                    IntegrityPolicy::FailJoin => return Err(fault),
                }
            }
        }
    }

    Ok(joined)
}

fn enrich(product: &Product, category: &Category, markup: f64) -> Product {
    let mut record = product.clone().without_derived();
    record.price = product.price * markup;
    let search_key = vec![product.product_name.clone()];
    record.with_derived(category.name.clone(), search_key)
}

/// Graph node publishing `productsWithCategory`.
#[derive(Debug)]
pub struct CategoryJoiner {
    handle: ReplayHandle<Collection<Product>>,
}

impl CategoryJoiner {
    pub fn spawn(
        products: ReplaySubscription<SourceState<Product>>,
        categories: ReplaySubscription<SourceState<Category>>,
        settings: JoinSettings,
        errors: Arc<ErrorSink>,
        on_error: Continuation,
    ) -> (Self, JoinHandle<()>) {
        let channel = ReplayChannel::new();
        let handle = channel.handle();
        let task = tokio::spawn(run(products, categories, settings, errors, on_error, channel));
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
    mut products: ReplaySubscription<SourceState<Product>>,
    mut categories: ReplaySubscription<SourceState<Category>>,
    settings: JoinSettings,
    errors: Arc<ErrorSink>,
    on_error: Continuation,
    channel: ReplayChannel<Collection<Product>>,
) {
    let mut latest_products: Option<SourceState<Product>> = None;
    let mut latest_categories: Option<SourceState<Category>> = None;
    let mut products_open = true;
    let mut categories_open = true;

    while products_open || categories_open {
        tokio::select! {
            next = products.next(), if products_open => match next {
                Some(value) => latest_products = Some(value),
                None => products_open = false,
            },
            next = categories.next(), if categories_open => match next {
                Some(value) => latest_categories = Some(value),
                None => categories_open = false,
            },
        }

        // An input that completed without ever emitting can never satisfy the join.
        if (!products_open && latest_products.is_none())
            || (!categories_open && latest_categories.is_none())
        {
            tracing::debug!("category join completed: an input ended without a value");
            return;
        }

        let (Some(raw), Some(known)) = (&latest_products, &latest_categories) else {
            continue;
        };
        let (Some(raw), Some(known)) = (raw.loaded(), known.loaded()) else {
            tracing::debug!("category join skipped: an input failed to load");
            if on_error == Continuation::EmptyCollection {
                channel.publish(Arc::new(Vec::new()));
            }
            continue;
        };

        match join_categories(raw, known, &settings) {
            Ok(joined) => {
                for fault in &joined.skipped {
                    tracing::warn!(%fault, "skipping product with dangling category");
                    errors.report(ErrorBranch::Catalog, fault);
                }
                tracing::debug!(
                    products = raw.len(),
                    categories = known.len(),
                    joined = joined.records.len(),
                    "category join recomputed"
                );
                channel.publish(Arc::new(joined.records));
            }
            Err(fault) => {
                errors.report(ErrorBranch::Catalog, &fault);
                match on_error {
                    Continuation::EmptyCollection => channel.publish(Arc::new(Vec::new())),
                    Continuation::Complete => return,
                }
            }
        }
    }
}
