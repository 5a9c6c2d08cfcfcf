//! `catalog-engine`: the reactive catalog composition graph.
//!
//! Remote collections (products, categories, suppliers) are fetched once and
//! cached; derived nodes join, accumulate and resolve them into the streams a
//! presentation layer subscribes to. Every node is a tokio task that holds the
//! latest value of each input, recomputes with a pure function, and publishes
//! on its own replay channel.
//!
//! Start with [`CatalogContext::start`].

pub mod accumulator;
pub mod actions;
pub mod config;
pub mod context;
pub mod detail;
pub mod errors;
pub mod fanout;
pub mod join;
pub mod selection;
pub mod source;

pub use accumulator::{Accumulator, WorkingSet};
pub use actions::ActionChannel;
pub use config::{CatalogConfig, ConfigError, init_logging};
pub use context::CatalogContext;
pub use detail::{DetailPresenter, DetailView, page_title};
pub use errors::{Continuation, ErrorBranch, ErrorMessage, ErrorSink};
pub use fanout::{FanOutResolver, SupplierSet, fetch_suppliers};
pub use join::{CategoryJoiner, IntegrityPolicy, JoinSettings, Joined, join_categories};
pub use selection::{SelectionResolver, resolve_selection};
pub use source::{CollectionSource, SourceState};
