//! `catalog-events`: channel primitives for the composition graph.
//!
//! Two delivery flavours are provided:
//!
//! - [`EventBus`] / [`InMemoryEventBus`]: discrete events, no memory. A
//!   subscriber only sees what is published after it subscribed.
//! - [`ReplayChannel`]: a hot channel with last-value memory. A subscriber
//!   immediately receives the most recent value, then every later one.

pub mod bus;
pub mod in_memory_bus;
pub mod replay;

pub use bus::{EventBus, Subscription};
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use replay::{ReplayChannel, ReplayHandle, ReplaySubscription};
