//! Local entity source for the Matter bridge
//!
//! An [`EntityStore`] holds entity metadata and states. Each bridge sees it
//! through a [`FilteredRegistry`] (its desired entity set), a
//! [`StoreSubscriber`] (pushed state changes) and a
//! [`MirroredEndpointFactory`] (one endpoint per supported entity).

mod endpoint;
mod filter;
mod registry;
mod store;
mod subscriber;

pub use endpoint::{DeviceType, MirroredEndpoint, MirroredEndpointFactory};
pub use filter::EntityFilter;
pub use registry::FilteredRegistry;
pub use store::EntityStore;
pub use subscriber::StoreSubscriber;
