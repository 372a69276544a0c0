pub mod episodes;
pub mod lifecycle;
pub mod reconcile;
pub mod watch;

pub mod catalog_service;
pub mod catalog_service_impl;
pub use catalog_service::{CatalogError, CatalogService, Cover, WatchReport};
pub use catalog_service_impl::DefaultCatalogService;

pub use lifecycle::{CacheLifecycle, TouchMode};
pub use reconcile::Reconciler;
pub use watch::WatchResolver;
