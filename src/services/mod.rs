pub mod catalog_service;
pub use catalog_service::{BulkSyncReport, CatalogService, DiscoverList, SyncError};

pub mod catalog_service_impl;
pub use catalog_service_impl::{SeaOrmCatalogService, SyncSettings};

pub mod reconciler;
pub use reconciler::Reconciler;

pub mod scheduler;
pub use scheduler::Scheduler;
