pub mod catalog;
pub mod connection;
pub mod providers;

pub use catalog::CatalogService;
pub use connection::{ConnectionMonitor, HttpProbe, LivenessProbe, MonitorHandle};
pub use providers::{CatalogProvider, TmdbProvider};
