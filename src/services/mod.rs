pub mod chart_service;
pub mod registry_service;
pub mod store_service;

pub use registry_service::Registry;
pub use store_service::DatasetStore;
