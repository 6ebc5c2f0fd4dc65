//! Course Catalog Service Library

pub mod catalog;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod store;

pub use catalog::CatalogService;
pub use config::schema::CatalogConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
