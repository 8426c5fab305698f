//! Business services for the storefront.

pub mod catalog;

pub use catalog::CatalogService;
