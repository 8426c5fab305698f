//! Vitrine storefront library.
//!
//! The public shop: catalog browsing, a session cart and WhatsApp checkout.
//! Exposed as a library so the binary and the integration tests share it.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod views;
