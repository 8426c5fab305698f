//! Vitrine admin library.
//!
//! Catalog management for the shop owner: products, categories, kits and
//! the home carousel, behind a password login. Exposed as a library so the
//! binary, the CLI and the integration tests share it.
//!
//! # Security
//!
//! This crate holds write access to the catalog database and the image
//! bucket. Bind it to a private interface.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod forms;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
