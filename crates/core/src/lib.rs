//! Vitrine Core - catalog, cart and ordering logic.
//!
//! Shared by every Vitrine component:
//! - `storefront` - public shop with the cart and WhatsApp checkout
//! - `admin` - catalog management dashboard
//! - `cli` - migrations and admin user management
//!
//! # Architecture
//!
//! Everything here is pure: no database access, no HTTP. The binaries load
//! rows, convert them into these types and call into the modules below.
//!
//! # Modules
//!
//! - [`types`] - IDs, prices and emails
//! - [`catalog`] - products, categories, kits and highlights
//! - [`cart`] - cart lines, merging and stock checks
//! - [`checkout`] - order message and `wa.me` link
//! - [`category_tree`] - hierarchy walks, filtering and sorting
//! - [`reorder`] - drag-and-drop sort order planning

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod category_tree;
pub mod checkout;
pub mod reorder;
pub mod types;

pub use types::*;
