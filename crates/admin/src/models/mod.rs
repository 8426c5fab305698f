//! Domain models for admin.
//!
//! Catalog entities themselves live in `vitrine_core::catalog`; this module
//! holds what only the admin needs: validated inputs and login identities.

pub mod admin_user;
pub mod catalog;
pub mod session;

pub use admin_user::AdminUser;
pub use catalog::{CategoryInput, HighlightInput, KitInput, ProductInput, ValidationError};
pub use session::{CurrentAdmin, Flash, FlashLevel, keys as session_keys, set_flash, take_flash};
