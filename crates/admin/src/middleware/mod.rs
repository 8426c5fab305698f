//! HTTP middleware for admin.
//!
//! - `auth` - `RequireAdminAuth` extractor and login session helpers
//! - `session` - tower-sessions layer backed by `PostgreSQL`

pub mod auth;
pub mod session;

pub use auth::{OptionalAdminAuth, RequireAdminAuth, clear_current_admin, set_current_admin};
pub use session::create_session_layer;
