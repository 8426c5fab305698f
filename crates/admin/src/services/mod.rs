//! Business logic services for admin.
//!
//! # Services
//!
//! - `auth` - Email and password login (Argon2id)
//! - `storage` - Image uploads to the object storage bucket

pub mod auth;
pub mod storage;

pub use auth::{AdminAuthError, AdminAuthService};
pub use storage::{StorageClient, StorageError, StoredObject, UploadFolder};
