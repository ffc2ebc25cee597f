//! Request extractors for the tracker service.

pub mod auth;

pub use auth::RequireAdminToken;
