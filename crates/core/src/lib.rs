//! Abandoned Cart Core - Shared types library.
//!
//! This crate provides the domain types used across the abandoned cart tracker:
//! - `service` - Storefront hooks, admin API and the abandonment sweeper
//! - `cli` - Command-line tools for migrations and record management
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Record IDs, emails, cart contents and record statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
