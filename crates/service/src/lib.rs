//! Abandoned cart tracker library.
//!
//! This crate provides the tracker as a library, allowing it to be tested and
//! driven from the CLI.
//!
//! # Flow
//!
//! - The storefront posts cart snapshots and completed orders to the hooks.
//! - The [`services::CartTracker`] keeps one pending record per email.
//! - The [`services::Sweeper`] posts idle carts to the automation webhook and
//!   expires old ones.
//! - The [`services::OrderReconciler`] marks carts recovered when the shopper
//!   buys.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;
