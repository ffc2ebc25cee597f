//! Core types for the abandoned cart tracker.
//!
//! This module provides type-safe wrappers for the cart record domain.

pub mod cart;
pub mod email;
pub mod id;
pub mod status;

pub use cart::{CartItem, CartRecord, CartSnapshot};
pub use email::{Email, EmailError};
pub use id::*;
pub use status::*;
