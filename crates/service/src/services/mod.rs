//! Business logic services for the tracker.
//!
//! Each service wraps the record store (and, where needed, the webhook
//! client) behind a small API used by the HTTP routes, the sweep loop and the
//! CLI.

pub mod admin;
pub mod dispatcher;
pub mod reconciler;
pub mod settings;
pub mod sweeper;
pub mod tracker;

pub use admin::AdminService;
pub use dispatcher::{Delivery, DispatchError, WebhookDispatcher, WebhookPayload};
pub use reconciler::OrderReconciler;
pub use settings::{SettingsService, SettingsUpdate};
pub use sweeper::{SweepReport, Sweeper, spawn_sweep_loop};
pub use tracker::{CartTracker, SkipReason, TrackOutcome};
