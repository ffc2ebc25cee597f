//! Application state shared across handlers and the sweep loop.

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;

use crate::config::{
    DEFAULT_DISPATCH_CONCURRENCY, DEFAULT_WEBHOOK_TIMEOUT, ServiceConfig, TrackerSettings,
};
use crate::db::{DynCartStore, DynSettingsStore};
use crate::services::{
    AdminService, CartTracker, DispatchError, OrderReconciler, SettingsService, Sweeper,
    WebhookDispatcher,
};

/// The parts of [`ServiceConfig`] the handlers need.
#[derive(Debug, Clone)]
pub struct StateOptions {
    pub admin_token: Option<SecretString>,
    pub tracker_defaults: TrackerSettings,
    pub webhook_timeout: Duration,
    pub dispatch_concurrency: usize,
}

impl Default for StateOptions {
    fn default() -> Self {
        Self {
            admin_token: None,
            tracker_defaults: TrackerSettings::default(),
            webhook_timeout: DEFAULT_WEBHOOK_TIMEOUT,
            dispatch_concurrency: DEFAULT_DISPATCH_CONCURRENCY,
        }
    }
}

impl From<&ServiceConfig> for StateOptions {
    fn from(config: &ServiceConfig) -> Self {
        Self {
            admin_token: config.admin_token.clone(),
            tracker_defaults: config.tracker_defaults.clone(),
            webhook_timeout: config.webhook_timeout,
            dispatch_concurrency: config.dispatch_concurrency,
        }
    }
}

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    carts: DynCartStore,
    admin_token: Option<SecretString>,
    tracker: CartTracker,
    reconciler: OrderReconciler,
    settings: SettingsService,
    sweeper: Sweeper,
    admin: AdminService,
}

impl AppState {
    /// Wire the services over the given stores.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError` if the webhook HTTP client cannot be built.
    pub fn new(
        carts: DynCartStore,
        settings_store: DynSettingsStore,
        options: StateOptions,
    ) -> Result<Self, DispatchError> {
        let dispatcher = WebhookDispatcher::new(options.webhook_timeout)?;
        let settings = SettingsService::new(settings_store, options.tracker_defaults);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                tracker: CartTracker::new(carts.clone()),
                reconciler: OrderReconciler::new(carts.clone()),
                sweeper: Sweeper::new(
                    carts.clone(),
                    settings.clone(),
                    dispatcher.clone(),
                    options.dispatch_concurrency,
                ),
                admin: AdminService::new(carts.clone(), settings.clone(), dispatcher),
                settings,
                admin_token: options.admin_token,
                carts,
            }),
        })
    }

    #[must_use]
    pub fn carts(&self) -> &DynCartStore {
        &self.inner.carts
    }

    /// Token required by the admin API, if any.
    #[must_use]
    pub fn admin_token(&self) -> Option<&SecretString> {
        self.inner.admin_token.as_ref()
    }

    #[must_use]
    pub fn tracker(&self) -> &CartTracker {
        &self.inner.tracker
    }

    #[must_use]
    pub fn reconciler(&self) -> &OrderReconciler {
        &self.inner.reconciler
    }

    #[must_use]
    pub fn settings(&self) -> &SettingsService {
        &self.inner.settings
    }

    #[must_use]
    pub fn sweeper(&self) -> &Sweeper {
        &self.inner.sweeper
    }

    #[must_use]
    pub fn admin(&self) -> &AdminService {
        &self.inner.admin
    }
}
