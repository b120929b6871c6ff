//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::backend::DataService;
use crate::config::PortalConfig;
use crate::services::{Catalog, NotificationHub};

const DEFAULT_RESUME_BUCKET: &str = "resumes";
const DEFAULT_SIGNED_URL_TTL: Duration = Duration::from_secs(3600);

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the data
/// service, configuration and the shared caches.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: PortalConfig,
    data: Arc<dyn DataService>,
    catalog: Catalog,
    notifications: NotificationHub,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: PortalConfig, data: Arc<dyn DataService>) -> Self {
        let catalog = Catalog::new(config.catalog_ttl);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                data,
                catalog,
                notifications: NotificationHub::new(),
            }),
        }
    }

    /// Get a reference to the portal configuration.
    #[must_use]
    pub fn config(&self) -> &PortalConfig {
        &self.inner.config
    }

    /// Get a reference to the external data service.
    #[must_use]
    pub fn data(&self) -> &dyn DataService {
        self.inner.data.as_ref()
    }

    /// Get a reference to the public catalog cache.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    /// Get a reference to the dashboard notification hub.
    #[must_use]
    pub fn notifications(&self) -> &NotificationHub {
        &self.inner.notifications
    }

    /// Start the background subscription that feeds the dashboard.
    pub fn start_notifications(&self) -> JoinHandle<()> {
        self.inner
            .notifications
            .spawn(Arc::clone(&self.inner.data))
    }

    /// Storage bucket holding resumes.
    #[must_use]
    pub fn resume_bucket(&self) -> &str {
        self.inner
            .config
            .supabase
            .as_ref()
            .map_or(DEFAULT_RESUME_BUCKET, |s| s.resume_bucket.as_str())
    }

    /// Lifetime of resume download links.
    #[must_use]
    pub fn signed_url_ttl(&self) -> Duration {
        self.inner
            .config
            .supabase
            .as_ref()
            .map_or(DEFAULT_SIGNED_URL_TTL, |s| s.signed_url_ttl)
    }
}
