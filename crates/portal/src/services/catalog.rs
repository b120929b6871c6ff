//! Public catalog cache.
//!
//! The public pages read services and job listings through this cache
//! (`moka`, 5 minute TTL by default). Admin writes to either table call
//! [`Catalog::invalidate`], so the next public read refetches.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::{debug, instrument};

use jack_machine_core::{JobId, JobListing, Service};

use crate::backend::DataService;
use crate::db::{JobRepository, RepositoryError, ServiceRepository};

/// Cache key for catalog entries.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
enum CacheKey {
    Services,
    Jobs,
}

/// Cached value types.
#[derive(Debug, Clone)]
enum CacheValue {
    Services(Arc<Vec<Service>>),
    Jobs(Arc<Vec<JobListing>>),
}

/// Read-through cache over the `services` and `job_listings` tables.
#[derive(Clone)]
pub struct Catalog {
    cache: Cache<CacheKey, CacheValue>,
}

impl Catalog {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        let cache = Cache::builder().max_capacity(16).time_to_live(ttl).build();
        Self { cache }
    }

    /// All services, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the cache is cold and the fetch fails.
    #[instrument(skip(self, data))]
    pub async fn services(
        &self,
        data: &dyn DataService,
    ) -> Result<Arc<Vec<Service>>, RepositoryError> {
        if let Some(CacheValue::Services(services)) = self.cache.get(&CacheKey::Services).await {
            debug!("Cache hit for services");
            return Ok(services);
        }

        let services = Arc::new(ServiceRepository::new(data).list().await?);
        self.cache
            .insert(CacheKey::Services, CacheValue::Services(Arc::clone(&services)))
            .await;
        Ok(services)
    }

    /// All job listings, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the cache is cold and the fetch fails.
    #[instrument(skip(self, data))]
    pub async fn jobs(&self, data: &dyn DataService) -> Result<Arc<Vec<JobListing>>, RepositoryError> {
        if let Some(CacheValue::Jobs(jobs)) = self.cache.get(&CacheKey::Jobs).await {
            debug!("Cache hit for jobs");
            return Ok(jobs);
        }

        let jobs = Arc::new(JobRepository::new(data).list().await?);
        self.cache
            .insert(CacheKey::Jobs, CacheValue::Jobs(Arc::clone(&jobs)))
            .await;
        Ok(jobs)
    }

    /// One job listing, served from the cached list.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the cache is cold and the fetch fails.
    pub async fn job(
        &self,
        data: &dyn DataService,
        id: JobId,
    ) -> Result<Option<JobListing>, RepositoryError> {
        let jobs = self.jobs(data).await?;
        Ok(jobs.iter().find(|job| job.id == id).cloned())
    }

    /// Drop every cached entry.
    pub async fn invalidate(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
        debug!("Catalog cache invalidated");
    }
}
