//! Services module
//!
//! This module contains the business logic services built on the entity
//! store.

pub mod identity;
pub mod notification;
pub mod profile;
pub mod queries;
pub mod registration;

// Re-export commonly used services
pub use identity::{Caller, Identity, IdentityService};
pub use notification::{JobKind, NotificationJob, NotificationQueue, TaskQueue};
pub use profile::ProfileService;
pub use queries::ActivityQueryService;
pub use registration::RegistrationService;

use std::sync::Arc;

use crate::config::Settings;
use crate::store::{EntityStore, RetryPolicy};
use crate::utils::errors::Result;

/// Service factory for creating and managing all services
#[derive(Clone)]
pub struct ServiceFactory {
    pub identity_service: IdentityService,
    pub profile_service: ProfileService,
    pub registration_service: RegistrationService,
    pub query_service: ActivityQueryService,
}

impl ServiceFactory {
    /// Create a new ServiceFactory with all services initialized.
    ///
    /// Opens the configured store and spawns the notification worker, so
    /// this must run inside a tokio runtime.
    pub fn new(settings: &Settings) -> Result<Self> {
        let store = EntityStore::from_config(&settings.store)?;
        let (queue, receiver) = TaskQueue::new();
        tokio::spawn(notification::run_worker(receiver));
        Ok(Self::with_store(settings, store, Arc::new(queue)))
    }

    /// Wire the services over an already-open store and notification queue.
    pub fn with_store(
        settings: &Settings,
        store: EntityStore,
        notifications: Arc<dyn NotificationQueue>,
    ) -> Self {
        let retry = RetryPolicy::from_config(&settings.transaction);
        let identity_service = IdentityService::new(store.clone(), retry.clone());
        let profile_service = ProfileService::new(store.clone(), retry.clone());
        let registration_service = RegistrationService::new(store.clone(), retry, notifications);
        let query_service = ActivityQueryService::new(store);

        Self {
            identity_service,
            profile_service,
            registration_service,
            query_service,
        }
    }

    /// Health check for all services
    pub fn health_check(&self) -> ServiceHealthStatus {
        ServiceHealthStatus {
            store_healthy: self.query_service.store().health_check().is_ok(),
        }
    }
}

/// Health status for all services
#[derive(Debug, Clone)]
pub struct ServiceHealthStatus {
    pub store_healthy: bool,
}

impl ServiceHealthStatus {
    /// Check if all critical services are healthy
    pub fn is_healthy(&self) -> bool {
        self.store_healthy
    }
}
