//! Shared test infrastructure
//!
//! Builds a fully wired service stack over a temp-dir store, with a
//! recording notification queue instead of the channel-backed one.

#![allow(dead_code)]

use std::sync::{Arc, Mutex, Once};

use gatherly::services::notification::{NotificationError, NotificationJob, NotificationQueue};
use gatherly::{ActivityForm, Caller, EntityStore, ServiceFactory, Settings};

static INIT: Once = Once::new();

/// Initialize test environment
pub fn init_test_env() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt::try_init();
    });
}

/// Notification queue that records every job instead of dispatching it.
#[derive(Clone, Default)]
pub struct RecordingQueue {
    jobs: Arc<Mutex<Vec<NotificationJob>>>,
}

impl RecordingQueue {
    pub fn jobs(&self) -> Vec<NotificationJob> {
        self.jobs.lock().unwrap().clone()
    }
}

impl NotificationQueue for RecordingQueue {
    fn enqueue(&self, job: NotificationJob) -> Result<(), NotificationError> {
        self.jobs.lock().unwrap().push(job);
        Ok(())
    }
}

/// A wired service stack over a throwaway store.
pub struct TestContext {
    pub services: ServiceFactory,
    pub store: EntityStore,
    pub queue: RecordingQueue,
    _temp_dir: tempfile::TempDir,
}

impl TestContext {
    pub fn new() -> Self {
        init_test_env();
        let temp_dir = tempfile::tempdir().expect("temp dir");

        let mut settings = Settings::default();
        settings.store.path = temp_dir.path().join("gatherly.db").display().to_string();
        // Tight, generous retry schedule so contention tests always resolve
        // to a business outcome rather than exhausted retries.
        settings.transaction.max_attempts = 20;
        settings.transaction.base_delay_ms = 1;
        settings.transaction.max_delay_ms = 10;

        let store = EntityStore::from_config(&settings.store).expect("open store");
        let queue = RecordingQueue::default();
        let services = ServiceFactory::with_store(&settings, store.clone(), Arc::new(queue.clone()));

        Self {
            services,
            store,
            queue,
            _temp_dir: temp_dir,
        }
    }
}

pub fn caller(user_id: &str) -> Caller {
    Caller {
        user_id: user_id.to_string(),
        email: format!("{user_id}@example.com"),
    }
}

pub fn activity_form(name: &str, max_seats: u32) -> ActivityForm {
    ActivityForm {
        name: name.to_string(),
        max_seats,
        ..Default::default()
    }
}
