//! Read-only listing surface
//!
//! Display queries consume the store directly, outside any transaction, and
//! carry no invariant logic.

use tracing::debug;

use crate::models::Activity;
use crate::services::identity::Caller;
use crate::store::key::{ActivityKey, ProfileKey};
use crate::store::EntityStore;
use crate::utils::errors::{GatherlyError, Result};

#[derive(Clone)]
pub struct ActivityQueryService {
    store: EntityStore,
}

impl ActivityQueryService {
    pub fn new(store: EntityStore) -> Self {
        Self { store }
    }

    /// Fetch one Activity by key.
    pub fn get_activity(&self, key: &ActivityKey) -> Result<Activity> {
        self.store
            .get_activity(key)?
            .ok_or_else(|| GatherlyError::ActivityNotFound {
                key: key.to_string(),
            })
    }

    /// Activities the caller created, ordered by name.
    pub fn activities_created_by(&self, caller: &Caller) -> Result<Vec<Activity>> {
        debug!(user_id = %caller.user_id, "listing created activities");
        let mut activities = self
            .store
            .list_activities(&ProfileKey::new(&caller.user_id))?;
        activities.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(activities)
    }

    /// Activities the caller registered for, in registration order.
    ///
    /// Unlike the mutating paths this does not lazily create the Profile;
    /// a user the system has never seen has nothing to attend.
    pub fn activities_to_attend(&self, caller: &Caller) -> Result<Vec<Activity>> {
        debug!(user_id = %caller.user_id, "listing attended activities");
        let profile = self
            .store
            .get_profile(&ProfileKey::new(&caller.user_id))?
            .ok_or_else(|| GatherlyError::ProfileNotFound {
                user_id: caller.user_id.clone(),
            })?;

        let mut activities = Vec::with_capacity(profile.activities_to_attend.len());
        for key in &profile.activities_to_attend {
            if let Some(activity) = self.store.get_activity(key)? {
                activities.push(activity);
            }
        }
        Ok(activities)
    }

    pub(crate) fn store(&self) -> &EntityStore {
        &self.store
    }
}
