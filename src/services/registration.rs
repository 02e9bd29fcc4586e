//! Registration coordinator
//!
//! Orchestrates the Activity and Profile aggregates inside single store
//! transactions. The seat counter and the membership list are always written
//! together, in the same transaction, so two racing registrations for the
//! last seat can never both win: the loser's commit fails on the version
//! check, the retry re-reads a sold-out activity, and the call surfaces a
//! Conflict instead of overselling.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::models::{Activity, ActivityError, ActivityForm};
use crate::services::identity::Caller;
use crate::services::notification::{NotificationJob, NotificationQueue};
use crate::services::profile::load_or_create;
use crate::store::key::{ActivityKey, ProfileKey};
use crate::store::{run_with_retry, EntityStore, RetryPolicy};
use crate::utils::errors::{GatherlyError, Result};

#[derive(Clone)]
pub struct RegistrationService {
    store: EntityStore,
    retry: RetryPolicy,
    notifications: Arc<dyn NotificationQueue>,
}

impl RegistrationService {
    pub fn new(
        store: EntityStore,
        retry: RetryPolicy,
        notifications: Arc<dyn NotificationQueue>,
    ) -> Self {
        Self {
            store,
            retry,
            notifications,
        }
    }

    /// Create an Activity in the caller's partition and persist it together
    /// with the caller's Profile.
    pub async fn create_activity(&self, caller: &Caller, form: &ActivityForm) -> Result<Activity> {
        let owner = ProfileKey::new(&caller.user_id);
        // Allocated before the transaction so a contended retry reuses the
        // same id instead of minting a second activity.
        let activity_id = self.store.allocate_activity_id(&owner)?;
        debug!(user_id = %caller.user_id, activity_id, "creating activity");

        let (activity, owner_email) = run_with_retry(&self.store, &self.retry, |txn| {
            let profile = load_or_create(txn, caller)?;
            let activity =
                Activity::new(activity_id, &caller.user_id, form).map_err(invalid_form)?;
            txn.put_activity(&activity)?;
            txn.put_profile(&profile)?;
            Ok::<_, GatherlyError>((activity, profile.email))
        })
        .await?;

        // Best-effort: a lost confirmation never fails the creation itself.
        let job = NotificationJob::confirmation_email(&owner_email, &activity);
        if let Err(err) = self.notifications.enqueue(job) {
            warn!(activity_id, error = %err, "failed to enqueue confirmation email");
        }

        info!(user_id = %caller.user_id, activity_id, name = %activity.name, "activity created");
        Ok(activity)
    }

    /// Update an Activity. Only the owner may update, and the new capacity
    /// must cover the seats already allocated.
    pub async fn update_activity(
        &self,
        caller: &Caller,
        key: &ActivityKey,
        form: &ActivityForm,
    ) -> Result<Activity> {
        let activity = run_with_retry(&self.store, &self.retry, |txn| {
            let Some(mut activity) = txn.get_activity(key)? else {
                return Err(GatherlyError::ActivityNotFound {
                    key: key.to_string(),
                });
            };
            if activity.owner_id != caller.user_id {
                return Err(GatherlyError::Forbidden(
                    "only the owner can update the activity".to_string(),
                ));
            }
            activity.apply_update(form).map_err(|err| match err {
                ActivityError::MissingName => invalid_form(err),
                other => GatherlyError::Conflict(other.to_string()),
            })?;
            txn.put_activity(&activity)?;
            Ok(activity)
        })
        .await?;

        info!(user_id = %caller.user_id, key = %key, "activity updated");
        Ok(activity)
    }

    /// Register the caller for an Activity, booking a seat and recording the
    /// membership in one transaction.
    pub async fn register(&self, caller: &Caller, key: &ActivityKey) -> Result<bool> {
        let registered = run_with_retry(&self.store, &self.retry, |txn| {
            let Some(mut activity) = txn.get_activity(key)? else {
                return Err(GatherlyError::ActivityNotFound {
                    key: key.to_string(),
                });
            };
            let mut profile = load_or_create(txn, caller)?;

            if profile.attends(key) {
                return Err(GatherlyError::Conflict(
                    "you have already registered for this activity".to_string(),
                ));
            }
            if activity.available_seats == 0 {
                return Err(GatherlyError::Conflict(
                    "there are no seats available".to_string(),
                ));
            }

            activity
                .book_seats(1)
                .map_err(|err| GatherlyError::Conflict(err.to_string()))?;
            profile.add_registration(key.clone());
            txn.put_profile(&profile)?;
            txn.put_activity(&activity)?;
            Ok(true)
        })
        .await?;

        info!(user_id = %caller.user_id, key = %key, "registered for activity");
        Ok(registered)
    }

    /// Unregister the caller from an Activity, releasing the seat. A caller
    /// with no membership gets `Ok(false)` and nothing is persisted.
    pub async fn unregister(&self, caller: &Caller, key: &ActivityKey) -> Result<bool> {
        let released = run_with_retry(&self.store, &self.retry, |txn| {
            let Some(mut activity) = txn.get_activity(key)? else {
                return Err(GatherlyError::ActivityNotFound {
                    key: key.to_string(),
                });
            };
            let mut profile = load_or_create(txn, caller)?;

            if !profile.attends(key) {
                return Ok(false);
            }

            profile
                .remove_registration(key)
                .map_err(|err| GatherlyError::Conflict(err.to_string()))?;
            activity
                .release_seats(1)
                .map_err(|err| GatherlyError::Conflict(err.to_string()))?;
            txn.put_profile(&profile)?;
            txn.put_activity(&activity)?;
            Ok(true)
        })
        .await?;

        if released {
            info!(user_id = %caller.user_id, key = %key, "unregistered from activity");
        } else {
            debug!(user_id = %caller.user_id, key = %key, "unregister without membership is a no-op");
        }
        Ok(released)
    }
}

fn invalid_form(err: ActivityError) -> GatherlyError {
    GatherlyError::InvalidInput(err.to_string())
}
