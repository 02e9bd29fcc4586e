//! Profile service
//!
//! Transactional access to the caller's own Profile. Profiles are created
//! lazily on first touch; `load_or_create` is the one get-or-create path
//! shared by every operation that needs the caller's Profile.

use tracing::{debug, info};

use crate::models::{Profile, ProfileForm};
use crate::services::identity::Caller;
use crate::store::key::ProfileKey;
use crate::store::{run_with_retry, EntityStore, RetryPolicy, Txn};
use crate::utils::errors::{GatherlyError, Result};

/// Fetch the caller's Profile from the transaction, or build the first-touch
/// default without persisting it. Callers decide whether the transaction
/// writes it back.
pub(crate) fn load_or_create(txn: &mut Txn<'_>, caller: &Caller) -> Result<Profile> {
    match txn.get_profile(&ProfileKey::new(&caller.user_id))? {
        Some(profile) => Ok(profile),
        None => Ok(Profile::with_defaults(&caller.user_id, &caller.email)),
    }
}

#[derive(Clone)]
pub struct ProfileService {
    store: EntityStore,
    retry: RetryPolicy,
}

impl ProfileService {
    pub fn new(store: EntityStore, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    /// Return the caller's Profile, creating and persisting the first-touch
    /// default when none exists yet.
    pub async fn get_profile(&self, caller: &Caller) -> Result<Profile> {
        debug!(user_id = %caller.user_id, "fetching profile");
        run_with_retry(&self.store, &self.retry, |txn| {
            if let Some(profile) = txn.get_profile(&ProfileKey::new(&caller.user_id))? {
                return Ok::<_, GatherlyError>(profile);
            }
            let profile = Profile::with_defaults(&caller.user_id, &caller.email);
            txn.put_profile(&profile)?;
            Ok(profile)
        })
        .await
    }

    /// Create or update the caller's Profile from the submitted form.
    pub async fn save_profile(&self, caller: &Caller, form: &ProfileForm) -> Result<Profile> {
        let profile = run_with_retry(&self.store, &self.retry, |txn| {
            let mut profile = load_or_create(txn, caller)?;
            profile.update(form.display_name.clone(), form.gender);
            txn.put_profile(&profile)?;
            Ok::<_, GatherlyError>(profile)
        })
        .await?;

        info!(user_id = %caller.user_id, "profile saved");
        Ok(profile)
    }

    #[allow(dead_code)]
    pub(crate) fn store(&self) -> &EntityStore {
        &self.store
    }
}
