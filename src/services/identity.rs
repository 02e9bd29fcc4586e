//! Identity resolution
//!
//! The identity provider hands us an email and, usually, a stable user id.
//! Some clients arrive without the persistent id; those are resolved once
//! through a store-backed alias keyed by email, and every later call gets
//! the same id back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::store::key::identity_alias_key;
use crate::store::{run_with_retry, EntityStore, RetryPolicy};
use crate::utils::errors::{GatherlyError, Result};

/// What the identity provider supplies for the current caller.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: Option<String>,
    pub email: String,
}

/// A fully resolved caller. Holding one implies the request is
/// authenticated.
#[derive(Debug, Clone)]
pub struct Caller {
    pub user_id: String,
    pub email: String,
}

/// Persistent email → user-id mapping for clients that arrive without a
/// stable id.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct IdentityAlias {
    email: String,
    user_id: String,
    issued_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct IdentityService {
    store: EntityStore,
    retry: RetryPolicy,
}

impl IdentityService {
    pub fn new(store: EntityStore, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    /// Turn the provider-supplied identity into a [`Caller`].
    ///
    /// A missing identity is `Unauthenticated`. A missing user id is
    /// resolved through the stored alias, creating one on first touch;
    /// the racing loser of concurrent first touches adopts the winner's id.
    pub async fn resolve(&self, identity: Option<Identity>) -> Result<Caller> {
        let identity = identity.ok_or(GatherlyError::Unauthenticated)?;
        if let Some(user_id) = identity.user_id {
            return Ok(Caller {
                user_id,
                email: identity.email,
            });
        }

        debug!(email = %identity.email, "identity has no persistent user id, resolving via alias");
        let email = identity.email.clone();
        // The candidate id is allocated outside the transaction so retries
        // stay idempotent; it is simply discarded when an alias already
        // exists.
        let candidate = format!("u{}", self.store.allocate_user_id()?);

        let alias_key = identity_alias_key(&email);
        let user_id: String = run_with_retry(&self.store, &self.retry, |txn| {
            if let Some(alias) = txn.get_json::<IdentityAlias>(&alias_key)? {
                return Ok::<_, GatherlyError>(alias.user_id);
            }
            let alias = IdentityAlias {
                email: email.clone(),
                user_id: candidate.clone(),
                issued_at: Utc::now(),
            };
            txn.put_json(alias_key.clone(), &alias)?;
            Ok(alias.user_id)
        })
        .await?;

        info!(email = %identity.email, user_id = %user_id, "resolved caller identity");
        Ok(Caller {
            user_id,
            email: identity.email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> IdentityService {
        IdentityService::new(EntityStore::open_in_memory().unwrap(), RetryPolicy::default())
    }

    #[tokio::test]
    async fn missing_identity_is_unauthenticated() {
        let err = service().resolve(None).await.unwrap_err();
        assert!(matches!(err, GatherlyError::Unauthenticated));
    }

    #[tokio::test]
    async fn supplied_user_ids_pass_through() {
        let caller = service()
            .resolve(Some(Identity {
                user_id: Some("u-supplied".to_string()),
                email: "carol@example.com".to_string(),
            }))
            .await
            .unwrap();
        assert_eq!(caller.user_id, "u-supplied");
    }

    #[tokio::test]
    async fn missing_user_ids_resolve_to_a_stable_alias() {
        let service = service();
        let identity = Identity {
            user_id: None,
            email: "carol@example.com".to_string(),
        };

        let first = service.resolve(Some(identity.clone())).await.unwrap();
        let second = service.resolve(Some(identity)).await.unwrap();
        assert_eq!(first.user_id, second.user_id);
        assert!(first.user_id.starts_with('u'));
    }

    #[tokio::test]
    async fn distinct_emails_get_distinct_ids() {
        let service = service();
        let a = service
            .resolve(Some(Identity {
                user_id: None,
                email: "a@example.com".to_string(),
            }))
            .await
            .unwrap();
        let b = service
            .resolve(Some(Identity {
                user_id: None,
                email: "b@example.com".to_string(),
            }))
            .await
            .unwrap();
        assert_ne!(a.user_id, b.user_id);
    }
}
