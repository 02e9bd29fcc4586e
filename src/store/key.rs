//! Entity keys.
//!
//! Every stored record is addressed by an explicit composite key: the
//! ownership partition it lives in plus a local id. A Profile is its own
//! partition; an Activity lives in the partition of the Profile that created
//! it, which is what allows one transaction to read-modify-write an Activity
//! together with a Profile.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::store::error::StoreError;

/// Key of a Profile record. The user id doubles as the partition id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProfileKey(String);

impl ProfileKey {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self(user_id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn record_key(&self) -> RecordKey {
        RecordKey {
            kind: RecordKind::Profile,
            partition: self.0.clone(),
            local: self.0.clone(),
        }
    }
}

impl fmt::Display for ProfileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key of an Activity record, partitioned under its owning Profile.
///
/// The string form `<owner>/<id>` is the websafe representation handed to
/// clients and parsed back at the API boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActivityKey {
    pub owner: ProfileKey,
    pub id: i64,
}

impl ActivityKey {
    pub fn new(owner: ProfileKey, id: i64) -> Self {
        Self { owner, id }
    }

    pub(crate) fn record_key(&self) -> RecordKey {
        RecordKey {
            kind: RecordKind::Activity,
            partition: self.owner.as_str().to_string(),
            local: self.id.to_string(),
        }
    }
}

impl fmt::Display for ActivityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.id)
    }
}

impl FromStr for ActivityKey {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Owner ids are opaque and may contain separators, so the numeric
        // local id is taken from the right.
        let (owner, id) = s
            .rsplit_once('/')
            .ok_or_else(|| StoreError::MalformedKey(s.to_string()))?;
        if owner.is_empty() {
            return Err(StoreError::MalformedKey(s.to_string()));
        }
        let id: i64 = id
            .parse()
            .map_err(|_| StoreError::MalformedKey(s.to_string()))?;
        Ok(ActivityKey::new(ProfileKey::new(owner), id))
    }
}

/// Record kinds persisted by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum RecordKind {
    Profile,
    Activity,
    IdentityAlias,
}

impl RecordKind {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            RecordKind::Profile => "profile",
            RecordKind::Activity => "activity",
            RecordKind::IdentityAlias => "identity_alias",
        }
    }
}

/// Fully-qualified address of one stored record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct RecordKey {
    pub(crate) kind: RecordKind,
    pub(crate) partition: String,
    pub(crate) local: String,
}

/// Key of the email → user-id alias record used by identity resolution.
/// Alias records form their own single-record partitions.
pub(crate) fn identity_alias_key(email: &str) -> RecordKey {
    RecordKey {
        kind: RecordKind::IdentityAlias,
        partition: email.to_string(),
        local: email.to_string(),
    }
}
