//! Profile aggregate.
//!
//! A Profile is a user's descriptive fields plus the ordered list of
//! activities they attend. Membership has no duplicates; the coordinator
//! checks before appending, `add_registration` itself does not deduplicate.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::key::{ActivityKey, ProfileKey};

/// Typed conditions raised by Profile mutations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProfileError {
    #[error("not registered for activity: {key}")]
    NotAMember { key: ActivityKey },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Third,
    #[default]
    Unspecified,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Stable key assigned by the identity layer, immutable.
    pub user_id: String,
    pub display_name: String,
    pub email: String,
    pub gender: Gender,
    /// Keys of the activities this user registered for, in registration
    /// order.
    pub activities_to_attend: Vec<ActivityKey>,
}

/// Client-supplied fields for updating a Profile. Absent fields are left
/// untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileForm {
    pub display_name: Option<String>,
    pub gender: Option<Gender>,
}

impl Profile {
    pub fn new(
        user_id: impl Into<String>,
        display_name: impl Into<String>,
        email: impl Into<String>,
        gender: Gender,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
            email: email.into(),
            gender,
            activities_to_attend: Vec::new(),
        }
    }

    /// Construct a first-touch Profile: display name derived from the email
    /// local part, gender unspecified.
    pub fn with_defaults(user_id: impl Into<String>, email: impl Into<String>) -> Self {
        let email = email.into();
        let display_name = default_display_name(&email).to_string();
        Self::new(user_id, display_name, email, Gender::Unspecified)
    }

    pub fn key(&self) -> ProfileKey {
        ProfileKey::new(&self.user_id)
    }

    /// Overwrite only the fields the caller supplied.
    pub fn update(&mut self, display_name: Option<String>, gender: Option<Gender>) {
        if let Some(display_name) = display_name {
            self.display_name = display_name;
        }
        if let Some(gender) = gender {
            self.gender = gender;
        }
    }

    pub fn attends(&self, key: &ActivityKey) -> bool {
        self.activities_to_attend.contains(key)
    }

    /// Append a membership. Duplicate detection is the caller's job.
    pub fn add_registration(&mut self, key: ActivityKey) {
        self.activities_to_attend.push(key);
    }

    /// Remove a membership.
    pub fn remove_registration(&mut self, key: &ActivityKey) -> Result<(), ProfileError> {
        let position = self
            .activities_to_attend
            .iter()
            .position(|k| k == key)
            .ok_or_else(|| ProfileError::NotAMember { key: key.clone() })?;
        self.activities_to_attend.remove(position);
        Ok(())
    }
}

/// The part of the email address before the `@`.
fn default_display_name(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(owner: &str, id: i64) -> ActivityKey {
        ActivityKey::new(ProfileKey::new(owner), id)
    }

    #[test]
    fn defaults_derive_display_name_from_email() {
        let profile = Profile::with_defaults("u1", "carol.baker@example.com");
        assert_eq!(profile.display_name, "carol.baker");
        assert_eq!(profile.gender, Gender::Unspecified);
        assert!(profile.activities_to_attend.is_empty());
    }

    #[test]
    fn update_touches_only_supplied_fields() {
        let mut profile = Profile::with_defaults("u1", "carol@example.com");
        profile.update(None, Some(Gender::Third));
        assert_eq!(profile.display_name, "carol");
        assert_eq!(profile.gender, Gender::Third);

        profile.update(Some("Carol B".to_string()), None);
        assert_eq!(profile.display_name, "Carol B");
        assert_eq!(profile.gender, Gender::Third);
    }

    #[test]
    fn memberships_keep_registration_order() {
        let mut profile = Profile::with_defaults("u1", "carol@example.com");
        profile.add_registration(key("alice", 2));
        profile.add_registration(key("bob", 1));
        assert!(profile.attends(&key("alice", 2)));
        assert_eq!(
            profile.activities_to_attend,
            vec![key("alice", 2), key("bob", 1)]
        );
    }

    #[test]
    fn removing_an_unknown_membership_fails() {
        let mut profile = Profile::with_defaults("u1", "carol@example.com");
        profile.add_registration(key("alice", 2));

        assert!(matches!(
            profile.remove_registration(&key("alice", 3)),
            Err(ProfileError::NotAMember { .. })
        ));

        profile.remove_registration(&key("alice", 2)).unwrap();
        assert!(!profile.attends(&key("alice", 2)));
    }
}
