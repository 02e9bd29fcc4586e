//! Activity aggregate.
//!
//! An Activity is a capacity-bounded event owned by the Profile that created
//! it. All mutations preserve the seat-accounting invariant
//! `allocated = max_seats - available_seats >= 0`.

use std::fmt;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::key::{ActivityKey, ProfileKey};

pub const DEFAULT_LOCATION: &str = "Default Location";
pub const DEFAULT_TOPICS: [&str; 2] = ["Default", "Topic"];

/// Typed conditions raised by Activity mutations. The coordinator maps these
/// to the public taxonomy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActivityError {
    #[error("the name is required")]
    MissingName,

    /// Booking more seats than are currently available.
    #[error("{}", seats_message(.available))]
    CapacityExceeded { available: u32, requested: u32 },

    /// A mutation would break the seat-accounting invariant.
    #[error("{0}")]
    InvariantViolation(String),
}

fn seats_message(available: &u32) -> String {
    if *available == 0 {
        "there are no seats available".to_string()
    } else {
        format!("there are only {available} seats available")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    /// Assigned once from the owner partition's sequence, immutable.
    pub id: i64,
    /// User id of the creating Profile; doubles as the storage partition.
    pub owner_id: String,
    pub name: String,
    pub description: Option<String>,
    pub topics: Vec<String>,
    pub location: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// Starting month (1-12) derived from `start_time`, kept for range
    /// filtering. Absent whenever `start_time` is absent.
    pub start_month: Option<u32>,
    pub max_seats: u32,
    pub available_seats: u32,
}

/// Client-supplied fields for creating or updating an Activity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivityForm {
    pub name: String,
    pub description: Option<String>,
    pub topics: Option<Vec<String>>,
    pub location: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub max_seats: u32,
}

impl Activity {
    /// Construct a new Activity from a form. No seats are allocated yet, so
    /// `available_seats` starts equal to `max_seats`.
    pub fn new(
        id: i64,
        owner_id: impl Into<String>,
        form: &ActivityForm,
    ) -> Result<Self, ActivityError> {
        let mut activity = Activity {
            id,
            owner_id: owner_id.into(),
            name: String::new(),
            description: None,
            topics: Vec::new(),
            location: String::new(),
            start_time: None,
            end_time: None,
            start_month: None,
            max_seats: 0,
            available_seats: 0,
        };
        // Creation and update derive every field through the same path.
        activity.apply_update(form)?;
        Ok(activity)
    }

    pub fn key(&self) -> ActivityKey {
        ActivityKey::new(ProfileKey::new(&self.owner_id), self.id)
    }

    pub fn allocated_seats(&self) -> u32 {
        self.max_seats - self.available_seats
    }

    /// Recompute all mutable fields from the form, preserving the seats
    /// already allocated. The activity is left untouched on rejection.
    pub fn apply_update(&mut self, form: &ActivityForm) -> Result<(), ActivityError> {
        let name = form.name.trim();
        if name.is_empty() {
            return Err(ActivityError::MissingName);
        }
        let allocated = self.allocated_seats();
        if form.max_seats < allocated {
            return Err(ActivityError::InvariantViolation(format!(
                "{} seats are already allocated, but max_seats was set to {}",
                allocated, form.max_seats
            )));
        }

        self.name = name.to_string();
        self.description = form.description.clone();
        self.topics = match &form.topics {
            Some(topics) if !topics.is_empty() => topics.clone(),
            _ => DEFAULT_TOPICS.iter().map(|t| t.to_string()).collect(),
        };
        self.location = form
            .location
            .clone()
            .unwrap_or_else(|| DEFAULT_LOCATION.to_string());
        self.start_time = form.start_time;
        self.end_time = form.end_time;
        self.start_month = form.start_time.map(|t| t.month());
        self.max_seats = form.max_seats;
        self.available_seats = self.max_seats - allocated;
        Ok(())
    }

    /// Take `requested` seats out of the available pool.
    pub fn book_seats(&mut self, requested: u32) -> Result<(), ActivityError> {
        if requested > self.available_seats {
            return Err(ActivityError::CapacityExceeded {
                available: self.available_seats,
                requested,
            });
        }
        self.available_seats -= requested;
        Ok(())
    }

    /// Return `count` seats to the available pool.
    pub fn release_seats(&mut self, count: u32) -> Result<(), ActivityError> {
        match self.available_seats.checked_add(count) {
            Some(total) if total <= self.max_seats => {
                self.available_seats = total;
                Ok(())
            }
            _ => Err(ActivityError::InvariantViolation(format!(
                "releasing {} seats would exceed the capacity of {}",
                count, self.max_seats
            ))),
        }
    }
}

/// Human-readable snapshot used in confirmation notifications.
impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Id: {}", self.id)?;
        writeln!(f, "Name: {}", self.name)?;
        writeln!(f, "Location: {}", self.location)?;
        if !self.topics.is_empty() {
            writeln!(f, "Topics:")?;
            for topic in &self.topics {
                writeln!(f, "\t{topic}")?;
            }
        }
        if let Some(start) = self.start_time {
            writeln!(f, "Starts: {}", start.to_rfc3339())?;
        }
        if let Some(end) = self.end_time {
            writeln!(f, "Ends: {}", end.to_rfc3339())?;
        }
        write!(f, "Max seats: {}", self.max_seats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn form(name: &str, max_seats: u32) -> ActivityForm {
        ActivityForm {
            name: name.to_string(),
            max_seats,
            ..Default::default()
        }
    }

    #[test]
    fn create_applies_defaults() {
        let activity = Activity::new(1, "alice", &form("Picnic", 10)).unwrap();
        assert_eq!(activity.location, DEFAULT_LOCATION);
        assert_eq!(activity.topics, vec!["Default", "Topic"]);
        assert_eq!(activity.available_seats, 10);
        assert_eq!(activity.start_month, None);
    }

    #[test]
    fn empty_topic_list_falls_back_to_defaults() {
        let mut f = form("Picnic", 5);
        f.topics = Some(vec![]);
        let activity = Activity::new(1, "alice", &f).unwrap();
        assert_eq!(activity.topics, vec!["Default", "Topic"]);
    }

    #[test]
    fn create_requires_a_name() {
        assert_eq!(
            Activity::new(1, "alice", &form("  ", 10)),
            Err(ActivityError::MissingName)
        );
    }

    #[test]
    fn start_month_follows_start_time() {
        let mut f = form("Picnic", 5);
        f.start_time = Some(Utc.with_ymd_and_hms(2024, 7, 14, 12, 0, 0).unwrap());
        let mut activity = Activity::new(1, "alice", &f).unwrap();
        assert_eq!(activity.start_month, Some(7));

        f.start_time = None;
        activity.apply_update(&f).unwrap();
        assert_eq!(activity.start_month, None);
    }

    #[test]
    fn update_preserves_allocated_seats() {
        let mut activity = Activity::new(1, "alice", &form("Picnic", 10)).unwrap();
        activity.book_seats(4).unwrap();

        activity.apply_update(&form("Picnic", 6)).unwrap();
        assert_eq!(activity.max_seats, 6);
        assert_eq!(activity.available_seats, 2);
        assert_eq!(activity.allocated_seats(), 4);
    }

    #[test]
    fn update_rejects_capacity_below_allocation_and_leaves_state_alone() {
        let mut activity = Activity::new(1, "alice", &form("Picnic", 10)).unwrap();
        activity.book_seats(4).unwrap();
        let before = activity.clone();

        let err = activity.apply_update(&form("Picnic", 3)).unwrap_err();
        assert!(matches!(err, ActivityError::InvariantViolation(_)));
        assert_eq!(activity, before);
    }

    #[test]
    fn create_then_update_with_same_form_is_stable() {
        let mut f = form("Picnic", 10);
        f.start_time = Some(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap());
        f.location = Some("The park".to_string());

        let created = Activity::new(1, "alice", &f).unwrap();
        let mut updated = created.clone();
        updated.apply_update(&f).unwrap();
        assert_eq!(updated, created);
    }

    #[test]
    fn booking_distinguishes_sold_out_from_insufficient() {
        let mut activity = Activity::new(1, "alice", &form("Picnic", 2)).unwrap();

        let err = activity.book_seats(3).unwrap_err();
        assert_eq!(err.to_string(), "there are only 2 seats available");

        activity.book_seats(2).unwrap();
        let err = activity.book_seats(1).unwrap_err();
        assert_eq!(err.to_string(), "there are no seats available");
    }

    #[test]
    fn releasing_beyond_capacity_is_rejected() {
        let mut activity = Activity::new(1, "alice", &form("Picnic", 2)).unwrap();
        activity.book_seats(1).unwrap();
        activity.release_seats(1).unwrap();
        assert!(matches!(
            activity.release_seats(1),
            Err(ActivityError::InvariantViolation(_))
        ));
    }

    proptest! {
        /// Any sequence of book/release attempts keeps the seat accounting
        /// inside bounds.
        #[test]
        fn seat_accounting_never_escapes_bounds(
            max_seats in 0u32..50,
            ops in proptest::collection::vec((any::<bool>(), 0u32..10), 0..40),
        ) {
            let mut activity = Activity::new(1, "alice", &form("Picnic", max_seats)).unwrap();
            for (book, n) in ops {
                if book {
                    let _ = activity.book_seats(n);
                } else {
                    let _ = activity.release_seats(n);
                }
                prop_assert!(activity.available_seats <= activity.max_seats);
            }
        }
    }
}
