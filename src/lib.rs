//! Gatherly event-registration backend
//!
//! A multi-tenant event-registration core: users create Activities with a
//! seat capacity and other users register for them. The crate's job is the
//! transactional seat-allocation protocol: concurrent registrations against
//! the same Activity never oversell seats and never let the seat counter
//! drift from the membership lists, because both are written in one
//! optimistic store transaction.

pub mod config;
pub mod models;
pub mod services;
pub mod store;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use utils::errors::{GatherlyError, Result};

// Re-export main components for easy access
pub use models::{Activity, ActivityForm, Gender, Profile, ProfileForm};
pub use services::{
    ActivityQueryService, Caller, Identity, IdentityService, ProfileService, RegistrationService,
    ServiceFactory,
};
pub use store::{ActivityKey, EntityStore, ProfileKey, StoreError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn info() -> String {
    format!("{} v{}", NAME, VERSION)
}
