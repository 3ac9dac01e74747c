//! Sprout core data models.
//!
//! This crate defines the fundamental data structures shared by the
//! assessment progression engine, the storage layer, and the HTTP server.

#![warn(missing_docs)]

// Core identities
mod id;

// Assessment domain
mod age;
mod attempt;
mod catalog;

// Roster domain
mod child;
mod notification;
mod request;
mod room;
mod user;

// Re-exports
pub use id::*;

// Assessment
pub use age::{age_in_months, AgeRange};
pub use attempt::{Attempt, AttemptStatus, Track, UnknownStatus};
pub use catalog::CatalogEntry;

// Roster
pub use child::Child;
pub use notification::{Notification, NotificationStatus};
pub use request::{AccessRequest, RequestStatus};
pub use room::Room;
pub use user::{Role, User};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
