//! SQLite persistence for Sprout.
//!
//! All access goes through [`SqliteStore`], a thin handle over a bounded
//! `sqlx` connection pool. Queries are parameterized throughout; the two
//! assessment tracks share one set of queries keyed by
//! [`sprout_core::Track`], which resolves to one of two compile-time
//! table names. Multi-step roster mutations run inside explicit
//! transactions.

mod attempts;
mod catalog;
mod children;
mod error;
mod requests;
mod rooms;
mod store;
mod trait_;
mod users;

pub use attempts::{AspectRangeCount, AttemptDetail, NewAttempt, RosterRow};
pub use children::NewChild;
pub use error::{Result, StoreError};
pub use rooms::RoomSummary;
pub use store::SqliteStore;
pub use trait_::AssessmentStore;
