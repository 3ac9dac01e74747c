//! Child profiles.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::id::{ChildId, UserId};

/// A child whose development is being tracked.
///
/// The progression engine only ever reads `birthday` (to derive age in
/// months); the remaining fields are roster/display data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Child {
    /// Unique identifier
    pub id: ChildId,

    /// Given name
    pub first_name: String,

    /// Family name
    pub last_name: String,

    /// Nickname shown in rosters
    pub nick_name: Option<String>,

    /// Date of birth
    pub birthday: NaiveDate,

    /// Gender as entered at registration
    pub gender: Option<String>,

    /// Reference to the profile picture
    pub picture: Option<String>,

    /// The parent account that registered the child
    pub registered_by: UserId,
}
