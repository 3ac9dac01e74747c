//! Access requests - a supervisor asking a parent for a child's data.

use serde::{Deserialize, Serialize};

use crate::id::{ChildId, RequestId, RoomId, UserId};

/// Status of an access request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Waiting for the parent's decision
    Pending,
    /// Approved; the child joined the supervisor's roster
    Approved,
    /// Denied by the parent
    Denied,
}

impl RequestStatus {
    /// Stable string form used in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Denied => "denied",
        }
    }
}

/// A pending or resolved request for access to one child.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessRequest {
    /// Unique identifier
    pub id: RequestId,

    /// The parent who decides
    pub parent_id: UserId,

    /// The requesting supervisor
    pub supervisor_id: UserId,

    /// The child in question
    pub child_id: ChildId,

    /// The room the child would join on approval
    pub room_id: RoomId,

    /// Current status
    pub status: RequestStatus,
}
