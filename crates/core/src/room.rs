//! Rooms - a supervisor's groups of children.

use serde::{Deserialize, Serialize};

use crate::id::{RoomId, UserId};

/// A room owned by one supervisor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    /// Unique identifier
    pub id: RoomId,

    /// Display name
    pub name: String,

    /// Reference to the room picture
    pub picture: Option<String>,

    /// Owning supervisor
    pub supervisor_id: UserId,

    /// Display color tag
    pub color: Option<String>,
}
