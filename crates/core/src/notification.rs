//! In-app notifications.

use serde::{Deserialize, Serialize};

use crate::id::{ChildId, NotificationId, UserId};
use crate::Time;

/// Read state of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    /// Not yet seen
    Unread,
    /// Seen or acted on
    Read,
}

impl NotificationStatus {
    /// Stable string form used in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Unread => "unread",
            NotificationStatus::Read => "read",
        }
    }
}

/// One notification delivered to a user's inbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// Unique identifier
    pub id: NotificationId,

    /// Recipient
    pub user_id: UserId,

    /// Message body
    pub message: String,

    /// Supervisor the notification concerns, if any
    pub supervisor_id: Option<UserId>,

    /// Child the notification concerns, if any
    pub child_id: Option<ChildId>,

    /// Client-side rendering template
    pub template_id: i64,

    /// Read state
    pub status: NotificationStatus,

    /// When the notification was created
    pub created_at: Time,
}
