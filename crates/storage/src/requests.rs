//! Access requests, notifications and push tokens.

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use sprout_core::{
    AccessRequest, ChildId, Notification, NotificationId, NotificationStatus, RequestId,
    RequestStatus, RoomId, UserId,
};

use crate::error::{Result, StoreError};
use crate::store::SqliteStore;

fn request_from_row(row: &SqliteRow) -> Result<AccessRequest> {
    let status: String = row.try_get("status")?;
    let status = match status.as_str() {
        "pending" => RequestStatus::Pending,
        "approved" => RequestStatus::Approved,
        "denied" => RequestStatus::Denied,
        other => return Err(StoreError::Corrupt(format!("unknown request status: {other}"))),
    };

    Ok(AccessRequest {
        id: RequestId(row.try_get("request_id")?),
        parent_id: UserId(row.try_get("parent_id")?),
        supervisor_id: UserId(row.try_get("supervisor_id")?),
        child_id: ChildId(row.try_get("child_id")?),
        room_id: RoomId(row.try_get("room_id")?),
        status,
    })
}

fn notification_from_row(row: &SqliteRow) -> Result<Notification> {
    let status: String = row.try_get("status")?;
    let status = match status.as_str() {
        "unread" => NotificationStatus::Unread,
        "read" => NotificationStatus::Read,
        other => {
            return Err(StoreError::Corrupt(format!(
                "unknown notification status: {other}"
            )))
        }
    };

    Ok(Notification {
        id: NotificationId(row.try_get("notification_id")?),
        user_id: UserId(row.try_get("user_id")?),
        message: row.try_get("message")?,
        supervisor_id: row
            .try_get::<Option<i64>, _>("supervisor_id")?
            .map(UserId),
        child_id: row.try_get::<Option<i64>, _>("child_id")?.map(ChildId),
        template_id: row.try_get("template_id")?,
        status,
        created_at: row.try_get("created_at")?,
    })
}

impl SqliteStore {
    /// File an access request (pending).
    pub async fn insert_access_request(
        &self,
        parent_id: UserId,
        supervisor_id: UserId,
        child_id: ChildId,
        room_id: RoomId,
    ) -> Result<RequestId> {
        let result = sqlx::query(
            "INSERT INTO access_requests (parent_id, supervisor_id, child_id, room_id, status)
             VALUES (?, ?, ?, ?, 'pending')",
        )
        .bind(parent_id.0)
        .bind(supervisor_id.0)
        .bind(child_id.0)
        .bind(room_id.0)
        .execute(&self.pool)
        .await?;

        Ok(RequestId(result.last_insert_rowid()))
    }

    /// The latest request between this supervisor and child, if any.
    pub async fn access_request_for(
        &self,
        supervisor_id: UserId,
        child_id: ChildId,
    ) -> Result<Option<AccessRequest>> {
        let row = sqlx::query(
            "SELECT request_id, parent_id, supervisor_id, child_id, room_id, status
             FROM access_requests
             WHERE supervisor_id = ? AND child_id = ?
             ORDER BY request_id DESC LIMIT 1",
        )
        .bind(supervisor_id.0)
        .bind(child_id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(request_from_row).transpose()
    }

    /// Approve a request: mark it approved, put the child in the
    /// requested room and on the supervisor's roster, rewrite the
    /// parent's notification and queue one for the supervisor. One
    /// transaction; any failure rolls the whole approval back.
    pub async fn approve_access_request(
        &self,
        request: &AccessRequest,
        parent_notification: Option<NotificationId>,
        parent_message: &str,
        supervisor_message: &str,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE access_requests SET status = 'approved' WHERE request_id = ?")
            .bind(request.id.0)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT OR IGNORE INTO rooms_children (room_id, child_id, supervisor_id)
             VALUES (?, ?, ?)",
        )
        .bind(request.room_id.0)
        .bind(request.child_id.0)
        .bind(request.supervisor_id.0)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT OR IGNORE INTO supervisor_children (supervisor_id, child_id) VALUES (?, ?)",
        )
        .bind(request.supervisor_id.0)
        .bind(request.child_id.0)
        .execute(&mut *tx)
        .await?;

        if let Some(notification_id) = parent_notification {
            sqlx::query(
                "UPDATE notifications
                 SET status = 'read', template_id = 3, message = ?
                 WHERE notification_id = ?",
            )
            .bind(parent_message)
            .bind(notification_id.0)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            "INSERT INTO notifications
                (user_id, message, supervisor_id, child_id, template_id, status, created_at)
             VALUES (?, ?, ?, ?, 2, 'unread', ?)",
        )
        .bind(request.supervisor_id.0)
        .bind(supervisor_message)
        .bind(request.supervisor_id.0)
        .bind(request.child_id.0)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Deny a request and notify the supervisor, in one transaction.
    pub async fn deny_access_request(
        &self,
        request: &AccessRequest,
        parent_notification: Option<NotificationId>,
        parent_message: &str,
        supervisor_message: &str,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE access_requests SET status = 'denied' WHERE request_id = ?")
            .bind(request.id.0)
            .execute(&mut *tx)
            .await?;

        if let Some(notification_id) = parent_notification {
            sqlx::query(
                "UPDATE notifications
                 SET status = 'read', template_id = 3, message = ?
                 WHERE notification_id = ?",
            )
            .bind(parent_message)
            .bind(notification_id.0)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            "INSERT INTO notifications
                (user_id, message, supervisor_id, child_id, template_id, status, created_at)
             VALUES (?, ?, ?, ?, 2, 'unread', ?)",
        )
        .bind(request.supervisor_id.0)
        .bind(supervisor_message)
        .bind(request.supervisor_id.0)
        .bind(request.child_id.0)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Queue a notification.
    pub async fn insert_notification(
        &self,
        user_id: UserId,
        message: &str,
        supervisor_id: Option<UserId>,
        child_id: Option<ChildId>,
        template_id: i64,
    ) -> Result<NotificationId> {
        let result = sqlx::query(
            "INSERT INTO notifications
                (user_id, message, supervisor_id, child_id, template_id, status, created_at)
             VALUES (?, ?, ?, ?, ?, 'unread', ?)",
        )
        .bind(user_id.0)
        .bind(message)
        .bind(supervisor_id.map(|id| id.0))
        .bind(child_id.map(|id| id.0))
        .bind(template_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(NotificationId(result.last_insert_rowid()))
    }

    /// A user's notifications, newest first.
    pub async fn notifications_for(&self, user_id: UserId) -> Result<Vec<Notification>> {
        let rows = sqlx::query(
            "SELECT notification_id, user_id, message, supervisor_id, child_id,
                    template_id, status, created_at
             FROM notifications
             WHERE user_id = ?
             ORDER BY created_at DESC, notification_id DESC",
        )
        .bind(user_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(notification_from_row).collect()
    }

    /// Mark a notification read. Zero rows means it did not exist.
    pub async fn mark_notification_read(&self, id: NotificationId) -> Result<u64> {
        let result =
            sqlx::query("UPDATE notifications SET status = 'read' WHERE notification_id = ?")
                .bind(id.0)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected())
    }

    /// Store or replace a user's Expo push token.
    pub async fn upsert_push_token(&self, user_id: UserId, token: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO push_tokens (user_id, token, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(user_id) DO UPDATE SET token = excluded.token,
                                               updated_at = excluded.updated_at",
        )
        .bind(user_id.0)
        .bind(token)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// The user's current push token, if registered.
    pub async fn push_token(&self, user_id: UserId) -> Result<Option<String>> {
        let row = sqlx::query("SELECT token FROM push_tokens WHERE user_id = ?")
            .bind(user_id.0)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.get("token")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn approve_links_roster_and_room() {
        let store = SqliteStore::in_memory().await.unwrap();

        let request_id = store
            .insert_access_request(UserId(2), UserId(1), ChildId(5), RoomId(3))
            .await
            .unwrap();

        let request = store
            .access_request_for(UserId(1), ChildId(5))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(request.id, request_id);
        assert_eq!(request.status, RequestStatus::Pending);

        store
            .approve_access_request(&request, None, "approved", "you have access now")
            .await
            .unwrap();

        let request = store
            .access_request_for(UserId(1), ChildId(5))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(request.status, RequestStatus::Approved);
        assert!(store.is_supervisor_of(UserId(1), ChildId(5)).await.unwrap());

        let inbox = store.notifications_for(UserId(1)).await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].status, NotificationStatus::Unread);
    }

    #[tokio::test]
    async fn push_token_upsert_replaces() {
        let store = SqliteStore::in_memory().await.unwrap();

        store.upsert_push_token(UserId(4), "ExponentPushToken[a]").await.unwrap();
        store.upsert_push_token(UserId(4), "ExponentPushToken[b]").await.unwrap();

        assert_eq!(
            store.push_token(UserId(4)).await.unwrap().as_deref(),
            Some("ExponentPushToken[b]")
        );
    }
}
