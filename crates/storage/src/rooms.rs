//! Rooms and the room-scoped cascade delete.

use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use sprout_core::{Child, ChildId, Room, RoomId, UserId};

use crate::error::Result;
use crate::store::SqliteStore;

const ROOM_COLUMNS: &str = "room_id, name, picture, supervisor_id, color";

fn room_from_row(row: &SqliteRow) -> Result<Room> {
    Ok(Room {
        id: RoomId(row.try_get("room_id")?),
        name: row.try_get("name")?,
        picture: row.try_get("picture")?,
        supervisor_id: UserId(row.try_get("supervisor_id")?),
        color: row.try_get("color")?,
    })
}

/// A room with its current member count.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RoomSummary {
    /// The room
    #[serde(flatten)]
    pub room: Room,
    /// Children currently in the room
    pub child_count: i64,
}

impl SqliteStore {
    /// Create a room for a supervisor.
    pub async fn insert_room(
        &self,
        supervisor_id: UserId,
        name: &str,
        picture: Option<&str>,
        color: Option<&str>,
    ) -> Result<Room> {
        let result = sqlx::query(
            "INSERT INTO rooms (name, picture, supervisor_id, color) VALUES (?, ?, ?, ?)",
        )
        .bind(name)
        .bind(picture)
        .bind(supervisor_id.0)
        .bind(color)
        .execute(&self.pool)
        .await?;

        Ok(Room {
            id: RoomId(result.last_insert_rowid()),
            name: name.to_string(),
            picture: picture.map(str::to_string),
            supervisor_id,
            color: color.map(str::to_string),
        })
    }

    /// A supervisor's rooms with per-room child counts.
    pub async fn rooms_of_supervisor(&self, supervisor_id: UserId) -> Result<Vec<RoomSummary>> {
        let rows = sqlx::query(
            "SELECT r.room_id, r.name, r.picture, r.supervisor_id, r.color,
                    COALESCE(rc.child_count, 0) AS child_count
             FROM rooms r
             LEFT JOIN (
                 SELECT room_id, COUNT(child_id) AS child_count
                 FROM rooms_children
                 GROUP BY room_id
             ) rc ON r.room_id = rc.room_id
             WHERE r.supervisor_id = ?",
        )
        .bind(supervisor_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(RoomSummary {
                    room: room_from_row(row)?,
                    child_count: row.try_get("child_count")?,
                })
            })
            .collect()
    }

    /// Load a room only if it is owned by the given supervisor.
    pub async fn room_owned_by(
        &self,
        room_id: RoomId,
        supervisor_id: UserId,
    ) -> Result<Option<Room>> {
        let sql = format!(
            "SELECT {ROOM_COLUMNS} FROM rooms WHERE room_id = ? AND supervisor_id = ?"
        );

        let row = sqlx::query(&sql)
            .bind(room_id.0)
            .bind(supervisor_id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(room_from_row).transpose()
    }

    /// The children currently in a room.
    pub async fn children_in_room(&self, room_id: RoomId) -> Result<Vec<Child>> {
        let rows = sqlx::query(
            "SELECT c.child_id, c.first_name, c.last_name, c.nick_name, c.birthday,
                    c.gender, c.picture, c.registered_by
             FROM rooms_children rc
             JOIN children c ON rc.child_id = c.child_id
             WHERE rc.room_id = ?",
        )
        .bind(room_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(Child {
                    id: ChildId(row.try_get("child_id")?),
                    first_name: row.try_get("first_name")?,
                    last_name: row.try_get("last_name")?,
                    nick_name: row.try_get("nick_name")?,
                    birthday: row.try_get("birthday")?,
                    gender: row.try_get("gender")?,
                    picture: row.try_get("picture")?,
                    registered_by: UserId(row.try_get("registered_by")?),
                })
            })
            .collect()
    }

    /// Update a room's name and/or picture. `None` leaves a field as is.
    pub async fn update_room(
        &self,
        room_id: RoomId,
        supervisor_id: UserId,
        name: Option<&str>,
        picture: Option<&str>,
    ) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE rooms
             SET name = COALESCE(?, name), picture = COALESCE(?, picture)
             WHERE room_id = ? AND supervisor_id = ?",
        )
        .bind(name)
        .bind(picture)
        .bind(room_id.0)
        .bind(supervisor_id.0)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Delete a room and everything scoped to it, all-or-nothing:
    /// the room's children's supervisor-track attempts and access
    /// requests, the memberships, the room itself, and - for children
    /// left without any room - their supervisor roster links.
    pub async fn delete_room_cascade(&self, room_id: RoomId) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let member_rows = sqlx::query("SELECT child_id FROM rooms_children WHERE room_id = ?")
            .bind(room_id.0)
            .fetch_all(&mut *tx)
            .await?;
        let members: Vec<i64> = member_rows.iter().map(|r| r.get("child_id")).collect();

        sqlx::query(
            "DELETE FROM supervisor_attempts WHERE child_id IN
                (SELECT child_id FROM rooms_children WHERE room_id = ?)",
        )
        .bind(room_id.0)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "DELETE FROM access_requests WHERE child_id IN
                (SELECT child_id FROM rooms_children WHERE room_id = ?)",
        )
        .bind(room_id.0)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM rooms_children WHERE room_id = ?")
            .bind(room_id.0)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM rooms WHERE room_id = ?")
            .bind(room_id.0)
            .execute(&mut *tx)
            .await?;

        // Children no longer in any room lose their supervisor links.
        for child_id in members {
            sqlx::query(
                "DELETE FROM supervisor_children
                 WHERE child_id = ?
                   AND NOT EXISTS (SELECT 1 FROM rooms_children WHERE child_id = ?)",
            )
            .bind(child_id)
            .bind(child_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attempts::NewAttempt;
    use crate::children::NewChild;
    use chrono::NaiveDate;
    use sprout_core::Track;

    async fn store_with_room() -> (SqliteStore, RoomId, ChildId) {
        let store = SqliteStore::in_memory().await.unwrap();
        let supervisor = UserId(1);
        let parent = UserId(2);

        let room = store
            .insert_room(supervisor, "Sunflower", None, Some("#ffcc00"))
            .await
            .unwrap();

        let child_id = store
            .insert_child(
                parent,
                &NewChild {
                    first_name: "Nok",
                    last_name: "Chai",
                    nick_name: None,
                    birthday: NaiveDate::from_ymd_opt(2022, 1, 10).unwrap(),
                    gender: None,
                    picture: None,
                },
            )
            .await
            .unwrap();

        sqlx::query(
            "INSERT INTO rooms_children (room_id, child_id, supervisor_id) VALUES (?, ?, ?)",
        )
        .bind(room.id.0)
        .bind(child_id.0)
        .bind(supervisor.0)
        .execute(&store.pool)
        .await
        .unwrap();

        sqlx::query(
            "INSERT INTO supervisor_children (supervisor_id, child_id) VALUES (?, ?)",
        )
        .bind(supervisor.0)
        .bind(child_id.0)
        .execute(&store.pool)
        .await
        .unwrap();

        (store, room.id, child_id)
    }

    #[tokio::test]
    async fn room_listing_counts_children() {
        let (store, _room_id, _child_id) = store_with_room().await;

        let rooms = store.rooms_of_supervisor(UserId(1)).await.unwrap();
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].child_count, 1);
        assert_eq!(rooms[0].room.name, "Sunflower");
    }

    #[tokio::test]
    async fn ownership_check_rejects_other_supervisors() {
        let (store, room_id, _child_id) = store_with_room().await;

        assert!(store.room_owned_by(room_id, UserId(1)).await.unwrap().is_some());
        assert!(store.room_owned_by(room_id, UserId(99)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn cascade_delete_clears_room_scope() {
        let (store, room_id, child_id) = store_with_room().await;

        // Give the child a supervisor-track attempt that must go too.
        sqlx::query("INSERT INTO catalog_entries (aspect, rank, name, age_range) VALUES ('motor', 1, 'x', '0-6')")
            .execute(&store.pool)
            .await
            .unwrap();
        store
            .insert_attempt(
                Track::Supervisor,
                &NewAttempt {
                    child_id,
                    aspect: "motor".into(),
                    rank: 1,
                    entry_id: sprout_core::EntryId(1),
                    evaluator_id: UserId(1),
                },
            )
            .await
            .unwrap();

        store.delete_room_cascade(room_id).await.unwrap();

        assert!(store.rooms_of_supervisor(UserId(1)).await.unwrap().is_empty());
        assert!(store
            .attempts_for(Track::Supervisor, child_id, "motor")
            .await
            .unwrap()
            .is_empty());
        // Child had no other room: supervisor link removed as well.
        assert!(!store.is_supervisor_of(UserId(1), child_id).await.unwrap());
        // The child profile itself is untouched.
        assert!(store.child(child_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn update_room_keeps_unset_fields() {
        let (store, room_id, _child) = store_with_room().await;

        let updated = store
            .update_room(room_id, UserId(1), Some("Lotus"), None)
            .await
            .unwrap();
        assert_eq!(updated, 1);

        let room = store.room_owned_by(room_id, UserId(1)).await.unwrap().unwrap();
        assert_eq!(room.name, "Lotus");
        assert_eq!(room.color.as_deref(), Some("#ffcc00"));
    }
}
