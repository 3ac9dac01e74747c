//! Child profiles and roster links.

use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use sprout_core::{Child, ChildId, UserId};

use crate::error::Result;
use crate::store::SqliteStore;

// Qualified with the `c` alias so joins stay unambiguous.
const CHILD_COLUMNS: &str = "c.child_id, c.first_name, c.last_name, c.nick_name, c.birthday, \
     c.gender, c.picture, c.registered_by";

fn child_from_row(row: &SqliteRow) -> Result<Child> {
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
}

/// Fields for registering a child.
#[derive(Debug, Clone)]
pub struct NewChild<'a> {
    /// Given name
    pub first_name: &'a str,
    /// Family name
    pub last_name: &'a str,
    /// Nickname
    pub nick_name: Option<&'a str>,
    /// Date of birth
    pub birthday: NaiveDate,
    /// Gender as entered
    pub gender: Option<&'a str>,
    /// Picture reference
    pub picture: Option<&'a str>,
}

impl SqliteStore {
    /// Register a child for a parent and link the roster row, in one
    /// transaction.
    pub async fn insert_child(&self, parent_id: UserId, new: &NewChild<'_>) -> Result<ChildId> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO children
                (first_name, last_name, nick_name, birthday, gender, picture, registered_by)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(new.first_name)
        .bind(new.last_name)
        .bind(new.nick_name)
        .bind(new.birthday)
        .bind(new.gender)
        .bind(new.picture)
        .bind(parent_id.0)
        .execute(&mut *tx)
        .await?;

        let child_id = ChildId(result.last_insert_rowid());

        sqlx::query("INSERT INTO parent_children (parent_id, child_id) VALUES (?, ?)")
            .bind(parent_id.0)
            .bind(child_id.0)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(child_id)
    }

    /// Whether this parent already registered a child with the same
    /// name and birthday (case-insensitive on names).
    pub async fn child_exists_for_parent(
        &self,
        parent_id: UserId,
        first_name: &str,
        last_name: &str,
        birthday: NaiveDate,
    ) -> Result<bool> {
        let row = sqlx::query(
            "SELECT child_id FROM children
             WHERE LOWER(first_name) = LOWER(?) AND LOWER(last_name) = LOWER(?)
               AND birthday = ? AND registered_by = ?
             LIMIT 1",
        )
        .bind(first_name)
        .bind(last_name)
        .bind(birthday)
        .bind(parent_id.0)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.is_some())
    }

    /// Look a child up by identity, regardless of who registered them.
    /// Used by the supervisor add-child path to file an access request.
    pub async fn find_child_by_identity(
        &self,
        first_name: &str,
        last_name: &str,
        birthday: NaiveDate,
    ) -> Result<Option<Child>> {
        let sql = format!(
            "SELECT {CHILD_COLUMNS} FROM children c
             WHERE LOWER(c.first_name) = LOWER(?) AND LOWER(c.last_name) = LOWER(?)
               AND c.birthday = ?
             LIMIT 1"
        );

        let row = sqlx::query(&sql)
            .bind(first_name)
            .bind(last_name)
            .bind(birthday)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(child_from_row).transpose()
    }

    /// Load one child by id.
    pub async fn child(&self, id: ChildId) -> Result<Option<Child>> {
        let sql = format!("SELECT {CHILD_COLUMNS} FROM children c WHERE c.child_id = ?");

        let row = sqlx::query(&sql).bind(id.0).fetch_optional(&self.pool).await?;
        row.as_ref().map(child_from_row).transpose()
    }

    /// All children on a parent's roster.
    pub async fn children_of_parent(&self, parent_id: UserId) -> Result<Vec<Child>> {
        let sql = format!(
            "SELECT {CHILD_COLUMNS} FROM children c
             JOIN parent_children pc ON c.child_id = pc.child_id
             WHERE pc.parent_id = ?"
        );

        let rows = sqlx::query(&sql).bind(parent_id.0).fetch_all(&self.pool).await?;
        rows.iter().map(child_from_row).collect()
    }

    /// Access check: is this user the child's parent?
    pub async fn is_parent_of(&self, parent_id: UserId, child_id: ChildId) -> Result<bool> {
        let row = sqlx::query(
            "SELECT 1 FROM parent_children WHERE parent_id = ? AND child_id = ?",
        )
        .bind(parent_id.0)
        .bind(child_id.0)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.is_some())
    }

    /// Access check: is this user a supervisor of the child?
    pub async fn is_supervisor_of(&self, supervisor_id: UserId, child_id: ChildId) -> Result<bool> {
        let row = sqlx::query(
            "SELECT 1 FROM supervisor_children WHERE supervisor_id = ? AND child_id = ?",
        )
        .bind(supervisor_id.0)
        .bind(child_id.0)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.is_some())
    }

    /// The parent linked to a child, if any.
    pub async fn parent_of_child(&self, child_id: ChildId) -> Result<Option<UserId>> {
        let row = sqlx::query("SELECT parent_id FROM parent_children WHERE child_id = ? LIMIT 1")
            .bind(child_id.0)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| UserId(r.get("parent_id"))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn newborn<'a>() -> NewChild<'a> {
        NewChild {
            first_name: "Mali",
            last_name: "Srisuk",
            nick_name: Some("Mai"),
            birthday: NaiveDate::from_ymd_opt(2023, 4, 2).unwrap(),
            gender: Some("female"),
            picture: None,
        }
    }

    #[tokio::test]
    async fn insert_links_parent_roster() {
        let store = SqliteStore::in_memory().await.unwrap();
        let parent = UserId(7);

        let child_id = store.insert_child(parent, &newborn()).await.unwrap();

        assert!(store.is_parent_of(parent, child_id).await.unwrap());
        assert!(!store.is_parent_of(UserId(8), child_id).await.unwrap());
        assert_eq!(store.parent_of_child(child_id).await.unwrap(), Some(parent));

        let roster = store.children_of_parent(parent).await.unwrap();
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].first_name, "Mali");
    }

    #[tokio::test]
    async fn duplicate_guard_is_case_insensitive() {
        let store = SqliteStore::in_memory().await.unwrap();
        let parent = UserId(7);
        store.insert_child(parent, &newborn()).await.unwrap();

        let exists = store
            .child_exists_for_parent(
                parent,
                "mali",
                "SRISUK",
                NaiveDate::from_ymd_opt(2023, 4, 2).unwrap(),
            )
            .await
            .unwrap();
        assert!(exists);

        // Different parent, same identity: no clash on this guard.
        let exists = store
            .child_exists_for_parent(
                UserId(9),
                "Mali",
                "Srisuk",
                NaiveDate::from_ymd_opt(2023, 4, 2).unwrap(),
            )
            .await
            .unwrap();
        assert!(!exists);
    }
}
