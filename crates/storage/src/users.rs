//! User accounts and refresh tokens.

use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use sprout_core::{Role, User, UserId};

use crate::error::{Result, StoreError};
use crate::store::SqliteStore;

fn user_from_row(row: &SqliteRow) -> Result<User> {
    let role: String = row.try_get("role")?;
    let role: Role = role
        .parse()
        .map_err(StoreError::Corrupt)?;

    Ok(User {
        id: UserId(row.try_get("user_id")?),
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        role,
    })
}

impl SqliteStore {
    /// Create an account. Fails on duplicate username or email.
    pub async fn insert_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<UserId> {
        let result = sqlx::query(
            "INSERT INTO users (username, email, password_hash, role) VALUES (?, ?, ?, ?)",
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(role.as_str())
        .execute(&self.pool)
        .await?;

        Ok(UserId(result.last_insert_rowid()))
    }

    /// Look an account up by login name.
    pub async fn user_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            "SELECT user_id, username, email, password_hash, role
             FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    /// Load one account by id.
    pub async fn user(&self, id: UserId) -> Result<Option<User>> {
        let row = sqlx::query(
            "SELECT user_id, username, email, password_hash, role
             FROM users WHERE user_id = ?",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    /// Persist the user's current refresh token (None clears it).
    pub async fn set_refresh_token(&self, id: UserId, token: Option<&str>) -> Result<()> {
        sqlx::query("UPDATE users SET refresh_token = ? WHERE user_id = ?")
            .bind(token)
            .bind(id.0)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Whether the presented refresh token matches the stored one.
    pub async fn refresh_token_matches(&self, id: UserId, token: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM users WHERE user_id = ? AND refresh_token = ?")
            .bind(id.0)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn account_roundtrip() {
        let store = SqliteStore::in_memory().await.unwrap();

        let id = store
            .insert_user("somchai", "somchai@example.com", "$argon2id$stub", Role::Parent)
            .await
            .unwrap();

        let user = store.user_by_username("somchai").await.unwrap().unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.role, Role::Parent);

        // Duplicate username rejected by the schema.
        assert!(store
            .insert_user("somchai", "other@example.com", "x", Role::Supervisor)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn refresh_token_match_is_exact() {
        let store = SqliteStore::in_memory().await.unwrap();
        let id = store
            .insert_user("kru", "kru@example.com", "h", Role::Supervisor)
            .await
            .unwrap();

        store.set_refresh_token(id, Some("token-a")).await.unwrap();
        assert!(store.refresh_token_matches(id, "token-a").await.unwrap());
        assert!(!store.refresh_token_matches(id, "token-b").await.unwrap());

        store.set_refresh_token(id, None).await.unwrap();
        assert!(!store.refresh_token_matches(id, "token-a").await.unwrap());
    }
}
