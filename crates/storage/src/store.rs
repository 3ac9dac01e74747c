//! Store handle, schema bootstrap and catalog seeding.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use tracing::info;

use sprout_core::CatalogEntry;

use crate::error::Result;

/// SQLite store.
///
/// Cheap to clone; every clone shares the same bounded pool. Each
/// operation acquires a connection from the pool for the duration of a
/// single statement (or an explicit transaction) and returns it on every
/// exit path.
#[derive(Clone)]
pub struct SqliteStore {
    pub(crate) pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) a database file and bootstrap the schema.
    pub async fn open(path: &Path, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;

        Ok(store)
    }

    /// Create an in-memory store for testing.
    ///
    /// A single connection, because every in-memory SQLite connection is
    /// its own database.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let store = Self { pool };
        store.init_schema().await?;

        Ok(store)
    }

    /// Initialize the database schema.
    async fn init_schema(&self) -> Result<()> {
        let statements = [
            "CREATE TABLE IF NOT EXISTS catalog_entries (
                entry_id INTEGER PRIMARY KEY AUTOINCREMENT,
                aspect TEXT NOT NULL,
                rank INTEGER NOT NULL,
                name TEXT NOT NULL,
                age_range TEXT NOT NULL,
                image TEXT,
                device_name TEXT,
                device_image TEXT,
                device_detail TEXT,
                method TEXT,
                success_note TEXT,
                UNIQUE (aspect, rank)
            )",
            "CREATE TABLE IF NOT EXISTS users (
                user_id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL,
                refresh_token TEXT
            )",
            "CREATE TABLE IF NOT EXISTS children (
                child_id INTEGER PRIMARY KEY AUTOINCREMENT,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                nick_name TEXT,
                birthday TEXT NOT NULL,
                gender TEXT,
                picture TEXT,
                registered_by INTEGER NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS parent_children (
                parent_id INTEGER NOT NULL,
                child_id INTEGER NOT NULL,
                UNIQUE (parent_id, child_id)
            )",
            "CREATE TABLE IF NOT EXISTS supervisor_children (
                supervisor_id INTEGER NOT NULL,
                child_id INTEGER NOT NULL,
                UNIQUE (supervisor_id, child_id)
            )",
            "CREATE TABLE IF NOT EXISTS parent_attempts (
                attempt_id INTEGER PRIMARY KEY AUTOINCREMENT,
                child_id INTEGER NOT NULL,
                aspect TEXT NOT NULL,
                rank INTEGER NOT NULL,
                entry_id INTEGER NOT NULL,
                status TEXT NOT NULL,
                assessment_date TEXT NOT NULL,
                evaluator_id INTEGER NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS supervisor_attempts (
                attempt_id INTEGER PRIMARY KEY AUTOINCREMENT,
                child_id INTEGER NOT NULL,
                aspect TEXT NOT NULL,
                rank INTEGER NOT NULL,
                entry_id INTEGER NOT NULL,
                status TEXT NOT NULL,
                assessment_date TEXT NOT NULL,
                evaluator_id INTEGER NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS rooms (
                room_id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                picture TEXT,
                supervisor_id INTEGER NOT NULL,
                color TEXT
            )",
            "CREATE TABLE IF NOT EXISTS rooms_children (
                room_id INTEGER NOT NULL,
                child_id INTEGER NOT NULL,
                supervisor_id INTEGER NOT NULL,
                UNIQUE (room_id, child_id)
            )",
            "CREATE TABLE IF NOT EXISTS access_requests (
                request_id INTEGER PRIMARY KEY AUTOINCREMENT,
                parent_id INTEGER NOT NULL,
                supervisor_id INTEGER NOT NULL,
                child_id INTEGER NOT NULL,
                room_id INTEGER NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending'
            )",
            "CREATE TABLE IF NOT EXISTS notifications (
                notification_id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                message TEXT NOT NULL,
                supervisor_id INTEGER,
                child_id INTEGER,
                template_id INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL DEFAULT 'unread',
                created_at TEXT NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS push_tokens (
                user_id INTEGER PRIMARY KEY,
                token TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            "CREATE INDEX IF NOT EXISTS idx_parent_attempts_child
                ON parent_attempts(child_id, aspect)",
            "CREATE INDEX IF NOT EXISTS idx_supervisor_attempts_child
                ON supervisor_attempts(child_id, aspect)",
            "CREATE INDEX IF NOT EXISTS idx_supervisor_attempts_evaluator
                ON supervisor_attempts(evaluator_id)",
            "CREATE INDEX IF NOT EXISTS idx_catalog_aspect_rank
                ON catalog_entries(aspect, rank)",
            "CREATE INDEX IF NOT EXISTS idx_notifications_user
                ON notifications(user_id, created_at)",
        ];

        for statement in statements {
            sqlx::query(statement).execute(&self.pool).await?;
        }

        Ok(())
    }

    /// Seed the assessment catalog from a JSON array of entries.
    ///
    /// Idempotent: entries whose (aspect, rank) already exist are left
    /// untouched, so re-running a deploy is safe.
    pub async fn seed_catalog(&self, entries: &[CatalogEntry]) -> Result<usize> {
        let mut inserted = 0;

        for entry in entries {
            let result = sqlx::query(
                "INSERT OR IGNORE INTO catalog_entries (
                    aspect, rank, name, age_range, image,
                    device_name, device_image, device_detail, method, success_note
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&entry.aspect)
            .bind(entry.rank)
            .bind(&entry.name)
            .bind(&entry.age_range)
            .bind(&entry.image)
            .bind(&entry.device_name)
            .bind(&entry.device_image)
            .bind(&entry.device_detail)
            .bind(&entry.method)
            .bind(&entry.success_note)
            .execute(&self.pool)
            .await?;

            inserted += result.rows_affected() as usize;
        }

        info!(seeded = inserted, total = entries.len(), "catalog seeded");
        Ok(inserted)
    }

    /// Load and seed the catalog from a JSON file on disk.
    pub async fn seed_catalog_from_file(&self, path: &Path) -> Result<usize> {
        let raw = std::fs::read_to_string(path)?;
        let entries: Vec<CatalogEntry> = serde_json::from_str(&raw)?;
        self.seed_catalog(&entries).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(aspect: &str, rank: i64, age_range: &str) -> CatalogEntry {
        CatalogEntry {
            id: Default::default(),
            aspect: aspect.to_string(),
            rank,
            name: format!("{aspect} checkpoint {rank}"),
            age_range: age_range.to_string(),
            image: None,
            device_name: None,
            device_image: None,
            device_detail: None,
            method: None,
            success_note: None,
        }
    }

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let store = SqliteStore::in_memory().await.unwrap();

        let entries = vec![entry("motor", 1, "0-6"), entry("motor", 2, "6-12")];

        let first = store.seed_catalog(&entries).await.unwrap();
        let second = store.seed_catalog(&entries).await.unwrap();

        assert_eq!(first, 2);
        assert_eq!(second, 0);
    }

    #[tokio::test]
    async fn open_creates_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sprout.db");

        let store = SqliteStore::open(&path, 4).await.unwrap();
        store
            .seed_catalog(&[entry("language", 1, "0-12")])
            .await
            .unwrap();

        assert!(path.exists());
    }
}
