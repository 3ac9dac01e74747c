//! Catalog entry queries. The catalog is read-only after seeding.

use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use sprout_core::{CatalogEntry, EntryId};

use crate::error::Result;
use crate::store::SqliteStore;

const ENTRY_COLUMNS: &str = "entry_id, aspect, rank, name, age_range, image, device_name, \
     device_image, device_detail, method, success_note";

fn entry_from_row(row: &SqliteRow) -> Result<CatalogEntry> {
    Ok(CatalogEntry {
        id: EntryId(row.try_get("entry_id")?),
        aspect: row.try_get("aspect")?,
        rank: row.try_get("rank")?,
        name: row.try_get("name")?,
        age_range: row.try_get("age_range")?,
        image: row.try_get("image")?,
        device_name: row.try_get("device_name")?,
        device_image: row.try_get("device_image")?,
        device_detail: row.try_get("device_detail")?,
        method: row.try_get("method")?,
        success_note: row.try_get("success_note")?,
    })
}

impl SqliteStore {
    /// All entries for one aspect, lowest rank first.
    pub async fn entries_for_aspect(&self, aspect: &str) -> Result<Vec<CatalogEntry>> {
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM catalog_entries
             WHERE aspect = ? ORDER BY rank ASC"
        );

        let rows = sqlx::query(&sql).bind(aspect).fetch_all(&self.pool).await?;
        rows.iter().map(entry_from_row).collect()
    }

    /// Load one entry by id.
    pub async fn entry(&self, id: EntryId) -> Result<Option<CatalogEntry>> {
        let sql = format!("SELECT {ENTRY_COLUMNS} FROM catalog_entries WHERE entry_id = ?");

        let row = sqlx::query(&sql).bind(id.0).fetch_optional(&self.pool).await?;
        row.as_ref().map(entry_from_row).transpose()
    }

    /// The next checkpoint after `rank` within an aspect, if any.
    pub async fn next_entry(&self, aspect: &str, rank: i64) -> Result<Option<CatalogEntry>> {
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM catalog_entries
             WHERE aspect = ? AND rank > ?
             ORDER BY rank ASC LIMIT 1"
        );

        let row = sqlx::query(&sql)
            .bind(aspect)
            .bind(rank)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(entry_from_row).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(aspect: &str, rank: i64) -> CatalogEntry {
        CatalogEntry {
            id: Default::default(),
            aspect: aspect.to_string(),
            rank,
            name: format!("{aspect}-{rank}"),
            age_range: "0-12".to_string(),
            image: None,
            device_name: None,
            device_image: None,
            device_detail: None,
            method: None,
            success_note: None,
        }
    }

    #[tokio::test]
    async fn next_entry_skips_rank_gaps() {
        let store = SqliteStore::in_memory().await.unwrap();
        store
            .seed_catalog(&[entry("language", 1), entry("language", 5), entry("motor", 2)])
            .await
            .unwrap();

        let next = store.next_entry("language", 1).await.unwrap().unwrap();
        assert_eq!(next.rank, 5);

        // Last rank in the aspect: nothing follows.
        assert!(store.next_entry("language", 5).await.unwrap().is_none());

        // Other aspects never leak in.
        let next = store.next_entry("motor", 1).await.unwrap().unwrap();
        assert_eq!(next.aspect, "motor");
    }
}
