//! Attempt queries for both assessment tracks.
//!
//! The two tracks live in separate tables. Query text is assembled only
//! from the two compile-time table names returned by [`attempts_table`];
//! everything else is a bind parameter.

use chrono::{NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use sprout_core::{
    Attempt, AttemptId, AttemptStatus, CatalogEntry, ChildId, EntryId, Time, Track, UserId,
};

use crate::error::{Result, StoreError};
use crate::store::SqliteStore;

/// Table backing a track's attempts.
pub(crate) fn attempts_table(track: Track) -> &'static str {
    match track {
        Track::Parent => "parent_attempts",
        Track::Supervisor => "supervisor_attempts",
    }
}

/// Fields needed to create a fresh `in_progress` attempt.
#[derive(Debug, Clone)]
pub struct NewAttempt {
    /// The child being assessed
    pub child_id: ChildId,
    /// Developmental aspect
    pub aspect: String,
    /// Rank copied from the catalog entry
    pub rank: i64,
    /// The catalog entry the attempt is against
    pub entry_id: EntryId,
    /// The evaluating parent or supervisor
    pub evaluator_id: UserId,
}

/// An attempt joined with its catalog entry.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AttemptDetail {
    /// The attempt row
    pub attempt: Attempt,
    /// Its checkpoint definition
    pub entry: CatalogEntry,
}

/// One row of a supervisor's roster scan: an attempt with the child's
/// identity and the checkpoint's age range, ready for aggregation.
#[derive(Debug, Clone)]
pub struct RosterRow {
    /// Attempt id (tie-breaker for "latest")
    pub attempt_id: AttemptId,
    /// The child
    pub child_id: ChildId,
    /// Developmental aspect
    pub aspect: String,
    /// Attempt status
    pub status: AttemptStatus,
    /// When the attempt was last assessed
    pub assessment_date: Time,
    /// Child's given name
    pub first_name: String,
    /// Child's family name
    pub last_name: String,
    /// Child's nickname
    pub nick_name: Option<String>,
    /// Child's date of birth
    pub birthday: NaiveDate,
    /// Child's gender
    pub gender: Option<String>,
    /// Child's picture reference
    pub picture: Option<String>,
    /// The checkpoint's declared age range
    pub age_range: String,
}

/// One cell of the (aspect, age range) cross-tab.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AspectRangeCount {
    /// Developmental aspect
    pub aspect: String,
    /// The checkpoint's declared age range
    pub age_range: String,
    /// Attempts with status `passed`
    pub passed: i64,
    /// Attempts with status `not_passed`
    pub not_passed: i64,
}

fn parse_status(raw: &str) -> Result<AttemptStatus> {
    raw.parse()
        .map_err(|e: sprout_core::UnknownStatus| StoreError::Corrupt(e.to_string()))
}

fn attempt_from_row(row: &SqliteRow) -> Result<Attempt> {
    let status: String = row.try_get("status")?;
    Ok(Attempt {
        id: AttemptId(row.try_get("attempt_id")?),
        child_id: ChildId(row.try_get("child_id")?),
        aspect: row.try_get("aspect")?,
        rank: row.try_get("rank")?,
        entry_id: EntryId(row.try_get("entry_id")?),
        status: parse_status(&status)?,
        assessment_date: row.try_get("assessment_date")?,
        evaluator_id: UserId(row.try_get("evaluator_id")?),
    })
}

/// Build the catalog entry from a joined row. The attempt's aspect,
/// rank and entry id are copies of the catalog's, so the join only has
/// to carry the catalog-specific columns.
fn detail_from_row(row: &SqliteRow) -> Result<AttemptDetail> {
    let attempt = attempt_from_row(row)?;
    let entry = CatalogEntry {
        id: attempt.entry_id,
        aspect: attempt.aspect.clone(),
        rank: attempt.rank,
        name: row.try_get("name")?,
        age_range: row.try_get("age_range")?,
        image: row.try_get("image")?,
        device_name: row.try_get("device_name")?,
        device_image: row.try_get("device_image")?,
        device_detail: row.try_get("device_detail")?,
        method: row.try_get("method")?,
        success_note: row.try_get("success_note")?,
    };
    Ok(AttemptDetail { attempt, entry })
}

const ATTEMPT_COLUMNS: &str =
    "attempt_id, child_id, aspect, rank, entry_id, status, assessment_date, evaluator_id";

const DETAIL_COLUMNS: &str = "a.attempt_id, a.child_id, a.aspect, a.rank, a.entry_id, a.status, \
     a.assessment_date, a.evaluator_id, d.name, d.age_range, d.image, d.device_name, \
     d.device_image, d.device_detail, d.method, d.success_note";

impl SqliteStore {
    /// All attempts for (child, aspect) on a track, highest rank first.
    pub async fn attempts_for(
        &self,
        track: Track,
        child_id: ChildId,
        aspect: &str,
    ) -> Result<Vec<Attempt>> {
        let table = attempts_table(track);
        let sql = format!(
            "SELECT {ATTEMPT_COLUMNS} FROM {table}
             WHERE child_id = ? AND aspect = ?
             ORDER BY rank DESC, attempt_id DESC"
        );

        let rows = sqlx::query(&sql)
            .bind(child_id.0)
            .bind(aspect)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(attempt_from_row).collect()
    }

    /// Load one attempt by id.
    pub async fn attempt(&self, track: Track, id: AttemptId) -> Result<Option<Attempt>> {
        let table = attempts_table(track);
        let sql = format!("SELECT {ATTEMPT_COLUMNS} FROM {table} WHERE attempt_id = ?");

        let row = sqlx::query(&sql).bind(id.0).fetch_optional(&self.pool).await?;
        row.as_ref().map(attempt_from_row).transpose()
    }

    /// Insert a fresh `in_progress` attempt and return it.
    pub async fn insert_attempt(&self, track: Track, new: &NewAttempt) -> Result<Attempt> {
        let table = attempts_table(track);
        let now = Utc::now();
        let sql = format!(
            "INSERT INTO {table}
                (child_id, aspect, rank, entry_id, status, assessment_date, evaluator_id)
             VALUES (?, ?, ?, ?, ?, ?, ?)"
        );

        let result = sqlx::query(&sql)
            .bind(new.child_id.0)
            .bind(&new.aspect)
            .bind(new.rank)
            .bind(new.entry_id.0)
            .bind(AttemptStatus::InProgress.as_str())
            .bind(now)
            .bind(new.evaluator_id.0)
            .execute(&self.pool)
            .await?;

        Ok(Attempt {
            id: AttemptId(result.last_insert_rowid()),
            child_id: new.child_id,
            aspect: new.aspect.clone(),
            rank: new.rank,
            entry_id: new.entry_id,
            status: AttemptStatus::InProgress,
            assessment_date: now,
            evaluator_id: new.evaluator_id,
        })
    }

    /// Conditionally move an attempt from one of `from` to `to`.
    ///
    /// Returns the number of rows updated; zero means the attempt was
    /// missing or had already transitioned. The predicate is the only
    /// guard against concurrent double-advances.
    pub async fn transition(
        &self,
        track: Track,
        id: AttemptId,
        from: &[AttemptStatus],
        to: AttemptStatus,
    ) -> Result<u64> {
        let table = attempts_table(track);
        let placeholders = vec!["?"; from.len()].join(", ");
        let sql = format!(
            "UPDATE {table} SET status = ?, assessment_date = ?
             WHERE attempt_id = ? AND status IN ({placeholders})"
        );

        let mut query = sqlx::query(&sql).bind(to.as_str()).bind(Utc::now()).bind(id.0);
        for status in from {
            query = query.bind(status.as_str());
        }

        Ok(query.execute(&self.pool).await?.rows_affected())
    }

    /// Unconditionally set an attempt's status (terminal marking, retry).
    pub async fn force_status(
        &self,
        track: Track,
        id: AttemptId,
        to: AttemptStatus,
    ) -> Result<u64> {
        let table = attempts_table(track);
        let sql = format!(
            "UPDATE {table} SET status = ?, assessment_date = ? WHERE attempt_id = ?"
        );

        let result = sqlx::query(&sql)
            .bind(to.as_str())
            .bind(Utc::now())
            .bind(id.0)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Full attempt history for (child, aspect), newest first, catalog
    /// details joined in the same query.
    pub async fn attempt_history(
        &self,
        track: Track,
        child_id: ChildId,
        aspect: &str,
        evaluator: Option<UserId>,
    ) -> Result<Vec<AttemptDetail>> {
        let table = attempts_table(track);
        let evaluator_filter = match evaluator {
            Some(_) => "AND a.evaluator_id = ?",
            None => "",
        };
        let sql = format!(
            "SELECT {DETAIL_COLUMNS}
             FROM {table} a
             JOIN catalog_entries d ON a.entry_id = d.entry_id
             WHERE a.child_id = ? AND a.aspect = ? {evaluator_filter}
             ORDER BY a.assessment_date DESC, a.attempt_id DESC"
        );

        let mut query = sqlx::query(&sql).bind(child_id.0).bind(aspect);
        if let Some(evaluator) = evaluator {
            query = query.bind(evaluator.0);
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(detail_from_row).collect()
    }

    /// A child's live state on a track: attempts that are `in_progress`
    /// or `passed_all`, details joined.
    pub async fn live_attempts(
        &self,
        track: Track,
        child_id: ChildId,
    ) -> Result<Vec<AttemptDetail>> {
        let table = attempts_table(track);
        let sql = format!(
            "SELECT {DETAIL_COLUMNS}
             FROM {table} a
             JOIN catalog_entries d ON a.entry_id = d.entry_id
             WHERE a.child_id = ? AND a.status IN ('in_progress', 'passed_all')
             ORDER BY a.aspect ASC, a.rank DESC"
        );

        let rows = sqlx::query(&sql).bind(child_id.0).fetch_all(&self.pool).await?;
        rows.iter().map(detail_from_row).collect()
    }

    /// The highest-ranked attempt per aspect for one child and
    /// evaluator, details joined.
    pub async fn latest_attempts_per_aspect(
        &self,
        track: Track,
        child_id: ChildId,
        evaluator: UserId,
    ) -> Result<Vec<AttemptDetail>> {
        let table = attempts_table(track);
        let sql = format!(
            "SELECT {DETAIL_COLUMNS}
             FROM {table} a
             JOIN catalog_entries d ON a.entry_id = d.entry_id
             WHERE a.child_id = ? AND a.evaluator_id = ?
               AND a.rank = (SELECT MAX(rank) FROM {table}
                             WHERE child_id = a.child_id AND aspect = a.aspect)
             ORDER BY a.aspect ASC, a.attempt_id DESC"
        );

        let rows = sqlx::query(&sql)
            .bind(child_id.0)
            .bind(evaluator.0)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(detail_from_row).collect()
    }

    /// Every supervisor-track attempt in a supervisor's caseload, joined
    /// with child identity and the checkpoint's age range. One query;
    /// the aggregation engine does the rest in memory.
    pub async fn roster_rows(&self, supervisor_id: UserId) -> Result<Vec<RosterRow>> {
        let rows = sqlx::query(
            "SELECT a.attempt_id, a.child_id, a.aspect, a.status, a.assessment_date,
                    c.first_name, c.last_name, c.nick_name, c.birthday, c.gender, c.picture,
                    d.age_range
             FROM supervisor_attempts a
             JOIN children c ON a.child_id = c.child_id
             JOIN catalog_entries d ON a.entry_id = d.entry_id
             WHERE a.evaluator_id = ?",
        )
        .bind(supervisor_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let status: String = row.try_get("status")?;
                Ok(RosterRow {
                    attempt_id: AttemptId(row.try_get("attempt_id")?),
                    child_id: ChildId(row.try_get("child_id")?),
                    aspect: row.try_get("aspect")?,
                    status: parse_status(&status)?,
                    assessment_date: row.try_get("assessment_date")?,
                    first_name: row.try_get("first_name")?,
                    last_name: row.try_get("last_name")?,
                    nick_name: row.try_get("nick_name")?,
                    birthday: row.try_get("birthday")?,
                    gender: row.try_get("gender")?,
                    picture: row.try_get("picture")?,
                    age_range: row.try_get("age_range")?,
                })
            })
            .collect()
    }

    /// Raw passed/not-passed counts per (aspect, age range) across all
    /// of a supervisor's attempt rows.
    pub async fn aspect_range_counts(&self, supervisor_id: UserId) -> Result<Vec<AspectRangeCount>> {
        let rows = sqlx::query(
            "SELECT a.aspect, d.age_range,
                    SUM(CASE WHEN a.status = 'passed' THEN 1 ELSE 0 END) AS passed,
                    SUM(CASE WHEN a.status = 'not_passed' THEN 1 ELSE 0 END) AS not_passed
             FROM supervisor_attempts a
             JOIN catalog_entries d ON a.entry_id = d.entry_id
             WHERE a.evaluator_id = ?
             GROUP BY a.aspect, d.age_range
             ORDER BY a.aspect ASC, d.age_range ASC",
        )
        .bind(supervisor_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(AspectRangeCount {
                    aspect: row.try_get("aspect")?,
                    age_range: row.try_get("age_range")?,
                    passed: row.try_get("passed")?,
                    not_passed: row.try_get("not_passed")?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded_store() -> SqliteStore {
        let store = SqliteStore::in_memory().await.unwrap();
        let entries = vec![
            CatalogEntry {
                id: Default::default(),
                aspect: "motor".into(),
                rank: 1,
                name: "lifts head".into(),
                age_range: "0-6".into(),
                image: None,
                device_name: None,
                device_image: None,
                device_detail: None,
                method: None,
                success_note: None,
            },
            CatalogEntry {
                id: Default::default(),
                aspect: "motor".into(),
                rank: 2,
                name: "sits unaided".into(),
                age_range: "6-12".into(),
                image: None,
                device_name: None,
                device_image: None,
                device_detail: None,
                method: None,
                success_note: None,
            },
        ];
        store.seed_catalog(&entries).await.unwrap();
        store
    }

    fn new_attempt(entry_id: i64, rank: i64) -> NewAttempt {
        NewAttempt {
            child_id: ChildId(1),
            aspect: "motor".into(),
            rank,
            entry_id: EntryId(entry_id),
            evaluator_id: UserId(10),
        }
    }

    #[tokio::test]
    async fn insert_and_fetch_roundtrip() {
        let store = seeded_store().await;

        let created = store
            .insert_attempt(Track::Parent, &new_attempt(1, 1))
            .await
            .unwrap();

        let fetched = store.attempt(Track::Parent, created.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, AttemptStatus::InProgress);
        assert_eq!(fetched.rank, 1);

        // Tracks are independent: nothing on the supervisor side.
        assert!(store
            .attempt(Track::Supervisor, created.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn transition_is_conditional() {
        let store = seeded_store().await;
        let attempt = store
            .insert_attempt(Track::Parent, &new_attempt(1, 1))
            .await
            .unwrap();

        let first = store
            .transition(
                Track::Parent,
                attempt.id,
                &[AttemptStatus::InProgress],
                AttemptStatus::Passed,
            )
            .await
            .unwrap();
        assert_eq!(first, 1);

        // Second advance observes zero affected rows.
        let second = store
            .transition(
                Track::Parent,
                attempt.id,
                &[AttemptStatus::InProgress],
                AttemptStatus::Passed,
            )
            .await
            .unwrap();
        assert_eq!(second, 0);
    }

    #[tokio::test]
    async fn history_joins_catalog_details() {
        let store = seeded_store().await;
        let first = store
            .insert_attempt(Track::Parent, &new_attempt(1, 1))
            .await
            .unwrap();
        store
            .transition(
                Track::Parent,
                first.id,
                &[AttemptStatus::InProgress],
                AttemptStatus::Passed,
            )
            .await
            .unwrap();
        store
            .insert_attempt(Track::Parent, &new_attempt(2, 2))
            .await
            .unwrap();

        let history = store
            .attempt_history(Track::Parent, ChildId(1), "motor", None)
            .await
            .unwrap();

        assert_eq!(history.len(), 2);
        assert!(history.iter().any(|d| d.entry.name == "lifts head"));
        assert!(history.iter().any(|d| d.entry.name == "sits unaided"));
    }
}
