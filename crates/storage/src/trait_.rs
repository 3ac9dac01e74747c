//! Store abstraction the progression and aggregation engines run against.

use async_trait::async_trait;

use sprout_core::{
    Attempt, AttemptId, AttemptStatus, CatalogEntry, ChildId, EntryId, Track, UserId,
};

use crate::attempts::{AspectRangeCount, AttemptDetail, NewAttempt, RosterRow};
use crate::error::Result;
use crate::store::SqliteStore;

/// The persistent surface the engines are specified against.
///
/// One implementation exists (SQLite); the trait keeps the engines free
/// of storage details and pins down exactly what they are allowed to
/// touch.
#[async_trait]
pub trait AssessmentStore: Send + Sync {
    // === Attempts ===

    /// All attempts for (child, aspect) on a track, highest rank first.
    async fn attempts_for(
        &self,
        track: Track,
        child_id: ChildId,
        aspect: &str,
    ) -> Result<Vec<Attempt>>;

    /// Load one attempt by id.
    async fn attempt(&self, track: Track, id: AttemptId) -> Result<Option<Attempt>>;

    /// Insert a fresh `in_progress` attempt and return it.
    async fn insert_attempt(&self, track: Track, new: &NewAttempt) -> Result<Attempt>;

    /// Conditionally transition an attempt; returns affected rows.
    async fn transition(
        &self,
        track: Track,
        id: AttemptId,
        from: &[AttemptStatus],
        to: AttemptStatus,
    ) -> Result<u64>;

    /// Unconditionally set an attempt's status; returns affected rows.
    async fn force_status(&self, track: Track, id: AttemptId, to: AttemptStatus) -> Result<u64>;

    /// Attempt history with catalog details, newest first.
    async fn attempt_history(
        &self,
        track: Track,
        child_id: ChildId,
        aspect: &str,
        evaluator: Option<UserId>,
    ) -> Result<Vec<AttemptDetail>>;

    /// Live (`in_progress`/`passed_all`) attempts with details.
    async fn live_attempts(&self, track: Track, child_id: ChildId) -> Result<Vec<AttemptDetail>>;

    /// Highest-ranked attempt per aspect for a child and evaluator.
    async fn latest_attempts_per_aspect(
        &self,
        track: Track,
        child_id: ChildId,
        evaluator: UserId,
    ) -> Result<Vec<AttemptDetail>>;

    // === Catalog ===

    /// Catalog entries for one aspect, lowest rank first.
    async fn entries_for_aspect(&self, aspect: &str) -> Result<Vec<CatalogEntry>>;

    /// Load one catalog entry by id.
    async fn entry(&self, id: EntryId) -> Result<Option<CatalogEntry>>;

    /// The next checkpoint after `rank` within an aspect.
    async fn next_entry(&self, aspect: &str, rank: i64) -> Result<Option<CatalogEntry>>;

    // === Roster scans ===

    /// Every attempt in a supervisor's caseload with child identity and
    /// age range attached.
    async fn roster_rows(&self, supervisor_id: UserId) -> Result<Vec<RosterRow>>;

    /// Raw pass/fail counts per (aspect, age range).
    async fn aspect_range_counts(&self, supervisor_id: UserId) -> Result<Vec<AspectRangeCount>>;
}

#[async_trait]
impl AssessmentStore for SqliteStore {
    async fn attempts_for(
        &self,
        track: Track,
        child_id: ChildId,
        aspect: &str,
    ) -> Result<Vec<Attempt>> {
        SqliteStore::attempts_for(self, track, child_id, aspect).await
    }

    async fn attempt(&self, track: Track, id: AttemptId) -> Result<Option<Attempt>> {
        SqliteStore::attempt(self, track, id).await
    }

    async fn insert_attempt(&self, track: Track, new: &NewAttempt) -> Result<Attempt> {
        SqliteStore::insert_attempt(self, track, new).await
    }

    async fn transition(
        &self,
        track: Track,
        id: AttemptId,
        from: &[AttemptStatus],
        to: AttemptStatus,
    ) -> Result<u64> {
        SqliteStore::transition(self, track, id, from, to).await
    }

    async fn force_status(&self, track: Track, id: AttemptId, to: AttemptStatus) -> Result<u64> {
        SqliteStore::force_status(self, track, id, to).await
    }

    async fn attempt_history(
        &self,
        track: Track,
        child_id: ChildId,
        aspect: &str,
        evaluator: Option<UserId>,
    ) -> Result<Vec<AttemptDetail>> {
        SqliteStore::attempt_history(self, track, child_id, aspect, evaluator).await
    }

    async fn live_attempts(&self, track: Track, child_id: ChildId) -> Result<Vec<AttemptDetail>> {
        SqliteStore::live_attempts(self, track, child_id).await
    }

    async fn latest_attempts_per_aspect(
        &self,
        track: Track,
        child_id: ChildId,
        evaluator: UserId,
    ) -> Result<Vec<AttemptDetail>> {
        SqliteStore::latest_attempts_per_aspect(self, track, child_id, evaluator).await
    }

    async fn entries_for_aspect(&self, aspect: &str) -> Result<Vec<CatalogEntry>> {
        SqliteStore::entries_for_aspect(self, aspect).await
    }

    async fn entry(&self, id: EntryId) -> Result<Option<CatalogEntry>> {
        SqliteStore::entry(self, id).await
    }

    async fn next_entry(&self, aspect: &str, rank: i64) -> Result<Option<CatalogEntry>> {
        SqliteStore::next_entry(self, aspect, rank).await
    }

    async fn roster_rows(&self, supervisor_id: UserId) -> Result<Vec<RosterRow>> {
        SqliteStore::roster_rows(self, supervisor_id).await
    }

    async fn aspect_range_counts(&self, supervisor_id: UserId) -> Result<Vec<AspectRangeCount>> {
        SqliteStore::aspect_range_counts(self, supervisor_id).await
    }
}
