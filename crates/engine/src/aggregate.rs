//! Roster-wide aggregation for supervisor dashboards.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use sprout_core::{age_in_months, AgeRange, AttemptStatus, ChildId, UserId};
use sprout_storage::{AspectRangeCount, AssessmentStore, RosterRow};

use crate::error::Result;

/// A child whose latest attempt is not passed and whose age has passed
/// the checkpoint's ceiling. Denormalized for direct display.
#[derive(Debug, Clone, Serialize)]
pub struct OverdueChild {
    /// The child
    pub child_id: ChildId,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Nickname
    pub nick_name: Option<String>,
    /// Date of birth
    pub birthday: NaiveDate,
    /// Gender as entered
    pub gender: Option<String>,
    /// Picture reference
    pub picture: Option<String>,
    /// Current age in months
    pub age_months: u32,
}

/// Per-aspect pass/overdue totals across a supervisor's caseload.
#[derive(Debug, Clone, Serialize)]
pub struct AspectStats {
    /// Developmental aspect
    pub aspect: String,
    /// Latest attempts still on track (live, resumable or complete,
    /// child still inside the checkpoint's age window)
    pub passed_count: i64,
    /// Latest attempts not passed with the age window closed
    pub not_passed_count: i64,
    /// The children behind `not_passed_count`
    pub not_passed_children: Vec<OverdueChild>,
}

/// The roster aggregation engine.
#[derive(Clone)]
pub struct AggregationEngine<S> {
    store: S,
}

impl<S: AssessmentStore> AggregationEngine<S> {
    /// Create an engine over a store handle.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Per-aspect statistics over the supervisor's caseload, sorted by
    /// aspect name.
    ///
    /// Only the latest attempt per (child, aspect) counts - latest by
    /// assessment date, ties broken by attempt id. A latest attempt in
    /// `in_progress`, `not_passed` or `passed_all` counts as on-track
    /// while the child's age is below the checkpoint's ceiling; a
    /// `not_passed` at or past the ceiling is an overdue failure. A
    /// transient `passed` counts toward neither bucket.
    pub async fn roster_stats(
        &self,
        supervisor_id: UserId,
        today: NaiveDate,
    ) -> Result<Vec<AspectStats>> {
        let rows = self.store.roster_rows(supervisor_id).await?;

        let mut latest: HashMap<(ChildId, String), RosterRow> = HashMap::new();
        for row in rows {
            let key = (row.child_id, row.aspect.clone());
            match latest.get(&key) {
                Some(current)
                    if (current.assessment_date, current.attempt_id)
                        >= (row.assessment_date, row.attempt_id) => {}
                _ => {
                    latest.insert(key, row);
                }
            }
        }

        let mut by_aspect: BTreeMap<String, AspectStats> = BTreeMap::new();

        for row in latest.into_values() {
            let Some(range) = AgeRange::parse(&row.age_range) else {
                debug!(age_range = %row.age_range, "skipping unparseable age range");
                continue;
            };

            let age = age_in_months(row.birthday, today);
            let within_window = age < range.ceiling();

            let stats = by_aspect
                .entry(row.aspect.clone())
                .or_insert_with(|| AspectStats {
                    aspect: row.aspect.clone(),
                    passed_count: 0,
                    not_passed_count: 0,
                    not_passed_children: Vec::new(),
                });

            match row.status {
                AttemptStatus::InProgress | AttemptStatus::NotPassed | AttemptStatus::PassedAll
                    if within_window =>
                {
                    stats.passed_count += 1;
                }
                AttemptStatus::NotPassed => {
                    stats.not_passed_count += 1;
                    stats.not_passed_children.push(OverdueChild {
                        child_id: row.child_id,
                        first_name: row.first_name,
                        last_name: row.last_name,
                        nick_name: row.nick_name,
                        birthday: row.birthday,
                        gender: row.gender,
                        picture: row.picture,
                        age_months: age,
                    });
                }
                _ => {}
            }
        }

        Ok(by_aspect.into_values().collect())
    }

    /// Raw pass/fail counts per (aspect, age range) - the finer-grained
    /// breakdown, straight from a grouped query.
    pub async fn roster_stats_detailed(
        &self,
        supervisor_id: UserId,
    ) -> Result<Vec<AspectRangeCount>> {
        Ok(self.store.aspect_range_counts(supervisor_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use sprout_core::{CatalogEntry, Track};
    use sprout_storage::{NewAttempt, NewChild, SqliteStore};

    const SUPERVISOR: UserId = UserId(50);

    fn entry(aspect: &str, rank: i64, age_range: &str) -> CatalogEntry {
        CatalogEntry {
            id: Default::default(),
            aspect: aspect.to_string(),
            rank,
            name: format!("{aspect}-{rank}"),
            age_range: age_range.to_string(),
            image: None,
            device_name: None,
            device_image: None,
            device_detail: None,
            method: None,
            success_note: None,
        }
    }

    /// Child with the given age in whole months as of today.
    async fn add_child(store: &SqliteStore, months_old: i64, name: &str) -> ChildId {
        let birthday = (Utc::now() - Duration::days(months_old * 31)).date_naive();
        store
            .insert_child(
                UserId(2),
                &NewChild {
                    first_name: name,
                    last_name: "Test",
                    nick_name: None,
                    birthday,
                    gender: None,
                    picture: None,
                },
            )
            .await
            .unwrap()
    }

    async fn add_attempt(
        store: &SqliteStore,
        child_id: ChildId,
        aspect: &str,
        rank: i64,
        entry_id: i64,
        status: AttemptStatus,
    ) {
        let attempt = store
            .insert_attempt(
                Track::Supervisor,
                &NewAttempt {
                    child_id,
                    aspect: aspect.to_string(),
                    rank,
                    entry_id: sprout_core::EntryId(entry_id),
                    evaluator_id: SUPERVISOR,
                },
            )
            .await
            .unwrap();

        if status != AttemptStatus::InProgress {
            store
                .force_status(Track::Supervisor, attempt.id, status)
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn partitions_latest_attempts_by_status_and_age() {
        // in_progress, overdue not_passed, young not_passed and
        // passed_all land in the right buckets.
        let store = SqliteStore::in_memory().await.unwrap();
        store
            .seed_catalog(&[entry("motor", 1, "0-6"), entry("motor", 2, "6-12")])
            .await
            .unwrap();

        let live = add_child(&store, 3, "Live").await;
        let overdue = add_child(&store, 10, "Overdue").await;
        let young = add_child(&store, 3, "Young").await;
        let done = add_child(&store, 3, "Done").await;

        add_attempt(&store, live, "motor", 1, 1, AttemptStatus::InProgress).await;
        // Overdue: not passed on the 0-6 checkpoint, child now 10mo.
        add_attempt(&store, overdue, "motor", 1, 1, AttemptStatus::NotPassed).await;
        // Young: not passed but still inside the window.
        add_attempt(&store, young, "motor", 1, 1, AttemptStatus::NotPassed).await;
        add_attempt(&store, done, "motor", 1, 1, AttemptStatus::PassedAll).await;

        let engine = AggregationEngine::new(store);
        let stats = engine
            .roster_stats(SUPERVISOR, Utc::now().date_naive())
            .await
            .unwrap();

        assert_eq!(stats.len(), 1);
        let motor = &stats[0];
        assert_eq!(motor.aspect, "motor");
        assert_eq!(motor.passed_count, 3);
        assert_eq!(motor.not_passed_count, 1);
        assert_eq!(motor.not_passed_children.len(), 1);
        assert_eq!(motor.not_passed_children[0].first_name, "Overdue");
        assert!(motor.not_passed_children[0].age_months >= 6);
    }

    #[tokio::test]
    async fn only_the_latest_attempt_counts() {
        let store = SqliteStore::in_memory().await.unwrap();
        store
            .seed_catalog(&[entry("motor", 1, "0-36"), entry("motor", 2, "0-36")])
            .await
            .unwrap();

        let child = add_child(&store, 3, "Walker").await;
        // An old passed rank-1 row and a live rank-2 row: one unit in
        // the passed bucket, not two.
        add_attempt(&store, child, "motor", 1, 1, AttemptStatus::Passed).await;
        add_attempt(&store, child, "motor", 2, 2, AttemptStatus::InProgress).await;

        let engine = AggregationEngine::new(store);
        let stats = engine
            .roster_stats(SUPERVISOR, Utc::now().date_naive())
            .await
            .unwrap();

        assert_eq!(stats[0].passed_count, 1);
        assert_eq!(stats[0].not_passed_count, 0);
    }

    #[tokio::test]
    async fn transient_passed_counts_toward_neither_bucket() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.seed_catalog(&[entry("motor", 1, "0-36")]).await.unwrap();

        let child = add_child(&store, 3, "Mid").await;
        add_attempt(&store, child, "motor", 1, 1, AttemptStatus::Passed).await;

        let engine = AggregationEngine::new(store);
        let stats = engine
            .roster_stats(SUPERVISOR, Utc::now().date_naive())
            .await
            .unwrap();

        assert_eq!(stats[0].passed_count, 0);
        assert_eq!(stats[0].not_passed_count, 0);
    }

    #[tokio::test]
    async fn aspects_come_back_sorted() {
        let store = SqliteStore::in_memory().await.unwrap();
        store
            .seed_catalog(&[entry("motor", 1, "0-36"), entry("language", 1, "0-36")])
            .await
            .unwrap();

        let child = add_child(&store, 3, "Multi").await;
        // language entry seeded second -> entry_id 2.
        add_attempt(&store, child, "motor", 1, 1, AttemptStatus::InProgress).await;
        add_attempt(&store, child, "language", 1, 2, AttemptStatus::InProgress).await;

        let engine = AggregationEngine::new(store);
        let stats = engine
            .roster_stats(SUPERVISOR, Utc::now().date_naive())
            .await
            .unwrap();

        let aspects: Vec<&str> = stats.iter().map(|s| s.aspect.as_str()).collect();
        assert_eq!(aspects, vec!["language", "motor"]);
    }

    #[tokio::test]
    async fn detailed_cross_tab_counts_raw_statuses() {
        let store = SqliteStore::in_memory().await.unwrap();
        store
            .seed_catalog(&[entry("motor", 1, "0-6"), entry("motor", 2, "6-12")])
            .await
            .unwrap();

        let a = add_child(&store, 3, "A").await;
        let b = add_child(&store, 3, "B").await;
        add_attempt(&store, a, "motor", 1, 1, AttemptStatus::Passed).await;
        add_attempt(&store, a, "motor", 2, 2, AttemptStatus::NotPassed).await;
        add_attempt(&store, b, "motor", 1, 1, AttemptStatus::Passed).await;

        let engine = AggregationEngine::new(store);
        let rows = engine.roster_stats_detailed(SUPERVISOR).await.unwrap();

        assert_eq!(rows.len(), 2);
        let first_bracket = rows.iter().find(|r| r.age_range == "0-6").unwrap();
        assert_eq!(first_bracket.passed, 2);
        assert_eq!(first_bracket.not_passed, 0);

        let second_bracket = rows.iter().find(|r| r.age_range == "6-12").unwrap();
        assert_eq!(second_bracket.passed, 0);
        assert_eq!(second_bracket.not_passed, 1);
    }

    #[tokio::test]
    async fn empty_caseload_yields_empty_stats() {
        let store = SqliteStore::in_memory().await.unwrap();
        let engine = AggregationEngine::new(store);

        let stats = engine
            .roster_stats(SUPERVISOR, Utc::now().date_naive())
            .await
            .unwrap();
        assert!(stats.is_empty());

        let rows = engine.roster_stats_detailed(SUPERVISOR).await.unwrap();
        assert!(rows.is_empty());
    }
}
