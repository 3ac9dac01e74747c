//! The per-(child, aspect) progression state machine.
//!
//! One implementation serves both tracks. The track picks the attempt
//! table and widens two rules on the supervisor side: `not_passed` is a
//! durable, resumable state there, and an advance may start from it.

use tracing::debug;

use sprout_core::{AgeRange, AttemptId, AttemptStatus, ChildId, Track, UserId};
use sprout_storage::{AssessmentStore, AttemptDetail, NewAttempt};

use crate::error::{EngineError, Result};

/// Result of a get-or-bootstrap call.
#[derive(Debug)]
pub enum Progress {
    /// A live attempt, with its checkpoint definition. `created` is
    /// true when this call bootstrapped it.
    Current {
        /// Whether the attempt was created by this call
        created: bool,
        /// The attempt and its catalog entry
        detail: AttemptDetail,
    },
    /// The aspect's curriculum is complete; nothing more to assess.
    Completed,
}

/// Result of an advance-on-pass call.
#[derive(Debug)]
pub enum Advance {
    /// The next checkpoint's attempt, freshly created
    Next(AttemptDetail),
    /// The passed checkpoint was the last one; the aspect is done.
    Completed,
}

/// Outcome of a conditional transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The row was updated
    Applied,
    /// Nothing matched the predicate; no row was touched.
    NoOp,
}

impl TransitionOutcome {
    /// True when the call changed nothing.
    pub fn is_noop(&self) -> bool {
        matches!(self, TransitionOutcome::NoOp)
    }
}

/// Statuses an advance may start from, per track.
fn advance_from(track: Track) -> &'static [AttemptStatus] {
    match track {
        Track::Parent => &[AttemptStatus::InProgress],
        Track::Supervisor => &[AttemptStatus::InProgress, AttemptStatus::NotPassed],
    }
}

/// The assessment progression engine.
#[derive(Clone)]
pub struct ProgressionEngine<S> {
    store: S,
}

impl<S: AssessmentStore> ProgressionEngine<S> {
    /// Create an engine over a store handle.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Current assessment for (child, aspect), bootstrapping the first
    /// attempt from the catalog when none exists.
    pub async fn get_or_bootstrap(
        &self,
        track: Track,
        child_id: ChildId,
        aspect: &str,
        age_months: u32,
        evaluator_id: UserId,
    ) -> Result<Progress> {
        let aspect = aspect.trim();
        if aspect.is_empty() {
            return Err(EngineError::Validation("aspect is required".into()));
        }

        let attempts = self.store.attempts_for(track, child_id, aspect).await?;

        if attempts.is_empty() {
            return self.bootstrap(track, child_id, aspect, age_months, evaluator_id).await;
        }

        // Highest rank wins if duplicate inserts ever left several
        // in_progress rows; the list is already rank-descending.
        if let Some(current) = attempts
            .iter()
            .find(|a| a.status == AttemptStatus::InProgress)
        {
            let entry = self
                .store
                .entry(current.entry_id)
                .await?
                .ok_or_else(|| EngineError::NotFound("catalog entry missing".into()))?;
            return Ok(Progress::Current {
                created: false,
                detail: AttemptDetail {
                    attempt: current.clone(),
                    entry,
                },
            });
        }

        if attempts.iter().any(|a| a.status == AttemptStatus::PassedAll) {
            return Ok(Progress::Completed);
        }

        // Supervisor track: a not_passed row is the resumable current
        // state; the most recently inserted one wins.
        if track == Track::Supervisor {
            if let Some(stuck) = attempts
                .iter()
                .filter(|a| a.status == AttemptStatus::NotPassed)
                .max_by_key(|a| a.id)
            {
                let entry = self
                    .store
                    .entry(stuck.entry_id)
                    .await?
                    .ok_or_else(|| EngineError::NotFound("catalog entry missing".into()))?;
                return Ok(Progress::Current {
                    created: false,
                    detail: AttemptDetail {
                        attempt: stuck.clone(),
                        entry,
                    },
                });
            }
        }

        // Orphaned terminal rows with nothing live: inconsistent state,
        // no automatic repair.
        Err(EngineError::NotFound(
            "no attempt in an expected state".into(),
        ))
    }

    async fn bootstrap(
        &self,
        track: Track,
        child_id: ChildId,
        aspect: &str,
        age_months: u32,
        evaluator_id: UserId,
    ) -> Result<Progress> {
        let entries = self.store.entries_for_aspect(aspect).await?;

        let entry = entries
            .into_iter()
            .find(|e| {
                AgeRange::parse(&e.age_range).is_some_and(|range| range.contains(age_months))
            })
            .ok_or_else(|| {
                EngineError::NotFound(format!("no {aspect} checkpoint covers {age_months} months"))
            })?;

        debug!(%child_id, aspect, rank = entry.rank, "bootstrapping first attempt");

        let attempt = self
            .store
            .insert_attempt(
                track,
                &NewAttempt {
                    child_id,
                    aspect: entry.aspect.clone(),
                    rank: entry.rank,
                    entry_id: entry.id,
                    evaluator_id,
                },
            )
            .await?;

        Ok(Progress::Current {
            created: true,
            detail: AttemptDetail { attempt, entry },
        })
    }

    /// Record a pass and move to the next checkpoint, or close out the
    /// aspect when the passed checkpoint was the last one.
    ///
    /// The conditional update is the only guard against a concurrent
    /// double-advance: the loser observes zero affected rows and gets
    /// `NotFound`.
    pub async fn advance_on_pass(
        &self,
        track: Track,
        attempt_id: AttemptId,
        evaluator_id: UserId,
    ) -> Result<Advance> {
        let updated = self
            .store
            .transition(track, attempt_id, advance_from(track), AttemptStatus::Passed)
            .await?;

        if updated == 0 {
            return Err(EngineError::NotFound(
                "attempt not found or already completed".into(),
            ));
        }

        let attempt = self
            .store
            .attempt(track, attempt_id)
            .await?
            .ok_or_else(|| EngineError::NotFound("attempt vanished mid-advance".into()))?;

        let entry = self
            .store
            .entry(attempt.entry_id)
            .await?
            .ok_or_else(|| EngineError::NotFound("catalog entry missing".into()))?;

        match self.store.next_entry(&attempt.aspect, entry.rank).await? {
            Some(next) => {
                let created = self
                    .store
                    .insert_attempt(
                        track,
                        &NewAttempt {
                            child_id: attempt.child_id,
                            aspect: next.aspect.clone(),
                            rank: next.rank,
                            entry_id: next.id,
                            evaluator_id,
                        },
                    )
                    .await?;

                debug!(
                    attempt = %attempt_id,
                    next_rank = next.rank,
                    "advanced to next checkpoint"
                );

                Ok(Advance::Next(AttemptDetail {
                    attempt: created,
                    entry: next,
                }))
            }
            None => {
                self.store
                    .force_status(track, attempt_id, AttemptStatus::PassedAll)
                    .await?;

                debug!(attempt = %attempt_id, "aspect curriculum complete");
                Ok(Advance::Completed)
            }
        }
    }

    /// Conditional `in_progress -> not_passed`. A miss is a no-op, not
    /// an error.
    pub async fn mark_not_passed(
        &self,
        track: Track,
        attempt_id: AttemptId,
    ) -> Result<TransitionOutcome> {
        let updated = self
            .store
            .transition(
                track,
                attempt_id,
                &[AttemptStatus::InProgress],
                AttemptStatus::NotPassed,
            )
            .await?;

        Ok(if updated == 0 {
            TransitionOutcome::NoOp
        } else {
            TransitionOutcome::Applied
        })
    }

    /// Parent-track retry resolution: force the attempt to `passed`
    /// regardless of its current status. Idempotent.
    pub async fn retry_resolve(&self, attempt_id: AttemptId) -> Result<TransitionOutcome> {
        let updated = self
            .store
            .force_status(Track::Parent, attempt_id, AttemptStatus::Passed)
            .await?;

        Ok(if updated == 0 {
            TransitionOutcome::NoOp
        } else {
            TransitionOutcome::Applied
        })
    }

    /// Attempt history for (child, aspect), newest first.
    pub async fn history(
        &self,
        track: Track,
        child_id: ChildId,
        aspect: &str,
        evaluator: Option<UserId>,
    ) -> Result<Vec<AttemptDetail>> {
        Ok(self
            .store
            .attempt_history(track, child_id, aspect, evaluator)
            .await?)
    }

    /// A child's live attempts (`in_progress`/`passed_all`) with details.
    pub async fn live_state(&self, track: Track, child_id: ChildId) -> Result<Vec<AttemptDetail>> {
        Ok(self.store.live_attempts(track, child_id).await?)
    }

    /// Highest-ranked attempt per aspect for a child and evaluator.
    pub async fn latest_per_aspect(
        &self,
        track: Track,
        child_id: ChildId,
        evaluator: UserId,
    ) -> Result<Vec<AttemptDetail>> {
        Ok(self
            .store
            .latest_attempts_per_aspect(track, child_id, evaluator)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprout_core::CatalogEntry;
    use sprout_storage::SqliteStore;

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

    async fn engine_with_catalog(entries: &[CatalogEntry]) -> ProgressionEngine<SqliteStore> {
        let store = SqliteStore::in_memory().await.unwrap();
        store.seed_catalog(entries).await.unwrap();
        ProgressionEngine::new(store)
    }

    fn detail_of(progress: Progress) -> AttemptDetail {
        match progress {
            Progress::Current { detail, .. } => detail,
            Progress::Completed => panic!("expected a live attempt, got completion sentinel"),
        }
    }

    const CHILD: ChildId = ChildId(1);
    const PARENT: UserId = UserId(10);
    const SUPERVISOR: UserId = UserId(20);

    #[tokio::test]
    async fn bootstrap_picks_first_matching_age_bracket() {
        // With [0,6] -> rank1 and [6,12] -> rank2, age 8 selects rank2.
        let engine = engine_with_catalog(&[entry("motor", 1, "0-6"), entry("motor", 2, "6-12")])
            .await;

        let progress = engine
            .get_or_bootstrap(Track::Parent, CHILD, "motor", 8, PARENT)
            .await
            .unwrap();

        let detail = detail_of(progress);
        assert_eq!(detail.attempt.rank, 2);
        assert_eq!(detail.attempt.status, AttemptStatus::InProgress);
    }

    #[tokio::test]
    async fn bootstrap_fails_when_no_bracket_matches() {
        let engine = engine_with_catalog(&[entry("motor", 1, "0-6")]).await;

        let err = engine
            .get_or_bootstrap(Track::Parent, CHILD, "motor", 48, PARENT)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));

        // Unknown aspect behaves the same way.
        let err = engine
            .get_or_bootstrap(Track::Parent, CHILD, "social", 3, PARENT)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[tokio::test]
    async fn bootstrap_is_not_repeated_while_live() {
        // A second call returns the existing attempt, never a twin.
        let engine = engine_with_catalog(&[entry("motor", 1, "0-6")]).await;

        let first = detail_of(
            engine
                .get_or_bootstrap(Track::Parent, CHILD, "motor", 3, PARENT)
                .await
                .unwrap(),
        );
        let second = engine
            .get_or_bootstrap(Track::Parent, CHILD, "motor", 3, PARENT)
            .await
            .unwrap();

        match second {
            Progress::Current { created, detail } => {
                assert!(!created);
                assert_eq!(detail.attempt.id, first.attempt.id);
            }
            Progress::Completed => panic!("unexpected completion"),
        }
    }

    #[tokio::test]
    async fn full_walk_through_an_aspect() {
        // rank1 covers 0-12, rank2 covers 12-24; the child starts at 10mo.
        let engine =
            engine_with_catalog(&[entry("language", 1, "0-12"), entry("language", 2, "12-24")])
                .await;

        let first = detail_of(
            engine
                .get_or_bootstrap(Track::Parent, CHILD, "language", 10, PARENT)
                .await
                .unwrap(),
        );
        assert_eq!(first.attempt.rank, 1);

        // Pass rank1: rank2 is created in_progress.
        let advance = engine
            .advance_on_pass(Track::Parent, first.attempt.id, PARENT)
            .await
            .unwrap();
        let second = match advance {
            Advance::Next(detail) => detail,
            Advance::Completed => panic!("rank2 should exist"),
        };
        // Ranks increase strictly, following catalog order.
        assert!(second.attempt.rank > first.attempt.rank);
        assert_eq!(second.attempt.rank, 2);

        // Pass rank2: no rank3, the aspect closes out.
        let advance = engine
            .advance_on_pass(Track::Parent, second.attempt.id, PARENT)
            .await
            .unwrap();
        assert!(matches!(advance, Advance::Completed));

        // The sentinel is stable; no lower-rank attempt reappears.
        for _ in 0..2 {
            let progress = engine
                .get_or_bootstrap(Track::Parent, CHILD, "language", 10, PARENT)
                .await
                .unwrap();
            assert!(matches!(progress, Progress::Completed));
        }
    }

    #[tokio::test]
    async fn advance_is_guarded_against_double_calls() {
        // A second advance mutates nothing and reports NotFound.
        let engine =
            engine_with_catalog(&[entry("motor", 1, "0-6"), entry("motor", 2, "6-12")]).await;

        let first = detail_of(
            engine
                .get_or_bootstrap(Track::Parent, CHILD, "motor", 3, PARENT)
                .await
                .unwrap(),
        );

        engine
            .advance_on_pass(Track::Parent, first.attempt.id, PARENT)
            .await
            .unwrap();
        let err = engine
            .advance_on_pass(Track::Parent, first.attempt.id, PARENT)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));

        // Only one rank-2 attempt exists.
        let attempts = engine
            .store
            .attempts_for(Track::Parent, CHILD, "motor")
            .await
            .unwrap();
        assert_eq!(
            attempts.iter().filter(|a| a.rank == 2).count(),
            1,
            "double advance must not duplicate the next attempt"
        );
    }

    #[tokio::test]
    async fn mark_not_passed_noops_when_not_in_progress() {
        let engine = engine_with_catalog(&[entry("motor", 1, "0-6")]).await;

        let detail = detail_of(
            engine
                .get_or_bootstrap(Track::Parent, CHILD, "motor", 3, PARENT)
                .await
                .unwrap(),
        );

        let outcome = engine
            .mark_not_passed(Track::Parent, detail.attempt.id)
            .await
            .unwrap();
        assert_eq!(outcome, TransitionOutcome::Applied);

        // Already not_passed: nothing to do, no error.
        let outcome = engine
            .mark_not_passed(Track::Parent, detail.attempt.id)
            .await
            .unwrap();
        assert_eq!(outcome, TransitionOutcome::NoOp);

        // Missing attempt: same.
        let outcome = engine
            .mark_not_passed(Track::Parent, AttemptId(9999))
            .await
            .unwrap();
        assert_eq!(outcome, TransitionOutcome::NoOp);
    }

    #[tokio::test]
    async fn parent_track_dead_ends_on_not_passed() {
        // Parent track: not_passed with nothing live is inconsistent.
        let engine = engine_with_catalog(&[entry("motor", 1, "0-6")]).await;

        let detail = detail_of(
            engine
                .get_or_bootstrap(Track::Parent, CHILD, "motor", 3, PARENT)
                .await
                .unwrap(),
        );
        engine
            .mark_not_passed(Track::Parent, detail.attempt.id)
            .await
            .unwrap();

        let err = engine
            .get_or_bootstrap(Track::Parent, CHILD, "motor", 3, PARENT)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[tokio::test]
    async fn supervisor_track_surfaces_durable_not_passed() {
        let engine =
            engine_with_catalog(&[entry("motor", 1, "0-6"), entry("motor", 2, "6-12")]).await;

        let detail = detail_of(
            engine
                .get_or_bootstrap(Track::Supervisor, CHILD, "motor", 3, SUPERVISOR)
                .await
                .unwrap(),
        );
        engine
            .mark_not_passed(Track::Supervisor, detail.attempt.id)
            .await
            .unwrap();

        // The not_passed attempt is the current state, not an error.
        let progress = engine
            .get_or_bootstrap(Track::Supervisor, CHILD, "motor", 3, SUPERVISOR)
            .await
            .unwrap();
        let current = detail_of(progress);
        assert_eq!(current.attempt.id, detail.attempt.id);
        assert_eq!(current.attempt.status, AttemptStatus::NotPassed);

        // And an advance may start straight from it.
        let advance = engine
            .advance_on_pass(Track::Supervisor, detail.attempt.id, SUPERVISOR)
            .await
            .unwrap();
        assert!(matches!(advance, Advance::Next(_)));
    }

    #[tokio::test]
    async fn parent_advance_rejects_not_passed_start() {
        let engine =
            engine_with_catalog(&[entry("motor", 1, "0-6"), entry("motor", 2, "6-12")]).await;

        let detail = detail_of(
            engine
                .get_or_bootstrap(Track::Parent, CHILD, "motor", 3, PARENT)
                .await
                .unwrap(),
        );
        engine
            .mark_not_passed(Track::Parent, detail.attempt.id)
            .await
            .unwrap();

        let err = engine
            .advance_on_pass(Track::Parent, detail.attempt.id, PARENT)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[tokio::test]
    async fn retry_resolve_is_idempotent() {
        let engine = engine_with_catalog(&[entry("motor", 1, "0-6")]).await;

        let detail = detail_of(
            engine
                .get_or_bootstrap(Track::Parent, CHILD, "motor", 3, PARENT)
                .await
                .unwrap(),
        );
        engine
            .mark_not_passed(Track::Parent, detail.attempt.id)
            .await
            .unwrap();

        for _ in 0..2 {
            let outcome = engine.retry_resolve(detail.attempt.id).await.unwrap();
            assert_eq!(outcome, TransitionOutcome::Applied);
        }

        let attempt = engine
            .store
            .attempt(Track::Parent, detail.attempt.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(attempt.status, AttemptStatus::Passed);
    }

    #[tokio::test]
    async fn empty_aspect_is_a_validation_error() {
        let engine = engine_with_catalog(&[]).await;

        let err = engine
            .get_or_bootstrap(Track::Parent, CHILD, "  ", 3, PARENT)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }
}
