//! Assessment attempts - one child's try at one catalog checkpoint.

use serde::{Deserialize, Serialize};

use crate::id::{AttemptId, ChildId, EntryId, UserId};
use crate::Time;

/// Which assessment lineage an attempt belongs to.
///
/// Parent-initiated and supervisor-initiated assessments are stored and
/// progressed independently; the two tracks are never merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Track {
    /// Parent-initiated lineage
    Parent,
    /// Supervisor-initiated lineage
    Supervisor,
}

/// Status of an assessment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    /// The checkpoint is currently being assessed
    InProgress,
    /// Passed; immediately superseded by the next checkpoint's attempt
    Passed,
    /// Not passed. Transient on the parent track, durable on the
    /// supervisor track until an explicit retry.
    NotPassed,
    /// Terminal: the whole aspect curriculum is complete
    PassedAll,
}

impl AttemptStatus {
    /// Stable string form used in the database and on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptStatus::InProgress => "in_progress",
            AttemptStatus::Passed => "passed",
            AttemptStatus::NotPassed => "not_passed",
            AttemptStatus::PassedAll => "passed_all",
        }
    }
}

impl std::fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AttemptStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(AttemptStatus::InProgress),
            "passed" => Ok(AttemptStatus::Passed),
            "not_passed" => Ok(AttemptStatus::NotPassed),
            "passed_all" => Ok(AttemptStatus::PassedAll),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Error for a status string the database should never contain.
#[derive(Debug, thiserror::Error)]
#[error("unknown attempt status: {0}")]
pub struct UnknownStatus(pub String);

/// One child's attempt at one catalog rank, on one track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attempt {
    /// Unique identifier
    pub id: AttemptId,

    /// The child being assessed
    pub child_id: ChildId,

    /// Developmental aspect, e.g. "motor" or "language"
    pub aspect: String,

    /// Ordinal position within the aspect, copied from the catalog
    /// entry at creation time
    pub rank: i64,

    /// The catalog entry this attempt is against
    pub entry_id: EntryId,

    /// Current status
    pub status: AttemptStatus,

    /// When the attempt was created or last assessed
    pub assessment_date: Time,

    /// The parent or supervisor performing the assessment
    pub evaluator_id: UserId,
}
