//! Assessment progression and aggregation engines.
//!
//! The progression engine walks a child through an aspect's ordered
//! checkpoint curriculum, one implementation shared by the parent and
//! supervisor tracks. The aggregation engine turns a supervisor's
//! caseload into per-aspect pass/overdue statistics.

mod aggregate;
mod error;
mod progression;

pub use aggregate::{AggregationEngine, AspectStats, OverdueChild};
pub use error::{EngineError, Result};
pub use progression::{Advance, Progress, ProgressionEngine, TransitionOutcome};
