//! Catalog entries - the developmental checkpoint curriculum.

use serde::{Deserialize, Serialize};

use crate::id::EntryId;

/// One checkpoint definition in the assessment catalog.
///
/// The catalog is seeded at deployment time and read-only afterwards.
/// Within one aspect, ranks are unique and totally ordered; consecutive
/// ranks' age ranges may overlap or gap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Unique identifier
    #[serde(default)]
    pub id: EntryId,

    /// Developmental aspect this checkpoint belongs to
    pub aspect: String,

    /// Ordinal position within the aspect
    pub rank: i64,

    /// Checkpoint name shown to evaluators
    pub name: String,

    /// Applicable ages, `"low-high"` in months or a single bound
    pub age_range: String,

    /// Illustration for the checkpoint
    #[serde(default)]
    pub image: Option<String>,

    /// Name of the prop/device used during assessment
    #[serde(default)]
    pub device_name: Option<String>,

    /// Illustration of the device
    #[serde(default)]
    pub device_image: Option<String>,

    /// How to prepare the device
    #[serde(default)]
    pub device_detail: Option<String>,

    /// Assessment procedure
    #[serde(default)]
    pub method: Option<String>,

    /// What counts as passing
    #[serde(default)]
    pub success_note: Option<String>,
}
