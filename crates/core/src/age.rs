//! Age ranges and month-precision age computation.
//!
//! Catalog entries declare the ages they apply to as a string, either
//! `"low-high"` (both bounds in months, inclusive) or a single number.
//! A single bound reads as "up to this many months": it matches any age
//! at or below the bound and doubles as the overdue ceiling.

use chrono::{Datelike, NaiveDate};

/// Parsed view of a catalog entry's `age_range` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgeRange {
    /// `"low-high"`: inclusive bracket in months
    Span {
        /// Lower bound (months, inclusive)
        low: u32,
        /// Upper bound (months, inclusive)
        high: u32,
    },
    /// A single number: open start, capped at `bound`
    Single {
        /// Ceiling (months)
        bound: u32,
    },
}

impl AgeRange {
    /// Parse an `age_range` string. Whitespace around the dash is
    /// tolerated. Returns `None` for anything that is not one or two
    /// non-negative integers.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        match raw.split_once('-') {
            Some((low, high)) => {
                let low = low.trim().parse().ok()?;
                let high = high.trim().parse().ok()?;
                Some(AgeRange::Span { low, high })
            }
            None => {
                let bound = raw.parse().ok()?;
                Some(AgeRange::Single { bound })
            }
        }
    }

    /// Whether a child of `age_months` falls inside this range.
    pub fn contains(&self, age_months: u32) -> bool {
        match *self {
            AgeRange::Span { low, high } => age_months >= low && age_months <= high,
            AgeRange::Single { bound } => age_months <= bound,
        }
    }

    /// The age ceiling used for overdue classification: a child whose
    /// age has reached the ceiling is past this checkpoint's window.
    pub fn ceiling(&self) -> u32 {
        match *self {
            AgeRange::Span { high, .. } => high,
            AgeRange::Single { bound } => bound,
        }
    }
}

/// Whole months elapsed from `birthday` to `on`, clamped at zero.
pub fn age_in_months(birthday: NaiveDate, on: NaiveDate) -> u32 {
    let years = on.year() - birthday.year();
    let mut months = years * 12 + (on.month() as i32 - birthday.month() as i32);
    if on.day() < birthday.day() {
        months -= 1;
    }
    months.max(0) as u32
}
