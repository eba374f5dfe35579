//! Dense `(year, month)` enumeration over a closed year range.
//!
//! There is no cursor and no persisted progress: enumerating the same range
//! always yields the same sequence, and a restarted crawl walks it from the
//! first month again.

use crate::models::Period;
use std::fmt;

/// Inclusive year range `[year_min, year_max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodRange {
    year_min: i32,
    year_max: i32,
}

impl PeriodRange {
    /// Returns `None` when `year_min > year_max`.
    pub fn new(year_min: i32, year_max: i32) -> Option<Self> {
        (year_min <= year_max).then_some(Self { year_min, year_max })
    }

    pub fn year_min(&self) -> i32 {
        self.year_min
    }

    pub fn year_max(&self) -> i32 {
        self.year_max
    }

    /// Months ascending within years ascending:
    /// `(min, 1), (min, 2), …, (max, 12)`.
    pub fn iter(&self) -> impl Iterator<Item = Period> {
        (self.year_min..=self.year_max)
            .flat_map(|year| (1..=12).filter_map(move |month| Period::new(year, month)))
    }

    pub fn len(&self) -> usize {
        let years = i64::from(self.year_max) - i64::from(self.year_min) + 1;
        years as usize * 12
    }
}

impl fmt::Display for PeriodRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-01..={}-12", self.year_min(), self.year_max())
    }
}
