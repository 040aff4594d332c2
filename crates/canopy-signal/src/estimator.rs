//! The signal source seam and observation windows.

use crate::{Result, SignalError};
use canopy_engine::VegetationSignal;
use canopy_geo::Polygon;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// A source of vegetation statistics for a parcel.
///
/// Implementations produce the same [`VegetationSignal`] shape so the engine
/// does not care which one ran; [`method`](Self::method) records it.
pub trait VegetationSignalEstimator: Send + Sync {
    /// Calculation method tag stored on the resulting estimate.
    fn method(&self) -> &'static str;

    /// Produce index statistics and a land-cover mix for `polygon`.
    fn estimate_signal(&self, polygon: &Polygon, range: Option<&DateRange>) -> Result<VegetationSignal>;
}

/// Inclusive observation window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Create a window; `start` must not be after `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(SignalError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// The `days`-long window ending on `end`.
    pub fn ending(end: NaiveDate, days: u64) -> Self {
        let start = end.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN);
        Self { start, end }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of days covered, counting both ends.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_valid_range() {
        let range = DateRange::new(date(2024, 1, 1), date(2024, 3, 31)).unwrap();
        assert_eq!(range.days(), 91);
        assert_eq!(DateRange::new(date(2024, 1, 1), date(2024, 1, 1)).unwrap().days(), 1);
    }

    #[test]
    fn test_inverted_range_rejected() {
        let err = DateRange::new(date(2024, 5, 1), date(2024, 4, 1)).unwrap_err();
        assert!(matches!(err, SignalError::InvalidDateRange { .. }));
    }

    #[test]
    fn test_ending() {
        let range = DateRange::ending(date(2024, 3, 31), 90);
        assert_eq!(range.start(), date(2024, 1, 1));
        assert_eq!(range.end(), date(2024, 3, 31));
    }
}
