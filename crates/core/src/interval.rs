//! Half-open time intervals on a single calendar day.
//!
//! Times are kept as minutes from midnight so an interval that runs past
//! 24:00 still compares correctly; it just has no printable end time.

use chrono::{NaiveTime, Timelike};

/// Minutes in one day.
pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// `[start, end)` in minutes from midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeSpan {
    pub start: u32,
    pub end: u32,
}

impl TimeSpan {
    /// Interval beginning at `start` and lasting `duration_min` minutes.
    pub fn starting_at(start: NaiveTime, duration_min: u32) -> Self {
        let start = minute_of_day(start);
        Self {
            start,
            end: start.saturating_add(duration_min),
        }
    }

    /// Half-open overlap: touching endpoints do not count.
    pub fn overlaps(&self, other: &TimeSpan) -> bool {
        self.start < other.end && self.end > other.start
    }

    pub fn duration_min(&self) -> u32 {
        self.end - self.start
    }

    pub fn start_time(&self) -> NaiveTime {
        time_from_minutes(self.start).unwrap_or(NaiveTime::MIN)
    }

    /// `None` when the interval runs past midnight.
    pub fn end_time(&self) -> Option<NaiveTime> {
        time_from_minutes(self.end)
    }
}

/// `start + duration_min`, or `None` if that crosses midnight.
pub fn end_time(start: NaiveTime, duration_min: u32) -> Option<NaiveTime> {
    TimeSpan::starting_at(start, duration_min).end_time()
}

pub fn overlaps(a: &TimeSpan, b: &TimeSpan) -> bool {
    a.overlaps(b)
}

/// Whole minutes since midnight; seconds are dropped.
pub fn minute_of_day(t: NaiveTime) -> u32 {
    t.hour() * 60 + t.minute()
}

fn time_from_minutes(minutes: u32) -> Option<NaiveTime> {
    if minutes >= MINUTES_PER_DAY {
        return None;
    }
    NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0)
}

/// Parse `HH:MM` (the storage and wire format).
pub fn parse_hhmm(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M").ok()
}

pub fn format_hhmm(t: NaiveTime) -> String {
    t.format("%H:%M").to_string()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> NaiveTime {
        parse_hhmm(s).unwrap()
    }

    fn span(start: &str, minutes: u32) -> TimeSpan {
        TimeSpan::starting_at(t(start), minutes)
    }

    #[test]
    fn test_end_time_basic() {
        assert_eq!(end_time(t("10:00"), 30), Some(t("10:30")));
    }

    #[test]
    fn test_end_time_cross_hour() {
        assert_eq!(end_time(t("10:45"), 30), Some(t("11:15")));
    }

    #[test]
    fn test_end_time_past_midnight_is_none() {
        assert_eq!(end_time(t("23:30"), 60), None);
    }

    #[test]
    fn test_end_time_exactly_midnight_is_none() {
        assert_eq!(end_time(t("23:00"), 60), None);
    }

    #[test]
    fn test_huge_duration_saturates() {
        let s = span("10:00", u32::MAX);
        assert_eq!(s.end, u32::MAX);
        assert_eq!(s.end_time(), None);
        assert!(s.overlaps(&span("23:30", 30)));
    }

    #[test]
    fn test_overlap_partial() {
        assert!(span("10:00", 60).overlaps(&span("10:30", 60)));
    }

    #[test]
    fn test_overlap_contained() {
        assert!(span("10:00", 90).overlaps(&span("10:30", 20)));
    }

    #[test]
    fn test_touching_is_not_overlap() {
        assert!(!span("09:30", 30).overlaps(&span("10:00", 30)));
        assert!(!span("10:00", 30).overlaps(&span("09:30", 30)));
    }

    #[test]
    fn test_identical_overlaps() {
        let a = span("14:00", 45);
        assert!(a.overlaps(&a));
    }

    #[test]
    fn test_overlap_is_symmetric() {
        let starts = ["09:00", "09:20", "09:30", "10:00", "10:45", "11:30"];
        let durations = [20, 30, 45, 90];
        for a_start in starts {
            for b_start in starts {
                for a_len in durations {
                    for b_len in durations {
                        let a = span(a_start, a_len);
                        let b = span(b_start, b_len);
                        assert_eq!(overlaps(&a, &b), overlaps(&b, &a), "{a:?} vs {b:?}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_span_past_midnight_still_overlaps() {
        let late = span("23:30", 90);
        assert_eq!(late.end, MINUTES_PER_DAY + 60);
        assert!(late.overlaps(&span("23:45", 10)));
    }

    #[test]
    fn test_parse_hhmm_rejects_garbage() {
        assert!(parse_hhmm("garbage").is_none());
        assert!(parse_hhmm("25:00").is_none());
    }

    #[test]
    fn test_format_hhmm_pads() {
        assert_eq!(format_hhmm(NaiveTime::from_hms_opt(9, 5, 0).unwrap()), "09:05");
    }
}
