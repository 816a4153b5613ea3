//! Slot availability: the single place that decides whether a booking fits.
//!
//! Both operations are pure functions over a caller-supplied snapshot of the
//! day's confirmed bookings. Keeping that snapshot fresh up to the moment of
//! insertion is the store's job (see `BookingStore::insert_booking`).

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::booking::BookedSlot;
use crate::calendar::BusinessCalendar;
use crate::catalog::Catalog;
use crate::interval::{minute_of_day, TimeSpan};

/// Step between offered slot start times, in minutes.
pub const SLOT_GRANULARITY_MIN: u32 = 30;

/// Why a one-off candidate cannot be booked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    ClosedDay,
    OutsideHours,
    OffGrid,
    InPast,
    Overlap,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Rejection::ClosedDay => "the studio is closed that day",
            Rejection::OutsideHours => "the appointment does not fit in business hours",
            Rejection::OffGrid => "appointments start on the hour or half hour",
            Rejection::InPast => "that time has already passed",
            Rejection::Overlap => "that time overlaps another booking",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone)]
pub struct AvailabilityEngine {
    calendar: BusinessCalendar,
    catalog: Arc<Catalog>,
}

impl AvailabilityEngine {
    pub fn new(calendar: BusinessCalendar, catalog: Arc<Catalog>) -> Self {
        Self { calendar, catalog }
    }

    pub fn calendar(&self) -> &BusinessCalendar {
        &self.calendar
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// True when `[start, start + duration)` overlaps none of `existing` on `day`.
    ///
    /// Does not look at business hours or closed days; use
    /// [`validate_candidate`](Self::validate_candidate) for a full check.
    pub fn is_available(
        &self,
        day: NaiveDate,
        start: NaiveTime,
        duration_min: u32,
        existing: &[BookedSlot],
    ) -> bool {
        let candidate = TimeSpan::starting_at(start, duration_min);
        !existing
            .iter()
            .filter(|b| b.day == day)
            .any(|b| b.span(&self.catalog).overlaps(&candidate))
    }

    /// Every free start time on `day` for a service of `duration_min`, ascending.
    ///
    /// Starts are on a [`SLOT_GRANULARITY_MIN`] grid from opening time and the
    /// whole interval must end by closing time. On `now`'s date only starts
    /// strictly after `now` are offered. Closed days yield nothing.
    pub fn list_free_slots(
        &self,
        day: NaiveDate,
        duration_min: u32,
        existing: &[BookedSlot],
        now: NaiveDateTime,
    ) -> Vec<NaiveTime> {
        if !self.calendar.is_open_on(day) {
            return Vec::new();
        }

        let hours = self.calendar.hours();
        let is_today = day == now.date();

        (hours.start..hours.end)
            .step_by(SLOT_GRANULARITY_MIN as usize)
            .take_while(|start| start.saturating_add(duration_min) <= hours.end)
            .filter_map(|minute| NaiveTime::from_hms_opt(minute / 60, minute % 60, 0))
            .filter(|start| !is_today || *start > now.time())
            .filter(|start| self.is_available(day, *start, duration_min, existing))
            .collect()
    }

    /// Full check for a single requested start, in the order a customer
    /// would want the reason reported.
    pub fn validate_candidate(
        &self,
        day: NaiveDate,
        start: NaiveTime,
        duration_min: u32,
        existing: &[BookedSlot],
        now: NaiveDateTime,
    ) -> Result<(), Rejection> {
        if !self.calendar.is_open_on(day) {
            return Err(Rejection::ClosedDay);
        }
        if !self.calendar.contains(start, duration_min) {
            return Err(Rejection::OutsideHours);
        }
        let offset = minute_of_day(start) - self.calendar.hours().start;
        if offset % SLOT_GRANULARITY_MIN != 0 || start.second() != 0 {
            return Err(Rejection::OffGrid);
        }
        if day < now.date() || (day == now.date() && start <= now.time()) {
            return Err(Rejection::InPast);
        }
        if !self.is_available(day, start, duration_min, existing) {
            return Err(Rejection::Overlap);
        }
        Ok(())
    }

    /// Days within the horizon that still have at least one free slot.
    ///
    /// `bookings_for` supplies the confirmed bookings of a given day.
    pub fn days_with_free_slots<F>(
        &self,
        duration_min: u32,
        horizon_days: u32,
        now: NaiveDateTime,
        mut bookings_for: F,
    ) -> Vec<NaiveDate>
    where
        F: FnMut(NaiveDate) -> Vec<BookedSlot>,
    {
        self.calendar
            .bookable_days(now.date(), horizon_days)
            .into_iter()
            .filter(|day| {
                let existing = bookings_for(*day);
                !self
                    .list_free_slots(*day, duration_min, &existing, now)
                    .is_empty()
            })
            .collect()
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FALLBACK_DURATION_MIN;

    /// Monday.
    const DAY: &str = "2026-03-02";

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn time(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, "%H:%M").unwrap()
    }

    fn at(day: &str, t: &str) -> NaiveDateTime {
        date(day).and_time(time(t))
    }

    /// A `now` safely before [`DAY`], so nothing is in the past.
    fn yesterday() -> NaiveDateTime {
        at("2026-03-01", "08:00")
    }

    fn engine() -> AvailabilityEngine {
        AvailabilityEngine::new(BusinessCalendar::default(), Arc::new(Catalog::default()))
    }

    fn booked(t: &str, service: &str) -> BookedSlot {
        BookedSlot {
            day: date(DAY),
            start_time: time(t),
            service_key: service.into(),
        }
    }

    fn hhmm(slots: &[NaiveTime]) -> Vec<String> {
        slots.iter().map(|t| t.format("%H:%M").to_string()).collect()
    }

    // ── is_available ──

    #[test]
    fn test_empty_day_is_available() {
        assert!(engine().is_available(date(DAY), time("10:00"), 30, &[]));
    }

    #[test]
    fn test_touching_endpoint_is_available() {
        let existing = [booked("09:30", "haircut")];
        assert!(engine().is_available(date(DAY), time("10:00"), 30, &existing));
    }

    #[test]
    fn test_ending_at_existing_start_is_available() {
        let existing = [booked("10:00", "haircut")];
        assert!(engine().is_available(date(DAY), time("09:30"), 30, &existing));
    }

    #[test]
    fn test_identical_candidate_is_not_available() {
        let existing = [booked("11:00", "style")];
        assert!(!engine().is_available(date(DAY), time("11:00"), 45, &existing));
    }

    #[test]
    fn test_candidate_inside_long_booking() {
        let existing = [booked("10:00", "color")];
        assert!(!engine().is_available(date(DAY), time("11:00"), 20, &existing));
    }

    #[test]
    fn test_unknown_service_occupies_fallback() {
        let existing = [booked("12:00", "discontinued")];
        let e = engine();
        assert!(!e.is_available(date(DAY), time("12:00"), 30, &existing));
        assert!(!e.is_available(date(DAY), time("12:20"), 10, &existing));
        let after = 12 * 60 + FALLBACK_DURATION_MIN;
        let after = NaiveTime::from_hms_opt(after / 60, after % 60, 0).unwrap();
        assert!(e.is_available(date(DAY), after, 30, &existing));
    }

    #[test]
    fn test_bookings_on_other_days_ignored() {
        let mut other = booked("10:00", "haircut");
        other.day = date("2026-03-03");
        assert!(engine().is_available(date(DAY), time("10:00"), 30, &[other]));
    }

    // ── list_free_slots ──

    #[test]
    fn test_half_hour_grid_full_day() {
        let slots = engine().list_free_slots(date(DAY), 30, &[], yesterday());
        assert_eq!(slots.len(), 18);
        assert_eq!(slots.first(), Some(&time("09:00")));
        assert_eq!(slots.last(), Some(&time("17:30")));
        assert!(slots.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_long_service_ends_by_close() {
        let slots = engine().list_free_slots(date(DAY), 90, &[], yesterday());
        assert_eq!(slots.last(), Some(&time("16:30")));
        assert_eq!(slots.len(), 16);
    }

    #[test]
    fn test_oversized_duration_lists_nothing() {
        let e = engine();
        assert!(e.list_free_slots(date(DAY), u32::MAX, &[], yesterday()).is_empty());
        assert!(e.is_available(date(DAY), time("10:00"), u32::MAX, &[]));
        assert!(!e.is_available(date(DAY), time("09:00"), u32::MAX, &[booked("17:30", "haircut")]));
        assert_eq!(
            e.validate_candidate(date(DAY), time("10:00"), u32::MAX, &[], yesterday()),
            Err(Rejection::OutsideHours)
        );
    }

    #[test]
    fn test_closed_day_is_empty() {
        let sunday = date("2026-03-01");
        let slots = engine().list_free_slots(sunday, 30, &[], at("2026-02-27", "08:00"));
        assert!(slots.is_empty());
    }

    #[test]
    fn test_today_excludes_past_starts() {
        let slots = engine().list_free_slots(date(DAY), 30, &[], at(DAY, "14:15"));
        assert!(!slots.contains(&time("14:00")));
        assert!(slots.contains(&time("14:30")));
        assert_eq!(slots.first(), Some(&time("14:30")));
    }

    #[test]
    fn test_today_exact_start_is_past() {
        let slots = engine().list_free_slots(date(DAY), 30, &[], at(DAY, "14:00"));
        assert_eq!(slots.first(), Some(&time("14:30")));
    }

    #[test]
    fn test_future_day_ignores_now_time() {
        let slots = engine().list_free_slots(date(DAY), 30, &[], at("2026-03-01", "23:59"));
        assert_eq!(slots.len(), 18);
    }

    #[test]
    fn test_today_after_close_is_empty() {
        let slots = engine().list_free_slots(date(DAY), 30, &[], at(DAY, "18:30"));
        assert!(slots.is_empty());
    }

    #[test]
    fn test_fragmented_day() {
        let existing = [booked("09:00", "haircut"), booked("10:00", "color")];
        let slots = hhmm(&engine().list_free_slots(date(DAY), 30, &existing, yesterday()));
        for taken in ["09:00", "10:00", "10:30", "11:00"] {
            assert!(!slots.contains(&taken.to_string()), "{taken} should be taken");
        }
        assert_eq!(slots[0], "09:30");
        assert_eq!(slots[1], "11:30");
        assert_eq!(slots.len(), 18 - 4);
    }

    #[test]
    fn test_long_service_needs_whole_gap() {
        // 09:30 gap is only 30 min wide; 45-min service cannot fit there
        let existing = [booked("09:00", "haircut"), booked("10:00", "color")];
        let slots = engine().list_free_slots(date(DAY), 45, &existing, yesterday());
        assert!(!slots.contains(&time("09:30")));
        assert_eq!(slots.first(), Some(&time("11:30")));
    }

    #[test]
    fn test_unknown_service_in_listing() {
        let existing = [booked("12:00", "discontinued")];
        let slots = engine().list_free_slots(date(DAY), 30, &existing, yesterday());
        assert!(!slots.contains(&time("12:00")));
        assert!(slots.contains(&time("12:30")));
    }

    #[test]
    fn test_fully_booked_is_empty_not_error() {
        let existing: Vec<BookedSlot> = (9..18)
            .flat_map(|h| [format!("{h:02}:00"), format!("{h:02}:30")])
            .map(|t| booked(&t, "haircut"))
            .collect();
        assert!(engine()
            .list_free_slots(date(DAY), 30, &existing, yesterday())
            .is_empty());
    }

    #[test]
    fn test_listing_is_idempotent() {
        let e = engine();
        let existing = [booked("13:00", "style"), booked("15:30", "beard")];
        let now = at(DAY, "10:05");
        let first = e.list_free_slots(date(DAY), 45, &existing, now);
        let second = e.list_free_slots(date(DAY), 45, &existing, now);
        assert_eq!(first, second);
    }

    #[test]
    fn test_custom_hours() {
        let calendar = BusinessCalendar::new(10, 12, vec![]).unwrap();
        let e = AvailabilityEngine::new(calendar, Arc::new(Catalog::default()));
        let slots = hhmm(&e.list_free_slots(date(DAY), 30, &[], yesterday()));
        assert_eq!(slots, ["10:00", "10:30", "11:00", "11:30"]);
    }

    // ── validate_candidate ──

    #[test]
    fn test_validate_ok() {
        assert_eq!(
            engine().validate_candidate(date(DAY), time("10:00"), 30, &[], yesterday()),
            Ok(())
        );
    }

    #[test]
    fn test_validate_closed_day() {
        let sunday = date("2026-03-08");
        assert_eq!(
            engine().validate_candidate(sunday, time("10:00"), 30, &[], yesterday()),
            Err(Rejection::ClosedDay)
        );
    }

    #[test]
    fn test_validate_outside_hours() {
        let e = engine();
        assert_eq!(
            e.validate_candidate(date(DAY), time("08:30"), 30, &[], yesterday()),
            Err(Rejection::OutsideHours)
        );
        assert_eq!(
            e.validate_candidate(date(DAY), time("17:00"), 90, &[], yesterday()),
            Err(Rejection::OutsideHours)
        );
    }

    #[test]
    fn test_validate_off_grid() {
        assert_eq!(
            engine().validate_candidate(date(DAY), time("10:15"), 30, &[], yesterday()),
            Err(Rejection::OffGrid)
        );
    }

    #[test]
    fn test_validate_past() {
        let e = engine();
        assert_eq!(
            e.validate_candidate(date(DAY), time("14:00"), 30, &[], at(DAY, "14:15")),
            Err(Rejection::InPast)
        );
        assert_eq!(
            e.validate_candidate(date(DAY), time("14:00"), 30, &[], at("2026-03-03", "08:00")),
            Err(Rejection::InPast)
        );
    }

    #[test]
    fn test_validate_overlap() {
        let existing = [booked("10:00", "color")];
        assert_eq!(
            engine().validate_candidate(date(DAY), time("11:00"), 30, &existing, yesterday()),
            Err(Rejection::Overlap)
        );
    }

    #[test]
    fn test_validate_agrees_with_listing() {
        let e = engine();
        let existing = [booked("09:00", "haircut"), booked("10:00", "color"), booked("15:00", "perm")];
        let now = at(DAY, "09:10");
        for duration in [20, 30, 45, 90] {
            let listed = e.list_free_slots(date(DAY), duration, &existing, now);
            for minute in (0..24 * 60).step_by(SLOT_GRANULARITY_MIN as usize) {
                let start = NaiveTime::from_hms_opt(minute / 60, minute % 60, 0).unwrap();
                let accepted = e
                    .validate_candidate(date(DAY), start, duration, &existing, now)
                    .is_ok();
                assert_eq!(accepted, listed.contains(&start), "{start} for {duration} min");
            }
        }
    }

    // ── days_with_free_slots ──

    #[test]
    fn test_days_with_free_slots_skips_full_and_closed() {
        let e = engine();
        let full_day = date("2026-03-03");
        let full: Vec<BookedSlot> = (9..18)
            .map(|h| BookedSlot {
                day: full_day,
                start_time: time(&format!("{h:02}:00")),
                service_key: "color".into(),
            })
            .collect();
        let days = e.days_with_free_slots(30, 7, at(DAY, "08:00"), |day| {
            if day == full_day {
                full.clone()
            } else {
                Vec::new()
            }
        });
        assert_eq!(days.first(), Some(&date(DAY)));
        assert!(!days.contains(&full_day));
        assert!(!days.contains(&date("2026-03-08")));
        assert_eq!(days.len(), 5);
    }
}
