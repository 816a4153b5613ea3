use chrono::{Datelike, NaiveDate, NaiveTime, TimeDelta, Weekday};

use crate::error::ConfigError;
use crate::interval::TimeSpan;

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Daily opening window plus the weekdays the studio never opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusinessCalendar {
    open_hour: u32,
    close_hour: u32,
    closed_weekdays: Vec<Weekday>,
}

impl BusinessCalendar {
    pub fn new(
        open_hour: u32,
        close_hour: u32,
        closed_weekdays: Vec<Weekday>,
    ) -> Result<Self, ConfigError> {
        if open_hour >= close_hour || close_hour > 23 {
            return Err(ConfigError::InvalidHours {
                open: open_hour,
                close: close_hour,
            });
        }
        Ok(Self {
            open_hour,
            close_hour,
            closed_weekdays,
        })
    }

    pub fn open_hour(&self) -> u32 {
        self.open_hour
    }

    pub fn close_hour(&self) -> u32 {
        self.close_hour
    }

    pub fn closed_weekdays(&self) -> &[Weekday] {
        &self.closed_weekdays
    }

    pub fn is_open_on(&self, day: NaiveDate) -> bool {
        !self.closed_weekdays.contains(&day.weekday())
    }

    /// Business hours as a span, `[open:00, close:00)`.
    pub fn hours(&self) -> TimeSpan {
        TimeSpan {
            start: self.open_hour * 60,
            end: self.close_hour * 60,
        }
    }

    /// True when `[start, start + duration)` fits inside business hours.
    pub fn contains(&self, start: NaiveTime, duration_min: u32) -> bool {
        let hours = self.hours();
        let candidate = TimeSpan::starting_at(start, duration_min);
        candidate.start >= hours.start && candidate.end <= hours.end
    }

    /// The next `horizon_days` days from `today` (inclusive), minus closed days.
    pub fn bookable_days(&self, today: NaiveDate, horizon_days: u32) -> Vec<NaiveDate> {
        (0..horizon_days)
            .filter_map(|i| today.checked_add_signed(TimeDelta::days(i64::from(i))))
            .filter(|day| self.is_open_on(*day))
            .collect()
    }
}

impl Default for BusinessCalendar {
    /// 09:00–18:00, closed Sundays.
    fn default() -> Self {
        Self {
            open_hour: 9,
            close_hour: 18,
            closed_weekdays: vec![Weekday::Sun],
        }
    }
}

/// Parse a comma list of weekday numbers, 0 = Monday … 6 = Sunday.
/// An empty string means open every day.
pub fn parse_closed_days(raw: &str) -> Result<Vec<Weekday>, ConfigError> {
    let mut days = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let weekday = part
            .parse::<usize>()
            .ok()
            .and_then(|n| WEEKDAYS.get(n).copied())
            .ok_or_else(|| ConfigError::InvalidWeekday(part.to_string()))?;
        if !days.contains(&weekday) {
            days.push(weekday);
        }
    }
    Ok(days)
}

// ── Tests ──
