use chrono::{NaiveDate, NaiveTime};
use studio_core::interval::{format_hhmm, parse_hhmm};
use studio_core::messages::{format_day_short, format_time_12h, service_button};
use studio_core::Catalog;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

const TIMES_PER_ROW: usize = 3;

/// Everything an inline button can ask the bot to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Book,
    MyBookings,
    Back,
    Admin,
    AdminToday,
    AdminTomorrow,
    AdminForward,
    Service(String),
    Date(NaiveDate),
    Time(NaiveTime),
}

impl Action {
    pub fn parse(data: &str) -> Option<Self> {
        let action = match data {
            "book" => Action::Book,
            "mybookings" => Action::MyBookings,
            "back" => Action::Back,
            "admin" => Action::Admin,
            "admin_today" => Action::AdminToday,
            "admin_tomorrow" => Action::AdminTomorrow,
            "admin_forward" => Action::AdminForward,
            _ => {
                if let Some(key) = data.strip_prefix("service:") {
                    Action::Service(key.to_string())
                } else if let Some(day) = data.strip_prefix("date:") {
                    Action::Date(NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()?)
                } else if let Some(time) = data.strip_prefix("time:") {
                    Action::Time(parse_hhmm(time)?)
                } else {
                    return None;
                }
            }
        };
        Some(action)
    }

    pub fn data(&self) -> String {
        match self {
            Action::Book => "book".into(),
            Action::MyBookings => "mybookings".into(),
            Action::Back => "back".into(),
            Action::Admin => "admin".into(),
            Action::AdminToday => "admin_today".into(),
            Action::AdminTomorrow => "admin_tomorrow".into(),
            Action::AdminForward => "admin_forward".into(),
            Action::Service(key) => format!("service:{key}"),
            Action::Date(day) => format!("date:{}", day.format("%Y-%m-%d")),
            Action::Time(t) => format!("time:{}", format_hhmm(*t)),
        }
    }
}

fn button(label: impl Into<String>, action: Action) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(label, action.data())
}

pub fn main_menu(is_admin: bool) -> InlineKeyboardMarkup {
    let mut rows = vec![
        vec![button("📅 Book Appointment", Action::Book)],
        vec![button("📋 My Bookings", Action::MyBookings)],
    ];
    if is_admin {
        rows.push(vec![button("⚙️ Admin", Action::Admin)]);
    }
    InlineKeyboardMarkup::new(rows)
}

pub fn back() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![button("⬅️ Back", Action::Back)]])
}

pub fn services(catalog: &Catalog) -> InlineKeyboardMarkup {
    let rows = catalog
        .iter()
        .map(|s| vec![button(service_button(s), Action::Service(s.key.clone()))])
        .collect::<Vec<_>>();
    InlineKeyboardMarkup::new(rows)
}

pub fn dates(days: &[NaiveDate]) -> InlineKeyboardMarkup {
    let rows = days
        .iter()
        .map(|d| vec![button(format_day_short(*d), Action::Date(*d))])
        .collect::<Vec<_>>();
    InlineKeyboardMarkup::new(rows)
}

pub fn times(slots: &[NaiveTime]) -> InlineKeyboardMarkup {
    let rows = slots
        .chunks(TIMES_PER_ROW)
        .map(|row| {
            row.iter()
                .map(|t| button(format_time_12h(*t), Action::Time(*t)))
                .collect()
        })
        .collect::<Vec<Vec<_>>>();
    InlineKeyboardMarkup::new(rows)
}

pub fn admin_panel() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![button("📊 Today's Bookings", Action::AdminToday)],
        vec![button("📅 Tomorrow's Bookings", Action::AdminTomorrow)],
        vec![button("📤 Forward All Bookings", Action::AdminForward)],
        vec![button("⬅️ Back", Action::Back)],
    ])
}

pub fn back_to_admin() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![button("⬅️ Back to Admin", Action::Admin)]])
}

pub fn cancel_forward() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![button("❌ Cancel", Action::Admin)]])
}

// ── Tests ──
