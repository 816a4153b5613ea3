use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::interval::TimeSpan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "confirmed" => Some(BookingStatus::Confirmed),
            "cancelled" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }
}

/// A persisted appointment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Booking {
    pub id: i64,
    pub customer_id: i64,
    pub customer_name: String,
    pub customer_phone: String,
    pub service_key: String,
    pub day: NaiveDate,
    pub start_time: NaiveTime,
    pub status: BookingStatus,
    pub created_at: NaiveDateTime,
}

impl Booking {
    pub fn slot(&self) -> BookedSlot {
        BookedSlot {
            day: self.day,
            start_time: self.start_time,
            service_key: self.service_key.clone(),
        }
    }

    /// Derived end time; `None` only if the service would run past midnight.
    pub fn end_time(&self, catalog: &Catalog) -> Option<NaiveTime> {
        self.slot().span(catalog).end_time()
    }
}

/// The part of a confirmed booking the availability engine needs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BookedSlot {
    pub day: NaiveDate,
    pub start_time: NaiveTime,
    pub service_key: String,
}

impl BookedSlot {
    /// Occupied interval, using the catalog duration (or the fallback).
    pub fn span(&self, catalog: &Catalog) -> TimeSpan {
        TimeSpan::starting_at(self.start_time, catalog.service_duration(&self.service_key))
    }
}

/// Everything the customer chose, before persistence assigns an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBooking {
    pub customer_id: i64,
    pub customer_name: String,
    pub customer_phone: String,
    pub service_key: String,
    pub day: NaiveDate,
    pub start_time: NaiveTime,
}

impl NewBooking {
    /// The confirmed record, once the store has assigned `id`.
    pub fn into_booking(self, id: i64, created_at: NaiveDateTime) -> Booking {
        Booking {
            id,
            customer_id: self.customer_id,
            customer_name: self.customer_name,
            customer_phone: self.customer_phone,
            service_key: self.service_key,
            day: self.day,
            start_time: self.start_time,
            status: BookingStatus::Confirmed,
            created_at,
        }
    }
}
