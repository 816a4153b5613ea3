//! Booking core for a single-location service studio: the service catalog,
//! business calendar, slot availability engine and the sqlite store that
//! both the Telegram bot and the Mini App API write through.

pub mod availability;
pub mod booking;
pub mod calendar;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod error;
pub mod interval;
pub mod messages;
pub mod store;

pub use availability::{AvailabilityEngine, Rejection, SLOT_GRANULARITY_MIN};
pub use booking::{BookedSlot, Booking, BookingStatus, NewBooking};
pub use calendar::BusinessCalendar;
pub use catalog::{Catalog, ServiceDefinition, FALLBACK_DURATION_MIN};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::StudioConfig;
pub use error::{ConfigError, StoreError};
pub use interval::TimeSpan;
pub use store::BookingStore;
