//! sqlite persistence for appointments.
//!
//! The availability check that guards an insert runs inside the same
//! `BEGIN IMMEDIATE` transaction as the insert itself. sqlite grants that
//! write lock to one connection at a time across every process sharing the
//! file, so the bot and the API server cannot both confirm overlapping
//! bookings from stale snapshots.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::sqlite::{SqliteConnection, SqlitePool, SqlitePoolOptions};
use sqlx::Sqlite;

use crate::availability::{AvailabilityEngine, Rejection};
use crate::booking::{BookedSlot, Booking, BookingStatus, NewBooking};
use crate::error::StoreError;
use crate::interval::{format_hhmm, parse_hhmm};

const DATE_FORMAT: &str = "%Y-%m-%d";
const CREATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const BOOKING_SELECT: &str = "SELECT id, customer_id, name, phone, service, date, time, status, created_at
     FROM appointments";

/// Named, run-once schema steps, applied in order.
const MIGRATIONS: &[(&str, &[&str])] = &[
    (
        "001_appointments",
        &["CREATE TABLE IF NOT EXISTS appointments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            customer_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            phone TEXT NOT NULL,
            service TEXT NOT NULL,
            date TEXT NOT NULL,
            time TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'confirmed',
            reminder_sent INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        )"],
    ),
    (
        "002_indexes",
        &[
            "CREATE INDEX IF NOT EXISTS idx_appointments_date_status ON appointments(date, status)",
            "CREATE INDEX IF NOT EXISTS idx_appointments_customer ON appointments(customer_id)",
        ],
    ),
];

#[derive(Debug, sqlx::FromRow)]
struct BookingRow {
    id: i64,
    customer_id: i64,
    name: String,
    phone: String,
    service: String,
    date: String,
    time: String,
    status: String,
    created_at: String,
}

impl TryFrom<BookingRow> for Booking {
    type Error = StoreError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let corrupt = |reason: String| StoreError::CorruptRow { id: row.id, reason };
        let day = NaiveDate::parse_from_str(&row.date, DATE_FORMAT)
            .map_err(|_| corrupt(format!("bad date {:?}", row.date)))?;
        let start_time = parse_hhmm(&row.time).ok_or_else(|| corrupt(format!("bad time {:?}", row.time)))?;
        let status = BookingStatus::parse(&row.status)
            .ok_or_else(|| corrupt(format!("bad status {:?}", row.status)))?;
        let created_at = NaiveDateTime::parse_from_str(&row.created_at, CREATED_AT_FORMAT)
            .map_err(|_| corrupt(format!("bad created_at {:?}", row.created_at)))?;

        Ok(Booking {
            id: row.id,
            customer_id: row.customer_id,
            customer_name: row.name,
            customer_phone: row.phone,
            service_key: row.service,
            day,
            start_time,
            status,
            created_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct BookingStore {
    pool: SqlitePool,
}

impl BookingStore {
    /// Open (creating if the URL allows) and migrate.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        // WAL lets readers proceed while a booking holds the write lock
        sqlx::query("PRAGMA journal_mode=WAL")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS _migrations (
                name TEXT PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
        )
        .execute(&self.pool)
        .await?;

        for (name, statements) in MIGRATIONS {
            let applied: bool =
                sqlx::query_scalar("SELECT COUNT(*) > 0 FROM _migrations WHERE name = ?")
                    .bind(name)
                    .fetch_one(&self.pool)
                    .await?;
            if applied {
                continue;
            }

            let mut tx = self.pool.begin().await?;
            for statement in *statements {
                sqlx::query(statement).execute(&mut *tx).await?;
            }
            sqlx::query("INSERT INTO _migrations (name) VALUES (?)")
                .bind(name)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            tracing::info!("Applied migration: {}", name);
        }

        tracing::info!("Database migrations up to date");
        Ok(())
    }

    /// Cheap reachability probe for health checks.
    pub async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    /// Start times and services of the confirmed bookings on `day`.
    pub async fn fetch_confirmed_bookings(&self, day: NaiveDate) -> Result<Vec<BookedSlot>, StoreError> {
        fetch_slots(&self.pool, day).await
    }

    /// Re-checks availability under the write lock, then inserts.
    ///
    /// Fails with [`StoreError::SlotTaken`] when a booking confirmed since the
    /// caller's last read now overlaps, and [`StoreError::Rejected`] for any
    /// other reason the candidate is not bookable.
    pub async fn insert_booking(
        &self,
        booking: &NewBooking,
        engine: &AvailabilityEngine,
        now: NaiveDateTime,
    ) -> Result<i64, StoreError> {
        let pool = self.pool.clone();
        let booking = booking.clone();
        let engine = engine.clone();

        // Own task: a cancelled caller must not strand an open transaction.
        let task = tokio::spawn(async move { insert_serialized(&pool, &booking, &engine, now).await });
        let id = task.await.map_err(|e| StoreError::Interrupted(e.to_string()))??;
        Ok(id)
    }

    /// Confirmed bookings on `day`, by start time.
    pub async fn bookings_on(&self, day: NaiveDate) -> Result<Vec<Booking>, StoreError> {
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            "{BOOKING_SELECT} WHERE date = ? AND status = 'confirmed' ORDER BY time ASC"
        ))
        .bind(day.format(DATE_FORMAT).to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Booking::try_from).collect()
    }

    /// A customer's confirmed bookings from `today` on.
    pub async fn upcoming_for_customer(
        &self,
        customer_id: i64,
        today: NaiveDate,
    ) -> Result<Vec<Booking>, StoreError> {
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            "{BOOKING_SELECT} WHERE customer_id = ? AND date >= ? AND status = 'confirmed'
             ORDER BY date ASC, time ASC"
        ))
        .bind(customer_id)
        .bind(today.format(DATE_FORMAT).to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Booking::try_from).collect()
    }

    /// Every confirmed booking from `today` on.
    pub async fn upcoming(&self, today: NaiveDate) -> Result<Vec<Booking>, StoreError> {
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            "{BOOKING_SELECT} WHERE date >= ? AND status = 'confirmed' ORDER BY date ASC, time ASC"
        ))
        .bind(today.format(DATE_FORMAT).to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Booking::try_from).collect()
    }

    /// Confirmed bookings on `day` whose customer has not been reminded yet.
    pub async fn due_reminders(&self, day: NaiveDate) -> Result<Vec<Booking>, StoreError> {
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            "{BOOKING_SELECT} WHERE date = ? AND status = 'confirmed' AND reminder_sent = 0
             ORDER BY time ASC"
        ))
        .bind(day.format(DATE_FORMAT).to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Booking::try_from).collect()
    }

    pub async fn mark_reminded(&self, id: i64) -> Result<(), StoreError> {
        sqlx::query("UPDATE appointments SET reminder_sent = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

async fn fetch_slots<'e, E>(executor: E, day: NaiveDate) -> Result<Vec<BookedSlot>, StoreError>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query_as::<_, (i64, String, String)>(
        "SELECT id, time, service FROM appointments WHERE date = ? AND status = 'confirmed'",
    )
    .bind(day.format(DATE_FORMAT).to_string())
    .fetch_all(executor)
    .await?;

    rows.into_iter()
        .map(|(id, time, service_key)| {
            let start_time: NaiveTime = parse_hhmm(&time).ok_or_else(|| StoreError::CorruptRow {
                id,
                reason: format!("bad time {time:?}"),
            })?;
            Ok(BookedSlot {
                day,
                start_time,
                service_key,
            })
        })
        .collect()
}

async fn insert_serialized(
    pool: &SqlitePool,
    booking: &NewBooking,
    engine: &AvailabilityEngine,
    now: NaiveDateTime,
) -> Result<i64, StoreError> {
    // Dropping the guard on any error path rolls back and clears the write lock
    let mut tx = pool.begin_with("BEGIN IMMEDIATE").await?;
    let id = insert_locked(&mut tx, booking, engine, now).await?;
    tx.commit().await?;

    tracing::info!(
        booking_id = id,
        customer_id = booking.customer_id,
        service = %booking.service_key,
        "Created appointment #{} on {} at {}",
        id,
        booking.day,
        format_hhmm(booking.start_time),
    );
    Ok(id)
}

async fn insert_locked(
    conn: &mut SqliteConnection,
    booking: &NewBooking,
    engine: &AvailabilityEngine,
    now: NaiveDateTime,
) -> Result<i64, StoreError> {
    let duration = engine.catalog().service_duration(&booking.service_key);
    let existing = fetch_slots(&mut *conn, booking.day).await?;

    match engine.validate_candidate(booking.day, booking.start_time, duration, &existing, now) {
        Ok(()) => {}
        Err(Rejection::Overlap) => {
            tracing::warn!(
                day = %booking.day,
                time = %format_hhmm(booking.start_time),
                "slot taken before insert"
            );
            return Err(StoreError::SlotTaken);
        }
        Err(reason) => return Err(StoreError::Rejected(reason)),
    }

    let id = sqlx::query(
        "INSERT INTO appointments (customer_id, name, phone, service, date, time, status, created_at)
         VALUES (?, ?, ?, ?, ?, ?, 'confirmed', ?)",
    )
    .bind(booking.customer_id)
    .bind(&booking.customer_name)
    .bind(&booking.customer_phone)
    .bind(&booking.service_key)
    .bind(booking.day.format(DATE_FORMAT).to_string())
    .bind(format_hhmm(booking.start_time))
    .bind(now.format(CREATED_AT_FORMAT).to_string())
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    Ok(id)
}

// ── Tests ──
