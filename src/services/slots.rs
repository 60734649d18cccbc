use chrono::NaiveDate;
use rusqlite::Connection;

use crate::db::queries;
use crate::models::{Booking, SlotAvailability, SlotGrid};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    /// An active booking already holds the slot. Nothing was written.
    Conflict,
}

/// Admits `booking` into its (date, time slot) and stores it in one step.
///
/// There is no separate availability query: the insert is the check. The
/// partial unique index over active bookings rejects a second active booking
/// for the same slot, so concurrent callers, including ones on other
/// connections to the same database, cannot both be admitted.
pub fn reserve(conn: &Connection, booking: &Booking) -> anyhow::Result<Admission> {
    match queries::insert_booking(conn, booking) {
        Ok(()) => Ok(Admission::Admitted),
        Err(e) if is_active_slot_violation(&e) => Ok(Admission::Conflict),
        Err(e) => Err(anyhow::Error::new(e).context("failed to insert booking")),
    }
}

fn is_active_slot_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, Some(msg)) => {
            e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                && msg.contains("bookings.date")
                && msg.contains("bookings.time_slot")
        }
        _ => false,
    }
}

/// Every slot of the grid on `date`, marked unavailable where an active
/// booking holds it. Advisory: a slot shown free can still be taken before
/// the caller books it.
pub fn available_slots(
    conn: &Connection,
    grid: &SlotGrid,
    date: NaiveDate,
) -> anyhow::Result<Vec<SlotAvailability>> {
    let occupied = queries::occupied_slots(conn, date)?;
    Ok(grid
        .labels()
        .into_iter()
        .map(|label| SlotAvailability {
            available: !occupied.contains(&label),
            time_slot: label,
        })
        .collect())
}
