use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Serialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Booking, BookingStatus, BookingView, SlotAvailability, SlotGrid};
use crate::services::catalog::ServiceCatalog;
use crate::services::lifecycle;
use crate::services::query::{self, BookingCriteria, Pagination};
use crate::services::slots::{self, Admission};
use crate::services::validation::{self, CreateBookingRequest};

#[derive(Debug, Serialize)]
pub struct BookingPage {
    pub data: Vec<BookingView>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct DayAvailability {
    pub date: NaiveDate,
    pub slots: Vec<SlotAvailability>,
}

/// Entry point for every booking operation. All writes to the bookings table
/// go through here.
pub struct BookingService {
    db: Arc<Mutex<Connection>>,
    catalog: Box<dyn ServiceCatalog>,
    slots: SlotGrid,
}

impl BookingService {
    pub fn new(
        db: Arc<Mutex<Connection>>,
        catalog: Box<dyn ServiceCatalog>,
        slots: SlotGrid,
    ) -> Self {
        Self { db, catalog, slots }
    }

    fn db(&self) -> Result<MutexGuard<'_, Connection>, AppError> {
        self.db
            .lock()
            .map_err(|_| AppError::Internal(anyhow::anyhow!("database lock poisoned")))
    }

    pub async fn create(&self, req: CreateBookingRequest) -> Result<Booking, AppError> {
        let new = validation::validate_new_booking(req, &self.slots)?;

        let service = self
            .catalog
            .find(&new.service_id)
            .await?
            .ok_or_else(|| AppError::InvalidReference(new.service_id.clone()))?;

        let now = queries::now();
        let booking = Booking {
            id: uuid::Uuid::new_v4().to_string(),
            service_id: new.service_id,
            date: new.date,
            time_slot: new.time_slot,
            customer_info: new.customer_info,
            notes: new.notes,
            status: BookingStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        let admission = {
            let db = self.db()?;
            slots::reserve(&db, &booking)?
        };

        match admission {
            Admission::Admitted => {
                tracing::info!(
                    booking_id = %booking.id,
                    service = %service.name,
                    date = %booking.date,
                    time_slot = %booking.time_slot,
                    "booking created"
                );
                Ok(booking)
            }
            Admission::Conflict => {
                tracing::info!(
                    date = %booking.date,
                    time_slot = %booking.time_slot,
                    "slot already booked"
                );
                Err(AppError::SlotConflict {
                    date: booking.date.to_string(),
                    time_slot: booking.time_slot,
                })
            }
        }
    }

    pub async fn list(&self, criteria: &BookingCriteria) -> Result<BookingPage, AppError> {
        let query = query::build(criteria)?;
        let (data, total) = {
            let db = self.db()?;
            queries::list_bookings(&db, &query)?
        };
        Ok(BookingPage {
            data,
            pagination: Pagination::new(total, query.page),
        })
    }

    pub async fn get(&self, id: &str) -> Result<BookingView, AppError> {
        check_id(id)?;
        let db = self.db()?;
        queries::get_booking_view(&db, id)?
            .ok_or_else(|| AppError::NotFound(format!("booking {id}")))
    }

    /// Moves a booking to `status` if the lifecycle allows it from the
    /// booking's current status. The write only applies if the status is
    /// still the one the decision was made on; otherwise the decision is
    /// retaken against the fresh status.
    pub async fn change_status(&self, id: &str, status: BookingStatus) -> Result<Booking, AppError> {
        check_id(id)?;
        let db = self.db()?;

        loop {
            let current = queries::get_booking_by_id(&db, id)?
                .ok_or_else(|| AppError::NotFound(format!("booking {id}")))?;

            lifecycle::approve_transition(current.status, status)?;

            if queries::update_booking_status(&db, id, current.status, status)? {
                let updated = queries::get_booking_by_id(&db, id)?
                    .ok_or_else(|| AppError::NotFound(format!("booking {id}")))?;
                tracing::info!(
                    booking_id = %id,
                    from = %current.status,
                    to = %status,
                    "booking status changed"
                );
                return Ok(updated);
            }

            tracing::debug!(booking_id = %id, "status changed concurrently, re-evaluating");
        }
    }

    pub async fn available_slots(&self, date: &str) -> Result<DayAvailability, AppError> {
        let day = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
            .map_err(|_| AppError::validation(format!("date must be YYYY-MM-DD: {date}")))?;
        let db = self.db()?;
        let slots = slots::available_slots(&db, &self.slots, day)?;
        Ok(DayAvailability { date: day, slots })
    }
}

fn check_id(id: &str) -> Result<(), AppError> {
    if validation::is_valid_id(id) {
        Ok(())
    } else {
        Err(AppError::validation(format!("invalid booking id: {id}")))
    }
}
