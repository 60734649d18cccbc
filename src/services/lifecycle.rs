use crate::errors::AppError;
use crate::models::BookingStatus;

/// Statuses reachable from `from` in one step. Completed and cancelled
/// bookings are terminal.
pub fn next_statuses(from: BookingStatus) -> &'static [BookingStatus] {
    match from {
        BookingStatus::Pending => &[BookingStatus::Confirmed, BookingStatus::Cancelled],
        BookingStatus::Confirmed => &[BookingStatus::Completed, BookingStatus::Cancelled],
        BookingStatus::Completed | BookingStatus::Cancelled => &[],
    }
}

pub fn approve_transition(from: BookingStatus, to: BookingStatus) -> Result<(), AppError> {
    if next_statuses(from).contains(&to) {
        Ok(())
    } else {
        Err(AppError::IllegalTransition { from, to })
    }
}
