pub mod booking;
pub mod query;
pub mod service;
pub mod slot;

pub use booking::{Booking, BookingStatus, BookingView, CustomerInfo};
pub use query::{BookingFilter, BookingQuery, PageSpec, SortDirection, SortField, SortSpec};
pub use service::ServiceSummary;
pub use slot::{SlotAvailability, SlotGrid};
