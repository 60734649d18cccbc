pub mod booking;
pub mod catalog;
pub mod lifecycle;
pub mod query;
pub mod slots;
pub mod validation;
