use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{CustomerInfo, SlotGrid};

const MAX_NOTES_LEN: usize = 1000;

/// Body of `POST /bookings`. Every field is optional at the serde level so
/// that missing fields are reported by [`validate_new_booking`] alongside the
/// other problems instead of as an opaque deserialization failure.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub service_id: Option<String>,
    pub date: Option<String>,
    pub time_slot: Option<String>,
    pub customer_info: Option<CustomerInfoInput>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInfoInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// A create request that passed validation. The service reference has the
/// right shape but has not been resolved yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBooking {
    pub service_id: String,
    pub date: NaiveDate,
    pub time_slot: String,
    pub customer_info: CustomerInfo,
    pub notes: Option<String>,
}

pub fn validate_new_booking(
    req: CreateBookingRequest,
    grid: &SlotGrid,
) -> Result<NewBooking, AppError> {
    let mut errors: Vec<String> = vec![];

    let service_id = match req.service_id.as_deref().map(str::trim) {
        Some(id) if is_valid_id(id) => Some(id.to_string()),
        Some("") | None => {
            errors.push("serviceId is required".to_string());
            None
        }
        Some(id) => {
            errors.push(format!("serviceId is not a valid id: {id}"));
            None
        }
    };

    let date = match req.date.as_deref().map(str::trim) {
        Some("") | None => {
            errors.push("date is required".to_string());
            None
        }
        Some(raw) => {
            let parsed = normalize_date(raw);
            if parsed.is_none() {
                errors.push(format!("date must be YYYY-MM-DD: {raw}"));
            }
            parsed
        }
    };

    let time_slot = match req.time_slot.as_deref().map(str::trim) {
        Some("") | None => {
            errors.push("timeSlot is required".to_string());
            None
        }
        Some(slot) => match grid.canonical(slot) {
            Some(canonical) => Some(canonical),
            None => {
                errors.push(format!(
                    "timeSlot {slot} is not a bookable slot ({})",
                    grid.to_human_readable()
                ));
                None
            }
        },
    };

    let customer_info = match req.customer_info {
        Some(info) => validate_customer_info(info, &mut errors),
        None => {
            errors.push("customerInfo is required".to_string());
            None
        }
    };

    let notes = req
        .notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());
    if let Some(n) = &notes {
        if n.chars().count() > MAX_NOTES_LEN {
            errors.push(format!("notes must be at most {MAX_NOTES_LEN} characters"));
        }
    }

    match (service_id, date, time_slot, customer_info) {
        (Some(service_id), Some(date), Some(time_slot), Some(customer_info))
            if errors.is_empty() =>
        {
            Ok(NewBooking {
                service_id,
                date,
                time_slot,
                customer_info,
                notes,
            })
        }
        _ => Err(AppError::Validation(errors.join("; "))),
    }
}

fn validate_customer_info(
    info: CustomerInfoInput,
    errors: &mut Vec<String>,
) -> Option<CustomerInfo> {
    let mut required = |value: Option<String>, field: &str| -> Option<String> {
        match value.map(|v| v.trim().to_string()) {
            Some(v) if !v.is_empty() => Some(v),
            _ => {
                errors.push(format!("customerInfo.{field} is required"));
                None
            }
        }
    };

    let first_name = required(info.first_name, "firstName");
    let last_name = required(info.last_name, "lastName");
    let email = required(info.email, "email");
    let phone = required(info.phone, "phone");

    if let Some(e) = &email {
        if !is_plausible_email(e) {
            errors.push(format!("customerInfo.email is not a valid email: {e}"));
            return None;
        }
    }

    Some(CustomerInfo {
        first_name: first_name?,
        last_name: last_name?,
        email: email?,
        phone: phone?,
    })
}

/// Accepts a plain `YYYY-MM-DD` date or an RFC 3339 timestamp. Timestamps are
/// reduced to their UTC calendar day.
pub fn normalize_date(raw: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.naive_utc().date())
}

pub fn is_valid_id(id: &str) -> bool {
    Uuid::parse_str(id).is_ok()
}

fn is_plausible_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .map(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
            .unwrap_or(false)
}
