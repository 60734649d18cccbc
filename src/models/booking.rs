use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::ServiceSummary;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub service_id: String,
    pub date: NaiveDate,
    pub time_slot: String,
    pub customer_info: CustomerInfo,
    pub notes: Option<String>,
    pub status: BookingStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInfo {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
}

/// A booking joined with the service it references. `service` is `None` when
/// the service has been removed from the catalog since the booking was made.
#[derive(Debug, Clone, Serialize)]
pub struct BookingView {
    #[serde(flatten)]
    pub booking: Booking,
    pub service: Option<ServiceSummary>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 4] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BookingStatus::Pending),
            "confirmed" => Some(BookingStatus::Confirmed),
            "completed" => Some(BookingStatus::Completed),
            "cancelled" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }

    /// Active bookings occupy their slot.
    pub fn is_active(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_round_trips_known_values() {
        for status in BookingStatus::ALL {
            assert_eq!(BookingStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(BookingStatus::parse("Pending"), None);
        assert_eq!(BookingStatus::parse("done"), None);
    }

    #[test]
    fn test_only_pending_and_confirmed_are_active() {
        assert!(BookingStatus::Pending.is_active());
        assert!(BookingStatus::Confirmed.is_active());
        assert!(!BookingStatus::Completed.is_active());
        assert!(!BookingStatus::Cancelled.is_active());
    }

    #[test]
    fn test_booking_serializes_with_camel_case_fields() {
        let booking = Booking {
            id: "b-1".to_string(),
            service_id: "s-1".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 12, 20).unwrap(),
            time_slot: "10:00".to_string(),
            customer_info: CustomerInfo {
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                email: "ada@example.com".to_string(),
                phone: "+15550001111".to_string(),
            },
            notes: None,
            status: BookingStatus::Pending,
            created_at: NaiveDate::from_ymd_opt(2025, 12, 1)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap(),
            updated_at: NaiveDate::from_ymd_opt(2025, 12, 1)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap(),
        };

        let json = serde_json::to_value(&booking).unwrap();
        assert_eq!(json["serviceId"], "s-1");
        assert_eq!(json["date"], "2025-12-20");
        assert_eq!(json["timeSlot"], "10:00");
        assert_eq!(json["customerInfo"]["firstName"], "Ada");
        assert_eq!(json["status"], "pending");
        assert!(json.get("createdAt").is_some());
    }
}
