use serde::{Deserialize, Serialize};

/// The parts of a catalog service a booking needs: enough to check the
/// reference exists and to display it next to the booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSummary {
    pub id: String,
    pub name: String,
    /// Minutes.
    pub duration: i32,
    pub price: f64,
}
