use chrono::NaiveDate;

use super::BookingStatus;

/// Validated listing filter. Every present field narrows the result set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookingFilter {
    pub status: Option<BookingStatus>,
    pub service_id: Option<String>,
    /// Half-open `[start, end)` day range.
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    /// A lowercased LIKE pattern with wildcards in the user text already escaped.
    pub search_pattern: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    /// Date, then time slot.
    Date,
    CreatedAt,
    /// Last name, then first name.
    CustomerName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            field: SortField::Date,
            direction: SortDirection::Desc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSpec {
    pub page: u32,
    pub limit: u32,
}

impl PageSpec {
    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.limit as u64
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BookingQuery {
    pub filter: BookingFilter,
    pub sort: SortSpec,
    pub page: PageSpec,
}
