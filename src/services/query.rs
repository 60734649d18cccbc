use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::{
    BookingFilter, BookingQuery, BookingStatus, PageSpec, SortDirection, SortField, SortSpec,
};
use crate::services::validation::is_valid_id;

pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

/// Raw listing criteria as they arrive in the query string. Numbers are kept
/// as strings so malformed values are reported as validation errors.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingCriteria {
    pub status: Option<String>,
    pub service_id: Option<String>,
    pub date: Option<String>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(total: u64, page: PageSpec) -> Self {
        Self {
            total,
            page: page.page,
            limit: page.limit,
            total_pages: total_pages(total, page.limit),
        }
    }
}

pub fn build(criteria: &BookingCriteria) -> Result<BookingQuery, AppError> {
    let status = match non_empty(&criteria.status) {
        Some(s) => Some(
            BookingStatus::parse(s)
                .ok_or_else(|| AppError::validation(format!("invalid status: {s}")))?,
        ),
        None => None,
    };

    let service_id = match non_empty(&criteria.service_id) {
        Some(id) if is_valid_id(id) => Some(id.to_string()),
        Some(id) => {
            return Err(AppError::validation(format!(
                "serviceId is not a valid id: {id}"
            )))
        }
        None => None,
    };

    let date_range = match non_empty(&criteria.date) {
        Some(raw) => {
            let day = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|_| AppError::validation(format!("date must be YYYY-MM-DD: {raw}")))?;
            let next = day
                .checked_add_days(Days::new(1))
                .ok_or_else(|| AppError::validation(format!("date out of range: {raw}")))?;
            Some((day, next))
        }
        None => None,
    };

    let search_pattern = non_empty(&criteria.search)
        .map(|s| format!("%{}%", escape_like(&s.to_lowercase())));

    let direction = match non_empty(&criteria.sort_order) {
        Some(o) if o.eq_ignore_ascii_case("asc") => SortDirection::Asc,
        Some(o) if o.eq_ignore_ascii_case("desc") => SortDirection::Desc,
        Some(o) => {
            return Err(AppError::validation(format!(
                "sortOrder must be asc or desc: {o}"
            )))
        }
        None => SortDirection::Desc,
    };

    let sort = match non_empty(&criteria.sort_by) {
        None | Some("date") => SortSpec {
            field: SortField::Date,
            direction,
        },
        Some("createdAt") => SortSpec {
            field: SortField::CreatedAt,
            direction,
        },
        Some("customerName") => SortSpec {
            field: SortField::CustomerName,
            direction,
        },
        Some(other) => {
            tracing::debug!(sort_by = other, "unknown sort field, using default ordering");
            SortSpec::default()
        }
    };

    let page = parse_bounded(&criteria.page, "page", 1, u32::MAX, 1)?;
    let limit = parse_bounded(&criteria.limit, "limit", 1, MAX_LIMIT, DEFAULT_LIMIT)?;

    Ok(BookingQuery {
        filter: BookingFilter {
            status,
            service_id,
            date_range,
            search_pattern,
        },
        sort,
        page: PageSpec { page, limit },
    })
}

pub fn total_pages(total: u64, limit: u32) -> u64 {
    if limit == 0 {
        return 0;
    }
    total.div_ceil(limit as u64)
}

/// Escapes LIKE wildcards so the text matches literally under `ESCAPE '\'`.
pub fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_bounded(
    value: &Option<String>,
    name: &str,
    min: u32,
    max: u32,
    default: u32,
) -> Result<u32, AppError> {
    let Some(raw) = non_empty(value) else {
        return Ok(default);
    };
    match raw.parse::<i64>() {
        Ok(n) if n >= min as i64 && n <= max as i64 => Ok(n as u32),
        _ => Err(AppError::validation(format!(
            "{name} must be an integer between {min} and {max}: {raw}"
        ))),
    }
}
