use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime, SubsecRound, Utc};
use rusqlite::types::ToSql;
use rusqlite::{params, params_from_iter, Connection};

use crate::models::{
    Booking, BookingFilter, BookingQuery, BookingStatus, BookingView, CustomerInfo,
    ServiceSummary, SortDirection, SortField, SortSpec,
};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";
const DATE_FORMAT: &str = "%Y-%m-%d";

const BOOKING_COLUMNS: &str = "b.id, b.service_id, b.date, b.time_slot, \
     b.customer_first_name, b.customer_last_name, b.customer_email, b.customer_phone, \
     b.notes, b.status, b.created_at, b.updated_at";

const SERVICE_COLUMNS: &str = "s.id, s.name, s.duration_minutes, s.price";

/// Current time at the precision timestamps are stored with.
pub fn now() -> NaiveDateTime {
    Utc::now().naive_utc().trunc_subsecs(3)
}

// ── Services ──

pub fn insert_service(conn: &Connection, service: &ServiceSummary) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO services (id, name, duration_minutes, price) VALUES (?1, ?2, ?3, ?4)",
        params![service.id, service.name, service.duration, service.price],
    )?;
    Ok(())
}

pub fn get_service(conn: &Connection, id: &str) -> anyhow::Result<Option<ServiceSummary>> {
    let result = conn.query_row(
        "SELECT id, name, duration_minutes, price FROM services WHERE id = ?1",
        params![id],
        |row| {
            Ok(ServiceSummary {
                id: row.get(0)?,
                name: row.get(1)?,
                duration: row.get(2)?,
                price: row.get(3)?,
            })
        },
    );

    match result {
        Ok(service) => Ok(Some(service)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

// ── Bookings ──

/// Inserts a booking. The raw storage error is returned so the caller can
/// tell an occupied slot (unique index violation) apart from other failures.
pub fn insert_booking(conn: &Connection, booking: &Booking) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO bookings (id, service_id, date, time_slot, customer_first_name, customer_last_name,
                               customer_email, customer_phone, notes, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            booking.id,
            booking.service_id,
            booking.date.format(DATE_FORMAT).to_string(),
            booking.time_slot,
            booking.customer_info.first_name,
            booking.customer_info.last_name,
            booking.customer_info.email,
            booking.customer_info.phone,
            booking.notes,
            booking.status.as_str(),
            booking.created_at.format(TIMESTAMP_FORMAT).to_string(),
            booking.updated_at.format(TIMESTAMP_FORMAT).to_string(),
        ],
    )?;
    Ok(())
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let result = conn.query_row(
        &format!("SELECT {BOOKING_COLUMNS} FROM bookings b WHERE b.id = ?1"),
        params![id],
        |row| Ok(parse_booking_row(row)),
    );

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_booking_view(conn: &Connection, id: &str) -> anyhow::Result<Option<BookingView>> {
    let result = conn.query_row(
        &format!(
            "SELECT {BOOKING_COLUMNS}, {SERVICE_COLUMNS}
             FROM bookings b LEFT JOIN services s ON s.id = b.service_id
             WHERE b.id = ?1"
        ),
        params![id],
        |row| Ok(parse_view_row(row)),
    );

    match result {
        Ok(view) => Ok(Some(view?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Runs a listing query, returning one page of results and the total number
/// of bookings matching the filter.
pub fn list_bookings(
    conn: &Connection,
    query: &BookingQuery,
) -> anyhow::Result<(Vec<BookingView>, u64)> {
    let (where_sql, mut params_vec) = filter_clause(&query.filter);

    let total: i64 = conn
        .query_row(
            &format!("SELECT COUNT(*) FROM bookings b{where_sql}"),
            params_from_iter(params_vec.iter().map(|p| p.as_ref())),
            |row| row.get(0),
        )
        .context("failed to count bookings")?;

    let sql = format!(
        "SELECT {BOOKING_COLUMNS}, {SERVICE_COLUMNS}
         FROM bookings b LEFT JOIN services s ON s.id = b.service_id{where_sql}
         ORDER BY {} LIMIT ? OFFSET ?",
        order_by_clause(&query.sort)
    );
    params_vec.push(Box::new(query.page.limit as i64));
    params_vec.push(Box::new(query.page.offset() as i64));

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        params_from_iter(params_vec.iter().map(|p| p.as_ref())),
        |row| Ok(parse_view_row(row)),
    )?;

    let mut views = vec![];
    for row in rows {
        views.push(row??);
    }
    Ok((views, total as u64))
}

/// Sets the status only if the booking is still in `expected`. Returns false
/// when the booking does not exist or its status changed in the meantime.
pub fn update_booking_status(
    conn: &Connection,
    id: &str,
    expected: BookingStatus,
    status: BookingStatus,
) -> anyhow::Result<bool> {
    let now = now().format(TIMESTAMP_FORMAT).to_string();
    let count = conn.execute(
        "UPDATE bookings SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = ?4",
        params![status.as_str(), now, id, expected.as_str()],
    )?;
    Ok(count > 0)
}

/// Time slots held by active bookings on `date`.
pub fn occupied_slots(conn: &Connection, date: NaiveDate) -> anyhow::Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT time_slot FROM bookings
         WHERE date = ?1 AND status IN ({})
         ORDER BY time_slot ASC",
        active_status_list()
    ))?;

    let rows = stmt.query_map(params![date.format(DATE_FORMAT).to_string()], |row| {
        row.get::<_, String>(0)
    })?;

    let mut slots = vec![];
    for row in rows {
        slots.push(row?);
    }
    Ok(slots)
}

/// SQL list of the statuses that hold a slot, e.g. `'pending', 'confirmed'`.
/// Must agree with the predicate of `idx_bookings_active_slot`.
fn active_status_list() -> String {
    BookingStatus::ALL
        .iter()
        .filter(|s| s.is_active())
        .map(|s| format!("'{}'", s.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn filter_clause(filter: &BookingFilter) -> (String, Vec<Box<dyn ToSql>>) {
    let mut clauses: Vec<&str> = vec![];
    let mut params_vec: Vec<Box<dyn ToSql>> = vec![];

    if let Some(status) = filter.status {
        clauses.push("b.status = ?");
        params_vec.push(Box::new(status.as_str()));
    }
    if let Some(service_id) = &filter.service_id {
        clauses.push("b.service_id = ?");
        params_vec.push(Box::new(service_id.clone()));
    }
    if let Some((start, end)) = filter.date_range {
        clauses.push("b.date >= ? AND b.date < ?");
        params_vec.push(Box::new(start.format(DATE_FORMAT).to_string()));
        params_vec.push(Box::new(end.format(DATE_FORMAT).to_string()));
    }
    if let Some(pattern) = &filter.search_pattern {
        clauses.push(
            "(unicode_lower(b.customer_first_name) LIKE ? ESCAPE '\\' \
              OR unicode_lower(b.customer_last_name) LIKE ? ESCAPE '\\' \
              OR unicode_lower(b.customer_email) LIKE ? ESCAPE '\\' \
              OR unicode_lower(b.customer_phone) LIKE ? ESCAPE '\\')",
        );
        for _ in 0..4 {
            params_vec.push(Box::new(pattern.clone()));
        }
    }

    if clauses.is_empty() {
        (String::new(), params_vec)
    } else {
        (format!(" WHERE {}", clauses.join(" AND ")), params_vec)
    }
}

fn order_by_clause(sort: &SortSpec) -> String {
    let dir = match sort.direction {
        SortDirection::Asc => "ASC",
        SortDirection::Desc => "DESC",
    };
    // b.id keeps page boundaries stable between requests.
    match sort.field {
        SortField::Date => format!("b.date {dir}, b.time_slot {dir}, b.id ASC"),
        SortField::CreatedAt => format!("b.created_at {dir}, b.id ASC"),
        SortField::CustomerName => format!(
            "b.customer_last_name COLLATE NOCASE {dir}, b.customer_first_name COLLATE NOCASE {dir}, b.id ASC"
        ),
    }
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let id: String = row.get(0)?;
    let date_str: String = row.get(2)?;
    let status_str: String = row.get(9)?;
    let created_at_str: String = row.get(10)?;
    let updated_at_str: String = row.get(11)?;

    let date = NaiveDate::parse_from_str(&date_str, DATE_FORMAT)
        .with_context(|| format!("booking {id} has malformed date: {date_str}"))?;
    let status = BookingStatus::parse(&status_str)
        .with_context(|| format!("booking {id} has unknown status: {status_str}"))?;
    let created_at = NaiveDateTime::parse_from_str(&created_at_str, TIMESTAMP_FORMAT)
        .with_context(|| format!("booking {id} has malformed created_at: {created_at_str}"))?;
    let updated_at = NaiveDateTime::parse_from_str(&updated_at_str, TIMESTAMP_FORMAT)
        .with_context(|| format!("booking {id} has malformed updated_at: {updated_at_str}"))?;

    Ok(Booking {
        id,
        service_id: row.get(1)?,
        date,
        time_slot: row.get(3)?,
        customer_info: CustomerInfo {
            first_name: row.get(4)?,
            last_name: row.get(5)?,
            email: row.get(6)?,
            phone: row.get(7)?,
        },
        notes: row.get(8)?,
        status,
        created_at,
        updated_at,
    })
}

fn parse_view_row(row: &rusqlite::Row) -> anyhow::Result<BookingView> {
    let booking = parse_booking_row(row)?;
    let service_id: Option<String> = row.get(12)?;
    let service = match service_id {
        Some(id) => Some(ServiceSummary {
            id,
            name: row.get(13)?,
            duration: row.get(14)?,
            price: row.get(15)?,
        }),
        None => None,
    };
    Ok(BookingView { booking, service })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::services::query::{self, BookingCriteria};

    const SERVICE_ID: &str = "11111111-1111-4111-8111-111111111111";

    fn setup_db() -> Connection {
        let conn = db::init_db(":memory:").unwrap();
        insert_service(
            &conn,
            &ServiceSummary {
                id: SERVICE_ID.to_string(),
                name: "Gel Manicure".to_string(),
                duration: 45,
                price: 35.0,
            },
        )
        .unwrap();
        conn
    }

    fn booking(id: &str, date: &str, slot: &str, last_name: &str) -> Booking {
        let now = now();
        Booking {
            id: id.to_string(),
            service_id: SERVICE_ID.to_string(),
            date: NaiveDate::parse_from_str(date, DATE_FORMAT).unwrap(),
            time_slot: slot.to_string(),
            customer_info: CustomerInfo {
                first_name: "Jane".to_string(),
                last_name: last_name.to_string(),
                email: format!("{}@example.com", last_name.to_lowercase()),
                phone: "+15550001111".to_string(),
            },
            notes: None,
            status: BookingStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    fn list(conn: &Connection, criteria: BookingCriteria) -> (Vec<BookingView>, u64) {
        list_bookings(conn, &query::build(&criteria).unwrap()).unwrap()
    }

    #[test]
    fn test_insert_and_get_round_trip() {
        let conn = setup_db();
        let b = booking("b1", "2025-12-20", "10:00", "Doe");
        insert_booking(&conn, &b).unwrap();

        let loaded = get_booking_by_id(&conn, "b1").unwrap().unwrap();
        assert_eq!(loaded.date, b.date);
        assert_eq!(loaded.time_slot, "10:00");
        assert_eq!(loaded.customer_info, b.customer_info);
        assert_eq!(loaded.created_at, b.created_at);

        assert!(get_booking_by_id(&conn, "missing").unwrap().is_none());
    }

    #[test]
    fn test_view_includes_service_and_tolerates_missing_one() {
        let conn = setup_db();
        insert_booking(&conn, &booking("b1", "2025-12-20", "10:00", "Doe")).unwrap();
        let view = get_booking_view(&conn, "b1").unwrap().unwrap();
        assert_eq!(view.service.unwrap().name, "Gel Manicure");

        conn.execute("DELETE FROM services", []).unwrap();
        let view = get_booking_view(&conn, "b1").unwrap().unwrap();
        assert!(view.service.is_none());
        assert_eq!(view.booking.service_id, SERVICE_ID);
    }

    #[test]
    fn test_active_slot_index_rejects_duplicate() {
        let conn = setup_db();
        insert_booking(&conn, &booking("b1", "2025-12-20", "10:00", "Doe")).unwrap();
        let err = insert_booking(&conn, &booking("b2", "2025-12-20", "10:00", "Roe")).unwrap_err();
        assert_eq!(
            err.sqlite_error_code(),
            Some(rusqlite::ErrorCode::ConstraintViolation)
        );

        // Other slot or other day is fine.
        insert_booking(&conn, &booking("b3", "2025-12-20", "10:30", "Roe")).unwrap();
        insert_booking(&conn, &booking("b4", "2025-12-21", "10:00", "Roe")).unwrap();
    }

    #[test]
    fn test_inactive_bookings_do_not_hold_slot() {
        let conn = setup_db();
        insert_booking(&conn, &booking("b1", "2025-12-20", "10:00", "Doe")).unwrap();
        assert!(update_booking_status(
            &conn,
            "b1",
            BookingStatus::Pending,
            BookingStatus::Cancelled
        )
        .unwrap());
        insert_booking(&conn, &booking("b2", "2025-12-20", "10:00", "Roe")).unwrap();
        assert_eq!(
            occupied_slots(&conn, NaiveDate::from_ymd_opt(2025, 12, 20).unwrap()).unwrap(),
            vec!["10:00"]
        );
    }

    #[test]
    fn test_active_status_list_matches_slot_index() {
        assert_eq!(active_status_list(), "'pending', 'confirmed'");

        let conn = setup_db();
        let index_sql: String = conn
            .query_row(
                "SELECT sql FROM sqlite_master WHERE name = 'idx_bookings_active_slot'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert!(
            index_sql.contains(&format!("IN ({})", active_status_list())),
            "{index_sql}"
        );
    }

    #[test]
    fn test_completed_bookings_release_their_slot() {
        let conn = setup_db();
        let date = NaiveDate::from_ymd_opt(2025, 12, 20).unwrap();
        insert_booking(&conn, &booking("b1", "2025-12-20", "10:00", "Doe")).unwrap();
        insert_booking(&conn, &booking("b2", "2025-12-20", "10:30", "Roe")).unwrap();
        update_booking_status(&conn, "b1", BookingStatus::Pending, BookingStatus::Confirmed)
            .unwrap();
        assert_eq!(occupied_slots(&conn, date).unwrap(), vec!["10:00", "10:30"]);

        update_booking_status(&conn, "b1", BookingStatus::Confirmed, BookingStatus::Completed)
            .unwrap();
        assert_eq!(occupied_slots(&conn, date).unwrap(), vec!["10:30"]);
    }

    #[test]
    fn test_update_status_compare_and_swap() {
        let conn = setup_db();
        insert_booking(&conn, &booking("b1", "2025-12-20", "10:00", "Doe")).unwrap();

        assert!(!update_booking_status(
            &conn,
            "b1",
            BookingStatus::Confirmed,
            BookingStatus::Completed
        )
        .unwrap());
        assert!(update_booking_status(
            &conn,
            "b1",
            BookingStatus::Pending,
            BookingStatus::Confirmed
        )
        .unwrap());
        assert!(!update_booking_status(
            &conn,
            "nope",
            BookingStatus::Pending,
            BookingStatus::Confirmed
        )
        .unwrap());

        let loaded = get_booking_by_id(&conn, "b1").unwrap().unwrap();
        assert_eq!(loaded.status, BookingStatus::Confirmed);
        assert!(loaded.updated_at >= loaded.created_at);
    }

    #[test]
    fn test_list_filters() {
        let conn = setup_db();
        insert_booking(&conn, &booking("b1", "2025-12-20", "10:00", "Doe")).unwrap();
        insert_booking(&conn, &booking("b2", "2025-12-20", "11:00", "Smith")).unwrap();
        insert_booking(&conn, &booking("b3", "2025-12-21", "10:00", "Smithers")).unwrap();
        update_booking_status(&conn, "b2", BookingStatus::Pending, BookingStatus::Confirmed)
            .unwrap();

        let (items, total) = list(
            &conn,
            BookingCriteria {
                date: Some("2025-12-20".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(total, 2);
        assert_eq!(items.len(), 2);

        let (items, _) = list(
            &conn,
            BookingCriteria {
                status: Some("confirmed".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].booking.id, "b2");

        let (_, total) = list(
            &conn,
            BookingCriteria {
                search: Some("SMITH".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(total, 2);

        let (_, total) = list(
            &conn,
            BookingCriteria {
                service_id: Some("22222222-2222-4222-8222-222222222222".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(total, 0);
    }

    #[test]
    fn test_search_matches_literally() {
        let conn = setup_db();
        insert_booking(&conn, &booking("b1", "2025-12-20", "10:00", "a(b")).unwrap();
        insert_booking(&conn, &booking("b2", "2025-12-20", "10:30", "ab")).unwrap();
        insert_booking(&conn, &booking("b3", "2025-12-20", "11:00", "50%_off")).unwrap();
        insert_booking(&conn, &booking("b4", "2025-12-20", "11:30", "50xyoff")).unwrap();

        let search = |text: &str| {
            let (items, _) = list(
                &conn,
                BookingCriteria {
                    search: Some(text.to_string()),
                    ..Default::default()
                },
            );
            let mut ids: Vec<String> = items.into_iter().map(|v| v.booking.id).collect();
            ids.sort();
            ids
        };

        assert_eq!(search("a(b"), vec!["b1"]);
        assert_eq!(search("%_"), vec!["b3"]);
        assert_eq!(search("50%_off"), vec!["b3"]);
        assert_eq!(search(".*"), Vec::<String>::new());
    }

    #[test]
    fn test_search_folds_non_ascii_case() {
        let conn = setup_db();
        let mut b = booking("b1", "2025-12-20", "10:00", "Ødegård");
        b.customer_info.first_name = "Émile".to_string();
        b.customer_info.email = "emile@example.com".to_string();
        insert_booking(&conn, &b).unwrap();
        insert_booking(&conn, &booking("b2", "2025-12-20", "10:30", "Doe")).unwrap();

        for text in ["Émile", "émile", "ÉMILE", "mile", "ødegård", "ØDEGÅRD"] {
            let (items, total) = list(
                &conn,
                BookingCriteria {
                    search: Some(text.to_string()),
                    ..Default::default()
                },
            );
            assert_eq!(total, 1, "search {text:?}");
            assert_eq!(items[0].booking.id, "b1");
        }
    }

    #[test]
    fn test_default_sort_is_date_then_slot_descending() {
        let conn = setup_db();
        insert_booking(&conn, &booking("b1", "2025-12-20", "10:00", "A")).unwrap();
        insert_booking(&conn, &booking("b2", "2025-12-21", "09:00", "B")).unwrap();
        insert_booking(&conn, &booking("b3", "2025-12-20", "15:30", "C")).unwrap();

        let (items, _) = list(&conn, BookingCriteria::default());
        let ids: Vec<&str> = items.iter().map(|v| v.booking.id.as_str()).collect();
        assert_eq!(ids, vec!["b2", "b3", "b1"]);

        let (items, _) = list(
            &conn,
            BookingCriteria {
                sort_by: Some("customerName".to_string()),
                sort_order: Some("asc".to_string()),
                ..Default::default()
            },
        );
        let ids: Vec<&str> = items.iter().map(|v| v.booking.id.as_str()).collect();
        assert_eq!(ids, vec!["b1", "b2", "b3"]);
    }

    #[test]
    fn test_pages_concatenate_to_full_set() {
        let conn = setup_db();
        let slots = ["09:00", "09:30", "10:00", "10:30", "11:00"];
        let mut expected = vec![];
        for day in 20..=22 {
            for slot in slots {
                let id = format!("b-{day}-{slot}");
                // Identical created_at and names force the id tiebreak.
                insert_booking(&conn, &booking(&id, &format!("2025-12-{day}"), slot, "Same"))
                    .unwrap();
                expected.push(id);
            }
        }

        for limit in [1u32, 4, 7, 15, 20] {
            let mut seen = vec![];
            let mut page = 1;
            loop {
                let (items, total) = list(
                    &conn,
                    BookingCriteria {
                        sort_by: Some("customerName".to_string()),
                        page: Some(page.to_string()),
                        limit: Some(limit.to_string()),
                        ..Default::default()
                    },
                );
                assert_eq!(total, 15);
                if items.is_empty() {
                    break;
                }
                seen.extend(items.into_iter().map(|v| v.booking.id));
                page += 1;
            }
            assert_eq!(page - 1, query::total_pages(15, limit) as u32);
            let mut sorted = seen.clone();
            sorted.sort();
            sorted.dedup();
            assert_eq!(sorted.len(), seen.len(), "duplicates with limit {limit}");
            let mut all = expected.clone();
            all.sort();
            assert_eq!(sorted, all);
        }
    }
}
