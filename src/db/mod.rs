pub mod migrations;
pub mod queries;

use std::time::Duration;

use anyhow::Context;
use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;

pub fn init_db(path: &str) -> anyhow::Result<Connection> {
    let conn = Connection::open(path).context("failed to open database")?;

    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
        .context("failed to set database pragmas")?;

    // Writers from other connections wait on the database lock instead of
    // failing with SQLITE_BUSY.
    conn.busy_timeout(Duration::from_secs(5))
        .context("failed to set busy timeout")?;

    register_functions(&conn)?;

    migrations::run_migrations(&conn)?;

    Ok(conn)
}

/// SQLite's built-in `LOWER` folds ASCII only. `unicode_lower` folds with the
/// same rules as `str::to_lowercase`, so stored text and search input agree.
fn register_functions(conn: &Connection) -> anyhow::Result<()> {
    conn.create_scalar_function(
        "unicode_lower",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text: Option<String> = ctx.get(0)?;
            Ok(text.map(|t| t.to_lowercase()))
        },
    )
    .context("failed to register unicode_lower")?;
    Ok(())
}
