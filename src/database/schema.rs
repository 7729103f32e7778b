use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

const SQL_CREATE_EVENTS: &str = r#"
CREATE TABLE IF NOT EXISTS events (
  id TEXT PRIMARY KEY NOT NULL,
  name TEXT NOT NULL,
  description TEXT NOT NULL DEFAULT '',
  is_active INTEGER NOT NULL DEFAULT 1,
  max_team_size INTEGER NOT NULL DEFAULT 4,
  registration_deadline TEXT,
  sheet_id TEXT,
  created_at TEXT NOT NULL,
  updated_at TEXT NOT NULL
)
"#;

const SQL_CREATE_PROBLEM_STATEMENTS: &str = r#"
CREATE TABLE IF NOT EXISTS problem_statements (
  id TEXT PRIMARY KEY NOT NULL,
  event_id TEXT NOT NULL REFERENCES events(id) ON DELETE CASCADE,
  title TEXT NOT NULL,
  description TEXT NOT NULL DEFAULT '',
  sheet_tab_name TEXT,
  created_at TEXT NOT NULL,
  updated_at TEXT NOT NULL
)
"#;

const SQL_CREATE_REGISTRATIONS: &str = r#"
CREATE TABLE IF NOT EXISTS registrations (
  id TEXT PRIMARY KEY NOT NULL,
  event_id TEXT NOT NULL REFERENCES events(id) ON DELETE CASCADE,
  problem_statement_id TEXT NOT NULL REFERENCES problem_statements(id) ON DELETE CASCADE,
  team_name TEXT NOT NULL,
  college_name TEXT NOT NULL DEFAULT '',
  contact_number TEXT NOT NULL DEFAULT '',
  email TEXT NOT NULL DEFAULT '',
  team_size INTEGER NOT NULL DEFAULT 1,
  team_members TEXT NOT NULL DEFAULT '[]',
  reg_code TEXT NOT NULL UNIQUE,
  is_locked INTEGER NOT NULL DEFAULT 0,
  attendance_update_count INTEGER NOT NULL DEFAULT 0,
  created_at TEXT NOT NULL,
  updated_at TEXT NOT NULL
)
"#;

const SQL_CREATE_ATTENDANCE: &str = r#"
CREATE TABLE IF NOT EXISTS attendance (
  registration_id TEXT NOT NULL REFERENCES registrations(id) ON DELETE CASCADE,
  member_name TEXT NOT NULL,
  is_present INTEGER NOT NULL DEFAULT 0,
  last_updated TEXT NOT NULL,
  PRIMARY KEY (registration_id, member_name)
)
"#;

const SQL_CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_problem_statements_event ON problem_statements(event_id)",
    "CREATE INDEX IF NOT EXISTS idx_registrations_event ON registrations(event_id)",
    "CREATE INDEX IF NOT EXISTS idx_registrations_problem ON registrations(problem_statement_id)",
];

/// Creates all tables and indexes. Safe to run on every start.
pub async fn apply(pool: &SqlitePool) -> sqlx::Result<()> {
    for sql in [
        SQL_CREATE_EVENTS,
        SQL_CREATE_PROBLEM_STATEMENTS,
        SQL_CREATE_REGISTRATIONS,
        SQL_CREATE_ATTENDANCE,
    ] {
        sqlx::query(sql).execute(pool).await?;
    }
    for sql in SQL_CREATE_INDEXES {
        sqlx::query(sql).execute(pool).await?;
    }
    Ok(())
}

/// Opens a pool with foreign keys enforced and the schema applied.
///
/// An in-memory url keeps a single connection alive for the lifetime of the
/// pool; every new sqlite memory connection would otherwise see an empty db.
pub async fn open_pool(database_url: &str) -> sqlx::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = if database_url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?
    } else {
        SqlitePoolOptions::new().connect_with(options).await?
    };

    apply(&pool).await?;
    Ok(pool)
}
