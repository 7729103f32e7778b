use sqlx::SqlitePool;

use crate::models::EventsRow;

const SQL_EVENT_COLUMNS: &str = r#"
  id,
  name,
  description,
  is_active,
  max_team_size,
  registration_deadline,
  sheet_id,
  created_at,
  updated_at
"#;

const SQL_INSERT_EVENT: &str = r#"
INSERT INTO events (
  id,
  name,
  description,
  is_active,
  max_team_size,
  registration_deadline,
  created_at,
  updated_at
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
"#;

pub struct NewEvent<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub description: &'a str,
    pub is_active: bool,
    pub max_team_size: i64,
    pub registration_deadline: Option<&'a str>,
    pub created_at: &'a str,
}

pub async fn insert_event(pool: &SqlitePool, event: NewEvent<'_>) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_INSERT_EVENT)
        .bind(event.id)
        .bind(event.name)
        .bind(event.description)
        .bind(event.is_active)
        .bind(event.max_team_size)
        .bind(event.registration_deadline)
        .bind(event.created_at)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

pub async fn load_event(pool: &SqlitePool, event_id: &str) -> sqlx::Result<Option<EventsRow>> {
    let sql = format!("SELECT {SQL_EVENT_COLUMNS} FROM events WHERE id = ?1 LIMIT 1");
    sqlx::query_as::<_, EventsRow>(&sql)
        .bind(event_id)
        .fetch_optional(pool)
        .await
}

pub async fn list_events(pool: &SqlitePool) -> sqlx::Result<Vec<EventsRow>> {
    let sql = format!("SELECT {SQL_EVENT_COLUMNS} FROM events ORDER BY created_at DESC");
    sqlx::query_as::<_, EventsRow>(&sql).fetch_all(pool).await
}

pub async fn list_active_events(pool: &SqlitePool) -> sqlx::Result<Vec<EventsRow>> {
    let sql = format!(
        "SELECT {SQL_EVENT_COLUMNS} FROM events WHERE is_active = 1 ORDER BY created_at DESC"
    );
    sqlx::query_as::<_, EventsRow>(&sql).fetch_all(pool).await
}

const SQL_UPDATE_EVENT: &str = r#"
UPDATE events
SET name = ?1,
    description = ?2,
    is_active = ?3,
    max_team_size = ?4,
    registration_deadline = ?5,
    updated_at = ?6
WHERE id = ?7
"#;

pub struct EventUpdate<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub is_active: bool,
    pub max_team_size: i64,
    pub registration_deadline: Option<&'a str>,
    pub updated_at: &'a str,
}

pub async fn update_event(
    pool: &SqlitePool,
    event_id: &str,
    update: EventUpdate<'_>,
) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_UPDATE_EVENT)
        .bind(update.name)
        .bind(update.description)
        .bind(update.is_active)
        .bind(update.max_team_size)
        .bind(update.registration_deadline)
        .bind(update.updated_at)
        .bind(event_id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

pub async fn delete_event(pool: &SqlitePool, event_id: &str) -> sqlx::Result<u64> {
    let res = sqlx::query("DELETE FROM events WHERE id = ?1")
        .bind(event_id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

// First writer wins: an id that is already stored is never replaced.
const SQL_CLAIM_SHEET_ID: &str = r#"
UPDATE events
SET sheet_id = ?1,
    updated_at = ?2
WHERE id = ?3
  AND (sheet_id IS NULL OR sheet_id = '')
"#;

pub async fn claim_sheet_id(
    pool: &SqlitePool,
    event_id: &str,
    sheet_id: &str,
    updated_at: &str,
) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_CLAIM_SHEET_ID)
        .bind(sheet_id)
        .bind(updated_at)
        .bind(event_id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}
