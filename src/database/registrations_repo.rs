use sqlx::SqlitePool;

use crate::models::{RegistrationPatch, RegistrationSheetContextRow, RegistrationsRow};

const SQL_REGISTRATION_COLUMNS: &str = r#"
  id,
  event_id,
  problem_statement_id,
  team_name,
  college_name,
  contact_number,
  email,
  team_size,
  team_members,
  reg_code,
  is_locked,
  attendance_update_count,
  created_at,
  updated_at
"#;

const SQL_INSERT_REGISTRATION: &str = r#"
INSERT INTO registrations (
  id,
  event_id,
  problem_statement_id,
  team_name,
  college_name,
  contact_number,
  email,
  team_size,
  team_members,
  reg_code,
  created_at,
  updated_at
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
"#;

#[derive(Clone, Copy)]
pub struct NewRegistration<'a> {
    pub id: &'a str,
    pub event_id: &'a str,
    pub problem_statement_id: &'a str,
    pub team_name: &'a str,
    pub college_name: &'a str,
    pub contact_number: &'a str,
    pub email: &'a str,
    pub team_size: i64,
    pub team_members_json: &'a str,
    pub reg_code: &'a str,
    pub created_at: &'a str,
}

pub async fn insert_registration(
    pool: &SqlitePool,
    reg: NewRegistration<'_>,
) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_INSERT_REGISTRATION)
        .bind(reg.id)
        .bind(reg.event_id)
        .bind(reg.problem_statement_id)
        .bind(reg.team_name)
        .bind(reg.college_name)
        .bind(reg.contact_number)
        .bind(reg.email)
        .bind(reg.team_size)
        .bind(reg.team_members_json)
        .bind(reg.reg_code)
        .bind(reg.created_at)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

pub async fn load_registration(
    pool: &SqlitePool,
    registration_id: &str,
) -> sqlx::Result<Option<RegistrationsRow>> {
    let sql = format!("SELECT {SQL_REGISTRATION_COLUMNS} FROM registrations WHERE id = ?1 LIMIT 1");
    sqlx::query_as::<_, RegistrationsRow>(&sql)
        .bind(registration_id)
        .fetch_optional(pool)
        .await
}

pub async fn load_by_code(
    pool: &SqlitePool,
    reg_code: &str,
) -> sqlx::Result<Option<RegistrationsRow>> {
    let sql =
        format!("SELECT {SQL_REGISTRATION_COLUMNS} FROM registrations WHERE reg_code = ?1 LIMIT 1");
    sqlx::query_as::<_, RegistrationsRow>(&sql)
        .bind(reg_code)
        .fetch_optional(pool)
        .await
}

pub async fn list_for_event(
    pool: &SqlitePool,
    event_id: &str,
    problem_statement_id: Option<&str>,
) -> sqlx::Result<Vec<RegistrationsRow>> {
    let sql = format!(
        r#"
SELECT {SQL_REGISTRATION_COLUMNS}
FROM registrations
WHERE event_id = ?1
  AND (?2 IS NULL OR problem_statement_id = ?2)
ORDER BY created_at DESC
"#
    );
    sqlx::query_as::<_, RegistrationsRow>(&sql)
        .bind(event_id)
        .bind(problem_statement_id)
        .fetch_all(pool)
        .await
}

const SQL_UPDATE_BY_CODE: &str = r#"
UPDATE registrations
SET team_name = COALESCE(?1, team_name),
    college_name = COALESCE(?2, college_name),
    contact_number = COALESCE(?3, contact_number),
    email = COALESCE(?4, email),
    team_size = COALESCE(?5, team_size),
    team_members = COALESCE(?6, team_members),
    updated_at = ?7
WHERE reg_code = ?8
  AND event_id = ?9
RETURNING id
"#;

/// Applies `patch` to the row matching `(reg_code, event_id)` and returns its id.
pub async fn update_by_code(
    pool: &SqlitePool,
    event_id: &str,
    reg_code: &str,
    patch: &RegistrationPatch,
    updated_at: &str,
) -> sqlx::Result<Option<String>> {
    let members_json = match &patch.team_members {
        Some(members) => Some(
            serde_json::to_string(members).map_err(|e| sqlx::Error::Encode(Box::new(e)))?,
        ),
        None => None,
    };

    let row: Option<(String,)> = sqlx::query_as(SQL_UPDATE_BY_CODE)
        .bind(patch.team_name.as_deref())
        .bind(patch.college_name.as_deref())
        .bind(patch.contact_number.as_deref())
        .bind(patch.email.as_deref())
        .bind(patch.team_size)
        .bind(members_json)
        .bind(updated_at)
        .bind(reg_code)
        .bind(event_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|r| r.0))
}

const SQL_TOGGLE_LOCK: &str = r#"
UPDATE registrations
SET is_locked = CASE WHEN is_locked = 0 THEN 1 ELSE 0 END,
    updated_at = ?1
WHERE id = ?2
RETURNING is_locked
"#;

/// Flips the admin lock and returns the new state.
pub async fn toggle_lock(
    pool: &SqlitePool,
    registration_id: &str,
    updated_at: &str,
) -> sqlx::Result<Option<bool>> {
    let row: Option<(bool,)> = sqlx::query_as(SQL_TOGGLE_LOCK)
        .bind(updated_at)
        .bind(registration_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|r| r.0))
}

const SQL_COMPARE_AND_INCREMENT_ATTENDANCE_COUNT: &str = r#"
UPDATE registrations
SET attendance_update_count = ?1 + 1
WHERE id = ?2
  AND attendance_update_count = ?1
RETURNING attendance_update_count
"#;

/// Conditional increment: matches only while the stored count still equals `expected`.
pub async fn compare_and_increment_attendance_count(
    pool: &SqlitePool,
    registration_id: &str,
    expected: i64,
) -> sqlx::Result<Option<i64>> {
    let row: Option<(i64,)> = sqlx::query_as(SQL_COMPARE_AND_INCREMENT_ATTENDANCE_COUNT)
        .bind(expected)
        .bind(registration_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|r| r.0))
}

pub async fn load_attendance_update_count(
    pool: &SqlitePool,
    registration_id: &str,
) -> sqlx::Result<Option<i64>> {
    let row: Option<(i64,)> =
        sqlx::query_as("SELECT attendance_update_count FROM registrations WHERE id = ?1")
            .bind(registration_id)
            .fetch_optional(pool)
            .await?;
    Ok(row.map(|r| r.0))
}

const SQL_TEAM_ATTENDANCE_URL: &str = r#"
SELECT '/attendance/' || reg_code
FROM registrations
WHERE reg_code = ?1
LIMIT 1
"#;

/// Relative path of a team's public attendance page, if the code exists.
pub async fn get_team_attendance_url(
    pool: &SqlitePool,
    reg_code: &str,
) -> sqlx::Result<Option<String>> {
    let row: Option<(String,)> = sqlx::query_as(SQL_TEAM_ATTENDANCE_URL)
        .bind(reg_code)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|r| r.0))
}

const SQL_LOAD_SHEET_CONTEXT: &str = r#"
SELECT
  r.id AS registration_id,
  r.event_id,
  r.problem_statement_id,
  r.reg_code,
  e.name AS event_name,
  e.sheet_id,
  p.title AS problem_title,
  p.sheet_tab_name
FROM registrations r
JOIN events e ON e.id = r.event_id
JOIN problem_statements p ON p.id = r.problem_statement_id
WHERE r.id = ?1
LIMIT 1
"#;

pub async fn load_sheet_context(
    pool: &SqlitePool,
    registration_id: &str,
) -> sqlx::Result<Option<RegistrationSheetContextRow>> {
    sqlx::query_as::<_, RegistrationSheetContextRow>(SQL_LOAD_SHEET_CONTEXT)
        .bind(registration_id)
        .fetch_optional(pool)
        .await
}
