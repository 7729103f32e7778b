use sqlx::SqlitePool;

use crate::models::AttendanceRow;

const SQL_UPSERT_ATTENDANCE: &str = r#"
INSERT INTO attendance (
  registration_id,
  member_name,
  is_present,
  last_updated
) VALUES (?1, ?2, ?3, ?4)
ON CONFLICT(registration_id, member_name) DO UPDATE SET
  is_present = excluded.is_present,
  last_updated = excluded.last_updated
"#;

pub async fn upsert_attendance(
    pool: &SqlitePool,
    registration_id: &str,
    member_name: &str,
    is_present: bool,
    last_updated: &str,
) -> sqlx::Result<()> {
    sqlx::query(SQL_UPSERT_ATTENDANCE)
        .bind(registration_id)
        .bind(member_name)
        .bind(is_present)
        .bind(last_updated)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn list_for_registration(
    pool: &SqlitePool,
    registration_id: &str,
) -> sqlx::Result<Vec<AttendanceRow>> {
    sqlx::query_as::<_, AttendanceRow>(
        r#"
SELECT
  registration_id,
  member_name,
  is_present,
  last_updated
FROM attendance
WHERE registration_id = ?1
        "#,
    )
    .bind(registration_id)
    .fetch_all(pool)
    .await
}

pub async fn list_for_event(
    pool: &SqlitePool,
    event_id: &str,
) -> sqlx::Result<Vec<AttendanceRow>> {
    sqlx::query_as::<_, AttendanceRow>(
        r#"
SELECT
  a.registration_id,
  a.member_name,
  a.is_present,
  a.last_updated
FROM attendance a
JOIN registrations r ON r.id = a.registration_id
WHERE r.event_id = ?1
ORDER BY a.last_updated DESC
        "#,
    )
    .bind(event_id)
    .fetch_all(pool)
    .await
}
