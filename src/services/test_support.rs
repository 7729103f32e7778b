use sqlx::SqlitePool;

use crate::database::{events_repo, problem_statements_repo, registrations_repo, schema};

pub async fn memory_pool() -> SqlitePool {
    schema::open_pool("sqlite::memory:").await.unwrap()
}

pub async fn seed_event(pool: &SqlitePool, id: &str, sheet_id: Option<&str>) {
    events_repo::insert_event(
        pool,
        events_repo::NewEvent {
            id,
            name: &format!("Event {}", id),
            description: "",
            is_active: true,
            max_team_size: 4,
            registration_deadline: None,
            created_at: "2026-01-01T00:00:00.000Z",
        },
    )
    .await
    .unwrap();
    if let Some(sheet_id) = sheet_id {
        events_repo::claim_sheet_id(pool, id, sheet_id, "2026-01-01T00:00:00.000Z")
            .await
            .unwrap();
    }
}

pub async fn seed_problem(pool: &SqlitePool, id: &str, event_id: &str, title: &str) {
    problem_statements_repo::insert_problem_statement(
        pool,
        problem_statements_repo::NewProblemStatement {
            id,
            event_id,
            title,
            description: "",
            created_at: "2026-01-01T00:00:00.000Z",
        },
    )
    .await
    .unwrap();
}

pub async fn seed_registration(
    pool: &SqlitePool,
    id: &str,
    event_id: &str,
    problem_id: &str,
    reg_code: &str,
    members: &[&str],
) {
    let members_json = serde_json::to_string(members).unwrap();
    registrations_repo::insert_registration(
        pool,
        registrations_repo::NewRegistration {
            id,
            event_id,
            problem_statement_id: problem_id,
            team_name: &format!("Team {}", id),
            college_name: "IIT",
            contact_number: "9999999999",
            email: "team@example.com",
            team_size: members.len() as i64,
            team_members_json: &members_json,
            reg_code,
            created_at: "2026-01-01T00:00:00.000Z",
        },
    )
    .await
    .unwrap();
}

pub async fn set_attendance_count(pool: &SqlitePool, registration_id: &str, count: i64) {
    sqlx::query("UPDATE registrations SET attendance_update_count = ?1 WHERE id = ?2")
        .bind(count)
        .bind(registration_id)
        .execute(pool)
        .await
        .unwrap();
}
