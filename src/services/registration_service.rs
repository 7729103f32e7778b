use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::database::{
    events_repo, now_timestamp, problem_statements_repo, registrations_repo, ChangeFeed,
    ChangeKind, Table,
};
use crate::models::{EventsRow, RegistrationPatch, RegistrationsRow};
use crate::services::sync_error::SyncError;
use crate::services::sync_manager::SyncManager;

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("event not found")]
    EventNotFound,

    #[error("registrations are closed for this event")]
    EventClosed,

    #[error("registration deadline has passed")]
    DeadlinePassed,

    #[error("team size must be between 1 and {max}")]
    TeamSize { max: i64 },

    #[error("problem statement does not belong to this event")]
    ProblemMismatch,

    #[error("registration is locked")]
    Locked,

    #[error("registration not found")]
    NotFound,

    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    Sync(SyncError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewRegistrationRequest {
    pub problem_statement_id: String,
    pub team_name: String,
    pub college_name: String,
    pub contact_number: String,
    pub email: String,
    pub team_members: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegistrationView {
    pub id: String,
    pub event_id: String,
    pub problem_statement_id: String,
    pub team_name: String,
    pub college_name: String,
    pub contact_number: String,
    pub email: String,
    pub team_size: i64,
    pub team_members: Vec<String>,
    pub reg_code: String,
    pub is_locked: bool,
    pub attendance_update_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl From<RegistrationsRow> for RegistrationView {
    fn from(row: RegistrationsRow) -> Self {
        let team_members = row.members();
        Self {
            id: row.id,
            event_id: row.event_id,
            problem_statement_id: row.problem_statement_id,
            team_name: row.team_name,
            college_name: row.college_name,
            contact_number: row.contact_number,
            email: row.email,
            team_size: row.team_size,
            team_members,
            reg_code: row.reg_code,
            is_locked: row.is_locked,
            attendance_update_count: row.attendance_update_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Result of a write that is mirrored to the sheet afterwards. The write stands
/// when the mirror fails; `sheet_synced` says which happened.
#[derive(Debug, Clone, Serialize)]
pub struct SyncedRegistration {
    pub registration: RegistrationView,
    pub sheet_synced: bool,
}

fn clean_members(members: &[String]) -> Result<Vec<String>, RegistrationError> {
    let cleaned: Vec<String> = members.iter().map(|m| m.trim().to_string()).collect();
    if cleaned.iter().any(|m| m.is_empty()) {
        return Err(RegistrationError::Invalid(
            "team member names must not be empty".to_string(),
        ));
    }
    Ok(cleaned)
}

fn check_team_size(size: usize, event: &EventsRow) -> Result<(), RegistrationError> {
    let size = size as i64;
    if size < 1 || size > event.max_team_size {
        return Err(RegistrationError::TeamSize {
            max: event.max_team_size,
        });
    }
    Ok(())
}

fn deadline_passed(event: &EventsRow, now: DateTime<Utc>) -> bool {
    let Some(raw) = event.registration_deadline.as_deref().filter(|d| !d.is_empty()) else {
        return false;
    };
    match DateTime::parse_from_rfc3339(raw) {
        Ok(deadline) => now > deadline.with_timezone(&Utc),
        Err(e) => {
            warn!(event_id = %event.id, deadline = raw, "unparsable registration deadline: {}", e);
            false
        }
    }
}

/// Draws allowed per registration before a `reg_code` collision is surfaced.
const REG_CODE_ATTEMPTS: usize = 3;

fn new_reg_code() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_uppercase()
}

/// Inserts the registration, drawing a fresh code from `next_code` whenever
/// the UNIQUE constraint on `reg_code` rejects one. Returns the stored code.
async fn insert_with_fresh_code(
    pool: &SqlitePool,
    new: registrations_repo::NewRegistration<'_>,
    mut next_code: impl FnMut() -> String,
) -> Result<String, RegistrationError> {
    let mut attempt = 1;
    loop {
        let reg_code = next_code();
        let row = registrations_repo::NewRegistration {
            reg_code: &reg_code,
            ..new
        };
        match registrations_repo::insert_registration(pool, row).await {
            Ok(_) => return Ok(reg_code),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() && attempt < REG_CODE_ATTEMPTS => {
                warn!(attempt, "reg_code collision, drawing a new code");
                attempt += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

fn required(value: &str, field: &str) -> Result<String, RegistrationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(RegistrationError::Invalid(format!("{} is required", field)));
    }
    Ok(value.to_string())
}

pub async fn create_registration(
    pool: &SqlitePool,
    feed: &ChangeFeed,
    sync: &SyncManager,
    event_id: &str,
    req: NewRegistrationRequest,
) -> Result<SyncedRegistration, RegistrationError> {
    let event = events_repo::load_event(pool, event_id)
        .await?
        .ok_or(RegistrationError::EventNotFound)?;
    if !event.is_active {
        return Err(RegistrationError::EventClosed);
    }
    if deadline_passed(&event, Utc::now()) {
        return Err(RegistrationError::DeadlinePassed);
    }

    let problem = problem_statements_repo::load_problem_statement(pool, &req.problem_statement_id)
        .await?
        .filter(|p| p.event_id == event.id)
        .ok_or(RegistrationError::ProblemMismatch)?;

    let team_name = required(&req.team_name, "team_name")?;
    let college_name = required(&req.college_name, "college_name")?;
    let contact_number = required(&req.contact_number, "contact_number")?;
    let email = required(&req.email, "email")?;
    let members = clean_members(&req.team_members)?;
    check_team_size(members.len(), &event)?;

    let members_json = serde_json::to_string(&members)
        .map_err(|e| RegistrationError::Invalid(e.to_string()))?;
    let id = Uuid::new_v4().to_string();
    let now = now_timestamp();

    let reg_code = insert_with_fresh_code(
        pool,
        registrations_repo::NewRegistration {
            id: &id,
            event_id: &event.id,
            problem_statement_id: &problem.id,
            team_name: &team_name,
            college_name: &college_name,
            contact_number: &contact_number,
            email: &email,
            team_size: members.len() as i64,
            team_members_json: &members_json,
            reg_code: "",
            created_at: &now,
        },
        new_reg_code,
    )
    .await?;
    info!(registration_id = %id, event_id, reg_code = %reg_code, "registration created");

    feed.publish(
        Table::Registrations,
        ChangeKind::Insert,
        json!({ "id": id, "event_id": event.id, "reg_code": reg_code }),
    );

    let sheet_synced = match sync.upsert_registration(&id).await {
        Ok(()) => true,
        Err(e) if e.is_conflict() => {
            debug!(registration_id = %id, "registration sync already running");
            false
        }
        Err(e) => {
            warn!(registration_id = %id, error = %e, "registration saved but sheet sync failed");
            false
        }
    };

    let row = registrations_repo::load_registration(pool, &id)
        .await?
        .ok_or(RegistrationError::NotFound)?;
    Ok(SyncedRegistration {
        registration: row.into(),
        sheet_synced,
    })
}

pub async fn load_by_code(
    pool: &SqlitePool,
    reg_code: &str,
) -> Result<RegistrationView, RegistrationError> {
    registrations_repo::load_by_code(pool, reg_code.trim())
        .await?
        .map(RegistrationView::from)
        .ok_or(RegistrationError::NotFound)
}

/// Team-side edit by registration code. Locked registrations are refused; a
/// failed sheet mirror is reported but does not undo the write.
pub async fn update_by_code(
    pool: &SqlitePool,
    sync: &SyncManager,
    event_id: &str,
    reg_code: &str,
    mut patch: RegistrationPatch,
) -> Result<SyncedRegistration, RegistrationError> {
    if patch.is_empty() {
        return Err(RegistrationError::Invalid("nothing to update".to_string()));
    }
    for (value, field) in [
        (&mut patch.team_name, "team_name"),
        (&mut patch.college_name, "college_name"),
        (&mut patch.contact_number, "contact_number"),
        (&mut patch.email, "email"),
    ] {
        if let Some(v) = value.as_mut() {
            *v = required(v, field)?;
        }
    }

    let existing = registrations_repo::load_by_code(pool, reg_code)
        .await?
        .filter(|r| r.event_id == event_id)
        .ok_or(RegistrationError::NotFound)?;
    if existing.is_locked {
        return Err(RegistrationError::Locked);
    }

    if let Some(members) = patch.team_members.take() {
        let event = events_repo::load_event(pool, event_id)
            .await?
            .ok_or(RegistrationError::EventNotFound)?;
        let members = clean_members(&members)?;
        check_team_size(members.len(), &event)?;
        patch.team_size = Some(members.len() as i64);
        patch.team_members = Some(members);
    } else if patch.team_size.is_some() {
        return Err(RegistrationError::Invalid(
            "team_size follows team_members".to_string(),
        ));
    }

    let sheet_synced = match sync.update_registration_by_code(event_id, reg_code, &patch).await {
        Ok(synced) => synced,
        Err(SyncError::Remote(message)) => {
            warn!(reg_code, error = %message, "registration updated but sheet sync failed");
            false
        }
        Err(SyncError::NotFound(_)) => return Err(RegistrationError::NotFound),
        Err(SyncError::Database(e)) => return Err(RegistrationError::Database(e)),
        Err(e) => return Err(RegistrationError::Sync(e)),
    };

    let row = registrations_repo::load_registration(pool, &existing.id)
        .await?
        .ok_or(RegistrationError::NotFound)?;
    Ok(SyncedRegistration {
        registration: row.into(),
        sheet_synced,
    })
}

/// Flips the admin lock and returns the updated registration.
pub async fn toggle_lock(
    pool: &SqlitePool,
    feed: &ChangeFeed,
    registration_id: &str,
) -> Result<RegistrationView, RegistrationError> {
    let locked = registrations_repo::toggle_lock(pool, registration_id, &now_timestamp())
        .await?
        .ok_or(RegistrationError::NotFound)?;
    info!(registration_id, locked, "registration lock toggled");

    let row = registrations_repo::load_registration(pool, registration_id)
        .await?
        .ok_or(RegistrationError::NotFound)?;
    feed.publish(
        Table::Registrations,
        ChangeKind::Update,
        json!({ "id": row.id, "event_id": row.event_id, "is_locked": locked }),
    );
    Ok(row.into())
}

pub async fn list_for_event(
    pool: &SqlitePool,
    event_id: &str,
    problem_statement_id: Option<&str>,
) -> sqlx::Result<Vec<RegistrationView>> {
    let rows = registrations_repo::list_for_event(pool, event_id, problem_statement_id).await?;
    Ok(rows.into_iter().map(RegistrationView::from).collect())
}

/// Public attendance link for a team, absolute when `public_origin` is set.
pub async fn attendance_link(
    pool: &SqlitePool,
    reg_code: &str,
    public_origin: Option<&str>,
) -> sqlx::Result<Option<String>> {
    let path = registrations_repo::get_team_attendance_url(pool, reg_code.trim()).await?;
    Ok(path.map(|path| match public_origin {
        Some(origin) => format!("{}{}", origin.trim_end_matches('/'), path),
        None => path,
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::services::fake_sheets_gateway::FakeSheetsGateway;
    use crate::services::test_support::{memory_pool, seed_event, seed_problem};

    fn request(problem_id: &str, members: &[&str]) -> NewRegistrationRequest {
        NewRegistrationRequest {
            problem_statement_id: problem_id.to_string(),
            team_name: " Byte Me ".to_string(),
            college_name: "NIT".to_string(),
            contact_number: "9876543210".to_string(),
            email: "lead@example.com".to_string(),
            team_members: members.iter().map(|m| m.to_string()).collect(),
        }
    }

    async fn setup() -> (SqlitePool, ChangeFeed, Arc<FakeSheetsGateway>, SyncManager) {
        let pool = memory_pool().await;
        seed_event(&pool, "e1", Some("s1")).await;
        seed_problem(&pool, "p1", "e1", "AI").await;
        let feed = ChangeFeed::default();
        let gateway = Arc::new(FakeSheetsGateway::new());
        let sync = SyncManager::new(pool.clone(), gateway.clone(), feed.clone());
        (pool, feed, gateway, sync)
    }

    #[tokio::test]
    async fn create_then_lookup_by_code() {
        let (pool, feed, gateway, sync) = setup().await;
        let mut rx = feed.subscribe();

        let created = create_registration(&pool, &feed, &sync, "e1", request("p1", &["Ann", "Bo"]))
            .await
            .unwrap();
        assert!(created.sheet_synced);
        assert_eq!(created.registration.team_name, "Byte Me");
        assert_eq!(created.registration.team_size, 2);
        assert_eq!(created.registration.reg_code.len(), 8);
        assert_eq!(gateway.count("syncRegistration"), 1);

        let change = rx.recv().await.unwrap();
        assert_eq!(change.table, Table::Registrations);
        assert_eq!(change.kind, ChangeKind::Insert);
        assert_eq!(change.id(), Some(created.registration.id.as_str()));

        let found = load_by_code(&pool, &created.registration.reg_code).await.unwrap();
        assert_eq!(found, created.registration);
        assert_eq!(found.team_members, vec!["Ann", "Bo"]);
    }

    #[tokio::test]
    async fn lookup_after_update_matches_the_updated_registration() {
        let (pool, feed, _gateway, sync) = setup().await;
        let created = create_registration(&pool, &feed, &sync, "e1", request("p1", &["Ann"]))
            .await
            .unwrap();

        let patch = RegistrationPatch {
            team_name: Some("  Null Pointers ".into()),
            contact_number: Some("9000000000".into()),
            team_members: Some(vec!["Ann".into(), "Cy".into(), "Dee".into()]),
            ..Default::default()
        };
        let updated = update_by_code(&pool, &sync, "e1", &created.registration.reg_code, patch)
            .await
            .unwrap();
        assert!(updated.sheet_synced);
        assert_eq!(updated.registration.team_name, "Null Pointers");
        assert_eq!(updated.registration.team_size, 3);
        assert_eq!(updated.registration.email, created.registration.email);
        assert_eq!(updated.registration.reg_code, created.registration.reg_code);

        let found = load_by_code(&pool, &created.registration.reg_code).await.unwrap();
        assert_eq!(found, updated.registration);
    }

    #[tokio::test]
    async fn update_by_code_rejects_blank_required_fields() {
        let (pool, feed, gateway, sync) = setup().await;
        let created = create_registration(&pool, &feed, &sync, "e1", request("p1", &["Ann"]))
            .await
            .unwrap();
        let before = gateway.calls().len();

        let patch = RegistrationPatch {
            team_name: Some("   ".into()),
            email: Some(String::new()),
            ..Default::default()
        };
        assert!(matches!(
            update_by_code(&pool, &sync, "e1", &created.registration.reg_code, patch).await,
            Err(RegistrationError::Invalid(_))
        ));
        assert_eq!(gateway.calls().len(), before);

        let found = load_by_code(&pool, &created.registration.reg_code).await.unwrap();
        assert_eq!(found, created.registration);
    }

    #[tokio::test]
    async fn code_collision_draws_a_new_code() {
        let (pool, feed, _gateway, sync) = setup().await;
        let taken = create_registration(&pool, &feed, &sync, "e1", request("p1", &["Ann"]))
            .await
            .unwrap()
            .registration
            .reg_code;

        let mut codes = vec!["FRESH001".to_string(), taken.clone()];
        let new = registrations_repo::NewRegistration {
            id: "r-retry",
            event_id: "e1",
            problem_statement_id: "p1",
            team_name: "Retry",
            college_name: "IIT",
            contact_number: "1",
            email: "r@example.com",
            team_size: 1,
            team_members_json: r#"["Ann"]"#,
            reg_code: "",
            created_at: "2026-01-01T00:00:00Z",
        };
        let stored = insert_with_fresh_code(&pool, new, || codes.pop().unwrap())
            .await
            .unwrap();
        assert_eq!(stored, "FRESH001");
        assert_eq!(load_by_code(&pool, "FRESH001").await.unwrap().id, "r-retry");

        let always_taken = registrations_repo::NewRegistration { id: "r-stuck", ..new };
        assert!(matches!(
            insert_with_fresh_code(&pool, always_taken, || taken.clone()).await,
            Err(RegistrationError::Database(_))
        ));
    }

    #[tokio::test]
    async fn failed_sheet_sync_keeps_the_registration() {
        let (pool, feed, gateway, sync) = setup().await;
        gateway.fail_next("syncRegistration", "sheet offline");

        let created = create_registration(&pool, &feed, &sync, "e1", request("p1", &["Ann"]))
            .await
            .unwrap();
        assert!(!created.sheet_synced);
        assert!(load_by_code(&pool, &created.registration.reg_code).await.is_ok());
    }

    #[tokio::test]
    async fn create_validates_event_problem_and_team() {
        let (pool, feed, _gateway, sync) = setup().await;
        seed_event(&pool, "e2", None).await;
        seed_problem(&pool, "p2", "e2", "Other").await;

        assert!(matches!(
            create_registration(&pool, &feed, &sync, "nope", request("p1", &["Ann"])).await,
            Err(RegistrationError::EventNotFound)
        ));
        assert!(matches!(
            create_registration(&pool, &feed, &sync, "e1", request("p2", &["Ann"])).await,
            Err(RegistrationError::ProblemMismatch)
        ));
        assert!(matches!(
            create_registration(&pool, &feed, &sync, "e1", request("p1", &[])).await,
            Err(RegistrationError::TeamSize { max: 4 })
        ));
        assert!(matches!(
            create_registration(&pool, &feed, &sync, "e1", request("p1", &["A", "B", "C", "D", "E"]))
                .await,
            Err(RegistrationError::TeamSize { .. })
        ));
        assert!(matches!(
            create_registration(&pool, &feed, &sync, "e1", request("p1", &["Ann", "  "])).await,
            Err(RegistrationError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn closed_or_expired_events_refuse_registrations() {
        let (pool, feed, _gateway, sync) = setup().await;
        sqlx::query("UPDATE events SET registration_deadline = '2020-01-01T00:00:00Z' WHERE id = 'e1'")
            .execute(&pool)
            .await
            .unwrap();
        assert!(matches!(
            create_registration(&pool, &feed, &sync, "e1", request("p1", &["Ann"])).await,
            Err(RegistrationError::DeadlinePassed)
        ));

        sqlx::query("UPDATE events SET is_active = 0 WHERE id = 'e1'")
            .execute(&pool)
            .await
            .unwrap();
        assert!(matches!(
            create_registration(&pool, &feed, &sync, "e1", request("p1", &["Ann"])).await,
            Err(RegistrationError::EventClosed)
        ));
    }

    #[tokio::test]
    async fn update_by_code_reports_sheet_failure_without_failing() {
        let (pool, feed, gateway, sync) = setup().await;
        let created = create_registration(&pool, &feed, &sync, "e1", request("p1", &["Ann"]))
            .await
            .unwrap();
        gateway.fail_next("syncRegistration", "sheet offline");

        let patch = RegistrationPatch {
            team_members: Some(vec!["Ann".into(), "Cy".into()]),
            ..Default::default()
        };
        let updated = update_by_code(&pool, &sync, "e1", &created.registration.reg_code, patch)
            .await
            .unwrap();
        assert!(!updated.sheet_synced);
        assert_eq!(updated.registration.team_size, 2);
        assert_eq!(updated.registration.team_members, vec!["Ann", "Cy"]);
    }

    #[tokio::test]
    async fn locked_registration_refuses_updates() {
        let (pool, feed, gateway, sync) = setup().await;
        let created = create_registration(&pool, &feed, &sync, "e1", request("p1", &["Ann"]))
            .await
            .unwrap();
        let locked = toggle_lock(&pool, &feed, &created.registration.id).await.unwrap();
        assert!(locked.is_locked);

        let patch = RegistrationPatch {
            team_name: Some("Renamed".into()),
            ..Default::default()
        };
        let before = gateway.calls().len();
        assert!(matches!(
            update_by_code(&pool, &sync, "e1", &created.registration.reg_code, patch).await,
            Err(RegistrationError::Locked)
        ));
        assert_eq!(gateway.calls().len(), before);

        let unlocked = toggle_lock(&pool, &feed, &created.registration.id).await.unwrap();
        assert!(!unlocked.is_locked);
    }

    #[tokio::test]
    async fn attendance_link_uses_origin_when_configured() {
        let (pool, feed, _gateway, sync) = setup().await;
        let created = create_registration(&pool, &feed, &sync, "e1", request("p1", &["Ann"]))
            .await
            .unwrap();
        let code = created.registration.reg_code;

        assert_eq!(
            attendance_link(&pool, &code, None).await.unwrap(),
            Some(format!("/attendance/{}", code))
        );
        assert_eq!(
            attendance_link(&pool, &code, Some("https://hack.example.org/")).await.unwrap(),
            Some(format!("https://hack.example.org/attendance/{}", code))
        );
        assert_eq!(attendance_link(&pool, "MISSING", None).await.unwrap(), None);
    }
}
