use std::collections::HashMap;

use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};

use crate::database::{attendance_repo, now_timestamp, registrations_repo};
use crate::models::{AttendanceRow, RegistrationsRow};

pub const DEFAULT_ATTENDANCE_UPDATE_LIMIT: i64 = 2;

#[derive(Debug, Error)]
pub enum AttendanceError {
    #[error("registration not found")]
    NotFound,

    #[error("{0} is not a member of this team")]
    UnknownMember(String),

    /// Terminal: the team has used its whole edit budget.
    #[error("Attendance update limit reached for this team ({count}/{limit}).")]
    LimitReached { count: i64, limit: i64 },

    /// The conditional increment matched no row; the toggle was rolled back.
    #[error("Attendance update failed due to concurrent updates or limit reached ({count}/{limit}).")]
    ConcurrentUpdate { count: i64, limit: i64 },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberAttendanceView {
    pub member_name: String,
    pub is_present: bool,
    pub last_updated: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamAttendanceView {
    pub registration_id: String,
    pub reg_code: String,
    pub team_name: String,
    pub event_id: String,
    pub problem_statement_id: String,
    pub members: Vec<MemberAttendanceView>,
    pub attendance_update_count: i64,
    pub limit: i64,
    pub updates_remaining: i64,
}

/// A team's attendance as last seen by one client, plus the protocol that edits it.
///
/// `count` is the client's cached copy of `attendance_update_count`; every
/// toggle is a single compare-and-swap against it.
#[derive(Debug, Clone)]
pub struct AttendanceCounter {
    registration_id: String,
    presence: HashMap<String, bool>,
    count: i64,
    limit: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToggleOutcome {
    pub member_name: String,
    pub is_present: bool,
    pub attendance_update_count: i64,
    pub limit: i64,
}

impl AttendanceCounter {
    pub async fn load(
        pool: &SqlitePool,
        reg_code: &str,
        limit: i64,
    ) -> Result<Self, AttendanceError> {
        let reg = registrations_repo::load_by_code(pool, reg_code)
            .await?
            .ok_or(AttendanceError::NotFound)?;
        let rows = attendance_repo::list_for_registration(pool, &reg.id).await?;
        Ok(Self::from_rows(&reg, &rows, limit))
    }

    fn from_rows(reg: &RegistrationsRow, rows: &[AttendanceRow], limit: i64) -> Self {
        let presence = reg
            .members()
            .into_iter()
            .map(|m| {
                let present = rows
                    .iter()
                    .find(|r| r.member_name == m)
                    .map(|r| r.is_present)
                    .unwrap_or(false);
                (m, present)
            })
            .collect();
        Self {
            registration_id: reg.id.clone(),
            presence,
            count: reg.attendance_update_count,
            limit,
        }
    }

    /// Replaces the cached count, e.g. with the value a stateless client sent back.
    pub fn with_cached_count(mut self, count: i64) -> Self {
        self.count = count;
        self
    }

    pub fn count(&self) -> i64 {
        self.count
    }

    pub fn is_present(&self, member_name: &str) -> Option<bool> {
        self.presence.get(member_name).copied()
    }

    /// Flips one member's presence, spending one unit of the team's edit budget.
    ///
    /// On a lost race the attendance row is restored, the cached count is
    /// refreshed from the store and `ConcurrentUpdate` is returned. No retry.
    pub async fn toggle(
        &mut self,
        pool: &SqlitePool,
        member_name: &str,
    ) -> Result<ToggleOutcome, AttendanceError> {
        let Some(previous) = self.presence.get(member_name).copied() else {
            return Err(AttendanceError::UnknownMember(member_name.to_string()));
        };

        let expected = self.count;
        if expected >= self.limit {
            return Err(AttendanceError::LimitReached {
                count: expected,
                limit: self.limit,
            });
        }

        let next = !previous;
        attendance_repo::upsert_attendance(
            pool,
            &self.registration_id,
            member_name,
            next,
            &now_timestamp(),
        )
        .await?;
        self.presence.insert(member_name.to_string(), next);

        let swapped = registrations_repo::compare_and_increment_attendance_count(
            pool,
            &self.registration_id,
            expected,
        )
        .await?;

        let Some(new_count) = swapped else {
            attendance_repo::upsert_attendance(
                pool,
                &self.registration_id,
                member_name,
                previous,
                &now_timestamp(),
            )
            .await?;
            self.presence.insert(member_name.to_string(), previous);

            if let Some(fresh) =
                registrations_repo::load_attendance_update_count(pool, &self.registration_id)
                    .await?
            {
                self.count = fresh;
            }
            warn!(
                registration_id = %self.registration_id,
                member_name,
                expected,
                stored = self.count,
                "attendance toggle lost the count race, rolled back"
            );
            return Err(AttendanceError::ConcurrentUpdate {
                count: self.count,
                limit: self.limit,
            });
        };

        self.count = new_count;
        info!(
            registration_id = %self.registration_id,
            member_name,
            is_present = next,
            count = new_count,
            "attendance updated"
        );
        Ok(ToggleOutcome {
            member_name: member_name.to_string(),
            is_present: next,
            attendance_update_count: new_count,
            limit: self.limit,
        })
    }
}

pub async fn load_team_attendance(
    pool: &SqlitePool,
    reg_code: &str,
    limit: i64,
) -> Result<TeamAttendanceView, AttendanceError> {
    let reg = registrations_repo::load_by_code(pool, reg_code)
        .await?
        .ok_or(AttendanceError::NotFound)?;
    let rows = attendance_repo::list_for_registration(pool, &reg.id).await?;

    let members = reg
        .members()
        .into_iter()
        .map(|name| {
            let record = rows.iter().find(|r| r.member_name == name);
            MemberAttendanceView {
                is_present: record.map(|r| r.is_present).unwrap_or(false),
                last_updated: record.map(|r| r.last_updated.clone()),
                member_name: name,
            }
        })
        .collect();

    Ok(TeamAttendanceView {
        registration_id: reg.id,
        reg_code: reg.reg_code,
        team_name: reg.team_name,
        event_id: reg.event_id,
        problem_statement_id: reg.problem_statement_id,
        members,
        attendance_update_count: reg.attendance_update_count,
        limit,
        updates_remaining: (limit - reg.attendance_update_count).max(0),
    })
}

/// Toggle for a client that only holds the public code and its cached count.
pub async fn toggle_member_attendance(
    pool: &SqlitePool,
    reg_code: &str,
    member_name: &str,
    expected_count: i64,
    limit: i64,
) -> Result<ToggleOutcome, AttendanceError> {
    let mut counter = AttendanceCounter::load(pool, reg_code, limit)
        .await?
        .with_cached_count(expected_count);
    counter.toggle(pool, member_name).await
}

#[derive(Debug, Clone, Serialize)]
pub struct AttendanceStats {
    pub total: i64,
    pub present: i64,
    pub percentage: f64,
}

impl AttendanceStats {
    fn new(total: i64, present: i64) -> Self {
        let percentage = if total > 0 {
            (present as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        Self {
            total,
            present,
            percentage,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamAttendanceSummary {
    pub registration_id: String,
    pub team_name: String,
    pub reg_code: String,
    pub problem_statement_id: String,
    pub members: Vec<MemberAttendanceView>,
    pub stats: AttendanceStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventAttendanceOverview {
    pub event_id: String,
    pub teams: Vec<TeamAttendanceSummary>,
    pub overall: AttendanceStats,
}

/// Admin overview: every team of the event (optionally one problem statement),
/// members without a record counted as absent.
pub async fn load_event_attendance(
    pool: &SqlitePool,
    event_id: &str,
    problem_statement_id: Option<&str>,
) -> sqlx::Result<EventAttendanceOverview> {
    let registrations =
        registrations_repo::list_for_event(pool, event_id, problem_statement_id).await?;
    let records = attendance_repo::list_for_event(pool, event_id).await?;

    let mut by_registration: HashMap<&str, Vec<&AttendanceRow>> = HashMap::new();
    for record in &records {
        by_registration
            .entry(record.registration_id.as_str())
            .or_default()
            .push(record);
    }

    let mut total = 0;
    let mut present = 0;
    let mut teams = Vec::with_capacity(registrations.len());
    for reg in &registrations {
        let team_records = by_registration
            .get(reg.id.as_str())
            .cloned()
            .unwrap_or_default();
        let members: Vec<MemberAttendanceView> = reg
            .members()
            .into_iter()
            .map(|name| {
                let record = team_records.iter().find(|r| r.member_name == name);
                MemberAttendanceView {
                    is_present: record.map(|r| r.is_present).unwrap_or(false),
                    last_updated: record.map(|r| r.last_updated.clone()),
                    member_name: name,
                }
            })
            .collect();

        let team_total = members.len() as i64;
        let team_present = members.iter().filter(|m| m.is_present).count() as i64;
        total += team_total;
        present += team_present;

        teams.push(TeamAttendanceSummary {
            registration_id: reg.id.clone(),
            team_name: reg.team_name.clone(),
            reg_code: reg.reg_code.clone(),
            problem_statement_id: reg.problem_statement_id.clone(),
            members,
            stats: AttendanceStats::new(team_total, team_present),
        });
    }

    Ok(EventAttendanceOverview {
        event_id: event_id.to_string(),
        teams,
        overall: AttendanceStats::new(total, present),
    })
}
